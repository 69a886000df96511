// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Bodega's external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod provider;
pub mod search;
pub mod store;

pub use adapter::PluginAdapter;
pub use provider::ProviderAdapter;
pub use search::ProductSearchAdapter;
pub use store::KeyValueStore;
