// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Bodega integration tests.
//!
//! Provides mock adapters (`MockProvider`, `MockSearch`) and an
//! `InMemoryStore` so the full agent pipeline can run deterministically
//! without external services.

pub mod memory_store;
pub mod mock_provider;
pub mod mock_search;

pub use memory_store::InMemoryStore;
pub use mock_provider::MockProvider;
pub use mock_search::{evidence, MockSearch};
