// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Bodega grocery-shopping assistant.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Bodega workspace. The external
//! collaborators (text-generation provider, product search, key-value store)
//! are consumed through the adapter traits defined here.

pub mod error;
pub mod state;
pub mod structured;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BodegaError;
pub use state::ConversationState;
pub use types::{AdapterType, ConversationId, EvidenceItem, HealthStatus, Role, TurnMessage, Verdict};

// Re-export all adapter traits at crate root.
pub use traits::{KeyValueStore, PluginAdapter, ProductSearchAdapter, ProviderAdapter};
