// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product search adapter trait for the external evidence store.

use async_trait::async_trait;

use crate::error::BodegaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::EvidenceItem;

/// Adapter for the product-price evidence store.
///
/// Implementations must return items pre-sorted by relevance descending.
/// An empty result set is a valid, non-error outcome; transport failures
/// surface as [`BodegaError::Retrieval`].
#[async_trait]
pub trait ProductSearchAdapter: PluginAdapter {
    /// Runs a similarity search for `query`, returning at most `limit` items.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, BodegaError>;
}
