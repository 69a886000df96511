// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store adapter trait for long-term memory persistence.

use async_trait::async_trait;

use crate::error::BodegaError;
use crate::traits::adapter::PluginAdapter;

/// Namespaced key-value persistence for memory records.
///
/// Namespaces partition records by `{kind}:{user_id}` (see `bodega-memory`);
/// the store itself is agnostic to the scheme. `put` has insert-or-update
/// semantics. Values are JSON documents.
#[async_trait]
pub trait KeyValueStore: PluginAdapter {
    /// Fetches one record, or `None` if absent.
    async fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, BodegaError>;

    /// Lists all `(key, value)` pairs in a namespace.
    async fn search_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<(String, serde_json::Value)>, BodegaError>;

    /// Inserts or overwrites one record.
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), BodegaError>;
}
