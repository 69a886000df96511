// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value store for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use bodega_core::traits::adapter::PluginAdapter;
use bodega_core::traits::store::KeyValueStore;
use bodega_core::types::{AdapterType, HealthStatus};
use bodega_core::BodegaError;

/// Namespaced in-memory store backed by nested hash maps.
///
/// Reads take a shared lock, writes an exclusive one. Namespace listing
/// returns entries in insertion-independent (sorted-by-key) order so
/// tests are deterministic.
pub struct InMemoryStore {
    data: RwLock<HashMap<String, HashMap<String, serde_json::Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries in a namespace, for test assertions.
    pub async fn namespace_len(&self, namespace: &str) -> usize {
        self.data
            .read()
            .await
            .get(namespace)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::KeyValueStore
    }

    async fn health_check(&self) -> Result<HealthStatus, BodegaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, BodegaError> {
        Ok(self
            .data
            .read()
            .await
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    async fn search_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<(String, serde_json::Value)>, BodegaError> {
        let guard = self.data.read().await;
        let mut entries: Vec<(String, serde_json::Value)> = guard
            .get(namespace)
            .map(|ns| ns.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), BodegaError> {
        self.data
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_returns_none_for_missing_key() {
        let store = InMemoryStore::new();
        assert!(store.get("profile:u1", "profile").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStore::new();
        store
            .put("profile:u1", "profile", json!({"likes": ["coffee"]}))
            .await
            .unwrap();
        let value = store.get("profile:u1", "profile").await.unwrap().unwrap();
        assert_eq!(value["likes"][0], "coffee");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryStore::new();
        store.put("profile:u1", "k", json!(1)).await.unwrap();
        store.put("profile:u2", "k", json!(2)).await.unwrap();
        assert_eq!(store.get("profile:u1", "k").await.unwrap().unwrap(), 1);
        assert_eq!(store.get("profile:u2", "k").await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn search_namespace_sorted_by_key() {
        let store = InMemoryStore::new();
        store.put("log:u1", "b", json!("second")).await.unwrap();
        store.put("log:u1", "a", json!("first")).await.unwrap();
        let entries = store.search_namespace("log:u1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "a");
        assert_eq!(entries[1].0, "b");
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let store = InMemoryStore::new();
        store.put("ns", "k", json!("old")).await.unwrap();
        store.put("ns", "k", json!("new")).await.unwrap();
        assert_eq!(store.get("ns", "k").await.unwrap().unwrap(), "new");
        assert_eq!(store.namespace_len("ns").await, 1);
    }
}
