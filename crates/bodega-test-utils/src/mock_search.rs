// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock product-search adapter for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use bodega_core::traits::adapter::PluginAdapter;
use bodega_core::traits::search::ProductSearchAdapter;
use bodega_core::types::{AdapterType, EvidenceItem, HealthStatus, StorePrice};
use bodega_core::BodegaError;

/// A mock product search that returns pre-configured result sets.
///
/// Result sets are popped from a FIFO queue, one per `search` call.
/// An empty queue yields an empty result list. Queries are recorded
/// so tests can assert on rewritten queries.
pub struct MockSearch {
    results: Arc<Mutex<VecDeque<Vec<EvidenceItem>>>>,
    queries: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MockSearch {
    /// Create a new mock search with an empty result queue.
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Create a mock search pre-loaded with result sets, one per call.
    pub fn with_results(results: Vec<Vec<EvidenceItem>>) -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::from(results))),
            queries: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Add a result set to the end of the queue.
    pub async fn add_results(&self, items: Vec<EvidenceItem>) {
        self.results.lock().await.push_back(items);
    }

    /// Make the next `search` call fail with a retrieval error.
    pub async fn fail_next_call(&self) {
        *self.fail_next.lock().await = true;
    }

    /// Queries received so far, in call order.
    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a simple evidence item for tests.
pub fn evidence(id: &str, title: &str, relevance: f32) -> EvidenceItem {
    EvidenceItem {
        id: id.to_string(),
        title: title.to_string(),
        brand: None,
        size: None,
        store_prices: vec![StorePrice {
            store: "Corner Market".to_string(),
            price: "2.49".to_string(),
            on_offer: false,
        }],
        relevance,
    }
}

#[async_trait]
impl PluginAdapter for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ProductSearch
    }

    async fn health_check(&self) -> Result<HealthStatus, BodegaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProductSearchAdapter for MockSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, BodegaError> {
        self.queries.lock().await.push(query.to_string());

        let mut fail = self.fail_next.lock().await;
        if *fail {
            *fail = false;
            return Err(BodegaError::retrieval("mock search failure"));
        }
        drop(fail);

        let mut items = self
            .results
            .lock()
            .await
            .pop_front()
            .unwrap_or_default();
        items.truncate(limit);
        Ok(items)
    }
}
