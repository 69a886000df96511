// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text-generation provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use bodega_core::traits::adapter::PluginAdapter;
use bodega_core::traits::provider::ProviderAdapter;
use bodega_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse};
use bodega_core::BodegaError;

/// A mock provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    fail_next: Arc<Mutex<u32>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fail_next: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            fail_next: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Make the next `complete` call fail with an oracle error.
    pub async fn fail_next_call(&self) {
        self.fail_next_calls(1).await;
    }

    /// Make the next `n` `complete` calls fail, enough to defeat the
    /// callers' single-retry policy when a hard failure is wanted.
    pub async fn fail_next_calls(&self, n: u32) {
        *self.fail_next.lock().await = n;
    }

    /// Pop the next response, or return the default.
    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, BodegaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, BodegaError> {
        let mut fail = self.fail_next.lock().await;
        if *fail > 0 {
            *fail -= 1;
            return Err(BodegaError::oracle("mock provider failure"));
        }
        drop(fail);

        let text = self.next_response().await;
        Ok(ProviderResponse { content: text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            system_prompt: None,
            messages: vec![],
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.content, "mock response");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string(),
        ]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "second"
        );
        assert_eq!(provider.complete(request()).await.unwrap().content, "third");
        // Queue exhausted, falls back to default
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "mock response"
        );
    }

    #[tokio::test]
    async fn add_response_after_construction() {
        let provider = MockProvider::new();
        provider.add_response("dynamic response").await;
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "dynamic response"
        );
    }

    #[tokio::test]
    async fn fail_next_call_errors_once() {
        let provider = MockProvider::with_responses(vec!["after failure".to_string()]);
        provider.fail_next_call().await;
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "after failure"
        );
    }

    #[tokio::test]
    async fn fail_next_calls_arms_consecutive_failures() {
        let provider = MockProvider::with_responses(vec!["after failures".to_string()]);
        provider.fail_next_calls(2).await;
        assert!(provider.complete(request()).await.is_err());
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "after failures"
        );
    }
}
