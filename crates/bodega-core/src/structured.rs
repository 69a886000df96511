// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Oracle-call helpers over the provider adapter.
//!
//! Grading, classification, and delegation decisions all require JSON
//! outputs. Models wrap JSON in markdown fences or prose often enough that
//! we extract the outermost JSON payload before deserializing. An oracle
//! failure (transport or unparseable output) gets exactly one immediate
//! retry with the same request before surfacing; plain-text completions
//! follow the same policy via [`complete_text`].

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::BodegaError;
use crate::traits::ProviderAdapter;
use crate::types::ProviderRequest;

/// Calls the provider and deserializes its response as `T`.
///
/// Retries once on transport failure or malformed output, then returns
/// [`BodegaError::Oracle`].
pub async fn complete_structured<T: DeserializeOwned>(
    provider: &dyn ProviderAdapter,
    request: ProviderRequest,
) -> Result<T, BodegaError> {
    match try_once::<T>(provider, request.clone()).await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(error = %first, "structured oracle call failed, retrying once");
            try_once::<T>(provider, request).await.map_err(|second| {
                BodegaError::Oracle {
                    message: format!("structured output failed after retry: {second}"),
                    source: None,
                }
            })
        }
    }
}

async fn try_once<T: DeserializeOwned>(
    provider: &dyn ProviderAdapter,
    request: ProviderRequest,
) -> Result<T, BodegaError> {
    let response = provider.complete(request).await?;
    parse_json_payload(&response.content)
}

/// Calls the provider for a plain-text completion.
///
/// Transport failures get the same one immediate retry as structured
/// calls, then surface as [`BodegaError::Oracle`].
pub async fn complete_text(
    provider: &dyn ProviderAdapter,
    request: ProviderRequest,
) -> Result<String, BodegaError> {
    match provider.complete(request.clone()).await {
        Ok(response) => Ok(response.content),
        Err(first) => {
            warn!(error = %first, "text oracle call failed, retrying once");
            provider
                .complete(request)
                .await
                .map(|response| response.content)
                .map_err(|second| BodegaError::Oracle {
                    message: format!("completion failed after retry: {second}"),
                    source: None,
                })
        }
    }
}

/// Extracts and deserializes the outermost JSON object or array in `text`.
///
/// Handles markdown code fences and surrounding prose.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, BodegaError> {
    let trimmed = text.trim();

    let start = trimmed
        .find(['{', '['])
        .ok_or_else(|| BodegaError::oracle("no JSON payload in response"))?;
    let end = trimmed
        .rfind(['}', ']'])
        .map(|i| i + 1)
        .ok_or_else(|| BodegaError::oracle("unterminated JSON payload in response"))?;
    if end <= start {
        return Err(BodegaError::oracle("malformed JSON payload in response"));
    }

    serde_json::from_str(&trimmed[start..end]).map_err(|e| {
        debug!(raw = trimmed, "unparseable structured response");
        BodegaError::oracle(format!("invalid structured output: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::traits::PluginAdapter;
    use crate::types::{AdapterType, HealthStatus, ProviderResponse};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: String,
    }

    struct ScriptedProvider {
        // None entries simulate a transport failure.
        responses: Mutex<VecDeque<Option<String>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Option<&str>>) -> Self {
            Self {
                responses: Mutex::new(
                    responses.into_iter().map(|r| r.map(String::from)).collect(),
                ),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
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
    impl ProviderAdapter for ScriptedProvider {
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, BodegaError> {
            *self.calls.lock().unwrap() += 1;
            match self.responses.lock().unwrap().pop_front().flatten() {
                Some(content) => Ok(ProviderResponse { content }),
                None => Err(BodegaError::oracle("scripted transport failure")),
            }
        }
    }

    #[tokio::test]
    async fn retries_once_after_malformed_output() {
        let provider = ScriptedProvider::new(vec![
            Some("I would rate this highly."),
            Some(r#"{"score": "yes"}"#),
        ]);
        let request = ProviderRequest::prompt("grade", "doc", 64);
        let score: Score = complete_structured(&provider, request).await.unwrap();
        assert_eq!(score.score, "yes");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn two_failures_surface_an_oracle_error() {
        let provider = ScriptedProvider::new(vec![None, None]);
        let request = ProviderRequest::prompt("grade", "doc", 64);
        let err = complete_structured::<Score>(&provider, request)
            .await
            .unwrap_err();
        assert!(matches!(err, BodegaError::Oracle { .. }));
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn parses_bare_json() {
        let s: Score = parse_json_payload(r#"{"score": "yes"}"#).unwrap();
        assert_eq!(s.score, "yes");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"score\": \"no\"}\n```";
        let s: Score = parse_json_payload(raw).unwrap();
        assert_eq!(s.score, "no");
    }

    #[test]
    fn parses_json_with_surrounding_prose() {
        let raw = "Here is my judgment:\n{\"score\": \"yes\"}\nHope that helps.";
        let s: Score = parse_json_payload(raw).unwrap();
        assert_eq!(s.score, "yes");
    }

    #[test]
    fn rejects_plain_text() {
        let err = parse_json_payload::<Score>("definitely relevant").unwrap_err();
        assert!(matches!(err, BodegaError::Oracle { .. }));
    }

    #[test]
    fn rejects_truncated_json() {
        let err = parse_json_payload::<Score>(r#"{"score": "#).unwrap_err();
        assert!(matches!(err, BodegaError::Oracle { .. }));
    }

    #[test]
    fn parses_arrays() {
        let items: Vec<u32> = parse_json_payload("the list: [1, 2, 3] done").unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
