// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summarizer.
//!
//! When history grows past the configured threshold, older messages are
//! folded into a running summary and the history is truncated to the
//! newest few messages. An existing summary is extended, not replaced
//! from scratch. Summarizing an already-short history is a no-op, so the
//! operation is safe to trigger twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;

use bodega_config::model::SummarizerConfig;
use bodega_core::state::ConversationState;
use bodega_core::structured::complete_text;
use bodega_core::traits::ProviderAdapter;
use bodega_core::types::{ProviderRequest, TurnMessage};
use bodega_core::BodegaError;
use bodega_memory::MemoryStore;

pub struct Summarizer {
    provider: Arc<dyn ProviderAdapter>,
    store: Arc<MemoryStore>,
    config: SummarizerConfig,
    max_tokens: u32,
    call_timeout: Duration,
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        store: Arc<MemoryStore>,
        config: SummarizerConfig,
        max_tokens: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            max_tokens,
            call_timeout,
        }
    }

    /// Summarize when the message count exceeds the threshold.
    ///
    /// Returns whether a summarization pass ran.
    pub async fn maybe_summarize(
        &self,
        user_id: &str,
        conversation_key: &str,
        state: &mut ConversationState,
    ) -> Result<bool, BodegaError> {
        if state.messages.len() <= self.config.message_threshold {
            return Ok(false);
        }
        self.summarize(user_id, conversation_key, state).await
    }

    /// Unconditionally fold older history into the summary and truncate.
    ///
    /// No-op when the history is already within the keep-recent window.
    pub async fn summarize(
        &self,
        user_id: &str,
        conversation_key: &str,
        state: &mut ConversationState,
    ) -> Result<bool, BodegaError> {
        if state.messages.len() <= self.config.keep_recent {
            return Ok(false);
        }

        let instruction = match &state.summary {
            Some(summary) => format!(
                "This is the summary of the conversation to date: {summary}\n\n\
                 Extend the summary by taking into account the new messages above:"
            ),
            None => "Create a summary of the conversation above:".to_string(),
        };

        let mut messages: Vec<TurnMessage> = state.messages.clone();
        messages.push(TurnMessage::user(instruction));
        let content = timeout(
            self.call_timeout,
            complete_text(
                self.provider.as_ref(),
                ProviderRequest {
                    system_prompt: None,
                    messages,
                    max_tokens: self.max_tokens,
                },
            ),
        )
        .await
        .map_err(|_| BodegaError::Timeout {
            duration: self.call_timeout,
        })??;

        let before = state.messages.len();
        state.summary = Some(content.trim().to_string());
        let removed = state.truncate_history(self.config.keep_recent);
        info!(
            user_id,
            conversation_key,
            messages_before = before,
            messages_after = state.messages.len(),
            removed,
            "conversation summarized"
        );

        if let Some(summary) = &state.summary {
            self.store
                .save_summary(user_id, conversation_key, summary)
                .await?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_test_utils::{InMemoryStore, MockProvider};

    fn summarizer(provider: Arc<MockProvider>, store: Arc<MemoryStore>) -> Summarizer {
        let config = SummarizerConfig {
            message_threshold: 4,
            keep_recent: 2,
        };
        Summarizer::new(provider, store, config, 256, Duration::from_secs(5))
    }

    fn filled_state(n: usize) -> ConversationState {
        let mut state = ConversationState::new();
        for i in 0..n {
            if i % 2 == 0 {
                state.push_message(TurnMessage::user(format!("question {i}")));
            } else {
                state.push_message(TurnMessage::assistant(format!("answer {i}")));
            }
        }
        state
    }

    #[tokio::test]
    async fn below_threshold_is_a_noop() {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(provider, store);

        let mut state = filled_state(4);
        let ran = s.maybe_summarize("u1", "c1", &mut state).await.unwrap();
        assert!(!ran);
        assert_eq!(state.messages.len(), 4);
        assert!(state.summary.is_none());
    }

    #[tokio::test]
    async fn over_threshold_truncates_and_persists() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "User is shopping for breakfast items.".to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(provider, Arc::clone(&store));

        let mut state = filled_state(5);
        let ran = s.maybe_summarize("u1", "c1", &mut state).await.unwrap();
        assert!(ran);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content, "answer 3");
        assert_eq!(
            state.summary.as_deref(),
            Some("User is shopping for breakfast items.")
        );
        assert_eq!(
            store.load_summary("u1", "c1").await.unwrap().unwrap(),
            "User is shopping for breakfast items."
        );
    }

    #[tokio::test]
    async fn existing_summary_is_extended_not_replaced() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "Earlier: milk. Now also: bread.".to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(Arc::clone(&provider), store);

        let mut state = filled_state(5);
        state.summary = Some("Earlier: milk.".to_string());
        s.maybe_summarize("u1", "c1", &mut state).await.unwrap();
        assert_eq!(
            state.summary.as_deref(),
            Some("Earlier: milk. Now also: bread.")
        );
    }

    #[tokio::test]
    async fn double_summarize_is_idempotent() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "summary text".to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(provider, store);

        let mut state = filled_state(6);
        assert!(s.summarize("u1", "c1", &mut state).await.unwrap());
        // History is now at keep_recent; a second pass changes nothing.
        assert!(!s.summarize("u1", "c1", &mut state).await.unwrap());
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.summary.as_deref(), Some("summary text"));
    }

    #[tokio::test]
    async fn one_transport_blip_does_not_abort_summarization() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "summary after retry".to_string(),
        ]));
        provider.fail_next_call().await;
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(provider, store);

        let mut state = filled_state(5);
        assert!(s.maybe_summarize("u1", "c1", &mut state).await.unwrap());
        assert_eq!(state.summary.as_deref(), Some("summary after retry"));
    }

    #[tokio::test]
    async fn provider_failure_leaves_state_untouched() {
        let provider = Arc::new(MockProvider::new());
        // Two failures defeat the single retry.
        provider.fail_next_calls(2).await;
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let s = summarizer(provider, store);

        let mut state = filled_state(5);
        assert!(s.maybe_summarize("u1", "c1", &mut state).await.is_err());
        assert_eq!(state.messages.len(), 5);
        assert!(state.summary.is_none());
    }
}
