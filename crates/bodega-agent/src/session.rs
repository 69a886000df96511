// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation entry point.
//!
//! `Agent` wires the supervisor, workers, summarizer, and memory engine
//! together and exposes [`Agent::process_turn`]. Turns for the same
//! conversation are serialized through a per-conversation lock so
//! concurrent sends cannot interleave; distinct conversations proceed
//! in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use bodega_config::BodegaConfig;
use bodega_core::state::ConversationState;
use bodega_core::traits::{KeyValueStore, ProductSearchAdapter, ProviderAdapter};
use bodega_core::types::{ConversationId, TurnMessage};
use bodega_core::BodegaError;
use bodega_memory::{MemoryEngine, MemoryStore};
use bodega_rag::SelfRagController;

use crate::summarizer::Summarizer;
use crate::supervisor::Supervisor;
use crate::workers::{MemoryWorker, SearchWorker, SummarizerWorker, TurnContext};

/// Shown when a turn hits an operational failure (retrieval, oracle,
/// timeout). The session keeps going; only this turn degrades.
const DEGRADED_REPLY: &str = "I'm having trouble reaching the product information \
right now. Please try again in a moment.";

/// The assembled Bodega assistant.
pub struct Agent {
    supervisor: Supervisor,
    summarizer: Arc<Summarizer>,
    memory: Arc<MemoryStore>,
    conversations: Mutex<HashMap<ConversationId, Arc<Mutex<ConversationState>>>>,
}

impl Agent {
    /// Wire up the full pipeline from configuration and the three adapters.
    pub fn new(
        config: &BodegaConfig,
        provider: Arc<dyn ProviderAdapter>,
        search: Arc<dyn ProductSearchAdapter>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let call_timeout = Duration::from_secs(config.provider.call_timeout_secs);
        let max_tokens = config.provider.max_tokens;

        let memory = Arc::new(MemoryStore::new(store, config.memory.recent_interactions));
        let engine = Arc::new(MemoryEngine::new(
            Arc::clone(&provider),
            Arc::clone(&memory),
            max_tokens,
            call_timeout,
        ));
        let summarizer = Arc::new(Summarizer::new(
            Arc::clone(&provider),
            Arc::clone(&memory),
            config.summarizer.clone(),
            max_tokens,
            call_timeout,
        ));
        let controller = SelfRagController::new(
            search,
            Arc::clone(&provider),
            config.self_rag.clone(),
            max_tokens,
            call_timeout,
        );

        let mut supervisor = Supervisor::new(
            Arc::clone(&provider),
            Arc::clone(&memory),
            config.delegation.clone(),
            max_tokens,
            call_timeout,
        );
        supervisor.register(Arc::new(SearchWorker::new(controller)));
        supervisor.register(Arc::new(MemoryWorker::new(engine)));
        supervisor.register(Arc::new(SummarizerWorker::new(Arc::clone(&summarizer))));

        Self {
            supervisor,
            summarizer,
            memory,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one user message and return the single assistant reply.
    ///
    /// Operational failures (retrieval, oracle, timeout) degrade to an
    /// apology for this turn only; the error is never surfaced raw and the
    /// conversation stays usable.
    pub async fn process_turn(
        &self,
        conversation_id: &ConversationId,
        user_id: &str,
        message: &str,
    ) -> Result<String, BodegaError> {
        let slot = {
            let mut conversations = self.conversations.lock().await;
            Arc::clone(conversations.entry(conversation_id.clone()).or_default())
        };
        // Serializes turns within one conversation.
        let mut state = slot.lock().await;

        if state.messages.is_empty() && state.summary.is_none() {
            match self.memory.load_summary(user_id, &conversation_id.0).await {
                Ok(Some(summary)) => {
                    info!(conversation = %conversation_id.0, "resuming with persisted summary");
                    state.summary = Some(summary);
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "summary load failed"),
            }
        }

        state.push_message(TurnMessage::user(message));

        let reply = {
            let mut ctx = TurnContext {
                user_id,
                conversation_key: &conversation_id.0,
                state: &mut state,
            };
            match self.supervisor.run_turn(&mut ctx).await {
                Ok(reply) => reply,
                Err(err) if err.is_user_visible() => {
                    warn!(error = %err, "turn degraded");
                    DEGRADED_REPLY.to_string()
                }
                Err(err) => return Err(err),
            }
        };

        state.push_message(TurnMessage::assistant(reply.clone()));

        // Post-turn housekeeping is best-effort.
        if let Err(err) = self
            .summarizer
            .maybe_summarize(user_id, &conversation_id.0, &mut state)
            .await
        {
            warn!(error = %err, "post-turn summarization skipped");
        }

        Ok(reply)
    }

    /// The running summary for a conversation, if one exists. Diagnostic.
    pub async fn conversation_summary(&self, conversation_id: &ConversationId) -> Option<String> {
        let slot = {
            let conversations = self.conversations.lock().await;
            conversations.get(conversation_id).cloned()
        };
        match slot {
            Some(state) => state.lock().await.summary.clone(),
            None => None,
        }
    }
}
