// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delegation workers.
//!
//! Workers never address the user directly: their output is always routed
//! back through the supervisor for final phrasing. From the supervisor's
//! point of view a worker cannot fail; internal errors degrade to
//! best-effort text inside the worker.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use bodega_core::state::ConversationState;
use bodega_memory::{MemoryEngine, MemoryKind};
use bodega_rag::SelfRagController;

use crate::summarizer::Summarizer;

/// A unit of work handed from the supervisor to a worker. Consumed exactly
/// once; its result is merged back into conversation state and discarded.
#[derive(Debug, Clone)]
pub struct DelegationTask {
    pub target_worker: String,
    /// Free-form instructions plus context for the worker.
    pub payload: String,
    /// Kind hint for memory updates, when the decision names one.
    pub memory_kind: Option<String>,
    /// Ties the eventual result back to the triggering turn.
    pub correlation_id: Uuid,
}

/// What a worker handed back to the supervisor.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub worker: String,
    pub content: String,
    pub correlation_id: Uuid,
}

/// Everything a worker may touch during one turn.
pub struct TurnContext<'a> {
    pub user_id: &'a str,
    pub conversation_key: &'a str,
    pub state: &'a mut ConversationState,
}

/// One registered delegation target.
#[async_trait]
pub trait Worker: Send + Sync {
    /// The action name the decision oracle uses to select this worker.
    fn name(&self) -> &str;

    /// Execute the task. Must not fail: degrade internally instead.
    async fn run(&self, task: &DelegationTask, ctx: &mut TurnContext<'_>) -> WorkerResult;
}

const SEARCH_APOLOGY: &str = "I couldn't search the product database just now, so I \
don't have results for that.";

/// Runs the self-grading retrieval loop over the product database.
pub struct SearchWorker {
    controller: SelfRagController,
}

impl SearchWorker {
    pub fn new(controller: SelfRagController) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Worker for SearchWorker {
    fn name(&self) -> &str {
        "search"
    }

    async fn run(&self, task: &DelegationTask, ctx: &mut TurnContext<'_>) -> WorkerResult {
        // Fresh retrieval cycle for this task.
        ctx.state.question = task.payload.clone();
        ctx.state.iteration_count = 0;
        ctx.state.answer_draft = None;
        ctx.state.reset_verdicts();

        let content = match self.controller.run(ctx.state).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "search worker degraded to apology");
                SEARCH_APOLOGY.to_string()
            }
        };
        WorkerResult {
            worker: self.name().to_string(),
            content,
            correlation_id: task.correlation_id,
        }
    }
}

/// Extracts and persists long-term memory. Always reports success to the
/// supervisor; failures are logged and the reply proceeds without them.
pub struct MemoryWorker {
    engine: Arc<MemoryEngine>,
    /// How many trailing messages the extractor sees.
    context_window: usize,
}

impl MemoryWorker {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self {
            engine,
            context_window: 4,
        }
    }
}

#[async_trait]
impl Worker for MemoryWorker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn run(&self, task: &DelegationTask, ctx: &mut TurnContext<'_>) -> WorkerResult {
        let start = ctx.state.messages.len().saturating_sub(self.context_window);
        let turns = &ctx.state.messages[start..];

        let outcome = match task
            .memory_kind
            .as_deref()
            .and_then(|k| MemoryKind::from_str(k).ok())
        {
            Some(kind) => {
                self.engine
                    .update_memory_of_kind(ctx.user_id, turns, kind)
                    .await
            }
            None => self.engine.update_memory(ctx.user_id, turns).await,
        };

        let content = match outcome {
            Ok(changes) if changes.is_empty() => "Nothing new to remember.".to_string(),
            Ok(changes) => {
                let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
                format!("Remembered: {}.", fields.join(", "))
            }
            Err(err) => {
                warn!(error = %err, "memory update skipped");
                "Noted.".to_string()
            }
        };
        WorkerResult {
            worker: self.name().to_string(),
            content,
            correlation_id: task.correlation_id,
        }
    }
}

/// Compresses older history into the running summary on request.
pub struct SummarizerWorker {
    summarizer: Arc<Summarizer>,
}

impl SummarizerWorker {
    pub fn new(summarizer: Arc<Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Worker for SummarizerWorker {
    fn name(&self) -> &str {
        "summarize"
    }

    async fn run(&self, task: &DelegationTask, ctx: &mut TurnContext<'_>) -> WorkerResult {
        let content = match self
            .summarizer
            .summarize(ctx.user_id, ctx.conversation_key, ctx.state)
            .await
        {
            Ok(true) => "Conversation history condensed.".to_string(),
            Ok(false) => "Nothing to condense yet.".to_string(),
            Err(err) => {
                warn!(error = %err, "summarization skipped");
                "Noted.".to_string()
            }
        };
        WorkerResult {
            worker: self.name().to_string(),
            content,
            correlation_id: task.correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bodega_config::model::{SelfRagConfig, SummarizerConfig};
    use bodega_memory::MemoryStore;
    use bodega_test_utils::{evidence, InMemoryStore, MockProvider, MockSearch};

    fn task(worker: &str, payload: &str) -> DelegationTask {
        DelegationTask {
            target_worker: worker.to_string(),
            payload: payload.to_string(),
            memory_kind: None,
            correlation_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn search_worker_degrades_failures_to_apology() {
        let search = Arc::new(MockSearch::new());
        search.fail_next_call().await;
        let controller = SelfRagController::new(
            search,
            Arc::new(MockProvider::new()),
            SelfRagConfig::default(),
            128,
            Duration::from_secs(5),
        );
        let worker = SearchWorker::new(controller);

        let mut state = ConversationState::new();
        let mut ctx = TurnContext {
            user_id: "u1",
            conversation_key: "c1",
            state: &mut state,
        };
        let result = worker.run(&task("search", "milk"), &mut ctx).await;
        assert_eq!(result.content, SEARCH_APOLOGY);
    }

    #[tokio::test]
    async fn search_worker_resets_the_retrieval_cycle() {
        let search = Arc::new(MockSearch::with_results(vec![vec![evidence(
            "p1", "Milk", 0.9,
        )]]));
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"score": "yes"}"#.to_string(),
            "Milk costs 1.19.".to_string(),
            r#"{"score": "yes"}"#.to_string(),
            r#"{"score": "yes"}"#.to_string(),
        ]));
        let controller = SelfRagController::new(
            search,
            provider,
            SelfRagConfig::default(),
            128,
            Duration::from_secs(5),
        );
        let worker = SearchWorker::new(controller);

        let mut state = ConversationState::new();
        state.iteration_count = 7; // stale from a previous turn
        state.answer_draft = Some("old draft".to_string());
        let mut ctx = TurnContext {
            user_id: "u1",
            conversation_key: "c1",
            state: &mut state,
        };
        let result = worker.run(&task("search", "milk"), &mut ctx).await;
        assert_eq!(result.content, "Milk costs 1.19.");
        assert_eq!(state.iteration_count, 0);
    }

    #[tokio::test]
    async fn memory_worker_swallows_extraction_failures() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "not json".to_string(),
            "still not json".to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let worker = MemoryWorker::new(Arc::new(MemoryEngine::new(
            provider,
            store,
            512,
            Duration::from_secs(5),
        )));

        let mut state = ConversationState::new();
        state.push_message(bodega_core::types::TurnMessage::user("I'm vegan"));
        let mut ctx = TurnContext {
            user_id: "u1",
            conversation_key: "c1",
            state: &mut state,
        };
        let result = worker.run(&task("memory", "remember this"), &mut ctx).await;
        assert_eq!(result.content, "Noted.");
    }

    #[tokio::test]
    async fn memory_worker_honors_kind_hint() {
        // No classification response scripted: the hint must skip it.
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"dietary_restrictions": ["vegan"]}"#.to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let engine = Arc::new(MemoryEngine::new(
            provider,
            Arc::clone(&store),
            512,
            Duration::from_secs(5),
        ));
        let worker = MemoryWorker::new(engine);

        let mut state = ConversationState::new();
        state.push_message(bodega_core::types::TurnMessage::user("I'm vegan"));
        let mut ctx = TurnContext {
            user_id: "u1",
            conversation_key: "c1",
            state: &mut state,
        };
        let mut task = task("memory", "remember this");
        task.memory_kind = Some("profile".to_string());
        let result = worker.run(&task, &mut ctx).await;
        assert_eq!(result.content, "Remembered: dietary_restrictions.");
        assert!(store.load_profile("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn summarizer_worker_reports_noop_on_short_history() {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let summarizer = Arc::new(Summarizer::new(
            provider,
            store,
            SummarizerConfig::default(),
            256,
            Duration::from_secs(5),
        ));
        let worker = SummarizerWorker::new(summarizer);

        let mut state = ConversationState::new();
        state.push_message(bodega_core::types::TurnMessage::user("hi"));
        let mut ctx = TurnContext {
            user_id: "u1",
            conversation_key: "c1",
            state: &mut state,
        };
        let result = worker.run(&task("summarize", ""), &mut ctx).await;
        assert_eq!(result.content, "Nothing to condense yet.");
    }
}
