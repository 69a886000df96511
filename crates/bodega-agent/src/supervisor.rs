// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delegation supervisor.
//!
//! Owns the single source of truth for what the user sees each turn. Per
//! turn it repeatedly asks the decision oracle to pick a named action
//! (delegate to a registered worker, or answer directly), runs at most one
//! delegation at a time, merges worker results back into the turn, and
//! guarantees exactly one user-visible reply. A loop guard refuses to
//! re-delegate the same task to the same worker twice in a row, and a
//! per-turn iteration ceiling forces an answer regardless of state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bodega_config::model::DelegationConfig;
use bodega_core::structured::{complete_structured, complete_text};
use bodega_core::traits::ProviderAdapter;
use bodega_core::types::{ProviderRequest, Role};
use bodega_core::BodegaError;
use bodega_memory::MemoryStore;

use crate::workers::{DelegationTask, TurnContext, Worker, WorkerResult};

const PERSONA: &str = "You are Bodega, a personalized grocery shopping assistant that \
learns from every interaction. You help users find products, compare prices, and make \
shopping decisions while building an understanding of their preferences and habits.";

const DECIDE_INSTRUCTION: &str = "Decide the next step for this turn. Respond with JSON: \
{\"action\": \"search\" | \"memory\" | \"summarize\" | \"answer\", \"task\": \"...\", \
\"memory_kind\": \"profile\" | \"interaction_log\" | \"behavior_instructions\", \
\"reply\": \"...\"}.\n\
- \"search\": the user asks about products, prices, or availability; put the search \
request in \"task\".\n\
- \"memory\": the turn reveals something worth remembering about the user; name the \
kind in \"memory_kind\" and describe the context in \"task\".\n\
- \"summarize\": the conversation has grown long and should be condensed.\n\
- \"answer\": reply to the user directly; put the full reply text in \"reply\".\n\
If worker findings are listed, account for them in your reply instead of delegating \
the same work again.";

/// Per-decision output of the oracle.
#[derive(Debug, Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    memory_kind: Option<String>,
    #[serde(default)]
    reply: Option<String>,
}

/// Memory context rendered into every decision and phrasing prompt.
struct MemoryContext {
    preferences: String,
    recent_interactions: String,
    instructions: String,
}

/// The per-turn decide/delegate/resume state machine.
pub struct Supervisor {
    provider: Arc<dyn ProviderAdapter>,
    memory: Arc<MemoryStore>,
    workers: HashMap<String, Arc<dyn Worker>>,
    config: DelegationConfig,
    max_tokens: u32,
    call_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        memory: Arc<MemoryStore>,
        config: DelegationConfig,
        max_tokens: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            memory,
            workers: HashMap::new(),
            config,
            max_tokens,
            call_timeout,
        }
    }

    /// Register a delegation target under its action name.
    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.insert(worker.name().to_string(), worker);
    }

    /// Run the decision loop for one turn and return the single reply.
    pub async fn run_turn(&self, ctx: &mut TurnContext<'_>) -> Result<String, BodegaError> {
        let memory_ctx = self.load_memory_context(ctx.user_id).await;
        let mut results: Vec<WorkerResult> = Vec::new();
        let mut last_delegation: Option<(String, String)> = None;

        for iteration in 0..self.config.iteration_ceiling {
            let decision = self.decide(ctx, &memory_ctx, &results).await?;
            debug!(iteration, action = %decision.action, "supervisor decision");

            if decision.action == "answer" {
                return self
                    .finalize(ctx, &memory_ctx, &results, decision.reply)
                    .await;
            }

            let Some(worker) = self.workers.get(&decision.action) else {
                // Unrecognized action names degrade to answering directly.
                warn!(
                    error = %BodegaError::UnknownWorker(decision.action.clone()),
                    "decision named an unregistered worker"
                );
                break;
            };

            let payload = decision
                .task
                .or_else(|| ctx.state.last_user_message().map(|m| m.content.clone()))
                .unwrap_or_default();
            if last_delegation.as_ref() == Some(&(decision.action.clone(), payload.clone())) {
                warn!(worker = %decision.action, "loop guard: repeated identical delegation");
                break;
            }

            let task = DelegationTask {
                target_worker: decision.action.clone(),
                payload: payload.clone(),
                memory_kind: decision.memory_kind,
                correlation_id: Uuid::new_v4(),
            };
            info!(worker = %decision.action, "delegating");
            let result = worker.run(&task, ctx).await;
            results.push(result);
            last_delegation = Some((decision.action, payload));
        }

        // Ceiling, loop guard, or unknown worker: answer with what we have.
        self.finalize(ctx, &memory_ctx, &results, None).await
    }

    async fn decide(
        &self,
        ctx: &TurnContext<'_>,
        memory_ctx: &MemoryContext,
        results: &[WorkerResult],
    ) -> Result<RawDecision, BodegaError> {
        let system = self.system_prompt(ctx, memory_ctx, DECIDE_INSTRUCTION);
        let user = render_turn_context(ctx, results);
        self.with_timeout(complete_structured(
            self.provider.as_ref(),
            ProviderRequest::prompt(system, user, self.max_tokens),
        ))
        .await
    }

    /// Produce the turn's single reply. Worker output is never dropped: the
    /// phrasing prompt carries every result, and if phrasing itself fails
    /// the most recent worker result becomes the reply.
    async fn finalize(
        &self,
        ctx: &TurnContext<'_>,
        memory_ctx: &MemoryContext,
        results: &[WorkerResult],
        reply: Option<String>,
    ) -> Result<String, BodegaError> {
        if let Some(text) = reply
            && !text.trim().is_empty()
        {
            return Ok(text);
        }

        let system = self.system_prompt(
            ctx,
            memory_ctx,
            "Write the final reply to the user, working the worker findings into a \
             natural answer. Reply with the message text only.",
        );
        let user = render_turn_context(ctx, results);
        let phrased = self
            .with_timeout(complete_text(
                self.provider.as_ref(),
                ProviderRequest::prompt(system, user, self.max_tokens),
            ))
            .await;

        match phrased {
            Ok(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            Ok(_) | Err(_) if !results.is_empty() => {
                // Degrade to the raw result rather than lose it.
                warn!("final phrasing unavailable, relaying last worker result");
                Ok(results[results.len() - 1].content.clone())
            }
            Ok(_) => Err(BodegaError::oracle("final phrasing produced empty output")),
            Err(err) => Err(err),
        }
    }

    fn system_prompt(
        &self,
        ctx: &TurnContext<'_>,
        memory_ctx: &MemoryContext,
        instruction: &str,
    ) -> String {
        let summary = ctx
            .state
            .summary
            .as_deref()
            .unwrap_or("No summary yet");
        format!(
            "{PERSONA}\n\nCurrent user memory:\n\
             <preferences>\n{}\n</preferences>\n\
             <recent_interactions>\n{}\n</recent_interactions>\n\
             <behavior_instructions>\n{}\n</behavior_instructions>\n\
             <conversation_summary>\n{summary}\n</conversation_summary>\n\n{instruction}",
            memory_ctx.preferences, memory_ctx.recent_interactions, memory_ctx.instructions
        )
    }

    /// Memory lookups personalize prompts but never block a reply; a failed
    /// load degrades to the empty-memory defaults.
    async fn load_memory_context(&self, user_id: &str) -> MemoryContext {
        let preferences = match self.memory.load_profile(user_id).await {
            Ok(Some(profile)) => profile.context_line(),
            Ok(None) => "No stored preferences yet".to_string(),
            Err(err) => {
                warn!(error = %err, "profile load failed");
                "No stored preferences yet".to_string()
            }
        };

        let recent_interactions = match self.memory.recent_interactions(user_id).await {
            Ok(interactions) if !interactions.is_empty() => interactions
                .iter()
                .map(|i| i.context_line())
                .collect::<Vec<_>>()
                .join("\n"),
            Ok(_) => "No recent shopping history".to_string(),
            Err(err) => {
                warn!(error = %err, "interaction log load failed");
                "No recent shopping history".to_string()
            }
        };

        let instructions = match self.memory.load_instructions(user_id).await {
            Ok(Some(text)) => text,
            Ok(None) => "Standard helpful assistance mode".to_string(),
            Err(err) => {
                warn!(error = %err, "instructions load failed");
                "Standard helpful assistance mode".to_string()
            }
        };

        MemoryContext {
            preferences,
            recent_interactions,
            instructions,
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, BodegaError>>,
    ) -> Result<T, BodegaError> {
        timeout(self.call_timeout, fut)
            .await
            .map_err(|_| BodegaError::Timeout {
                duration: self.call_timeout,
            })?
    }
}

fn render_turn_context(ctx: &TurnContext<'_>, results: &[WorkerResult]) -> String {
    let mut out = String::from("Conversation:\n");
    for message in &ctx.state.messages {
        let speaker = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        out.push_str(&format!("{speaker}: {}\n", message.content));
    }
    if !results.is_empty() {
        out.push_str("\nWorker findings:\n");
        for result in results {
            out.push_str(&format!("- {}: {}\n", result.worker, result.content));
        }
    }
    out
}
