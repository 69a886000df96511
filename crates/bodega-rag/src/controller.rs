// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-grading retrieval state machine.
//!
//! Answers a product question only when the answer is both grounded in
//! retrieved evidence and useful for the question. Insufficient evidence
//! triggers query reformulation and re-retrieval; an ungrounded draft
//! triggers regeneration without re-fetching. Every loop-back edge bumps
//! the iteration count, and the configured ceiling forces termination
//! with the best available draft.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use bodega_config::model::SelfRagConfig;
use bodega_core::state::ConversationState;
use bodega_core::structured::complete_text;
use bodega_core::traits::{ProductSearchAdapter, ProviderAdapter};
use bodega_core::types::ProviderRequest;
use bodega_core::BodegaError;

use crate::grader::Grader;

const GENERATE_PROMPT: &str = "You are Bodega, an intelligent grocery shopping assistant. \
Use the provided product information to answer the user's question. Focus on product \
recommendations, price comparisons, store availability, and brand information. If you \
cannot find specific products, suggest alternatives. Always give a specific price for \
each store, never a range. Cite only products present in the provided information.";

/// Emitted when the loop ceiling is reached with no draft at all, or when
/// reformulation keeps coming back empty-handed.
pub const FALLBACK_ANSWER: &str = "I couldn't find a well-supported answer for that in \
the product database right now. Could you rephrase the question or name a specific \
product?";

/// Phases of the retrieve/grade/generate loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RagPhase {
    Retrieving,
    GradingDocuments,
    TransformingQuery,
    Generating,
    GradingGroundedness,
    GradingUsefulness,
    Done,
}

/// The self-grading retrieval controller.
///
/// Owns no conversation state; callers pass a [`ConversationState`] with
/// `question` set and read the answer from the return value.
pub struct SelfRagController {
    search: Arc<dyn ProductSearchAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    grader: Grader,
    config: SelfRagConfig,
    max_tokens: u32,
    call_timeout: Duration,
}

impl SelfRagController {
    pub fn new(
        search: Arc<dyn ProductSearchAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        config: SelfRagConfig,
        max_tokens: u32,
        call_timeout: Duration,
    ) -> Self {
        let grader = Grader::new(Arc::clone(&provider), max_tokens);
        Self {
            search,
            provider,
            grader,
            config,
            max_tokens,
            call_timeout,
        }
    }

    /// Run the loop to completion and return the answer text.
    ///
    /// `state.question` must be set. A hard adapter failure aborts the turn
    /// with an error; reaching the iteration ceiling is not an error and
    /// yields the best draft seen so far (or [`FALLBACK_ANSWER`]).
    pub async fn run(&self, state: &mut ConversationState) -> Result<String, BodegaError> {
        if state.question.trim().is_empty() {
            return Err(BodegaError::Internal(
                "retrieval controller invoked without a question".to_string(),
            ));
        }

        let mut phase = RagPhase::Retrieving;
        loop {
            match phase {
                RagPhase::Retrieving => {
                    self.simplify_first_query(state);
                    debug!(question = %state.question, "retrieving evidence");
                    let items = self
                        .with_timeout(self.search.search(&state.question, self.config.search_limit))
                        .await?;
                    // Similarity pre-filter; the oracle grades what survives.
                    state.evidence_set = items
                        .into_iter()
                        .filter(|i| i.relevance >= self.config.relevance_threshold)
                        .collect();
                    phase = RagPhase::GradingDocuments;
                }

                RagPhase::GradingDocuments => {
                    let mut kept = Vec::new();
                    for item in std::mem::take(&mut state.evidence_set) {
                        let verdict = self
                            .with_timeout(self.grader.grade_relevance(&state.question, &item))
                            .await?;
                        if verdict.is_yes() {
                            kept.push(item);
                        } else {
                            debug!(item = %item.title, "evidence discarded as irrelevant");
                        }
                    }
                    state.evidence_set = kept;
                    phase = if state.evidence_set.is_empty() {
                        RagPhase::TransformingQuery
                    } else {
                        RagPhase::Generating
                    };
                }

                RagPhase::TransformingQuery => {
                    state.bump_iteration();
                    if state.iteration_count >= self.config.iteration_ceiling {
                        warn!(
                            iterations = state.iteration_count,
                            "retrieval ceiling reached while reformulating"
                        );
                        phase = RagPhase::Done;
                        continue;
                    }
                    let rewritten = self
                        .with_timeout(self.grader.transform_query(&state.question))
                        .await?;
                    info!(from = %state.question, to = %rewritten, "query reformulated");
                    state.question = rewritten;
                    phase = RagPhase::Retrieving;
                }

                RagPhase::Generating => {
                    state.reset_verdicts();
                    let draft = self.generate(state).await?;
                    state.answer_draft = Some(draft);
                    phase = RagPhase::GradingGroundedness;
                }

                RagPhase::GradingGroundedness => {
                    let draft = state.answer_draft.as_deref().unwrap_or_default();
                    let context = state.evidence_context();
                    state.groundedness = self
                        .with_timeout(self.grader.grade_groundedness(&context, draft))
                        .await?;
                    if state.groundedness.is_yes() {
                        phase = RagPhase::GradingUsefulness;
                    } else {
                        // Regenerate against the same evidence; never re-fetch here.
                        state.bump_iteration();
                        if state.iteration_count >= self.config.iteration_ceiling {
                            warn!(
                                iterations = state.iteration_count,
                                "retrieval ceiling reached while regenerating"
                            );
                            phase = RagPhase::Done;
                        } else {
                            debug!("draft not grounded, regenerating");
                            phase = RagPhase::Generating;
                        }
                    }
                }

                RagPhase::GradingUsefulness => {
                    let draft = state.answer_draft.as_deref().unwrap_or_default();
                    state.usefulness = self
                        .with_timeout(self.grader.grade_usefulness(&state.question, draft))
                        .await?;
                    phase = if state.usefulness.is_yes() {
                        RagPhase::Done
                    } else {
                        debug!("draft not useful, reformulating query");
                        RagPhase::TransformingQuery
                    };
                }

                RagPhase::Done => {
                    let answer = match &state.answer_draft {
                        Some(draft) if state.usefulness.is_yes() => {
                            info!(iterations = state.iteration_count, "grounded answer accepted");
                            draft.clone()
                        }
                        // Ceiling hit: emit the best draft we have.
                        Some(draft) => {
                            info!(
                                iterations = state.iteration_count,
                                "emitting best-effort draft at ceiling"
                            );
                            draft.clone()
                        }
                        None => FALLBACK_ANSWER.to_string(),
                    };
                    return Ok(answer);
                }
            }
        }
    }

    /// On the very first retrieval, reduce a full-sentence question to up to
    /// three known product keywords. Later passes go through the oracle
    /// rewrite instead.
    fn simplify_first_query(&self, state: &mut ConversationState) {
        if state.iteration_count > 0
            || !state.evidence_set.is_empty()
            || state.question.split_whitespace().count() <= 3
        {
            return;
        }

        const PRODUCT_TYPES: &[&str] = &[
            "milk", "bread", "cheese", "meat", "fish", "fruit", "vegetable", "snack", "drink",
            "breakfast", "lunch", "dinner",
        ];
        const MODIFIERS: &[&str] = &[
            "organic", "low-fat", "whole", "fresh", "healthy", "cheap", "expensive", "bio",
            "natural",
        ];

        let lower = state.question.to_lowercase();
        let keywords: Vec<&str> = PRODUCT_TYPES
            .iter()
            .chain(MODIFIERS.iter())
            .filter(|kw| lower.contains(**kw))
            .copied()
            .take(3)
            .collect();

        if !keywords.is_empty() {
            let simplified = keywords.join(" ");
            debug!(from = %state.question, to = %simplified, "first-pass keyword reduction");
            state.question = simplified;
        }
    }

    async fn generate(&self, state: &ConversationState) -> Result<String, BodegaError> {
        let mut user = String::new();
        if let Some(summary) = &state.summary {
            user.push_str(&format!("Conversation so far: {summary}\n\n"));
        }
        user.push_str(&format!(
            "User question: {}\n\nAvailable products:\n{}",
            state.question,
            state.evidence_context()
        ));
        self.with_timeout(complete_text(
            self.provider.as_ref(),
            ProviderRequest::prompt(GENERATE_PROMPT, user, self.max_tokens),
        ))
        .await
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
