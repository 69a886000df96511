// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state shared by all controllers.
//!
//! `ConversationState` is the unit of work flowing through the delegation
//! supervisor, the retrieval controller, and the summarizer. Exactly one
//! controller owns the state at a time; ownership transfers whole at
//! delegation boundaries.

use serde::{Deserialize, Serialize};

use crate::types::{EvidenceItem, Role, TurnMessage, Verdict};

/// Mutable per-conversation state.
///
/// `messages` is append-only within a turn; the summarizer may bulk-truncate
/// it between turns. `evidence_set` and `answer_draft` are replaced wholesale
/// on each retrieval and generation respectively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Ordered conversation turns, oldest first.
    pub messages: Vec<TurnMessage>,

    /// The active search query, possibly rewritten across retrieval cycles.
    pub question: String,

    /// Current working set of ranked evidence. Replaced on every retrieval.
    pub evidence_set: Vec<EvidenceItem>,

    /// Most recent generated answer text. Replaced on every generation.
    pub answer_draft: Option<String>,

    /// Whether the draft's claims are supported by the evidence set.
    /// Reset to `Unknown` at each generation.
    pub groundedness: Verdict,

    /// Whether the draft actually answers the question.
    /// Reset to `Unknown` at each generation.
    pub usefulness: Verdict,

    /// Running summary of older, truncated history.
    pub summary: Option<String>,

    /// Guard against infinite retrieve/generate loops. Strictly increases
    /// on every loop-back edge.
    pub iteration_count: u32,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the history.
    pub fn push_message(&mut self, message: TurnMessage) {
        self.messages.push(message);
    }

    /// The most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&TurnMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Reset the per-generation verdicts to `Unknown`.
    ///
    /// Called before each generation so stale judgments never leak into
    /// the next grading round.
    pub fn reset_verdicts(&mut self) {
        self.groundedness = Verdict::Unknown;
        self.usefulness = Verdict::Unknown;
    }

    /// Record one traversal of a loop-back edge.
    pub fn bump_iteration(&mut self) {
        self.iteration_count += 1;
    }

    /// Drop everything except the `keep_recent` newest messages.
    ///
    /// Returns how many messages were removed.
    pub fn truncate_history(&mut self, keep_recent: usize) -> usize {
        if self.messages.len() <= keep_recent {
            return 0;
        }
        let removed = self.messages.len() - keep_recent;
        self.messages.drain(..removed);
        removed
    }

    /// Render the full evidence set as a prompt context block.
    pub fn evidence_context(&self) -> String {
        self.evidence_set
            .iter()
            .map(EvidenceItem::context_block)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
