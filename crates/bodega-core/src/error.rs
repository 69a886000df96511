// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Bodega assistant core.

use thiserror::Error;

/// The primary error type used across all Bodega adapter traits and controllers.
#[derive(Debug, Error)]
pub enum BodegaError {
    /// Configuration errors (invalid TOML, missing required fields, bad ranges).
    #[error("configuration error: {0}")]
    Config(String),

    /// Evidence store unreachable or errored; the turn degrades to a
    /// "could not search" reply instead of aborting the session.
    #[error("retrieval failure: {message}")]
    Retrieval {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generation/grading service errored or returned unparseable structured
    /// output even after the one immediate retry.
    #[error("oracle failure: {message}")]
    Oracle {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A memory extraction step errored. Always swallowed and logged by the
    /// caller; never affects the user-visible reply.
    #[error("extraction failure: {0}")]
    Extraction(String),

    /// A state-machine iteration ceiling was reached. Not a true error: the
    /// enclosing controller emits its best available output.
    #[error("{stage} loop ceiling reached after {iterations} iterations")]
    LoopCeiling { stage: &'static str, iterations: u32 },

    /// The decision oracle named a worker that is not registered.
    /// Treated as "answer directly" by the supervisor.
    #[error("unknown delegation worker: {0}")]
    UnknownWorker(String),

    /// Key-value store errors (transport, serialization).
    #[error("storage error: {0}")]
    Storage(String),

    /// An external call exceeded its configured timeout.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BodegaError {
    /// Build a retrieval failure from any underlying error.
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval {
            message: message.into(),
            source: None,
        }
    }

    /// Build an oracle failure from any underlying error.
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error may surface to the end user (as degraded apology
    /// text). Everything else is silent-but-logged per the propagation policy.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::Retrieval { .. } | Self::Oracle { .. } | Self::Timeout { .. }
        )
    }
}
