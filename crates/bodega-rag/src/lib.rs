// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-grading retrieval for the Bodega assistant.
//!
//! The [`SelfRagController`] retrieves product evidence, grades each item
//! for relevance, generates an answer, then grades the answer for
//! groundedness and usefulness, reformulating the query or regenerating as
//! needed within a bounded number of iterations.

pub mod controller;
pub mod grader;

pub use controller::{SelfRagController, FALLBACK_ANSWER};
pub use grader::Grader;
