// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Bodega assistant.
//!
//! The [`Agent`] owns a per-conversation state map and routes every user
//! turn through the [`Supervisor`], which decides between answering
//! directly and delegating to the registered workers (search, memory,
//! summarize). Exactly one reply comes back per turn.

pub mod logging;
pub mod session;
pub mod summarizer;
pub mod supervisor;
pub mod workers;

pub use logging::init_tracing;
pub use session::Agent;
pub use summarizer::Summarizer;
pub use supervisor::Supervisor;
pub use workers::{
    DelegationTask, MemoryWorker, SearchWorker, SummarizerWorker, TurnContext, Worker,
    WorkerResult,
};
