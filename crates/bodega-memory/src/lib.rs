// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term user memory for the Bodega assistant.
//!
//! Memory is partitioned into three kinds: a single overwritten-in-place
//! profile, an append-only interaction log, and a whole-document set of
//! behavior instructions. The [`MemoryEngine`] classifies each turn,
//! extracts a reconciled record, and reports every field it touched.

pub mod engine;
pub mod records;
pub mod store;

pub use engine::MemoryEngine;
pub use records::{
    BudgetSensitivity, ChangeOp, InteractionRecord, InteractionType, MemoryChange, MemoryKind,
    MemoryRecord, Outcome, UserProfile,
};
pub use store::MemoryStore;
