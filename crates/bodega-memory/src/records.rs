// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory record types, partitioned by kind.
//!
//! At most one live `Profile` and one live `BehaviorInstructions` record
//! exist per user (overwritten in place); `InteractionLog` records are
//! append-only and pruned to a recent window only at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The three partitions of long-term user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Durable preferences and facts about the user.
    Profile,
    /// One record per meaningful interaction, never overwritten.
    InteractionLog,
    /// Free-text instructions on how the assistant should behave.
    BehaviorInstructions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BudgetSensitivity {
    Low,
    Medium,
    High,
}

/// Durable facts about one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub preferred_stores: Vec<String>,
    #[serde(default)]
    pub budget_sensitivity: Option<BudgetSensitivity>,
    #[serde(default)]
    pub household_size: Option<u32>,
}

impl UserProfile {
    /// Compact one-line rendering for prompt context.
    pub fn context_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.dietary_restrictions.is_empty() {
            parts.push(format!("Dietary: {}", self.dietary_restrictions.join(", ")));
        }
        if !self.allergies.is_empty() {
            parts.push(format!("Allergies: {}", self.allergies.join(", ")));
        }
        if let Some(budget) = self.budget_sensitivity {
            parts.push(format!("Budget: {budget}"));
        }
        if !self.preferred_stores.is_empty() {
            parts.push(format!("Stores: {}", self.preferred_stores.join(", ")));
        }
        if !self.likes.is_empty() {
            let top: Vec<&str> = self.likes.iter().take(3).map(String::as_str).collect();
            parts.push(format!("Likes: {}", top.join(", ")));
        }
        if !self.dislikes.is_empty() {
            let top: Vec<&str> = self.dislikes.iter().take(3).map(String::as_str).collect();
            parts.push(format!("Dislikes: {}", top.join(", ")));
        }
        if let Some(size) = self.household_size {
            parts.push(format!("Household: {size}"));
        }
        if parts.is_empty() {
            "No stored preferences yet".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    ProductSearch,
    PriceComparison,
    MealPlanning,
    RecipeSuggestion,
    ShoppingList,
    Feedback,
    Purchase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Positive,
    Negative,
    Neutral,
    #[default]
    Unknown,
}

/// One entry in the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub interaction_type: InteractionType,
    /// What the user did or requested.
    pub user_action: String,
    /// How the assistant responded.
    pub system_response: String,
    #[serde(default)]
    pub user_feedback: Option<String>,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub products_mentioned: Vec<String>,
    pub date: DateTime<Utc>,
}

impl InteractionRecord {
    /// Compact one-line rendering for prompt context.
    pub fn context_line(&self) -> String {
        format!(
            "{}: {} ({})",
            self.interaction_type, self.user_action, self.outcome
        )
    }
}

/// Envelope persisted in the key-value store for every memory kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub kind: MemoryKind,
    pub subject_id: String,
    /// Kind-specific fields; `UserProfile`, `InteractionRecord`, or
    /// instruction text.
    pub payload: serde_json::Value,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(kind: MemoryKind, subject_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            subject_id: subject_id.into(),
            payload,
            version: 1,
            updated_at: Utc::now(),
        }
    }
}

/// How one field was reconciled during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// The field had no prior value.
    Insert,
    /// An existing value was amended.
    Patch,
}

/// Audit entry for one field touched by an extraction pass.
///
/// Extraction results are introspectable: callers can enumerate exactly
/// which fields were inserted vs patched and with what values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryChange {
    pub field: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: serde_json::Value,
    pub op: ChangeOp,
}
