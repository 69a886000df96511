// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across adapter traits and the Bodega controllers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation (one `thread_id` in transport terms).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Identifies the type of adapter behind a [`crate::traits::PluginAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Provider,
    ProductSearch,
    KeyValueStore,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// The author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One turn in a conversation. Append-only within a turn; the summarizer may
/// bulk-truncate older entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub content: String,
}

impl TurnMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Tri-state judgment produced by the grading oracle. Reset to `Unknown`
/// on every new generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    Unknown,
    Yes,
    No,
}

impl Verdict {
    pub fn is_yes(self) -> bool {
        self == Verdict::Yes
    }
}

/// Per-store price and availability for one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorePrice {
    pub store: String,
    /// Display price string, e.g. "€2.49". Opaque to the controllers.
    pub price: String,
    #[serde(default)]
    pub on_offer: bool,
}

/// One retrieved candidate product. Immutable once created; the working set
/// is discarded wholesale on re-retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Stable key in the product database.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub store_prices: Vec<StorePrice>,
    /// Similarity score from the search backend, descending across a result set.
    pub relevance: f32,
}

impl EvidenceItem {
    /// Render this item as a context block for grading and generation prompts.
    pub fn context_block(&self) -> String {
        let mut block = format!("Product: {}", self.title);
        if let Some(brand) = &self.brand {
            block.push_str(&format!("\nBrand: {brand}"));
        }
        if let Some(size) = &self.size {
            block.push_str(&format!("\nSize: {size}"));
        }
        for sp in &self.store_prices {
            block.push_str(&format!("\nPrice: {} at {}", sp.price, sp.store));
            if sp.on_offer {
                block.push_str(" (ON OFFER)");
            }
        }
        block
    }
}

/// A request to the text-generation provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<TurnMessage>,
    pub max_tokens: u32,
}

impl ProviderRequest {
    /// Single user-prompt request, the shape every grading call uses.
    pub fn prompt(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            messages: vec![TurnMessage::user(user)],
            max_tokens,
        }
    }
}

/// A response from the text-generation provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
}
