// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Bodega assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Bodega configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BodegaConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Text-generation provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Self-RAG controller settings.
    #[serde(default)]
    pub self_rag: SelfRagConfig,

    /// Delegation supervisor settings.
    #[serde(default)]
    pub delegation: DelegationConfig,

    /// Conversation summarizer settings.
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "bodega".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Text-generation provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout applied to every provider and search call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_call_timeout_secs() -> u64 {
    30
}

/// Self-RAG controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelfRagConfig {
    /// Hard upper bound on retrieve/generate loop iterations.
    #[serde(default = "default_self_rag_ceiling")]
    pub iteration_ceiling: u32,

    /// Minimum similarity score for an item to enter the working set.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Maximum evidence items requested per retrieval.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for SelfRagConfig {
    fn default() -> Self {
        Self {
            iteration_ceiling: default_self_rag_ceiling(),
            relevance_threshold: default_relevance_threshold(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_self_rag_ceiling() -> u32 {
    3
}

fn default_relevance_threshold() -> f32 {
    0.6
}

fn default_search_limit() -> usize {
    10
}

/// Delegation supervisor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationConfig {
    /// Hard upper bound on decide/delegate cycles per user turn.
    #[serde(default = "default_delegation_ceiling")]
    pub iteration_ceiling: u32,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            iteration_ceiling: default_delegation_ceiling(),
        }
    }
}

fn default_delegation_ceiling() -> u32 {
    10
}

/// Conversation summarizer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerConfig {
    /// Message count above which summarization triggers.
    #[serde(default = "default_message_threshold")]
    pub message_threshold: usize,

    /// How many recent messages survive truncation.
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            message_threshold: default_message_threshold(),
            keep_recent: default_keep_recent(),
        }
    }
}

fn default_message_threshold() -> usize {
    8
}

fn default_keep_recent() -> usize {
    2
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// How many recent interaction-log entries are injected into prompts.
    #[serde(default = "default_recent_interactions")]
    pub recent_interactions: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_interactions: default_recent_interactions(),
        }
    }
}

fn default_recent_interactions() -> usize {
    3
}
