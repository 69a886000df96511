// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero ceilings and threshold ordering.

use thiserror::Error;

use crate::model::BodegaConfig;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BodegaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "agent.name must not be empty".to_string(),
        });
    }

    if config.provider.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.max_tokens must be at least 1".to_string(),
        });
    }

    if config.provider.call_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.call_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.self_rag.iteration_ceiling == 0 {
        errors.push(ConfigError::Validation {
            message: "self_rag.iteration_ceiling must be at least 1".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.self_rag.relevance_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "self_rag.relevance_threshold must be within [0.0, 1.0], got {}",
                config.self_rag.relevance_threshold
            ),
        });
    }

    if config.self_rag.search_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "self_rag.search_limit must be at least 1".to_string(),
        });
    }

    if config.delegation.iteration_ceiling == 0 {
        errors.push(ConfigError::Validation {
            message: "delegation.iteration_ceiling must be at least 1".to_string(),
        });
    }

    // Truncation must leave fewer messages than the trigger threshold,
    // otherwise the summarizer would re-fire on every turn.
    if config.summarizer.keep_recent >= config.summarizer.message_threshold {
        errors.push(ConfigError::Validation {
            message: format!(
                "summarizer.keep_recent ({}) must be less than summarizer.message_threshold ({})",
                config.summarizer.keep_recent, config.summarizer.message_threshold
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
