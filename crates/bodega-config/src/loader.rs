// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./bodega.toml` > `~/.config/bodega/bodega.toml` > `/etc/bodega/bodega.toml`
//! with environment variable overrides via `BODEGA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BodegaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bodega/bodega.toml` (system-wide)
/// 3. `~/.config/bodega/bodega.toml` (user XDG config)
/// 4. `./bodega.toml` (local directory)
/// 5. `BODEGA_*` environment variables
pub fn load_config() -> Result<BodegaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BodegaConfig::default()))
        .merge(Toml::file("/etc/bodega/bodega.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("bodega/bodega.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("bodega.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an in-memory TOML string only (no XDG lookup).
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BodegaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BodegaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BodegaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BodegaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `BODEGA_SELF_RAG_SEARCH_LIMIT`
/// must map to `self_rag.search_limit`, not `self.rag.search.limit`.
fn env_provider() -> Env {
    Env::prefixed("BODEGA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: BODEGA_SELF_RAG_ITERATION_CEILING -> "self_rag_iteration_ceiling"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("provider_", "provider.", 1)
            .replacen("self_rag_", "self_rag.", 1)
            .replacen("delegation_", "delegation.", 1)
            .replacen("summarizer_", "summarizer.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.agent.name, "bodega");
        assert_eq!(config.provider.max_tokens, 1024);
    }

    #[test]
    fn toml_string_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[provider]
max_tokens = 2048

[delegation]
iteration_ceiling = 4
"#,
        )
        .unwrap();
        assert_eq!(config.provider.max_tokens, 2048);
        assert_eq!(config.delegation.iteration_ceiling, 4);
        // Untouched sections keep defaults.
        assert_eq!(config.summarizer.message_threshold, 8);
    }

    #[test]
    fn invalid_type_is_an_error() {
        let result = load_config_from_str(
            r#"
[self_rag]
iteration_ceiling = "three"
"#,
        );
        assert!(result.is_err());
    }
}
