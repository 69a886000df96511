// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by all external collaborators.

use async_trait::async_trait;

use crate::error::BodegaError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for Bodega adapters (provider, product search, key-value store).
///
/// Adapters wrap external services; this trait gives each one identity and a
/// health check so the embedding application can probe its collaborators.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, BodegaError>;
}
