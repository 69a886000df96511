// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the external text-generation service.

use async_trait::async_trait;

use crate::error::BodegaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for the text-generation oracle.
///
/// Every grading, classification, and generation step in the core goes
/// through `complete`. Structured (JSON) outputs are requested by prompt and
/// parsed by [`crate::structured::complete_structured`], which owns the
/// one-immediate-retry policy for unparseable responses.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, BodegaError>;
}
