// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary grading calls against the text-generation provider.
//!
//! Every judgment is a single structured call returning
//! `{"score": "yes"}` or `{"score": "no"}`. Relevance is graded per
//! evidence item, never as one aggregate judgment over the whole set.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use bodega_core::structured::{complete_structured, complete_text};
use bodega_core::traits::ProviderAdapter;
use bodega_core::types::{EvidenceItem, ProviderRequest, Verdict};
use bodega_core::BodegaError;

const RELEVANCE_PROMPT: &str = "You are a grader assessing whether a retrieved product is \
relevant to a user's grocery or shopping question. Consider the product relevant if it \
matches the product type mentioned in the question, belongs to a related category, has \
ingredients or features mentioned in the question, or could be a reasonable alternative \
to what was asked. Answer with JSON: {\"score\": \"yes\"} or {\"score\": \"no\"}.";

const GROUNDEDNESS_PROMPT: &str = "You are grading whether a response about products is \
supported by the provided product information. Check that the response only mentions \
products present in the data, accurately represents prices, brands, and features, and \
does not invent product details. Answer with JSON: {\"score\": \"yes\"} or {\"score\": \"no\"}.";

const USEFULNESS_PROMPT: &str = "You are grading whether a response is useful for \
answering a shopping or grocery question. Check that it directly addresses what the user \
was looking for, provides helpful recommendations, and includes relevant details like \
prices or stores. Answer with JSON: {\"score\": \"yes\"} or {\"score\": \"no\"}.";

const TRANSFORM_PROMPT: &str = "You are optimizing a grocery product search query. \
Transform the question into a simple, direct keyword query: focus on the main product \
type, include key modifiers like \"organic\" or \"low-fat\", keep it under 5 words, and \
do not use quotes or full sentences. Reply with the improved query only.";

#[derive(Debug, Deserialize)]
struct GradeScore {
    score: Verdict,
}

/// Issues binary grading and query-rewrite calls.
pub struct Grader {
    provider: Arc<dyn ProviderAdapter>,
    max_tokens: u32,
}

impl Grader {
    pub fn new(provider: Arc<dyn ProviderAdapter>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    /// Is this single evidence item relevant to the question?
    pub async fn grade_relevance(
        &self,
        question: &str,
        item: &EvidenceItem,
    ) -> Result<Verdict, BodegaError> {
        let user = format!(
            "Product information:\n{}\n\nUser question: {question}",
            item.context_block()
        );
        let score: GradeScore = complete_structured(
            self.provider.as_ref(),
            ProviderRequest::prompt(RELEVANCE_PROMPT, user, self.max_tokens),
        )
        .await?;
        debug!(item = %item.title, verdict = %score.score, "relevance graded");
        Ok(score.score)
    }

    /// Are all claims in the draft supported by the evidence context?
    pub async fn grade_groundedness(
        &self,
        evidence_context: &str,
        draft: &str,
    ) -> Result<Verdict, BodegaError> {
        let user = format!("Product information:\n{evidence_context}\n\nResponse: {draft}");
        let score: GradeScore = complete_structured(
            self.provider.as_ref(),
            ProviderRequest::prompt(GROUNDEDNESS_PROMPT, user, self.max_tokens),
        )
        .await?;
        Ok(score.score)
    }

    /// Does the draft actually answer the question?
    pub async fn grade_usefulness(
        &self,
        question: &str,
        draft: &str,
    ) -> Result<Verdict, BodegaError> {
        let user = format!("Response:\n{draft}\n\nUser question: {question}");
        let score: GradeScore = complete_structured(
            self.provider.as_ref(),
            ProviderRequest::prompt(USEFULNESS_PROMPT, user, self.max_tokens),
        )
        .await?;
        Ok(score.score)
    }

    /// Rewrite the question into a short keyword search query.
    ///
    /// The provider is instructed to stay under 5 words; the output is
    /// clamped to that bound regardless.
    pub async fn transform_query(&self, question: &str) -> Result<String, BodegaError> {
        let content = complete_text(
            self.provider.as_ref(),
            ProviderRequest::prompt(
                TRANSFORM_PROMPT,
                format!("Original question: {question}"),
                self.max_tokens,
            ),
        )
        .await?;
        let rewritten: String = content
            .trim()
            .trim_matches('"')
            .split_whitespace()
            .take(5)
            .collect::<Vec<_>>()
            .join(" ");
        if rewritten.is_empty() {
            return Err(BodegaError::oracle("query rewrite produced empty output"));
        }
        Ok(rewritten)
    }
}
