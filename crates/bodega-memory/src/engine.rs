// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory extraction engine.
//!
//! Classifies each turn into a memory kind, extracts a reconciled record,
//! and persists it. Every extraction pass returns the list of field
//! changes it applied so callers can audit what was written. All failures
//! surface as [`BodegaError::Extraction`]; callers log and skip them,
//! never letting memory trouble abort a user-visible reply.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info};

use bodega_core::structured::{complete_structured, complete_text};
use bodega_core::traits::ProviderAdapter;
use bodega_core::types::{ProviderRequest, TurnMessage};
use bodega_core::BodegaError;

use crate::records::{
    BudgetSensitivity, ChangeOp, InteractionRecord, InteractionType, MemoryChange, MemoryKind,
    Outcome, UserProfile,
};
use crate::store::MemoryStore;

const CLASSIFY_PROMPT: &str = "You decide whether a conversation turn contains information \
worth remembering about the user, and which memory kind it belongs to.\n\
- \"profile\": durable preferences and facts (dietary restrictions, allergies, likes, \
dislikes, preferred stores, budget sensitivity, household size).\n\
- \"interaction_log\": a meaningful interaction worth recording (a search, a purchase, \
feedback on a recommendation).\n\
- \"behavior_instructions\": feedback about how the assistant should behave or communicate.\n\
- \"none\": nothing worth remembering.\n\
Answer with JSON: {\"kind\": \"profile\" | \"interaction_log\" | \"behavior_instructions\" | \"none\"}.";

const PROFILE_PROMPT: &str = "You maintain a grocery shopper's profile. Given the current \
profile and the latest conversation, return the full updated profile as JSON with exactly \
these fields: likes, dislikes, dietary_restrictions, allergies, preferred_stores (string \
arrays), budget_sensitivity (\"low\", \"medium\", \"high\", or null), household_size \
(integer or null). Carry over existing values, add what the conversation reveals, and \
extract every independent fact you can find in one pass. Never drop existing entries.";

const INTERACTION_PROMPT: &str = "Summarize the latest exchange as one interaction record. \
Return JSON with fields: interaction_type (one of \"product_search\", \"price_comparison\", \
\"meal_planning\", \"recipe_suggestion\", \"shopping_list\", \"feedback\", \"purchase\"), \
user_action, system_response, user_feedback (string or null), outcome (\"positive\", \
\"negative\", \"neutral\", \"unknown\"), products_mentioned (string array).";

const INSTRUCTIONS_PROMPT: &str = "You maintain the behavior instructions the assistant \
follows for this user. Rewrite the complete instruction document, keeping everything that \
still applies from the current instructions and folding in the new feedback. Reply with \
the instruction text only.";

#[derive(Debug, Deserialize)]
struct Classification {
    kind: String,
}

/// Intermediate shape for interaction extraction; the oracle does not
/// supply the timestamp.
#[derive(Debug, Deserialize)]
struct RawInteraction {
    interaction_type: InteractionType,
    user_action: String,
    system_response: String,
    #[serde(default)]
    user_feedback: Option<String>,
    #[serde(default)]
    outcome: Outcome,
    #[serde(default)]
    products_mentioned: Vec<String>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

/// Classifies turns and reconciles extracted facts into stored records.
pub struct MemoryEngine {
    provider: Arc<dyn ProviderAdapter>,
    store: Arc<MemoryStore>,
    max_tokens: u32,
    call_timeout: Duration,
}

impl MemoryEngine {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        store: Arc<MemoryStore>,
        max_tokens: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            max_tokens,
            call_timeout,
        }
    }

    /// Bounds one oracle call; a hung provider must not stall the turn.
    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, BodegaError>>,
    ) -> Result<T, BodegaError> {
        timeout(self.call_timeout, fut)
            .await
            .map_err(|_| BodegaError::Timeout {
                duration: self.call_timeout,
            })?
    }

    /// Which memory kind, if any, does this turn speak to?
    pub async fn classify(
        &self,
        turns: &[TurnMessage],
    ) -> Result<Option<MemoryKind>, BodegaError> {
        let classification: Classification = self
            .with_timeout(complete_structured(
                self.provider.as_ref(),
                ProviderRequest::prompt(CLASSIFY_PROMPT, render_turns(turns), self.max_tokens),
            ))
            .await
            .map_err(extraction_err)?;

        if classification.kind == "none" {
            return Ok(None);
        }
        MemoryKind::from_str(&classification.kind)
            .map(Some)
            .map_err(|_| {
                BodegaError::Extraction(format!(
                    "classifier produced unknown kind `{}`",
                    classification.kind
                ))
            })
    }

    /// Extract profile facts and reconcile them against the existing profile.
    ///
    /// List fields are unioned (existing entries are never dropped); scalar
    /// fields are overwritten when the extraction supplies a value. Returns
    /// the merged profile plus one [`MemoryChange`] per touched field.
    pub async fn extract_profile(
        &self,
        turns: &[TurnMessage],
        existing: &UserProfile,
    ) -> Result<(UserProfile, Vec<MemoryChange>), BodegaError> {
        let existing_json = serde_json::to_string(existing)
            .map_err(|e| BodegaError::Extraction(format!("unserializable profile: {e}")))?;
        let user = format!(
            "Current profile: {existing_json}\n\nConversation:\n{}",
            render_turns(turns)
        );
        let extracted: UserProfile = self
            .with_timeout(complete_structured(
                self.provider.as_ref(),
                ProviderRequest::prompt(PROFILE_PROMPT, user, self.max_tokens),
            ))
            .await
            .map_err(extraction_err)?;

        let mut merged = existing.clone();
        let mut changes = Vec::new();

        merge_list("likes", &mut merged.likes, extracted.likes, &mut changes);
        merge_list(
            "dislikes",
            &mut merged.dislikes,
            extracted.dislikes,
            &mut changes,
        );
        merge_list(
            "dietary_restrictions",
            &mut merged.dietary_restrictions,
            extracted.dietary_restrictions,
            &mut changes,
        );
        merge_list(
            "allergies",
            &mut merged.allergies,
            extracted.allergies,
            &mut changes,
        );
        merge_list(
            "preferred_stores",
            &mut merged.preferred_stores,
            extracted.preferred_stores,
            &mut changes,
        );
        merge_budget(
            &mut merged.budget_sensitivity,
            extracted.budget_sensitivity,
            &mut changes,
        );
        merge_household(
            &mut merged.household_size,
            extracted.household_size,
            &mut changes,
        );

        Ok((merged, changes))
    }

    /// Extract one interaction record. Always an insert, never a patch.
    pub async fn extract_interaction(
        &self,
        turns: &[TurnMessage],
    ) -> Result<(InteractionRecord, Vec<MemoryChange>), BodegaError> {
        let raw: RawInteraction = self
            .with_timeout(complete_structured(
                self.provider.as_ref(),
                ProviderRequest::prompt(INTERACTION_PROMPT, render_turns(turns), self.max_tokens),
            ))
            .await
            .map_err(extraction_err)?;

        let record = InteractionRecord {
            interaction_type: raw.interaction_type,
            user_action: raw.user_action,
            system_response: raw.system_response,
            user_feedback: raw.user_feedback,
            outcome: raw.outcome,
            products_mentioned: raw.products_mentioned,
            date: raw.date.unwrap_or_else(Utc::now),
        };
        let new_value = serde_json::to_value(&record)
            .map_err(|e| BodegaError::Extraction(format!("unserializable interaction: {e}")))?;
        let changes = vec![MemoryChange {
            field: "interaction".to_string(),
            old_value: None,
            new_value,
            op: ChangeOp::Insert,
        }];
        Ok((record, changes))
    }

    /// Regenerate the full behavior-instructions document.
    pub async fn extract_instructions(
        &self,
        turns: &[TurnMessage],
        existing: Option<&str>,
    ) -> Result<String, BodegaError> {
        let user = format!(
            "Current instructions: {}\n\nNew feedback:\n{}",
            existing.unwrap_or("(none yet)"),
            render_turns(turns)
        );
        let content = self
            .with_timeout(complete_text(
                self.provider.as_ref(),
                ProviderRequest::prompt(INSTRUCTIONS_PROMPT, user, self.max_tokens),
            ))
            .await
            .map_err(extraction_err)?;
        let text = content.trim().to_string();
        if text.is_empty() {
            return Err(BodegaError::Extraction(
                "instruction rewrite produced empty output".to_string(),
            ));
        }
        Ok(text)
    }

    /// Classify the turn, run the matching extraction, persist the result,
    /// and return the audit list. An empty list means nothing was stored.
    pub async fn update_memory(
        &self,
        user_id: &str,
        turns: &[TurnMessage],
    ) -> Result<Vec<MemoryChange>, BodegaError> {
        let Some(kind) = self.classify(turns).await? else {
            debug!(user_id, "turn carries no memorable signal");
            return Ok(Vec::new());
        };
        self.update_memory_of_kind(user_id, turns, kind).await
    }

    /// Like [`Self::update_memory`], but with the kind already decided by
    /// the caller (the supervisor's delegation action names one).
    pub async fn update_memory_of_kind(
        &self,
        user_id: &str,
        turns: &[TurnMessage],
        kind: MemoryKind,
    ) -> Result<Vec<MemoryChange>, BodegaError> {
        match kind {
            MemoryKind::Profile => {
                // The lock covers load, extraction, and save: a concurrent
                // turn for the same user must see this merge, not the
                // profile it started from.
                let _held = self
                    .store
                    .lock_for_update(MemoryKind::Profile, user_id)
                    .await;
                let existing = self
                    .store
                    .load_profile(user_id)
                    .await
                    .map_err(extraction_err)?
                    .unwrap_or_default();
                let (merged, changes) = self.extract_profile(turns, &existing).await?;
                if changes.is_empty() {
                    return Ok(changes);
                }
                self.store
                    .save_profile_unlocked(user_id, &merged)
                    .await
                    .map_err(extraction_err)?;
                info!(user_id, fields = changes.len(), "profile updated");
                Ok(changes)
            }
            MemoryKind::InteractionLog => {
                let (record, changes) = self.extract_interaction(turns).await?;
                self.store
                    .append_interaction(user_id, &record)
                    .await
                    .map_err(extraction_err)?;
                info!(user_id, kind = %record.interaction_type, "interaction logged");
                Ok(changes)
            }
            MemoryKind::BehaviorInstructions => {
                let _held = self
                    .store
                    .lock_for_update(MemoryKind::BehaviorInstructions, user_id)
                    .await;
                let existing = self
                    .store
                    .load_instructions(user_id)
                    .await
                    .map_err(extraction_err)?;
                let text = self
                    .extract_instructions(turns, existing.as_deref())
                    .await?;
                // First write is an insert; later rewrites patch the document.
                let op = if existing.is_none() {
                    ChangeOp::Insert
                } else {
                    ChangeOp::Patch
                };
                let change = MemoryChange {
                    field: "instructions".to_string(),
                    old_value: existing.map(serde_json::Value::String),
                    new_value: serde_json::Value::String(text.clone()),
                    op,
                };
                self.store
                    .save_instructions_unlocked(user_id, &text)
                    .await
                    .map_err(extraction_err)?;
                info!(user_id, "behavior instructions rewritten");
                Ok(vec![change])
            }
        }
    }
}

fn render_turns(turns: &[TurnMessage]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn extraction_err(err: BodegaError) -> BodegaError {
    BodegaError::Extraction(err.to_string())
}

fn merge_list(
    field: &str,
    existing: &mut Vec<String>,
    extracted: Vec<String>,
    changes: &mut Vec<MemoryChange>,
) {
    let old = existing.clone();
    let mut added = false;
    for item in extracted {
        if !existing.iter().any(|e| e.eq_ignore_ascii_case(&item)) {
            existing.push(item);
            added = true;
        }
    }
    if added {
        changes.push(MemoryChange {
            field: field.to_string(),
            old_value: if old.is_empty() {
                None
            } else {
                Some(serde_json::json!(old))
            },
            new_value: serde_json::json!(existing),
            op: if old.is_empty() {
                ChangeOp::Insert
            } else {
                ChangeOp::Patch
            },
        });
    }
}

fn merge_budget(
    existing: &mut Option<BudgetSensitivity>,
    extracted: Option<BudgetSensitivity>,
    changes: &mut Vec<MemoryChange>,
) {
    if let Some(value) = extracted
        && *existing != Some(value)
    {
        changes.push(MemoryChange {
            field: "budget_sensitivity".to_string(),
            old_value: existing.map(|v| serde_json::json!(v)),
            new_value: serde_json::json!(value),
            op: if existing.is_none() {
                ChangeOp::Insert
            } else {
                ChangeOp::Patch
            },
        });
        *existing = Some(value);
    }
}

fn merge_household(
    existing: &mut Option<u32>,
    extracted: Option<u32>,
    changes: &mut Vec<MemoryChange>,
) {
    if let Some(value) = extracted
        && *existing != Some(value)
    {
        changes.push(MemoryChange {
            field: "household_size".to_string(),
            old_value: existing.map(|v| serde_json::json!(v)),
            new_value: serde_json::json!(value),
            op: if existing.is_none() {
                ChangeOp::Insert
            } else {
                ChangeOp::Patch
            },
        });
        *existing = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bodega_core::traits::PluginAdapter;
    use bodega_core::types::{AdapterType, HealthStatus, ProviderResponse};
    use bodega_test_utils::{InMemoryStore, MockProvider};

    /// Scripted provider that sleeps before every response, long enough
    /// for concurrent callers to overlap.
    struct SlowProvider {
        inner: MockProvider,
        delay: Duration,
    }

    impl SlowProvider {
        fn new(responses: Vec<String>, delay: Duration) -> Self {
            Self {
                inner: MockProvider::with_responses(responses),
                delay,
            }
        }
    }

    #[async_trait]
    impl PluginAdapter for SlowProvider {
        fn name(&self) -> &str {
            "slow-provider"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }

        async fn health_check(&self) -> Result<HealthStatus, BodegaError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl ProviderAdapter for SlowProvider {
        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, BodegaError> {
            tokio::time::sleep(self.delay).await;
            self.inner.complete(request).await
        }
    }

    fn engine(provider: Arc<MockProvider>) -> MemoryEngine {
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        MemoryEngine::new(provider, store, 512, Duration::from_secs(5))
    }

    fn turn(content: &str) -> Vec<TurnMessage> {
        vec![TurnMessage::user(content)]
    }

    #[tokio::test]
    async fn classify_maps_none_to_no_kind() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"kind": "none"}"#.to_string(),
            r#"{"kind": "profile"}"#.to_string(),
        ]));
        let engine = engine(provider);
        assert!(engine.classify(&turn("hello")).await.unwrap().is_none());
        assert_eq!(
            engine.classify(&turn("I'm vegan")).await.unwrap(),
            Some(MemoryKind::Profile)
        );
    }

    #[tokio::test]
    async fn classify_rejects_invented_kinds() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"kind": "episodic"}"#.to_string(),
        ]));
        let engine = engine(provider);
        let err = engine.classify(&turn("x")).await.unwrap_err();
        assert!(matches!(err, BodegaError::Extraction(_)));
    }

    #[tokio::test]
    async fn profile_extraction_unions_lists_and_audits_changes() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"likes": ["coffee", "tea"], "allergies": ["peanuts"], "budget_sensitivity": "high"}"#
                .to_string(),
        ]));
        let engine = engine(provider);
        let existing = UserProfile {
            likes: vec!["coffee".into()],
            ..UserProfile::default()
        };

        let (merged, changes) = engine
            .extract_profile(&turn("I love tea but I'm allergic to peanuts"), &existing)
            .await
            .unwrap();

        assert_eq!(merged.likes, vec!["coffee", "tea"]);
        assert_eq!(merged.allergies, vec!["peanuts"]);
        assert_eq!(merged.budget_sensitivity, Some(BudgetSensitivity::High));

        let likes = changes.iter().find(|c| c.field == "likes").unwrap();
        assert_eq!(likes.op, ChangeOp::Patch);
        let allergies = changes.iter().find(|c| c.field == "allergies").unwrap();
        assert_eq!(allergies.op, ChangeOp::Insert);
        assert!(allergies.old_value.is_none());
        let budget = changes
            .iter()
            .find(|c| c.field == "budget_sensitivity")
            .unwrap();
        assert_eq!(budget.op, ChangeOp::Insert);
    }

    #[tokio::test]
    async fn profile_extraction_never_drops_existing_entries() {
        // Oracle "forgets" coffee; the merge must keep it anyway.
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"likes": ["tea"]}"#.to_string(),
        ]));
        let engine = engine(provider);
        let existing = UserProfile {
            likes: vec!["coffee".into()],
            ..UserProfile::default()
        };
        let (merged, _) = engine
            .extract_profile(&turn("also tea"), &existing)
            .await
            .unwrap();
        assert_eq!(merged.likes, vec!["coffee", "tea"]);
    }

    #[tokio::test]
    async fn interaction_extraction_is_always_an_insert() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"interaction_type": "product_search", "user_action": "searched for oat milk",
                "system_response": "recommended two brands", "outcome": "positive",
                "products_mentioned": ["oat milk"]}"#
                .to_string(),
        ]));
        let engine = engine(provider);
        let (record, changes) = engine
            .extract_interaction(&turn("find me oat milk"))
            .await
            .unwrap();
        assert_eq!(record.interaction_type, InteractionType::ProductSearch);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].op, ChangeOp::Insert);
        assert!(changes[0].old_value.is_none());
    }

    #[tokio::test]
    async fn update_memory_persists_profile_end_to_end() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"kind": "profile"}"#.to_string(),
            r#"{"dietary_restrictions": ["vegetarian"]}"#.to_string(),
        ]));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let engine = MemoryEngine::new(provider, Arc::clone(&store), 512, Duration::from_secs(5));

        let changes = engine
            .update_memory("u1", &turn("I'm vegetarian by the way"))
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "dietary_restrictions");

        let profile = store.load_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.dietary_restrictions, vec!["vegetarian"]);
    }

    #[tokio::test]
    async fn update_memory_rewrites_instructions_whole() {
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        store.save_instructions("u1", "Be brief.").await.unwrap();

        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"kind": "behavior_instructions"}"#.to_string(),
            "Be brief. Always mention offers first.".to_string(),
        ]));
        let engine = MemoryEngine::new(provider, Arc::clone(&store), 512, Duration::from_secs(5));

        let changes = engine
            .update_memory("u1", &turn("tell me about offers before anything else"))
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].op, ChangeOp::Patch);
        assert_eq!(
            store.load_instructions("u1").await.unwrap().unwrap(),
            "Be brief. Always mention offers first."
        );
    }

    #[tokio::test]
    async fn concurrent_profile_updates_do_not_lose_patches() {
        // The delay keeps both extractions in flight at once; without the
        // namespace lock both would read the empty profile and the second
        // save would drop the first one's fields.
        let provider = Arc::new(SlowProvider::new(
            vec![
                r#"{"likes": ["coffee"]}"#.to_string(),
                r#"{"allergies": ["peanuts"]}"#.to_string(),
            ],
            Duration::from_millis(50),
        ));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let engine =
            MemoryEngine::new(provider, Arc::clone(&store), 512, Duration::from_secs(5));

        let coffee_turn = turn("I love coffee");
        let peanut_turn = turn("I'm allergic to peanuts");
        let (a, b) = tokio::join!(
            engine.update_memory_of_kind("u1", &coffee_turn, MemoryKind::Profile),
            engine.update_memory_of_kind("u1", &peanut_turn, MemoryKind::Profile),
        );
        a.unwrap();
        b.unwrap();

        let profile = store.load_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.likes, vec!["coffee"]);
        assert_eq!(profile.allergies, vec!["peanuts"]);
    }

    #[tokio::test]
    async fn hung_oracle_is_bounded_by_the_call_timeout() {
        let provider = Arc::new(SlowProvider::new(
            vec![r#"{"kind": "none"}"#.to_string()],
            Duration::from_millis(200),
        ));
        let store = Arc::new(MemoryStore::new(Arc::new(InMemoryStore::new()), 3));
        let engine = MemoryEngine::new(provider, store, 512, Duration::from_millis(20));

        let err = engine.classify(&turn("hello")).await.unwrap_err();
        assert!(matches!(err, BodegaError::Extraction(_)));
    }

    #[tokio::test]
    async fn instruction_rewrite_survives_one_transport_failure() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            "Mention offers first.".to_string(),
        ]));
        provider.fail_next_call().await;
        let engine = engine(provider);
        let text = engine
            .extract_instructions(&turn("offers first please"), None)
            .await
            .unwrap();
        assert_eq!(text, "Mention offers first.");
    }

    #[tokio::test]
    async fn no_signal_means_no_changes() {
        let provider = Arc::new(MockProvider::with_responses(vec![
            r#"{"kind": "none"}"#.to_string(),
        ]));
        let engine = engine(provider);
        let changes = engine.update_memory("u1", &turn("thanks!")).await.unwrap();
        assert!(changes.is_empty());
    }
}
