// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed memory access over the key-value store adapter.
//!
//! Namespaces are `{kind}:{user_id}`. Profile and instruction updates are
//! serialized per user through a write lock held across the whole
//! load-reconcile-save cycle ([`MemoryStore::lock_for_update`]) so
//! concurrent turns cannot lose each other's patches; interaction appends
//! need no lock because every append targets a fresh key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use bodega_core::traits::KeyValueStore;
use bodega_core::BodegaError;

use crate::records::{InteractionRecord, MemoryKind, MemoryRecord, UserProfile};

const PROFILE_KEY: &str = "profile";
const INSTRUCTIONS_KEY: &str = "user_instructions";

/// Typed wrapper around the key-value store adapter.
pub struct MemoryStore {
    store: Arc<dyn KeyValueStore>,
    /// How many interaction-log entries are returned by [`Self::recent_interactions`].
    recent_window: usize,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, recent_window: usize) -> Self {
        Self {
            store,
            recent_window,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn namespace(kind: MemoryKind, user_id: &str) -> String {
        format!("{kind}:{user_id}")
    }

    async fn write_guard(&self, namespace: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().await;
        Arc::clone(locks.entry(namespace.to_string()).or_default())
    }

    /// Takes the write lock for one `{kind}:{user_id}` namespace.
    ///
    /// Hold the guard across a whole load-reconcile-save cycle, then save
    /// with the matching `*_unlocked` method. [`Self::save_profile`] and
    /// [`Self::save_instructions`] take this lock themselves and would
    /// deadlock against a held guard.
    pub async fn lock_for_update(
        &self,
        kind: MemoryKind,
        user_id: &str,
    ) -> OwnedMutexGuard<()> {
        let ns = Self::namespace(kind, user_id);
        self.write_guard(&ns).await.lock_owned().await
    }

    async fn load_record(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<MemoryRecord>, BodegaError> {
        match self.store.get(namespace, key).await? {
            Some(value) => {
                let record: MemoryRecord = serde_json::from_value(value)
                    .map_err(|e| BodegaError::Storage(format!("corrupt memory record: {e}")))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// The user's profile, if one has been extracted.
    pub async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BodegaError> {
        let ns = Self::namespace(MemoryKind::Profile, user_id);
        match self.load_record(&ns, PROFILE_KEY).await? {
            Some(record) => {
                let profile: UserProfile = serde_json::from_value(record.payload)
                    .map_err(|e| BodegaError::Storage(format!("corrupt profile payload: {e}")))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the user's profile in place, bumping its version.
    pub async fn save_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<(), BodegaError> {
        let _held = self.lock_for_update(MemoryKind::Profile, user_id).await;
        self.save_profile_unlocked(user_id, profile).await
    }

    /// Profile write for callers already holding [`Self::lock_for_update`].
    pub(crate) async fn save_profile_unlocked(
        &self,
        user_id: &str,
        profile: &UserProfile,
    ) -> Result<(), BodegaError> {
        let ns = Self::namespace(MemoryKind::Profile, user_id);
        let version = self
            .load_record(&ns, PROFILE_KEY)
            .await?
            .map(|r| r.version + 1)
            .unwrap_or(1);
        let payload = serde_json::to_value(profile)
            .map_err(|e| BodegaError::Storage(format!("unserializable profile: {e}")))?;
        let mut record = MemoryRecord::new(MemoryKind::Profile, user_id, payload);
        record.version = version;
        record.updated_at = Utc::now();

        let value = serde_json::to_value(&record)
            .map_err(|e| BodegaError::Storage(format!("unserializable record: {e}")))?;
        self.store.put(&ns, PROFILE_KEY, value).await?;
        debug!(user_id, version, "profile saved");
        Ok(())
    }

    /// Append one interaction-log entry under a fresh key.
    pub async fn append_interaction(
        &self,
        user_id: &str,
        interaction: &InteractionRecord,
    ) -> Result<(), BodegaError> {
        let ns = Self::namespace(MemoryKind::InteractionLog, user_id);
        let payload = serde_json::to_value(interaction)
            .map_err(|e| BodegaError::Storage(format!("unserializable interaction: {e}")))?;
        let record = MemoryRecord::new(MemoryKind::InteractionLog, user_id, payload);
        let value = serde_json::to_value(&record)
            .map_err(|e| BodegaError::Storage(format!("unserializable record: {e}")))?;
        let key = uuid::Uuid::new_v4().to_string();
        self.store.put(&ns, &key, value).await?;
        Ok(())
    }

    /// The most recent interactions, newest last, pruned to the configured
    /// window. The full log stays in the store untouched.
    pub async fn recent_interactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<InteractionRecord>, BodegaError> {
        let ns = Self::namespace(MemoryKind::InteractionLog, user_id);
        let mut interactions: Vec<InteractionRecord> = Vec::new();
        for (_key, value) in self.store.search_namespace(&ns).await? {
            let record: MemoryRecord = serde_json::from_value(value)
                .map_err(|e| BodegaError::Storage(format!("corrupt memory record: {e}")))?;
            let interaction: InteractionRecord = serde_json::from_value(record.payload)
                .map_err(|e| BodegaError::Storage(format!("corrupt interaction payload: {e}")))?;
            interactions.push(interaction);
        }
        interactions.sort_by_key(|i| i.date);
        if interactions.len() > self.recent_window {
            interactions.drain(..interactions.len() - self.recent_window);
        }
        Ok(interactions)
    }

    /// Current behavior instructions, if any.
    pub async fn load_instructions(&self, user_id: &str) -> Result<Option<String>, BodegaError> {
        let ns = Self::namespace(MemoryKind::BehaviorInstructions, user_id);
        match self.load_record(&ns, INSTRUCTIONS_KEY).await? {
            Some(record) => {
                let text: String = serde_json::from_value(record.payload).map_err(|e| {
                    BodegaError::Storage(format!("corrupt instructions payload: {e}"))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Regenerated-in-full instruction text replaces the old document.
    pub async fn save_instructions(&self, user_id: &str, text: &str) -> Result<(), BodegaError> {
        let _held = self
            .lock_for_update(MemoryKind::BehaviorInstructions, user_id)
            .await;
        self.save_instructions_unlocked(user_id, text).await
    }

    /// Instructions write for callers already holding [`Self::lock_for_update`].
    pub(crate) async fn save_instructions_unlocked(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<(), BodegaError> {
        let ns = Self::namespace(MemoryKind::BehaviorInstructions, user_id);
        let version = self
            .load_record(&ns, INSTRUCTIONS_KEY)
            .await?
            .map(|r| r.version + 1)
            .unwrap_or(1);
        let mut record = MemoryRecord::new(
            MemoryKind::BehaviorInstructions,
            user_id,
            serde_json::Value::String(text.to_string()),
        );
        record.version = version;

        let value = serde_json::to_value(&record)
            .map_err(|e| BodegaError::Storage(format!("unserializable record: {e}")))?;
        self.store.put(&ns, INSTRUCTIONS_KEY, value).await?;
        debug!(user_id, version, "behavior instructions saved");
        Ok(())
    }

    /// Persisted running summary for one conversation.
    pub async fn load_summary(
        &self,
        user_id: &str,
        conversation_key: &str,
    ) -> Result<Option<String>, BodegaError> {
        let ns = format!("summary:{user_id}");
        match self.store.get(&ns, conversation_key).await? {
            Some(serde_json::Value::String(text)) => Ok(Some(text)),
            Some(_) => Err(BodegaError::Storage("corrupt summary payload".to_string())),
            None => Ok(None),
        }
    }

    pub async fn save_summary(
        &self,
        user_id: &str,
        conversation_key: &str,
        summary: &str,
    ) -> Result<(), BodegaError> {
        let ns = format!("summary:{user_id}");
        self.store
            .put(
                &ns,
                conversation_key,
                serde_json::Value::String(summary.to_string()),
            )
            .await
    }
}
