use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{Snapshot, SubjectId};

use crate::repository::{KeyValueStore, StorageError};

/// Outcome of looking up a persisted in-progress session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotLookup {
    Found(Snapshot),
    Missing,
    /// Older than the ttl; the record has been discarded.
    Expired,
    /// Unparsable or inconsistent; the record has been discarded.
    Corrupt,
}

/// Stores one JSON-encoded snapshot per subject on top of a key-value store.
#[derive(Clone)]
pub struct SnapshotRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl SnapshotRepository {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the snapshot for `subject`.
    ///
    /// Corrupt and expired records are reported as such and deleted
    /// best-effort; they never surface as errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only if the underlying store cannot be read.
    pub async fn load(
        &self,
        subject: &SubjectId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SnapshotLookup, StorageError> {
        let key = subject.storage_key();
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(SnapshotLookup::Missing);
        };

        let snapshot = match decode(&raw) {
            Ok(snapshot) if &snapshot.subject == subject => snapshot,
            Ok(snapshot) => {
                tracing::warn!(
                    subject = %subject,
                    stored_subject = %snapshot.subject,
                    "snapshot stored under another subject's key; discarding"
                );
                self.discard(&key).await;
                return Ok(SnapshotLookup::Corrupt);
            }
            Err(err) => {
                tracing::warn!(subject = %subject, error = %err, "unreadable snapshot; discarding");
                self.discard(&key).await;
                return Ok(SnapshotLookup::Corrupt);
            }
        };

        if let Err(err) = snapshot.validate() {
            tracing::warn!(subject = %subject, error = %err, "inconsistent snapshot; discarding");
            self.discard(&key).await;
            return Ok(SnapshotLookup::Corrupt);
        }

        if snapshot.is_expired(now, ttl) {
            tracing::debug!(subject = %subject, saved_at = %snapshot.timestamp, "snapshot expired");
            self.discard(&key).await;
            return Ok(SnapshotLookup::Expired);
        }

        Ok(SnapshotLookup::Found(snapshot))
    }

    /// Persist `snapshot` under its subject's key, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let raw = serde_json::to_string(snapshot)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.set(&snapshot.subject.storage_key(), &raw).await
    }

    /// Remove the snapshot for `subject`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn delete(&self, subject: &SubjectId) -> Result<(), StorageError> {
        self.kv.delete(&subject.storage_key()).await
    }

    async fn discard(&self, key: &str) {
        if let Err(err) = self.kv.delete(key).await {
            tracing::warn!(key, error = %err, "failed to discard snapshot");
        }
    }
}

fn decode(raw: &str) -> Result<Snapshot, StorageError> {
    serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))
}
