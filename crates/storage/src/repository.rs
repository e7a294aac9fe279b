use async_trait::async_trait;
use quiz_core::model::{Question, SubjectId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Catalog entry for a subject's question pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInfo {
    pub id: SubjectId,
    pub total_questions: usize,
    pub description: Option<String>,
}

/// String key-value persistence (the browser-storage style capability).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key` in a single write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be written.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Read-only source of question pools, one per subject.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Ordered question pool for `subject`. An empty list means "no data".
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject's data cannot be loaded. A failure
    /// for one subject does not affect the others.
    async fn questions(&self, subject: &SubjectId) -> Result<Vec<Question>, StorageError>;

    /// Subjects known to the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn subjects(&self) -> Result<Vec<SubjectInfo>, StorageError>;
}

/// Simple in-memory implementation for testing and prototyping.
///
/// Can be switched to "unavailable" to simulate disabled or full storage.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<String, String>>>,
    pools: Arc<Mutex<HashMap<SubjectId, Vec<Question>>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the question pool for a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the internal lock is poisoned.
    pub fn insert_subject(
        &self,
        subject: SubjectId,
        questions: Vec<Question>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .pools
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.insert(subject, questions);
        Ok(())
    }

    /// Make every key-value operation fail until re-enabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        self.entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl QuestionStore for InMemoryRepository {
    async fn questions(&self, subject: &SubjectId) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .pools
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.get(subject).cloned().unwrap_or_default())
    }

    async fn subjects(&self) -> Result<Vec<SubjectInfo>, StorageError> {
        let guard = self
            .pools
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let mut subjects: Vec<SubjectInfo> = guard
            .iter()
            .map(|(id, questions)| SubjectInfo {
                id: id.clone(),
                total_questions: questions.len(),
                description: None,
            })
            .collect();
        subjects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(subjects)
    }
}

/// Bundles the persistence and question-store capabilities behind trait
/// objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
    pub questions: Arc<dyn QuestionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let kv: Arc<dyn KeyValueStore> = Arc::new(repo.clone());
        let questions: Arc<dyn QuestionStore> = Arc::new(repo);
        Self { kv, questions }
    }
}
