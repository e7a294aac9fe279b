use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::QuizSettings;
use storage::json_bank::JsonQuestionBank;
use storage::{InMemoryRepository, QuestionStore, Storage, StorageError, SubjectInfo};

use crate::Clock;
use crate::display::QuizDisplay;
use crate::error::QuizServicesError;
use crate::quiz::QuizController;

const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";
const DEFAULT_DATA_DIR: &str = "data";

/// Where snapshots are persisted and where subject files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub db_url: String,
    pub data_dir: PathBuf,
}

impl QuizConfig {
    /// Read `QUIZ_DB_URL` and `QUIZ_DATA_DIR`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let db_url = env::var("QUIZ_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());
        let data_dir = env::var("QUIZ_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        Self { db_url, data_dir }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

/// Assembles storage, settings and clock, and hands out quiz controllers.
#[derive(Clone)]
pub struct QuizServices {
    storage: Storage,
    settings: QuizSettings,
    clock: Clock,
}

impl QuizServices {
    /// Build services backed by `SQLite` snapshots and JSON subject files.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if the database cannot be opened or migrated.
    pub async fn from_config(config: &QuizConfig, clock: Clock) -> Result<Self, QuizServicesError> {
        let questions: Arc<dyn QuestionStore> =
            Arc::new(JsonQuestionBank::new(config.data_dir.clone()));
        let storage = Storage::sqlite(&config.db_url, questions).await?;
        tracing::info!(
            db_url = %config.db_url,
            data_dir = %config.data_dir.display(),
            "quiz services ready"
        );
        Ok(Self {
            storage,
            settings: QuizSettings::default(),
            clock,
        })
    }

    /// Services over a single in-memory repository (tests and demos).
    #[must_use]
    pub fn in_memory(repo: InMemoryRepository, clock: Clock) -> Self {
        let storage = Storage {
            kv: Arc::new(repo.clone()),
            questions: Arc::new(repo),
        };
        Self::new(storage, clock)
    }

    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        Self {
            storage,
            settings: QuizSettings::default(),
            clock,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Subjects available for selection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject catalog cannot be read.
    pub async fn subjects(&self) -> Result<Vec<SubjectInfo>, StorageError> {
        self.storage.questions.subjects().await
    }

    /// A fresh controller rendering to `display`.
    #[must_use]
    pub fn controller(&self, display: Arc<dyn QuizDisplay>) -> QuizController {
        QuizController::new(self.clock, self.settings.clone(), &self.storage, display)
    }
}
