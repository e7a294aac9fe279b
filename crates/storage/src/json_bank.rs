//! Question pools stored as one JSON file per subject.
//!
//! Each `<dir>/<subject>.json` holds a `questions` array of records shaped
//! `{question_number, question, options{A..E}, correct_answer, instruction}`.
//! An optional `<dir>/index.json` lists subjects with counts and descriptions.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use quiz_core::model::{OptionLabel, Question, SubjectId};
use serde::Deserialize;

use crate::repository::{QuestionStore, StorageError, SubjectInfo};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Deserialize)]
struct SubjectFile {
    questions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: IndexMap<String, String>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    subjects: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    name: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    total_questions: usize,
    #[serde(default)]
    description: Option<String>,
}

/// Reads subject pools from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonQuestionBank {
    dir: PathBuf,
}

impl JsonQuestionBank {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn subject_path(&self, subject: &SubjectId) -> Option<PathBuf> {
        let name = subject.as_str();
        let safe = !name.is_empty()
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        safe.then(|| self.dir.join(format!("{name}.json")))
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Unavailable(format!(
                "{}: {err}",
                path.display()
            ))),
        }
    }

    async fn scan_subjects(&self) -> Result<Vec<SubjectInfo>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let mut subjects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?
        {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let is_index = path.file_name().is_some_and(|name| name == INDEX_FILE);
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_json || is_index {
                continue;
            }
            let id = SubjectId::new(stem);
            let total_questions = match self.questions(&id).await {
                Ok(questions) => questions.len(),
                Err(err) => {
                    tracing::warn!(subject = %id, error = %err, "skipping unreadable subject file");
                    continue;
                }
            };
            subjects.push(SubjectInfo {
                id,
                total_questions,
                description: None,
            });
        }
        subjects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(subjects)
    }
}

/// Parse a subject file, keeping only records that form valid questions.
///
/// Records are numbered by their position among the kept records.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the file is not a JSON object
/// with a `questions` array.
pub fn parse_subject_file(subject: &SubjectId, raw: &str) -> Result<Vec<Question>, StorageError> {
    let file: SubjectFile =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut questions = Vec::with_capacity(file.questions.len());
    for (position, value) in file.questions.into_iter().enumerate() {
        match to_question(value, questions.len() + 1) {
            Ok(question) => questions.push(question),
            Err(reason) => {
                tracing::debug!(subject = %subject, position, %reason, "skipping question record");
            }
        }
    }
    Ok(questions)
}

fn to_question(value: serde_json::Value, number: usize) -> Result<Question, String> {
    let raw: RawQuestion = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let correct = raw
        .correct_answer
        .map(|label| label.trim().to_owned())
        .filter(|label| !label.is_empty())
        .ok_or_else(|| "missing correct answer".to_owned())?;
    let options = raw
        .options
        .into_iter()
        .map(|(label, text)| (OptionLabel::new(label.trim()), text))
        .collect();
    let identifier = u32::try_from(number).map_err(|e| e.to_string())?;

    Question::new(
        identifier,
        raw.question,
        options,
        OptionLabel::new(correct),
        raw.instruction,
    )
    .map_err(|e| e.to_string())
}

#[async_trait]
impl QuestionStore for JsonQuestionBank {
    async fn questions(&self, subject: &SubjectId) -> Result<Vec<Question>, StorageError> {
        let Some(path) = self.subject_path(subject) else {
            tracing::warn!(subject = %subject, "rejecting subject name that is not a plain file name");
            return Ok(Vec::new());
        };
        match Self::read_optional(&path).await? {
            Some(raw) => parse_subject_file(subject, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn subjects(&self) -> Result<Vec<SubjectInfo>, StorageError> {
        let index_path = self.dir.join(INDEX_FILE);
        let Some(raw) = Self::read_optional(&index_path).await? else {
            return self.scan_subjects().await;
        };

        let index: IndexFile =
            serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(index
            .subjects
            .into_iter()
            .map(|entry| {
                let id = entry
                    .file
                    .as_deref()
                    .and_then(|file| file.strip_suffix(".json"))
                    .map_or_else(|| SubjectId::new(entry.name.clone()), SubjectId::new);
                SubjectInfo {
                    id,
                    total_questions: entry.total_questions,
                    description: entry.description,
                }
            })
            .collect())
    }
}
