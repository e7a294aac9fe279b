use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix for persisted in-progress sessions, one key per subject.
const SESSION_KEY_PREFIX: &str = "quiz_session::";

/// Identifier of a subject (a named pool of questions).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a new `SubjectId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying subject name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which an in-progress session for this subject is persisted.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }
}

/// Short label of a multiple-choice option (e.g. "A".."E").
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionLabel(String);

impl OptionLabel {
    /// Creates a new `OptionLabel`
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectId({})", self.0)
    }
}

impl fmt::Debug for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptionLabel({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&str> for OptionLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
