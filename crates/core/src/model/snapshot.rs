use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{OptionLabel, Question, QuestionError, Session, SubjectId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("snapshot has no questions")]
    NoQuestions,

    #[error("question at index {index} has identifier {found}, expected {expected}")]
    IdentifierMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("cursor {cursor} is out of range for {len} questions")]
    CursorOutOfRange { cursor: usize, len: usize },

    #[error("answer index {index} is out of range for {len} questions")]
    AnswerOutOfRange { index: usize, len: usize },

    #[error("answer {label} is not an option of question {index}")]
    InvalidAnswer { index: usize, label: OptionLabel },

    #[error("snapshot has no time remaining")]
    TimeExhausted,

    #[error("invalid question at index {index}: {source}")]
    Question {
        index: usize,
        #[source]
        source: QuestionError,
    },
}

/// Persisted projection of a running session.
///
/// `timestamp` is the time of the most recent write; it drives expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub subject: SubjectId,
    pub questions: Vec<Question>,
    pub cursor: usize,
    #[serde(default)]
    pub answers: BTreeMap<usize, OptionLabel>,
    pub time_remaining_secs: u32,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            subject: session.subject().clone(),
            questions: session.questions().to_vec(),
            cursor: session.cursor(),
            answers: session.answers().clone(),
            time_remaining_secs: session.time_remaining_secs(),
            timestamp: now,
        }
    }

    /// True when the snapshot was written more than `ttl` before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.timestamp) > ttl
    }

    /// Check every running-session invariant without consuming the snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first `SnapshotError` found.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let len = self.questions.len();
        if len == 0 {
            return Err(SnapshotError::NoQuestions);
        }
        for (index, question) in self.questions.iter().enumerate() {
            question
                .validate()
                .map_err(|source| SnapshotError::Question { index, source })?;
            let expected = u32::try_from(index + 1).unwrap_or(u32::MAX);
            if question.identifier() != expected {
                return Err(SnapshotError::IdentifierMismatch {
                    index,
                    expected,
                    found: question.identifier(),
                });
            }
        }
        if self.cursor >= len {
            return Err(SnapshotError::CursorOutOfRange {
                cursor: self.cursor,
                len,
            });
        }
        for (&index, label) in &self.answers {
            let Some(question) = self.questions.get(index) else {
                return Err(SnapshotError::AnswerOutOfRange { index, len });
            };
            if !question.has_option(label) {
                return Err(SnapshotError::InvalidAnswer {
                    index,
                    label: label.clone(),
                });
            }
        }
        if self.time_remaining_secs == 0 {
            return Err(SnapshotError::TimeExhausted);
        }
        Ok(())
    }

    /// Rebuild the running session this snapshot was taken from.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the record violates a session invariant.
    pub fn restore(self) -> Result<Session, SnapshotError> {
        self.validate()?;
        Ok(Session::running(
            self.subject,
            self.questions,
            self.cursor,
            self.answers,
            self.time_remaining_secs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Phase;
    use crate::model::question::fixtures;
    use crate::time::fixed_now;

    fn running_session() -> Session {
        let mut answers = BTreeMap::new();
        answers.insert(0, OptionLabel::new("B"));
        answers.insert(17, OptionLabel::new("E"));
        Session::running(
            SubjectId::new("Mythology"),
            fixtures::pool(50),
            17,
            answers,
            1234,
        )
    }

    #[test]
    fn json_round_trip_restores_identical_session() {
        let session = running_session();
        let snapshot = Snapshot::capture(&session, fixed_now());

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);

        let restored = decoded.restore().unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.phase(), Phase::Running);
    }

    #[test]
    fn expiry_uses_strictly_greater_than_ttl() {
        let snapshot = Snapshot::capture(&running_session(), fixed_now());
        let ttl = Duration::hours(24);
        assert!(!snapshot.is_expired(fixed_now() + Duration::hours(24), ttl));
        assert!(snapshot.is_expired(fixed_now() + Duration::hours(25), ttl));
        assert!(!snapshot.is_expired(fixed_now() - Duration::hours(1), ttl));
    }

    #[test]
    fn rejects_answers_with_unknown_labels() {
        let mut snapshot = Snapshot::capture(&running_session(), fixed_now());
        snapshot.answers.insert(3, OptionLabel::new("Z"));
        assert_eq!(
            snapshot.restore().unwrap_err(),
            SnapshotError::InvalidAnswer {
                index: 3,
                label: OptionLabel::new("Z")
            }
        );
    }

    #[test]
    fn rejects_out_of_range_cursor_and_answers() {
        let mut snapshot = Snapshot::capture(&running_session(), fixed_now());
        snapshot.cursor = 50;
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::CursorOutOfRange { cursor: 50, len: 50 })
        ));

        snapshot.cursor = 0;
        snapshot.answers.insert(50, OptionLabel::new("A"));
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::AnswerOutOfRange { index: 50, .. })
        ));
    }

    #[test]
    fn rejects_renumbering_gaps() {
        let mut snapshot = Snapshot::capture(&running_session(), fixed_now());
        snapshot.questions[4] = snapshot.questions[4].with_identifier(99);
        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::IdentifierMismatch {
                index: 4,
                expected: 5,
                found: 99
            })
        ));
    }

    #[test]
    fn rejects_exhausted_timer() {
        let mut snapshot = Snapshot::capture(&running_session(), fixed_now());
        snapshot.time_remaining_secs = 0;
        assert_eq!(snapshot.validate(), Err(SnapshotError::TimeExhausted));
    }

    #[test]
    fn missing_fields_fail_to_parse() {
        let raw = r#"{"subject":"Mythology","cursor":0,"time_remaining_secs":10}"#;
        assert!(serde_json::from_str::<Snapshot>(raw).is_err());
    }
}
