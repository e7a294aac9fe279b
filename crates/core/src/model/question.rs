use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::OptionLabel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question must have at least one option")]
    NoOptions,

    #[error("correct label {label} is not one of the question's options")]
    UnknownCorrectLabel { label: OptionLabel },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question record.
///
/// `identifier` is a 1-based position assigned when a test is generated; it is
/// not a stable external id. Options keep their insertion order for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    identifier: u32,
    prompt: String,
    options: IndexMap<OptionLabel, String>,
    correct_label: OptionLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instruction: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank,
    /// `QuestionError::NoOptions` if no options are given, and
    /// `QuestionError::UnknownCorrectLabel` if the correct label is not an option key.
    pub fn new(
        identifier: u32,
        prompt: impl Into<String>,
        options: IndexMap<OptionLabel, String>,
        correct_label: OptionLabel,
        instruction: Option<String>,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            identifier,
            prompt: prompt.into(),
            options,
            correct_label,
            instruction: instruction
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
        };
        question.validate()?;
        Ok(question)
    }

    /// Check the record invariants. Used again when a question is restored
    /// from persisted form.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Question::new`].
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if !self.options.contains_key(&self.correct_label) {
            return Err(QuestionError::UnknownCorrectLabel {
                label: self.correct_label.clone(),
            });
        }
        Ok(())
    }

    /// Returns a copy carrying a new position number. The original record is untouched.
    #[must_use]
    pub fn with_identifier(&self, identifier: u32) -> Self {
        Self {
            identifier,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &IndexMap<OptionLabel, String> {
        &self.options
    }

    #[must_use]
    pub fn correct_label(&self) -> &OptionLabel {
        &self.correct_label
    }

    #[must_use]
    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, label: &OptionLabel) -> bool {
        self.options.contains_key(label)
    }

    #[must_use]
    pub fn is_correct(&self, label: &OptionLabel) -> bool {
        &self.correct_label == label
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn options(labels: &[&str]) -> IndexMap<OptionLabel, String> {
        labels
            .iter()
            .map(|label| (OptionLabel::new(*label), format!("text {label}")))
            .collect()
    }

    #[test]
    fn rejects_correct_label_outside_options() {
        let err = Question::new(1, "Who?", options(&["A", "B"]), OptionLabel::new("C"), None)
            .unwrap_err();
        assert_eq!(
            err,
            QuestionError::UnknownCorrectLabel {
                label: OptionLabel::new("C")
            }
        );
    }

    #[test]
    fn rejects_blank_prompt_and_missing_options() {
        assert_eq!(
            Question::new(1, "  ", options(&["A"]), OptionLabel::new("A"), None).unwrap_err(),
            QuestionError::EmptyPrompt
        );
        assert_eq!(
            Question::new(1, "Q", IndexMap::new(), OptionLabel::new("A"), None).unwrap_err(),
            QuestionError::NoOptions
        );
    }

    #[test]
    fn blank_instruction_normalizes_to_none() {
        let q = Question::new(
            1,
            "Q",
            options(&["A"]),
            OptionLabel::new("A"),
            Some("   ".into()),
        )
        .unwrap();
        assert_eq!(q.instruction(), None);
    }

    #[test]
    fn renumbering_returns_a_copy() {
        let original = fixtures::question(7);
        let renumbered = original.with_identifier(1);
        assert_eq!(original.identifier(), 7);
        assert_eq!(renumbered.identifier(), 1);
        assert_eq!(renumbered.prompt(), original.prompt());
    }

    #[test]
    fn options_keep_insertion_order_through_json() {
        let q = Question::new(
            1,
            "Q",
            options(&["E", "A", "C"]),
            OptionLabel::new("A"),
            Some("Choose the best answer.".into()),
        )
        .unwrap();
        let json = serde_json::to_string(&q).unwrap();
        let back: Question = serde_json::from_str(&json).unwrap();
        let labels: Vec<_> = back.options().keys().map(OptionLabel::as_str).collect();
        assert_eq!(labels, ["E", "A", "C"]);
        assert_eq!(back, q);
    }
}
