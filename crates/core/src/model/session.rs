use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{OptionLabel, Question, SubjectId};

/// Lifecycle stage of the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Selecting,
    Running,
    Submitted,
    Reviewing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Selecting => "selecting",
            Phase::Running => "running",
            Phase::Submitted => "submitted",
            Phase::Reviewing => "reviewing",
        };
        f.write_str(name)
    }
}

/// Aggregated view of test progress, useful for the question header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
}

/// Score of a submitted test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    /// `score / total` as a whole percentage, rounded half up.
    pub percentage: u32,
}

impl QuizResult {
    #[must_use]
    pub fn new(score: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            let rounded = (score * 100 + total / 2) / total;
            u32::try_from(rounded).unwrap_or(u32::MAX)
        };
        Self {
            score,
            total,
            percentage,
        }
    }
}

/// One row of the post-submission review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub question: Question,
    pub user_label: Option<OptionLabel>,
    pub correct_label: OptionLabel,
    pub is_correct: bool,
}

/// What the display needs to draw the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub question: Question,
    pub selected: Option<OptionLabel>,
    pub progress: QuizProgress,
}

/// One attempt at a generated test.
///
/// The question list is frozen at generation time; `answers` only holds
/// entries for questions the user has touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    subject: SubjectId,
    questions: Vec<Question>,
    cursor: usize,
    answers: BTreeMap<usize, OptionLabel>,
    time_remaining_secs: u32,
    phase: Phase,
}

impl Session {
    /// Assemble a running session. Callers are responsible for the invariants
    /// (non-empty questions, cursor in range, answers referencing valid labels).
    pub(crate) fn running(
        subject: SubjectId,
        questions: Vec<Question>,
        cursor: usize,
        answers: BTreeMap<usize, OptionLabel>,
        time_remaining_secs: u32,
    ) -> Self {
        Self {
            subject,
            questions,
            cursor,
            answers,
            time_remaining_secs,
            phase: Phase::Running,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, OptionLabel> {
        &self.answers
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    #[must_use]
    pub fn selected_label(&self, index: usize) -> Option<&OptionLabel> {
        self.answers.get(&index)
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.questions.len();
        let answered = self.answers.len();
        QuizProgress {
            position: self.cursor + 1,
            total,
            answered,
            unanswered: total.saturating_sub(answered),
        }
    }

    /// Count answers matching the correct label. Unanswered questions never count.
    #[must_use]
    pub fn score(&self) -> QuizResult {
        let score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                self.answers
                    .get(index)
                    .is_some_and(|label| question.is_correct(label))
            })
            .count();
        QuizResult::new(score, self.questions.len())
    }

    #[must_use]
    pub fn review_items(&self) -> Vec<ReviewItem> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let user_label = self.answers.get(&index).cloned();
                let is_correct = user_label
                    .as_ref()
                    .is_some_and(|label| question.is_correct(label));
                ReviewItem {
                    question: question.clone(),
                    user_label,
                    correct_label: question.correct_label().clone(),
                    is_correct,
                }
            })
            .collect()
    }

    /// Snapshot of the current question for rendering, if any.
    #[must_use]
    pub fn question_view(&self) -> Option<QuestionView> {
        let question = self.current_question()?.clone();
        Some(QuestionView {
            question,
            selected: self.selected_label(self.cursor).cloned(),
            progress: self.progress(),
        })
    }

    pub(crate) fn record_answer(&mut self, label: OptionLabel) {
        self.answers.insert(self.cursor, label);
    }

    /// Move the cursor by one. Returns false when already at the bound.
    pub(crate) fn step(&mut self, forward: bool) -> bool {
        let last = self.questions.len().saturating_sub(1);
        let next = if forward {
            (self.cursor + 1).min(last)
        } else {
            self.cursor.saturating_sub(1)
        };
        let moved = next != self.cursor;
        self.cursor = next;
        moved
    }

    /// Decrement the countdown by one second (floor 0) and return the new value.
    pub(crate) fn tick(&mut self) -> u32 {
        self.time_remaining_secs = self.time_remaining_secs.saturating_sub(1);
        self.time_remaining_secs
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}
