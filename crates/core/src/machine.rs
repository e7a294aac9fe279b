//! Quiz lifecycle as a pure state machine.
//!
//! Every user action and timer tick is a [`Command`]. Applying it mutates the
//! owned [`Session`] and returns the side effects (timer control, snapshot
//! writes, rendering) for the caller to carry out in order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    OptionLabel, Phase, Question, QuestionView, QuizResult, QuizSettings, ReviewItem, Session,
    Snapshot, SnapshotError, SubjectId,
};

//
// ─── COMMANDS & EFFECTS ────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin a fresh test from questions already drawn for `subject`.
    Start {
        subject: SubjectId,
        questions: Vec<Question>,
    },
    /// Continue an attempt from a persisted snapshot.
    Resume(Snapshot),
    SelectAnswer(OptionLabel),
    Previous,
    Next,
    Tick,
    Submit,
    Review,
    BackToResults,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTimer,
    StopTimer,
    SaveSnapshot(Snapshot),
    DeleteSnapshot(SubjectId),
    RenderQuestion(QuestionView),
    RenderCountdown(u32),
    RenderResult(QuizResult),
    RenderReview(Vec<ReviewItem>),
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// User-facing classification of recoverable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoQuestionsAvailable,
    InvalidOption,
    CorruptSnapshot,
    StoreUnavailable,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available for subject {subject}")]
    NoQuestionsAvailable { subject: SubjectId },

    #[error("option {label} does not belong to the current question")]
    InvalidOption { label: OptionLabel },

    #[error("operation requires phase {expected}, but quiz is {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error(transparent)]
    InvalidSnapshot(#[from] SnapshotError),
}

impl QuizError {
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QuizError::NoQuestionsAvailable { .. } => Some(ErrorKind::NoQuestionsAvailable),
            QuizError::InvalidOption { .. } => Some(ErrorKind::InvalidOption),
            QuizError::InvalidSnapshot(_) => Some(ErrorKind::CorruptSnapshot),
            QuizError::InvalidPhase { .. } => None,
        }
    }
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// Owner of the single live session.
///
/// `Phase::Selecting` is represented by the absence of a session.
#[derive(Debug, Clone)]
pub struct QuizMachine {
    settings: QuizSettings,
    session: Option<Session>,
}

impl QuizMachine {
    #[must_use]
    pub fn new(settings: QuizSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Selecting, Session::phase)
    }

    /// Score of the concluded attempt, available while submitted or reviewing.
    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        self.session
            .as_ref()
            .filter(|s| matches!(s.phase(), Phase::Submitted | Phase::Reviewing))
            .map(Session::score)
    }

    /// Apply one command and return the effects to execute, in order.
    ///
    /// `now` stamps any snapshot produced by the transition.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the command is not valid in the current phase
    /// or carries invalid input. The state is unchanged on error.
    pub fn apply(
        &mut self,
        command: Command,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, QuizError> {
        match command {
            Command::Start { subject, questions } => self.start(subject, questions, now),
            Command::Resume(snapshot) => self.resume(snapshot),
            Command::SelectAnswer(label) => self.select_answer(label, now),
            Command::Previous => self.step(false, now),
            Command::Next => self.step(true, now),
            Command::Tick => Ok(self.tick(now)),
            Command::Submit => self.submit(),
            Command::Review => self.review(),
            Command::BackToResults => self.back_to_results(),
            Command::Reset => Ok(self.reset()),
        }
    }

    fn ensure_can_start(&self) -> Result<(), QuizError> {
        match self.phase() {
            Phase::Running => Err(QuizError::InvalidPhase {
                expected: Phase::Selecting,
                actual: Phase::Running,
            }),
            _ => Ok(()),
        }
    }

    fn running_mut(&mut self) -> Result<&mut Session, QuizError> {
        let actual = self.phase();
        match self.session.as_mut() {
            Some(session) if actual == Phase::Running => Ok(session),
            _ => Err(QuizError::InvalidPhase {
                expected: Phase::Running,
                actual,
            }),
        }
    }

    fn start(
        &mut self,
        subject: SubjectId,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, QuizError> {
        self.ensure_can_start()?;
        if questions.is_empty() {
            return Err(QuizError::NoQuestionsAvailable { subject });
        }

        let questions: Vec<Question> = questions
            .iter()
            .take(self.settings.questions_per_test())
            .enumerate()
            .map(|(index, question)| {
                question.with_identifier(u32::try_from(index + 1).unwrap_or(u32::MAX))
            })
            .collect();

        let session = Session::running(
            subject,
            questions,
            0,
            BTreeMap::new(),
            self.settings.time_limit_secs(),
        );
        let mut effects = vec![
            Effect::StartTimer,
            Effect::SaveSnapshot(Snapshot::capture(&session, now)),
        ];
        effects.extend(render_question(&session));
        effects.push(Effect::RenderCountdown(session.time_remaining_secs()));
        self.session = Some(session);
        Ok(effects)
    }

    fn resume(&mut self, snapshot: Snapshot) -> Result<Vec<Effect>, QuizError> {
        self.ensure_can_start()?;
        let session = snapshot.restore()?;
        let mut effects = vec![Effect::StartTimer];
        effects.extend(render_question(&session));
        effects.push(Effect::RenderCountdown(session.time_remaining_secs()));
        self.session = Some(session);
        Ok(effects)
    }

    fn select_answer(
        &mut self,
        label: OptionLabel,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, QuizError> {
        let session = self.running_mut()?;
        let valid = session
            .current_question()
            .is_some_and(|question| question.has_option(&label));
        if !valid {
            return Err(QuizError::InvalidOption { label });
        }

        session.record_answer(label);
        Ok(saved_and_rendered(session, now))
    }

    fn step(&mut self, forward: bool, now: DateTime<Utc>) -> Result<Vec<Effect>, QuizError> {
        let session = self.running_mut()?;
        if !session.step(forward) {
            return Ok(Vec::new());
        }
        Ok(saved_and_rendered(session, now))
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let time_limit = self.settings.time_limit_secs();
        let every = self.settings.snapshot_every_secs();
        let Ok(session) = self.running_mut() else {
            return Vec::new();
        };

        let remaining = session.tick();
        let mut effects = vec![Effect::RenderCountdown(remaining)];
        if remaining == 0 {
            effects.extend(self.conclude());
            return effects;
        }

        let elapsed = time_limit.saturating_sub(remaining);
        if elapsed % every == 0 {
            effects.push(Effect::SaveSnapshot(Snapshot::capture(session, now)));
        }
        effects
    }

    fn submit(&mut self) -> Result<Vec<Effect>, QuizError> {
        self.running_mut()?;
        Ok(self.conclude())
    }

    /// Move a running session to `Submitted`. Timer stop precedes the snapshot delete.
    fn conclude(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.set_phase(Phase::Submitted);
        vec![
            Effect::StopTimer,
            Effect::DeleteSnapshot(session.subject().clone()),
            Effect::RenderResult(session.score()),
        ]
    }

    fn review(&mut self) -> Result<Vec<Effect>, QuizError> {
        let session = self.expect_phase(Phase::Submitted)?;
        session.set_phase(Phase::Reviewing);
        Ok(vec![Effect::RenderReview(session.review_items())])
    }

    fn back_to_results(&mut self) -> Result<Vec<Effect>, QuizError> {
        let session = self.expect_phase(Phase::Reviewing)?;
        session.set_phase(Phase::Submitted);
        Ok(vec![Effect::RenderResult(session.score())])
    }

    fn expect_phase(&mut self, expected: Phase) -> Result<&mut Session, QuizError> {
        let actual = self.phase();
        match self.session.as_mut() {
            Some(session) if actual == expected => Ok(session),
            _ => Err(QuizError::InvalidPhase { expected, actual }),
        }
    }

    fn reset(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::StopTimer];
        if let Some(session) = self.session.take() {
            effects.push(Effect::DeleteSnapshot(session.subject().clone()));
        }
        effects
    }
}

fn render_question(session: &Session) -> Option<Effect> {
    session.question_view().map(Effect::RenderQuestion)
}

fn saved_and_rendered(session: &Session, now: DateTime<Utc>) -> Vec<Effect> {
    let mut effects = vec![Effect::SaveSnapshot(Snapshot::capture(session, now))];
    effects.extend(render_question(session));
    effects
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::fixtures;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn subject() -> SubjectId {
        SubjectId::new("Mythology")
    }

    fn started(pool: u32) -> QuizMachine {
        let mut machine = QuizMachine::new(QuizSettings::default());
        machine
            .apply(
                Command::Start {
                    subject: subject(),
                    questions: fixtures::pool(pool),
                },
                fixed_now(),
            )
            .unwrap();
        machine
    }

    fn session(machine: &QuizMachine) -> &Session {
        machine.session().unwrap()
    }

    fn saves(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::SaveSnapshot(_)))
            .count()
    }

    #[test]
    fn start_takes_fifty_and_renumbers_in_order() {
        let machine = started(500);
        let s = session(&machine);
        assert_eq!(s.questions().len(), 50);
        let ids: Vec<u32> = s.questions().iter().map(Question::identifier).collect();
        assert_eq!(ids, (1..=50).collect::<Vec<_>>());
        assert_eq!(s.cursor(), 0);
        assert!(s.answers().is_empty());
        assert_eq!(s.time_remaining_secs(), 3000);
        assert_eq!(machine.phase(), Phase::Running);
    }

    #[test]
    fn start_with_small_pool_uses_every_question() {
        let machine = started(7);
        assert_eq!(session(&machine).questions().len(), 7);
    }

    #[test]
    fn start_effects_start_timer_and_save() {
        let mut machine = QuizMachine::new(QuizSettings::default());
        let effects = machine
            .apply(
                Command::Start {
                    subject: subject(),
                    questions: fixtures::pool(60),
                },
                fixed_now(),
            )
            .unwrap();
        assert_eq!(effects[0], Effect::StartTimer);
        assert_eq!(saves(&effects), 1);
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, Effect::RenderQuestion(view) if view.progress.position == 1))
        );
    }

    #[test]
    fn start_without_questions_fails_without_state_change() {
        let mut machine = QuizMachine::new(QuizSettings::default());
        let err = machine
            .apply(
                Command::Start {
                    subject: subject(),
                    questions: Vec::new(),
                },
                fixed_now(),
            )
            .unwrap_err();
        assert_eq!(err, QuizError::NoQuestionsAvailable { subject: subject() });
        assert_eq!(err.kind(), Some(ErrorKind::NoQuestionsAvailable));
        assert_eq!(machine.phase(), Phase::Selecting);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut machine = started(60);
        let err = machine
            .apply(
                Command::Start {
                    subject: subject(),
                    questions: fixtures::pool(60),
                },
                fixed_now(),
            )
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidPhase { .. }));
    }

    #[test]
    fn select_answer_is_idempotent() {
        let mut machine = started(60);
        let label = OptionLabel::new("C");
        let first = machine
            .apply(Command::SelectAnswer(label.clone()), fixed_now())
            .unwrap();
        let after_first = session(&machine).answers().clone();
        let second = machine
            .apply(Command::SelectAnswer(label.clone()), fixed_now())
            .unwrap();

        assert_eq!(session(&machine).answers(), &after_first);
        assert_eq!(after_first.get(&0), Some(&label));
        assert_eq!(saves(&first), 1);
        assert_eq!(saves(&second), 1);
    }

    #[test]
    fn unknown_option_is_rejected_and_ignored() {
        let mut machine = started(60);
        let err = machine
            .apply(Command::SelectAnswer(OptionLabel::new("Q")), fixed_now())
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidOption));
        assert!(session(&machine).answers().is_empty());
    }

    #[test]
    fn navigation_is_clamped_and_silent_at_bounds() {
        let mut machine = started(60);
        let effects = machine.apply(Command::Previous, fixed_now()).unwrap();
        assert!(effects.is_empty());
        assert_eq!(session(&machine).cursor(), 0);

        for _ in 0..49 {
            let effects = machine.apply(Command::Next, fixed_now()).unwrap();
            assert_eq!(saves(&effects), 1);
        }
        assert_eq!(session(&machine).cursor(), 49);
        let effects = machine.apply(Command::Next, fixed_now()).unwrap();
        assert!(effects.is_empty());
        assert_eq!(session(&machine).cursor(), 49);
    }

    #[test]
    fn answers_follow_the_cursor() {
        let mut machine = started(60);
        machine.apply(Command::Next, fixed_now()).unwrap();
        machine.apply(Command::Next, fixed_now()).unwrap();
        machine
            .apply(Command::SelectAnswer(OptionLabel::new("A")), fixed_now())
            .unwrap();
        let answers = session(&machine).answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(&2), Some(&OptionLabel::new("A")));
    }

    #[test]
    fn tick_saves_every_thirty_seconds() {
        let mut machine = started(60);
        let mut saved_at = Vec::new();
        for second in 1..=90 {
            let effects = machine.apply(Command::Tick, fixed_now()).unwrap();
            if saves(&effects) > 0 {
                saved_at.push(second);
            }
        }
        assert_eq!(saved_at, vec![30, 60, 90]);
        assert_eq!(session(&machine).time_remaining_secs(), 2910);
    }

    #[test]
    fn tick_to_zero_submits_exactly_once() {
        let settings = QuizSettings::new(50, 3, Duration::hours(24), 1).unwrap();
        let mut machine = QuizMachine::new(settings);
        machine
            .apply(
                Command::Start {
                    subject: subject(),
                    questions: fixtures::pool(60),
                },
                fixed_now(),
            )
            .unwrap();

        machine.apply(Command::Tick, fixed_now()).unwrap();
        machine.apply(Command::Tick, fixed_now()).unwrap();
        let last = machine.apply(Command::Tick, fixed_now()).unwrap();

        let results = last
            .iter()
            .filter(|e| matches!(e, Effect::RenderResult(_)))
            .count();
        assert_eq!(results, 1);
        assert!(last.contains(&Effect::StopTimer));
        assert!(last.contains(&Effect::DeleteSnapshot(subject())));
        assert_eq!(saves(&last), 0);
        assert_eq!(machine.phase(), Phase::Submitted);

        let after = machine.apply(Command::Tick, fixed_now()).unwrap();
        assert!(after.is_empty());
        assert_eq!(session(&machine).time_remaining_secs(), 0);
    }

    #[test]
    fn full_default_countdown_submits_at_zero() {
        let mut machine = started(60);
        for _ in 0..2999 {
            machine.apply(Command::Tick, fixed_now()).unwrap();
        }
        assert_eq!(machine.phase(), Phase::Running);
        machine.apply(Command::Tick, fixed_now()).unwrap();
        assert_eq!(machine.phase(), Phase::Submitted);
    }

    #[test]
    fn submit_with_nothing_answered_scores_zero() {
        let mut machine = started(60);
        let effects = machine.apply(Command::Submit, fixed_now()).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::StopTimer,
                Effect::DeleteSnapshot(subject()),
                Effect::RenderResult(QuizResult::new(0, 50)),
            ]
        );
        let result = machine.result().unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.percentage, 0);
    }

    #[test]
    fn submit_with_everything_correct_scores_full_marks() {
        let mut machine = started(60);
        for index in 0..50 {
            let correct = session(&machine).questions()[index].correct_label().clone();
            machine
                .apply(Command::SelectAnswer(correct), fixed_now())
                .unwrap();
            machine.apply(Command::Next, fixed_now()).unwrap();
        }
        machine.apply(Command::Submit, fixed_now()).unwrap();
        let result = machine.result().unwrap();
        assert_eq!(result.score, 50);
        assert_eq!(result.percentage, 100);
    }

    #[test]
    fn operations_after_submit_are_rejected() {
        let mut machine = started(60);
        machine.apply(Command::Submit, fixed_now()).unwrap();
        assert!(machine.apply(Command::Submit, fixed_now()).is_err());
        assert!(machine.apply(Command::Next, fixed_now()).is_err());
        assert!(
            machine
                .apply(Command::SelectAnswer(OptionLabel::new("A")), fixed_now())
                .is_err()
        );
    }

    #[test]
    fn review_toggles_without_rescoring() {
        let mut machine = started(60);
        machine.apply(Command::Submit, fixed_now()).unwrap();

        let effects = machine.apply(Command::Review, fixed_now()).unwrap();
        assert_eq!(machine.phase(), Phase::Reviewing);
        assert!(matches!(&effects[..], [Effect::RenderReview(items)] if items.len() == 50));
        assert!(machine.result().is_some());

        let effects = machine.apply(Command::BackToResults, fixed_now()).unwrap();
        assert_eq!(machine.phase(), Phase::Submitted);
        assert_eq!(effects, vec![Effect::RenderResult(QuizResult::new(0, 50))]);
    }

    #[test]
    fn review_requires_submission() {
        let mut machine = started(60);
        let err = machine.apply(Command::Review, fixed_now()).unwrap_err();
        assert_eq!(
            err,
            QuizError::InvalidPhase {
                expected: Phase::Submitted,
                actual: Phase::Running
            }
        );
    }

    #[test]
    fn reset_clears_session_from_any_phase() {
        let mut machine = started(60);
        let effects = machine.apply(Command::Reset, fixed_now()).unwrap();
        assert_eq!(
            effects,
            vec![Effect::StopTimer, Effect::DeleteSnapshot(subject())]
        );
        assert_eq!(machine.phase(), Phase::Selecting);
        assert!(machine.session().is_none());

        let effects = machine.apply(Command::Reset, fixed_now()).unwrap();
        assert_eq!(effects, vec![Effect::StopTimer]);
    }

    #[test]
    fn new_test_may_start_from_results() {
        let mut machine = started(60);
        machine.apply(Command::Submit, fixed_now()).unwrap();
        machine
            .apply(
                Command::Start {
                    subject: SubjectId::new("Vocabulary_I"),
                    questions: fixtures::pool(60),
                },
                fixed_now(),
            )
            .unwrap();
        assert_eq!(machine.phase(), Phase::Running);
        assert!(machine.result().is_none());
    }

    #[test]
    fn resume_restores_snapshot_verbatim() {
        let mut machine = started(60);
        machine.apply(Command::Next, fixed_now()).unwrap();
        machine
            .apply(Command::SelectAnswer(OptionLabel::new("D")), fixed_now())
            .unwrap();
        for _ in 0..5 {
            machine.apply(Command::Tick, fixed_now()).unwrap();
        }
        let snapshot = Snapshot::capture(session(&machine), fixed_now());
        let before = session(&machine).clone();

        let mut fresh = QuizMachine::new(QuizSettings::default());
        let effects = fresh.apply(Command::Resume(snapshot), fixed_now()).unwrap();
        assert_eq!(effects[0], Effect::StartTimer);
        assert_eq!(saves(&effects), 0);
        assert_eq!(session(&fresh), &before);
        assert_eq!(session(&fresh).time_remaining_secs(), 2995);
    }

    #[test]
    fn resume_rejects_invalid_snapshot() {
        let machine = started(60);
        let mut snapshot = Snapshot::capture(session(&machine), fixed_now());
        snapshot.cursor = 99;

        let mut fresh = QuizMachine::new(QuizSettings::default());
        let err = fresh
            .apply(Command::Resume(snapshot), fixed_now())
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CorruptSnapshot));
        assert_eq!(fresh.phase(), Phase::Selecting);
    }
}
