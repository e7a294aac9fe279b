use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{OptionLabel, Phase, QuizResult, QuizSettings, Session, Snapshot, SubjectId};
use quiz_core::time::format_countdown;
use quiz_core::{Command, Effect, ErrorKind, QuizError, QuizMachine};
use storage::{QuestionStore, SnapshotLookup, SnapshotRepository, Storage, StorageError};
use tokio::sync::mpsc;

use super::plan::TestBuilder;
use super::timer::{QuizTimer, TimerTick};
use crate::Clock;
use crate::display::QuizDisplay;
use crate::error::QuizServiceError;

/// Drives one quiz at a time: test generation, answering, navigation, the
/// countdown, submission, review, and save/resume.
///
/// Persistence failures never interrupt the live session; the controller
/// keeps running in memory and tells the display once per attempt.
pub struct QuizController {
    clock: Clock,
    machine: QuizMachine,
    questions: Arc<dyn QuestionStore>,
    snapshots: SnapshotRepository,
    display: Arc<dyn QuizDisplay>,
    builder: TestBuilder,
    timer: QuizTimer,
    ticks: mpsc::UnboundedReceiver<TimerTick>,
    store_degraded: bool,
}

impl QuizController {
    /// Build an idle controller.
    ///
    /// Operations that start the countdown (`start_test`) spawn a tokio task,
    /// so the controller must be driven from inside a tokio runtime.
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        storage: &Storage,
        display: Arc<dyn QuizDisplay>,
    ) -> Self {
        let (timer, ticks) = QuizTimer::new(Duration::from_secs(1));
        let builder = TestBuilder::new().with_size(settings.questions_per_test());
        Self {
            clock,
            machine: QuizMachine::new(settings),
            questions: Arc::clone(&storage.questions),
            snapshots: SnapshotRepository::new(Arc::clone(&storage.kv)),
            display,
            builder,
            timer,
            ticks,
            store_degraded: false,
        }
    }

    /// Replace the question drawer (e.g. with a seeded one).
    #[must_use]
    pub fn with_builder(mut self, builder: TestBuilder) -> Self {
        self.builder = builder.with_size(self.machine.settings().questions_per_test());
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.machine.session()
    }

    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        self.machine.result()
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        self.machine.settings()
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Start a test for `subject`, offering to resume a saved attempt first.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestionsAvailable` (after notifying the display)
    /// if the subject has no questions, or `QuizError::InvalidPhase` while a
    /// test is already running.
    pub async fn start_test(&mut self, subject: SubjectId) -> Result<(), QuizServiceError> {
        if self.phase() == Phase::Running {
            return Err(QuizError::InvalidPhase {
                expected: Phase::Selecting,
                actual: Phase::Running,
            }
            .into());
        }

        let pool = match self.questions.questions(&subject).await {
            Ok(pool) => pool,
            Err(err) => {
                tracing::warn!(subject = %subject, error = %err, "question store failed");
                Vec::new()
            }
        };
        if pool.is_empty() {
            self.display.notify_error(ErrorKind::NoQuestionsAvailable);
            return Err(QuizError::NoQuestionsAvailable { subject }.into());
        }

        self.store_degraded = false;
        if let Some(snapshot) = self.resumable_snapshot(&subject).await {
            if self.display.confirm_resume(&subject).await {
                match self.apply(Command::Resume(snapshot)).await {
                    Ok(()) => {
                        tracing::info!(subject = %subject, "resumed saved test");
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::warn!(subject = %subject, error = %err, "resume failed; starting fresh");
                    }
                }
            } else {
                self.delete_snapshot(&subject).await;
            }
        }

        let questions = self.builder.draw(&pool);
        tracing::info!(subject = %subject, drawn = questions.len(), pool = pool.len(), "starting test");
        self.apply(Command::Start { subject, questions }).await
    }

    /// Record `label` for the current question. Labels that are not options
    /// of the current question are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` if no test is running.
    pub async fn select_answer(&mut self, label: OptionLabel) -> Result<(), QuizServiceError> {
        match self.apply(Command::SelectAnswer(label)).await {
            Err(QuizServiceError::Quiz(QuizError::InvalidOption { label })) => {
                tracing::warn!(%label, "ignoring selection of unknown option");
                Ok(())
            }
            other => other,
        }
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` if no test is running.
    pub async fn go_to_previous(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Previous).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` if no test is running.
    pub async fn go_to_next(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Next).await
    }

    /// Advance the countdown by one second; submits when time runs out.
    /// No-op unless a test is running.
    ///
    /// # Errors
    ///
    /// Propagates unexpected state-machine errors.
    pub async fn tick(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Tick).await
    }

    /// Apply a tick from the timer channel, dropping ticks from stopped runs.
    ///
    /// # Errors
    ///
    /// Same as [`QuizController::tick`].
    pub async fn handle_tick(&mut self, tick: TimerTick) -> Result<(), QuizServiceError> {
        if !self.timer.accepts(tick) {
            tracing::debug!("dropping tick from a stopped timer");
            return Ok(());
        }
        self.tick().await
    }

    /// Wait for the next timer tick. Pending forever while the timer is stopped.
    pub async fn next_tick(&mut self) -> Option<TimerTick> {
        self.ticks.recv().await
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` if no test is running.
    pub async fn submit(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Submit).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless results are showing.
    pub async fn review(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Review).await
    }

    /// # Errors
    ///
    /// Returns `QuizError::InvalidPhase` unless the review is showing.
    pub async fn back_to_results(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::BackToResults).await
    }

    /// Abandon whatever is in progress and return to subject selection.
    ///
    /// # Errors
    ///
    /// Never fails in practice; kept fallible for symmetry with the other operations.
    pub async fn reset(&mut self) -> Result<(), QuizServiceError> {
        self.apply(Command::Reset).await
    }

    /// Stop the timer without touching the session (host shutdown).
    pub fn stop_timer(&mut self) {
        self.timer.stop();
    }

    async fn apply(&mut self, command: Command) -> Result<(), QuizServiceError> {
        let effects = self.machine.apply(command, self.clock.now())?;
        self.execute(effects).await;
        Ok(())
    }

    async fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer => self.timer.start(),
                Effect::StopTimer => self.timer.stop(),
                Effect::SaveSnapshot(snapshot) => self.save_snapshot(&snapshot).await,
                Effect::DeleteSnapshot(subject) => self.delete_snapshot(&subject).await,
                Effect::RenderQuestion(view) => self.display.render_question(&view),
                Effect::RenderCountdown(secs) => {
                    self.display.render_countdown(secs, &format_countdown(secs));
                }
                Effect::RenderResult(result) => self.display.render_result(&result),
                Effect::RenderReview(items) => self.display.render_review(&items),
            }
        }
    }

    async fn resumable_snapshot(&mut self, subject: &SubjectId) -> Option<Snapshot> {
        let ttl = self.machine.settings().snapshot_ttl();
        match self.snapshots.load(subject, self.clock.now(), ttl).await {
            Ok(SnapshotLookup::Found(snapshot)) => Some(snapshot),
            Ok(SnapshotLookup::Corrupt) => {
                tracing::info!(subject = %subject, "ignoring corrupt saved test");
                None
            }
            Ok(SnapshotLookup::Missing | SnapshotLookup::Expired) => None,
            Err(err) => {
                self.store_failed(&err);
                None
            }
        }
    }

    async fn save_snapshot(&mut self, snapshot: &Snapshot) {
        if let Err(err) = self.snapshots.save(snapshot).await {
            self.store_failed(&err);
        }
    }

    async fn delete_snapshot(&mut self, subject: &SubjectId) {
        if let Err(err) = self.snapshots.delete(subject).await {
            self.store_failed(&err);
        }
    }

    fn store_failed(&mut self, err: &StorageError) {
        tracing::warn!(error = %err, "snapshot storage failed; continuing in memory");
        if !self.store_degraded {
            self.store_degraded = true;
            self.display.notify_error(ErrorKind::StoreUnavailable);
        }
    }
}

impl fmt::Debug for QuizController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizController")
            .field("phase", &self.machine.phase())
            .field("timer_running", &self.timer.is_running())
            .field("store_degraded", &self.store_degraded)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
