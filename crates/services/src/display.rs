use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use quiz_core::ErrorKind;
use quiz_core::model::{QuestionView, QuizResult, ReviewItem, SubjectId};

/// Presentation layer driven by the quiz controller.
///
/// Rendering calls are fire-and-forget; `confirm_resume` waits for the user's
/// yes/no answer.
#[async_trait]
pub trait QuizDisplay: Send + Sync {
    fn render_question(&self, view: &QuestionView);

    /// Remaining time changed. `clock` is the same value as `MM:SS`.
    /// Hosts without a visible countdown can ignore it.
    fn render_countdown(&self, _remaining_secs: u32, _clock: &str) {}

    fn render_result(&self, result: &QuizResult);

    fn render_review(&self, items: &[ReviewItem]);

    /// Ask whether to continue the saved attempt for `subject`.
    async fn confirm_resume(&self, subject: &SubjectId) -> bool;

    fn notify_error(&self, kind: ErrorKind);
}

/// Everything a [`RecordingDisplay`] has been asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Question(QuestionView),
    Countdown { remaining_secs: u32, clock: String },
    Result(QuizResult),
    Review(Vec<ReviewItem>),
    ResumePrompt(SubjectId),
    Error(ErrorKind),
}

/// Headless display that records calls, for tests and scripted hosts.
#[derive(Debug)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
    accept_resume: AtomicBool,
}

impl RecordingDisplay {
    /// `accept_resume` is the answer given to every resume prompt.
    #[must_use]
    pub fn new(accept_resume: bool) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            accept_resume: AtomicBool::new(accept_resume),
        }
    }

    pub fn set_accept_resume(&self, accept: bool) {
        self.accept_resume.store(accept, Ordering::SeqCst);
    }

    #[must_use]
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Drain the recorded events.
    pub fn take_events(&self) -> Vec<DisplayEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<ErrorKind> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Error(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn resume_prompts(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DisplayEvent::ResumePrompt(_)))
            .count()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<QuizResult> {
        self.events().into_iter().rev().find_map(|event| match event {
            DisplayEvent::Result(result) => Some(result),
            _ => None,
        })
    }

    fn push(&self, event: DisplayEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for RecordingDisplay {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl QuizDisplay for RecordingDisplay {
    fn render_question(&self, view: &QuestionView) {
        self.push(DisplayEvent::Question(view.clone()));
    }

    fn render_countdown(&self, remaining_secs: u32, clock: &str) {
        self.push(DisplayEvent::Countdown {
            remaining_secs,
            clock: clock.to_owned(),
        });
    }

    fn render_result(&self, result: &QuizResult) {
        self.push(DisplayEvent::Result(*result));
    }

    fn render_review(&self, items: &[ReviewItem]) {
        self.push(DisplayEvent::Review(items.to_vec()));
    }

    async fn confirm_resume(&self, subject: &SubjectId) -> bool {
        self.push(DisplayEvent::ResumePrompt(subject.clone()));
        self.accept_resume.load(Ordering::SeqCst)
    }

    fn notify_error(&self, kind: ErrorKind) {
        self.push(DisplayEvent::Error(kind));
    }
}
