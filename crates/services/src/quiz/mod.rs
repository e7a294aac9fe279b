mod controller;
mod plan;
mod runtime;
mod timer;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use controller::QuizController;
pub use plan::TestBuilder;
pub use runtime::{QuizCommand, QuizRuntime};
pub use timer::{QuizTimer, TimerTick};
