#![forbid(unsafe_code)]

pub mod app_services;
pub mod display;
pub mod error;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::{QuizConfig, QuizServices};
pub use display::{DisplayEvent, QuizDisplay, RecordingDisplay};
pub use error::{QuizServiceError, QuizServicesError};
pub use quiz::{QuizCommand, QuizController, QuizRuntime, QuizTimer, TestBuilder, TimerTick};
