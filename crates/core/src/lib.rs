#![forbid(unsafe_code)]

pub mod machine;
pub mod model;
pub mod time;

pub use machine::{Command, Effect, ErrorKind, QuizError, QuizMachine};
pub use time::Clock;
