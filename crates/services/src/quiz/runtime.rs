use quiz_core::model::{OptionLabel, SubjectId};
use tokio::sync::mpsc;

use super::controller::QuizController;
use super::timer::TimerTick;
use crate::error::QuizServiceError;

/// User intents forwarded from the host to a running [`QuizRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizCommand {
    StartTest(SubjectId),
    SelectAnswer(OptionLabel),
    Previous,
    Next,
    Submit,
    Review,
    BackToResults,
    Reset,
}

enum Event {
    Command(QuizCommand),
    Tick(TimerTick),
    Closed,
}

/// Owns a controller on one task and serializes user commands with timer ticks,
/// so no two operations ever interleave.
pub struct QuizRuntime {
    controller: QuizController,
    commands: mpsc::Receiver<QuizCommand>,
}

impl QuizRuntime {
    const COMMAND_BUFFER: usize = 32;

    #[must_use]
    pub fn new(controller: QuizController) -> (Self, mpsc::Sender<QuizCommand>) {
        let (tx, commands) = mpsc::channel(Self::COMMAND_BUFFER);
        (Self { controller, commands }, tx)
    }

    /// Process commands and ticks until every command sender is dropped.
    /// Returns the controller so the host can inspect the final state.
    pub async fn run(mut self) -> QuizController {
        loop {
            let event = tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Closed,
                },
                Some(tick) = self.controller.next_tick() => Event::Tick(tick),
            };

            let outcome = match event {
                Event::Command(command) => {
                    tracing::debug!(?command, "quiz command");
                    self.dispatch(command).await
                }
                Event::Tick(tick) => self.controller.handle_tick(tick).await,
                Event::Closed => break,
            };
            if let Err(err) = outcome {
                tracing::warn!(error = %err, phase = %self.controller.phase(), "quiz command rejected");
            }
        }

        self.controller.stop_timer();
        tracing::debug!("quiz runtime stopped");
        self.controller
    }

    async fn dispatch(&mut self, command: QuizCommand) -> Result<(), QuizServiceError> {
        let controller = &mut self.controller;
        match command {
            QuizCommand::StartTest(subject) => controller.start_test(subject).await,
            QuizCommand::SelectAnswer(label) => controller.select_answer(label).await,
            QuizCommand::Previous => controller.go_to_previous().await,
            QuizCommand::Next => controller.go_to_next().await,
            QuizCommand::Submit => controller.submit().await,
            QuizCommand::Review => controller.review().await,
            QuizCommand::BackToResults => controller.back_to_results().await,
            QuizCommand::Reset => controller.reset().await,
        }
    }
}
