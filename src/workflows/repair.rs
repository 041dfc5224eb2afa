use std::sync::Arc;

use tracing::{info, instrument};

use crate::llm::ReasoningService;
use crate::progress::{Progress, Silent};
use crate::runner::{CommandOutcome, CommandRunner};
use crate::workflows::conversation::{ConversationEngine, EngineError};

#[derive(Debug, Clone, PartialEq)]
pub enum RepairState {
    Running,
    Repairing(CommandOutcome),
    Succeeded(CommandOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairSummary {
    /// Repair attempts made before the command passed.
    pub iterations: usize,
    /// The passing run.
    pub outcome: CommandOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("command still failing after {attempts} repair attempts")]
    IterationLimit { attempts: usize },
}

impl RepairError {
    /// The transcript attached to a protocol violation, if this is one.
    pub fn transcript_dump(&self) -> Option<&str> {
        match self {
            RepairError::Engine(EngineError::ProtocolViolation { transcript, .. }) => {
                Some(transcript)
            }
            _ => None,
        }
    }
}

/// Outer loop: run the command, and while it fails hand the failure to the
/// conversation engine.
pub struct RepairOrchestrator<S> {
    runner: CommandRunner,
    engine: ConversationEngine<S>,
    progress: Arc<dyn Progress>,
    max_iterations: Option<usize>,
}

impl<S: ReasoningService> RepairOrchestrator<S> {
    pub fn new(runner: CommandRunner, engine: ConversationEngine<S>) -> Self {
        Self {
            runner,
            engine,
            progress: Arc::new(Silent),
            max_iterations: None,
        }
    }

    /// Report progress to `progress`, for this loop and its engine.
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.engine = self.engine.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn engine(&self) -> &ConversationEngine<S> {
        &self.engine
    }

    #[instrument(skip(self), fields(max_iterations = ?self.max_iterations))]
    pub async fn run(&mut self, command: &str) -> Result<RepairSummary, RepairError> {
        let mut iterations = 0;
        let mut state = RepairState::Running;
        loop {
            state = match state {
                RepairState::Running => {
                    self.progress.command_started(iterations, command);
                    let outcome = self.runner.run(command).await;
                    if outcome.success() {
                        RepairState::Succeeded(outcome)
                    } else {
                        self.progress.command_failed(iterations, &outcome);
                        RepairState::Repairing(outcome)
                    }
                }
                RepairState::Repairing(outcome) => {
                    if let Some(max) = self.max_iterations {
                        if iterations >= max {
                            return Err(RepairError::IterationLimit { attempts: iterations });
                        }
                    }
                    iterations += 1;
                    info!(iteration = iterations, exit_code = outcome.exit_code, "starting repair attempt");
                    self.engine.repair(command, &outcome, iterations).await?;
                    RepairState::Running
                }
                RepairState::Succeeded(outcome) => {
                    info!(iterations, "command passed");
                    self.progress.command_passed(iterations, command, &outcome);
                    return Ok(RepairSummary { iterations, outcome });
                }
            };
        }
    }
}
