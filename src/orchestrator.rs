//! Provisioning orchestrator
//!
//! Runs the provisioning steps in order as an explicit state machine:
//!
//! ```text
//! NotStarted -> Running(0) -> Running(1) -> ... -> Completed
//!                    \              \
//!                     +--------------+--> Failed { step_index, cause }
//! ```
//!
//! Each step's independent satisfaction check decides whether it runs; the
//! step log only records what happened. Every transition is persisted before
//! the next one starts, and the first failure halts the sequence. A
//! [`Completed`] token is the only way to reach the gateway launcher.

use tracing::{info, warn};

use crate::config::Configuration;
use crate::error::{self, BootError, Result};
use crate::progress::StepProgress;
use crate::provision::{
    CommandRunner, ProvisioningStep, StepContext, StepFailure, SystemRunner, standard_steps,
};
use crate::step_log::{Outcome, StepLog, StepRecord};

/// Message recorded for steps whose check passed
pub const ALREADY_SATISFIED: &str = "already satisfied";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorState {
    NotStarted,
    /// Index of the step being checked or executed
    Running(usize),
    Completed,
    Failed {
        step_index: usize,
        cause: StepFailure,
    },
}

/// How a step reached its successful state in this attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
    pub name: String,
    /// False when the satisfaction check passed and nothing ran
    pub executed: bool,
    pub message: String,
}

/// Proof that every provisioning step succeeded in one attempt
///
/// Only [`Orchestrator::run`] constructs this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    attempt: u32,
    steps: Vec<StepSummary>,
}

impl Completed {
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn steps(&self) -> &[StepSummary] {
        &self.steps
    }

    /// Number of steps that actually executed in this attempt
    pub fn executed(&self) -> usize {
        self.steps.iter().filter(|s| s.executed).count()
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            attempt: 1,
            steps: Vec::new(),
        }
    }
}

pub struct Orchestrator {
    log: StepLog,
    steps: Vec<Box<dyn ProvisioningStep>>,
    runner: Box<dyn CommandRunner>,
    state: OrchestratorState,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(
        log: StepLog,
        steps: Vec<Box<dyn ProvisioningStep>>,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            log,
            steps,
            runner,
            state: OrchestratorState::NotStarted,
            show_progress: false,
        }
    }

    /// The fixed step sequence against real processes
    pub fn standard(log: StepLog) -> Self {
        Self::new(log, standard_steps(), Box::new(SystemRunner))
    }

    /// Draw a progress bar on stderr while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn log(&self) -> &StepLog {
        &self.log
    }

    /// Give back the step log, releasing it when dropped
    pub fn into_log(self) -> StepLog {
        self.log
    }

    /// Run every step in order, halting at the first failure
    pub fn run(&mut self, config: &Configuration) -> Result<Completed> {
        if self.state != OrchestratorState::NotStarted {
            return Err(error::io_error("orchestrator already ran"));
        }

        let Self {
            log,
            steps,
            runner,
            state,
            show_progress,
        } = self;

        let attempt = log.start_attempt();
        let progress = if *show_progress {
            StepProgress::new(steps.len())
        } else {
            StepProgress::hidden(steps.len())
        };
        info!(
            attempt,
            generation = log.generation(),
            steps = steps.len(),
            "Starting provisioning"
        );

        let mut summaries = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let name = step.name();
            *state = OrchestratorState::Running(index);
            progress.start_step(name, index);

            let satisfied = {
                let ctx = StepContext {
                    config,
                    runner: runner.as_ref(),
                    history: &*log,
                };
                step.is_already_satisfied(&ctx)
            };

            if satisfied {
                info!(step = name, "Already satisfied, skipping");
                persist(
                    log.record(name, Outcome::Succeeded, ALREADY_SATISFIED),
                    state,
                    index,
                    &progress,
                )?;
                summaries.push(StepSummary {
                    name: name.to_string(),
                    executed: false,
                    message: ALREADY_SATISFIED.to_string(),
                });
                progress.finish_step();
                continue;
            }

            if log.has_succeeded(name) {
                warn!(
                    step = name,
                    "Step log records success but the system check disagrees; executing again"
                );
            }

            persist(
                log.record(name, Outcome::Pending, "started"),
                state,
                index,
                &progress,
            )?;
            info!(step = name, "Executing");

            let result = {
                let ctx = StepContext {
                    config,
                    runner: runner.as_ref(),
                    history: &*log,
                };
                step.execute(&ctx)
            };

            match result {
                Ok(report) => {
                    info!(step = name, version = ?report.version, "{}", report.message);
                    let record =
                        StepRecord::new(name, Outcome::Succeeded, report.message.clone(), attempt)
                            .with_version(report.version);
                    persist(log.append(record), state, index, &progress)?;
                    summaries.push(StepSummary {
                        name: name.to_string(),
                        executed: true,
                        message: report.message,
                    });
                    progress.finish_step();
                }
                Err(cause) => {
                    warn!(
                        step = name,
                        exit_code = ?cause.exit_code,
                        stderr = %cause.stderr,
                        "{}",
                        cause.message
                    );
                    progress.abandon();
                    let recorded = log.record(name, Outcome::Failed, cause.to_string());
                    let err = error::provision::step_failed(name, &cause);
                    *state = OrchestratorState::Failed {
                        step_index: index,
                        cause,
                    };
                    recorded?;
                    return Err(err);
                }
            }
        }

        progress.finish();
        *state = OrchestratorState::Completed;
        info!(attempt, "Provisioning complete");

        Ok(Completed {
            attempt,
            steps: summaries,
        })
    }
}

/// Turn a step log write failure into a terminal state
fn persist(
    written: Result<()>,
    state: &mut OrchestratorState,
    index: usize,
    progress: &StepProgress,
) -> Result<()> {
    written.map_err(|err: BootError| {
        progress.abandon();
        *state = OrchestratorState::Failed {
            step_index: index,
            cause: StepFailure::new(err.to_string()),
        };
        err
    })
}
