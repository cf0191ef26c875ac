//! Provisioning steps
//!
//! Each step pairs an independent satisfaction check, which inspects the real
//! state of the container (installed binaries, prefix files, pip metadata),
//! with an execution procedure that shells out to installers. Steps run in
//! the fixed order returned by [`standard_steps`]:
//!
//! 1. [`CompatLayerStep`]: Wine pinned to a known-good version, 64-bit prefix
//!    with 32-bit support
//! 2. [`HostedRuntimeStep`]: Windows Python installed inside the prefix
//! 3. [`DependenciesStep`]: the requirements manifest installed into that Python

pub mod dependencies;
pub mod manifest;
pub mod runner;
pub mod runtime;
pub mod wine;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::Path;

use crate::config::Configuration;
use crate::step_log::StepLog;

pub use dependencies::DependenciesStep;
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use runtime::HostedRuntimeStep;
pub use wine::CompatLayerStep;

/// Everything a step may look at while checking or executing
pub struct StepContext<'a> {
    pub config: &'a Configuration,
    pub runner: &'a dyn CommandRunner,
    /// Read-only view of earlier records, e.g. for version drift checks
    pub history: &'a StepLog,
}

/// What a successful execution reports back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub message: String,
    /// Version installed by the step, persisted in its step record
    pub version: Option<String>,
}

impl StepReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Structured cause of a failed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub message: String,
    /// Exit status of the external process, when one ran to completion
    pub exit_code: Option<i32>,
    /// Captured standard error of the external process
    pub stderr: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: None,
            stderr: String::new(),
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Failure for an external process that exited unsuccessfully
    pub fn from_output(message: impl Into<String>, output: &CommandOutput) -> Self {
        Self::new(message)
            .with_exit_code(output.status)
            .with_stderr(output.stderr.trim())
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = self.exit_code {
            write!(f, " (exit status {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StepFailure {}

/// One discrete, idempotent-checkable unit of environment setup
pub trait ProvisioningStep {
    /// Stable name used in step records
    fn name(&self) -> &'static str;

    /// Whether the system already is in the state this step produces
    ///
    /// Must inspect observable state, not the step log, and must not change
    /// anything. A check that cannot be performed answers `false`.
    fn is_already_satisfied(&self, ctx: &StepContext<'_>) -> bool;

    /// Bring the system into the state this step produces
    fn execute(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepFailure>;
}

/// The fixed provisioning sequence
pub fn standard_steps() -> Vec<Box<dyn ProvisioningStep>> {
    vec![
        Box::new(CompatLayerStep),
        Box::new(HostedRuntimeStep),
        Box::new(DependenciesStep),
    ]
}

/// Invocation of the Wine binary with the prefix environment
pub fn wine_invocation<I, S>(config: &Configuration, args: I) -> Invocation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Invocation::new(&config.wine.binary)
        .args(args)
        .envs(config.wine_env())
}

/// Translate a host path to the path Windows programs see through Wine's `Z:` drive
pub fn to_wine_path(path: &Path) -> String {
    let display = path.display().to_string();
    if path.is_absolute() {
        format!("Z:{}", display.replace('/', "\\"))
    } else {
        display.replace('/', "\\")
    }
}
