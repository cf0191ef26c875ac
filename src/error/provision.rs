//! Provisioning errors

use super::BootError;
use crate::provision::StepFailure;

/// Creates a step failed error from the structured cause captured by the step
pub fn step_failed(step: impl Into<String>, failure: &StepFailure) -> BootError {
    BootError::StepFailed {
        step: step.into(),
        message: failure.to_string(),
        exit_code: failure.exit_code,
        stderr: failure.stderr.clone(),
    }
}
