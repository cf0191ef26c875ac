//! Step log errors

use std::path::Path;

use super::BootError;

/// Creates a step log unavailable error
pub fn unavailable(path: &Path, reason: impl Into<String>) -> BootError {
    BootError::StepLogUnavailable {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}
