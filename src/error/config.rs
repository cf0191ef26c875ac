//! Configuration errors

use super::BootError;

/// Creates an invalid configuration error listing every problem found
pub fn invalid(problems: Vec<String>) -> BootError {
    BootError::ConfigInvalid { problems }
}
