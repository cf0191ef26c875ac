//! Error types and handling for mt5-bootstrap
//!
//! Uses `thiserror` for error definitions and `miette` for diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`config`]: Environment resolution errors
//! - [`step_log`]: Step log persistence errors
//! - [`provision`]: Provisioning step failures
//! - [`gateway`]: Gateway launch errors
//!
//! Every variant maps to a distinct process exit code so an operator can tell
//! the failure class from the container's exit status alone.

pub mod config;
pub mod gateway;
pub mod provision;
pub mod step_log;

use miette::Diagnostic;
use thiserror::Error;

/// Exit code for configuration errors (`EX_CONFIG`)
pub const EXIT_CONFIG: i32 = 78;

/// Exit code when the step log cannot be read, written or locked (`EX_IOERR`)
pub const EXIT_STEP_LOG: i32 = 74;

/// Exit code for a failed provisioning step (`EX_TEMPFAIL`, a restart may succeed)
pub const EXIT_PROVISIONING: i32 = 75;

/// Exit code when the gateway port cannot be bound (`EX_UNAVAILABLE`)
pub const EXIT_PORT_BIND: i32 = 69;

/// Exit code when the gateway process cannot be spawned (`EX_OSERR`)
pub const EXIT_GATEWAY_SPAWN: i32 = 71;

/// Exit code for any other failure
pub const EXIT_GENERIC: i32 = 1;

/// Main error type for mt5-bootstrap operations
#[derive(Error, Diagnostic, Debug)]
pub enum BootError {
    // Configuration errors
    #[error("Invalid configuration: {}", .problems.join("; "))]
    #[diagnostic(
        code(mt5_bootstrap::config::invalid),
        help("Set the listed environment variables and restart the container")
    )]
    ConfigInvalid { problems: Vec<String> },

    // Step log errors
    #[error("Step log unavailable at {path}: {reason}")]
    #[diagnostic(
        code(mt5_bootstrap::step_log::unavailable),
        help(
            "Check that the state volume is mounted and writable and that no other bootstrap process is running"
        )
    )]
    StepLogUnavailable { path: String, reason: String },

    // Provisioning errors
    #[error("Provisioning step '{step}' failed: {message}")]
    #[diagnostic(
        code(mt5_bootstrap::provision::step_failed),
        help("Fix the cause and restart the container; completed steps are skipped on restart")
    )]
    StepFailed {
        step: String,
        message: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    // Gateway errors
    #[error("Cannot bind gateway address {address}: {reason}")]
    #[diagnostic(
        code(mt5_bootstrap::gateway::port_bind),
        help("Another process is using the port; stop it or set MT5_API_PORT")
    )]
    PortBind { address: String, reason: String },

    #[error("Failed to start gateway '{program}': {reason}")]
    #[diagnostic(
        code(mt5_bootstrap::gateway::spawn_failed),
        help("Check WINE_BIN and GATEWAY_SCRIPT")
    )]
    GatewaySpawnFailed { program: String, reason: String },

    // Generic I/O errors
    #[error("IO error: {message}")]
    #[diagnostic(code(mt5_bootstrap::io_error))]
    IoError { message: String },
}

impl BootError {
    /// Process exit code for this error class
    pub fn exit_code(&self) -> i32 {
        match self {
            BootError::ConfigInvalid { .. } => EXIT_CONFIG,
            BootError::StepLogUnavailable { .. } => EXIT_STEP_LOG,
            BootError::StepFailed { .. } => EXIT_PROVISIONING,
            BootError::PortBind { .. } => EXIT_PORT_BIND,
            BootError::GatewaySpawnFailed { .. } => EXIT_GATEWAY_SPAWN,
            BootError::IoError { .. } => EXIT_GENERIC,
        }
    }
}

impl From<std::io::Error> for BootError {
    fn from(err: std::io::Error) -> Self {
        BootError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BootError {
    fn from(err: serde_json::Error) -> Self {
        BootError::IoError {
            message: err.to_string(),
        }
    }
}

/// Creates a generic IO error
pub fn io_error(message: impl Into<String>) -> BootError {
    BootError::IoError {
        message: message.into(),
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, BootError>;
