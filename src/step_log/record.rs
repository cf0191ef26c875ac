//! Step records as persisted in the step log

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one provisioning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Step started and has not been finalized
    Pending,
    Succeeded,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Pending => "pending",
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
        };
        f.pad(label)
    }
}

/// One line of the step log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Stable step name, e.g. `compat-layer`
    pub step_name: String,
    pub outcome: Outcome,
    /// Human-readable message
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Orchestrator pass that wrote this record, starting at 1 per generation
    pub attempt: u32,
    /// Version the step installed or verified, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl StepRecord {
    pub fn new(
        step_name: impl Into<String>,
        outcome: Outcome,
        message: impl Into<String>,
        attempt: u32,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            outcome,
            message: message.into(),
            timestamp: Utc::now(),
            attempt,
            version: None,
        }
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }
}
