//! Status command: show what the step log recorded

use serde::Serialize;

use crate::cli::StatusArgs;
use crate::error::Result;
use crate::step_log::{StepLog, StepRecord};
use crate::ui::display;

/// Shape of `status --json`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    path: String,
    generation: u32,
    latest_attempt: u32,
    records: Vec<StepRecord>,
}

/// Run status command; reads without taking the step log lock
pub fn run(args: StatusArgs) -> Result<()> {
    let log = StepLog::read(&args.state.state_dir)?;

    if args.json {
        let records = if args.all {
            log.records()
        } else {
            log.attempt_records(log.attempt())
        };
        let report = StatusReport {
            path: log.path().display().to_string(),
            generation: log.generation(),
            latest_attempt: log.attempt(),
            records,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_status(&log, args.all);
    }

    Ok(())
}
