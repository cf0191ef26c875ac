//! Display functions for step records
//!
//! Styles come from `console` and collapse to plain text when stdout is not
//! a terminal.

use console::Style;

use crate::step_log::{Outcome, StepLog, StepRecord};

fn outcome_style(outcome: Outcome) -> Style {
    match outcome {
        Outcome::Succeeded => Style::new().green(),
        Outcome::Pending => Style::new().yellow(),
        Outcome::Failed => Style::new().red().bold(),
    }
}

/// One line per record: outcome, step, message, optional version, time
pub fn format_record(record: &StepRecord) -> String {
    let mut line = format!(
        "  {:<9}  {:<15} {}",
        outcome_style(record.outcome).apply_to(record.outcome),
        Style::new().bold().apply_to(&record.step_name),
        record.message
    );
    if let Some(version) = &record.version {
        line.push_str(&format!(" {}", Style::new().cyan().apply_to(format!("[{version}]"))));
    }
    line.push_str(&format!(
        "  {}",
        Style::new()
            .dim()
            .apply_to(record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))
    ));
    line
}

/// Header naming the attempt and its overall result
pub fn format_attempt_header(attempt: u32, records: &[StepRecord]) -> String {
    let result = if records.iter().any(|r| r.outcome == Outcome::Failed) {
        Style::new().red().bold().apply_to("failed")
    } else if records.iter().any(|r| r.outcome == Outcome::Pending) {
        Style::new().yellow().apply_to("interrupted")
    } else {
        Style::new().green().apply_to("ok")
    };
    format!(
        "{} {attempt} ({result})",
        Style::new().bold().apply_to("Attempt")
    )
}

/// Print the latest attempt, or every attempt with `all`
pub fn print_status(log: &StepLog, all: bool) {
    let records = log.records();
    println!(
        "{} {} (generation {})",
        Style::new().bold().apply_to("Step log:"),
        log.path().display(),
        log.generation()
    );

    if records.is_empty() {
        println!("  No steps recorded yet.");
        return;
    }

    let latest = log.attempt();
    let mut attempts: Vec<u32> = records.iter().map(|r| r.attempt).collect();
    attempts.dedup();
    if !all {
        attempts.retain(|a| *a == latest);
    }

    for attempt in attempts {
        let in_attempt: Vec<StepRecord> = records
            .iter()
            .filter(|r| r.attempt == attempt)
            .cloned()
            .collect();
        println!();
        println!("{}", format_attempt_header(attempt, &in_attempt));
        for record in &in_attempt {
            println!("{}", format_record(record));
        }
    }
}
