//! Reset command: start a new step log generation

use std::path::Path;

use console::{Style, Term};

use crate::cli::ResetArgs;
use crate::error::{self, Result};
use crate::step_log::StepLog;

/// Run reset command
pub fn run(args: ResetArgs) -> Result<()> {
    let state_dir = &args.state.state_dir;

    if !args.yes && !confirm(state_dir)? {
        println!("Reset cancelled.");
        return Ok(());
    }

    match StepLog::reset(state_dir)? {
        Some(archive) => println!(
            "{} step log archived to {}",
            Style::new().green().bold().apply_to("Reset:"),
            archive.display()
        ),
        None => println!("No step log in {}; nothing to reset.", state_dir.display()),
    }
    Ok(())
}

fn confirm(state_dir: &Path) -> Result<bool> {
    if !console::user_attended_stderr() {
        return Err(error::io_error(
            "refusing to reset without a terminal; pass --yes",
        ));
    }

    let term = Term::stderr();
    term.write_str(&format!(
        "Archive the step log in {}? Every step will be checked again on next boot. [y/N] ",
        state_dir.display()
    ))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
