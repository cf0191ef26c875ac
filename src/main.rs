//! mt5-bootstrap - MetaTrader 5 container bootstrap
//!
//! Brings a container from a bare image to a running MetaTrader 5 HTTP
//! gateway: Wine at a pinned version, Windows Python inside the Wine prefix,
//! the gateway's Python dependencies, then the gateway itself as a supervised
//! foreground process whose exit code becomes the container's exit code.

use clap::Parser;
use miette::Diagnostic;

mod cli;
mod commands;
mod config;
mod error;
mod gateway;
mod logging;
mod orchestrator;
mod progress;
mod provision;
mod step_log;
mod ui;

use cli::{Cli, Commands};
use error::BootError;

/// Lines of a failed command's stderr repeated in the final error
const STDERR_TAIL_LINES: usize = 10;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run(cli.verbose),
        Commands::Status(args) => commands::status::run(args).map(|()| 0),
        Commands::Reset(args) => commands::reset::run(args).map(|()| 0),
        Commands::Version => commands::version::run().map(|()| 0),
        Commands::Completions(args) => commands::completions::run(args).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            report(&e);
            std::process::exit(e.exit_code());
        }
    }
}

fn report(e: &BootError) {
    eprintln!("Error: {e}");

    if let BootError::StepFailed { stderr, .. } = e {
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
        if !tail.is_empty() {
            eprintln!("  stderr:");
            for line in tail {
                eprintln!("    {line}");
            }
        }
    }

    if let Some(help) = e.help() {
        eprintln!("  help: {help}");
    }
}
