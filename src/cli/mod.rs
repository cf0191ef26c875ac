//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - status: Status command arguments
//! - reset: Reset command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{defaults, vars};

pub mod completions;
pub mod reset;
pub mod status;

pub use completions::CompletionsArgs;
pub use reset::ResetArgs;
pub use status::StatusArgs;

/// mt5-bootstrap - MetaTrader 5 container bootstrap
///
/// Provisions Wine, Windows Python and the gateway's dependencies, then runs
/// the HTTP gateway in the foreground.
#[derive(Parser, Debug)]
#[command(
    name = "mt5-bootstrap",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Bootstrap a MetaTrader 5 container and supervise its gateway",
    long_about = "Resolves configuration from the environment, runs the provisioning steps \
                  (Wine, Windows Python, gateway dependencies) that are not yet satisfied, \
                  records every step in a persistent step log and then runs the gateway \
                  as the container's foreground process.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  mt5-bootstrap                  \x1b[90m# Provision and run the gateway\x1b[0m\n   \
                  mt5-bootstrap status           \x1b[90m# Show the latest attempt\x1b[0m\n   \
                  mt5-bootstrap reset --yes      \x1b[90m# Start over with a new step log\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the container and run the gateway (default)
    Run,

    /// Show recorded provisioning steps
    Status(StatusArgs),

    /// Archive the step log so every step is checked from scratch
    Reset(ResetArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Location of the step log for commands that do not provision
#[derive(Args, Debug, Clone)]
pub struct StateDirArgs {
    /// State directory holding the step log
    #[arg(long, env = vars::STATE_DIR, default_value = defaults::STATE_DIR)]
    pub state_dir: PathBuf,
}
