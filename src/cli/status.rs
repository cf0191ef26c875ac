use clap::Parser;

use super::StateDirArgs;

/// Arguments for the status command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show the latest bootstrap attempt:\n    mt5-bootstrap status\n\n\
                  Show every attempt of the current generation:\n    mt5-bootstrap status --all\n\n\
                  Machine-readable output:\n    mt5-bootstrap status --json")]
pub struct StatusArgs {
    #[command(flatten)]
    pub state: StateDirArgs,

    /// Show all attempts instead of only the latest
    #[arg(long)]
    pub all: bool,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,
}
