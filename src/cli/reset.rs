use clap::Parser;

use super::StateDirArgs;

/// Arguments for the reset command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Start the next boot from a fresh step log:\n    mt5-bootstrap reset --yes")]
pub struct ResetArgs {
    #[command(flatten)]
    pub state: StateDirArgs,

    /// Archive the step log without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}
