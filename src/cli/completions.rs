use clap::Parser;
use clap_complete::Shell;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    mt5-bootstrap completions bash > ~/.bash_completion.d/mt5-bootstrap\n\n\
                  Generate zsh completions:\n    mt5-bootstrap completions zsh > ~/.zfunc/_mt5-bootstrap\n\n\
                  Generate fish completions:\n    mt5-bootstrap completions fish > ~/.config/fish/completions/mt5-bootstrap.fish")]
pub struct CompletionsArgs {
    /// Shell type
    #[arg(value_enum, ignore_case = true)]
    pub shell: Shell,
}
