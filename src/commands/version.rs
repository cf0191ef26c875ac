//! Version command implementation

use crate::config::defaults;
use crate::error::Result;

/// Run version command
pub fn run() -> Result<()> {
    println!("mt5-bootstrap {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Pinned defaults:");
    println!("  Wine: {}", defaults::WINE_VERSION);
    println!("  Python: {}", defaults::PYTHON_VERSION);
    println!();
    println!("Build info:");
    println!("  Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  Profile: {}", build_profile());

    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
