//! Command implementations for the mt5-bootstrap CLI

pub mod completions;
pub mod reset;
pub mod run;
pub mod status;
pub mod version;
