//! Terminal presentation for non-provisioning commands

pub mod display;
