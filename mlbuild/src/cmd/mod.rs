//! All subcommand implementations for the MLogger build utility.

pub mod build;
pub mod check;
pub mod info;
