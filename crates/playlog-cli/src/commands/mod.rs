//! CLI subcommand implementations.

pub mod run;
pub mod version;
