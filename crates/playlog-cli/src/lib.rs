//! PlayLog CLI library.
//!
//! Argument parsing, configuration and the session file renderers behind the
//! `playlog` binary.

mod cli;
pub mod commands;
mod config;
pub mod render;

pub use cli::{Cli, Commands, RunArgs};
pub use config::Config;
