//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Normalize DJ play history into per-night session archives.
///
/// Reads djay Set history and Serato history or logs, groups plays into
/// nights, and writes JSON, text and CSV summaries.
#[derive(Debug, Parser)]
#[command(name = "playlog", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract play history and write session files.
    Run(RunArgs),

    /// Print the core library version.
    Version,
}

/// Options for `playlog run`. Unset options fall back to the config file.
#[derive(Debug, Default, clap::Args)]
pub struct RunArgs {
    /// Apps to extract, comma separated (djay, rekordbox, serato).
    #[arg(long, value_delimiter = ',', default_value = "djay,rekordbox,serato")]
    pub apps: Vec<String>,

    /// Output directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output formats, comma separated (json, txt, csv).
    #[arg(long, value_delimiter = ',')]
    pub formats: Option<Vec<String>>,

    /// IANA timezone name (e.g. Asia/Tokyo).
    #[arg(long)]
    pub tz: Option<String>,

    /// Night cutoff time of day, HH:MM.
    #[arg(long)]
    pub cutoff: Option<String>,

    /// Serato source: auto, crate or logs.
    #[arg(long)]
    pub serato_mode: Option<String>,

    /// Serato root directory (the `_Serato_` folder).
    #[arg(long)]
    pub serato_root: Option<PathBuf>,

    /// djay Sets directory or a single `.plist` file.
    #[arg(long)]
    pub djay_root: Option<PathBuf>,

    /// Synthesize timestamps for sessions that record none.
    #[arg(long)]
    pub timeline_estimate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_parse_lists() {
        let cli = Cli::parse_from([
            "playlog",
            "run",
            "--apps",
            "djay,serato",
            "--formats",
            "json,csv",
            "--tz",
            "Asia/Tokyo",
            "--timeline-estimate",
        ]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.apps, vec!["djay", "serato"]);
        assert_eq!(args.formats, Some(vec!["json".to_string(), "csv".to_string()]));
        assert_eq!(args.tz.as_deref(), Some("Asia/Tokyo"));
        assert!(args.timeline_estimate);
        assert!(args.out.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["playlog", "version", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Version)));
    }
}
