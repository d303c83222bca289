use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use playlog_cli::commands::{run, version};
use playlog_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Run(args)) => {
            let config = Config::load_from(cli.config.as_deref())
                .context("failed to load configuration")?
                .with_run_args(args);
            tracing::debug!(?config, "loaded configuration");
            run::run(&mut io::stdout().lock(), &config, &args.apps)?;
        }
        Some(Commands::Version) => {
            version::run(&mut io::stdout().lock())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
