use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vl_cli::commands::{format_duration, run};
use vl_cli::{Cli, Commands, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr; stdout carries command replies.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout();
    match &cli.command {
        Some(Commands::Run { input, out_dir }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            tracing::debug!(?config, "loaded configuration");

            let out_dir = out_dir.as_ref().unwrap_or(&config.report_dir);
            std::fs::create_dir_all(out_dir).context("failed to create report directory")?;
            run::run(&mut stdout, &config, input.as_deref(), out_dir).await?;
        }
        Some(Commands::FormatDuration { ms }) => {
            format_duration::run(&mut stdout, *ms)?;
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
