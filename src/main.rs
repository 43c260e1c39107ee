//! sdr-compare CLI
//!
//! Command-line entry point for ranking separation models by SDR.

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use sdr_compare::cli::commands::{self, BlendArgs, CompareArgs};
use sdr_compare::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("sdr-compare v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = handle_command(cli.command, cli.verbose) {
        error!("{} [{}]", e, e.error_code());
        for hint in e.recovery_suggestions() {
            error!("  hint: {}", hint);
        }
        return Err(e.into());
    }
    Ok(())
}

fn handle_command(cmd: Commands, verbose: bool) -> sdr_compare::Result<()> {
    match cmd {
        Commands::Compare {
            models,
            tracks_folder,
            threads,
            strict_length,
            skip_other,
            json,
            config,
            details,
        } => commands::compare(CompareArgs {
            models,
            tracks_folder,
            threads,
            strict_length,
            skip_other,
            json,
            config,
            details: details || verbose,
        }),
        Commands::Blend {
            models,
            tracks_folder,
            threads,
            weight_step,
            crossover_hz,
            strict_length,
        } => commands::blend(BlendArgs {
            models,
            tracks_folder,
            threads,
            weight_step,
            crossover_hz,
            strict_length,
        }),
    }
}
