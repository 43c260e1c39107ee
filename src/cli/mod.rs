//! CLI Module
//!
//! Command-line interface for comparing separation models by SDR.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::eval::blend::DEFAULT_CROSSOVER_HZ;

/// Rank source separation models by signal-to-distortion ratio
#[derive(Parser, Debug)]
#[command(name = "sdr-compare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every model on every song and print a leaderboard
    #[command(name = "compare")]
    Compare {
        /// Model names, matched against vocals_<model>.wav
        #[arg(short, long, num_args = 1..)]
        models: Vec<String>,

        /// Dataset root with one directory per song
        #[arg(short, long)]
        tracks_folder: Option<PathBuf>,

        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Skip pairs whose lengths differ instead of truncating
        #[arg(long)]
        strict_length: bool,

        /// Do not score other_<model>.wav files
        #[arg(long)]
        skip_other: bool,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// JSON config file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also print every song/model score (implied by --verbose)
        #[arg(long)]
        details: bool,
    },

    /// Sweep blend weights between two models' vocal estimates
    #[command(name = "blend")]
    Blend {
        /// Exactly two model names: primary then secondary
        #[arg(short, long, num_args = 2)]
        models: Vec<String>,

        /// Dataset root with one directory per song
        #[arg(short, long)]
        tracks_folder: Option<PathBuf>,

        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Step between primary weights on the 0..=10 scale
        #[arg(long, default_value_t = 1.0)]
        weight_step: f64,

        /// Crossover frequency in Hz
        #[arg(long, default_value_t = DEFAULT_CROSSOVER_HZ)]
        crossover_hz: f64,

        /// Skip songs whose estimate lengths differ instead of truncating
        #[arg(long)]
        strict_length: bool,
    },
}
