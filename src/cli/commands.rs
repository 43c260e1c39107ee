//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};

use crate::config::{CompareConfig, DEFAULT_DATASET_ROOT};
use crate::engine::WavLoader;
use crate::error::Result;
use crate::eval::{discover_songs, BlendConfig, BlendSweep, ComparisonEngine};
use crate::metrics::LengthPolicy;
use crate::report::{
    render_blend, render_details, render_leaderboard, render_summary, ConsoleProgress, JsonReport,
};

/// Options of the `compare` command as given on the command line
#[derive(Debug, Default)]
pub struct CompareArgs {
    pub models: Vec<String>,
    pub tracks_folder: Option<PathBuf>,
    pub threads: Option<usize>,
    pub strict_length: bool,
    pub skip_other: bool,
    pub json: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub details: bool,
}

impl CompareArgs {
    /// Start from the config file (or defaults) and apply flag overrides
    pub fn resolve(&self) -> Result<CompareConfig> {
        let mut config = match &self.config {
            Some(path) => CompareConfig::from_file(path)?,
            None => CompareConfig::default(),
        };

        if !self.models.is_empty() {
            config.models = self.models.clone();
        }
        if let Some(root) = &self.tracks_folder {
            config.dataset_root = root.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.strict_length {
            config.length_policy = LengthPolicy::Strict;
        }
        if self.skip_other {
            config.evaluate_other = false;
        }
        if self.json.is_some() {
            config.json_output = self.json.clone();
        }

        config.validate()
    }
}

/// Score all models over the dataset and print the leaderboard.
pub fn compare(args: CompareArgs) -> Result<()> {
    let config = args.resolve()?;
    info!(
        "Comparing {} model(s) over {} with {} thread(s)",
        config.models.len(),
        config.dataset_root.display(),
        config.threads
    );

    let engine = ComparisonEngine::from_config(&config, Arc::new(WavLoader))
        .with_observer(Arc::new(ConsoleProgress::new()));
    let report = engine.run_dataset(&config.dataset_root, &config.models)?;

    if args.details {
        print!("{}", render_details(&report));
        println!();
    }
    print!("{}", render_leaderboard(&report.leaderboard));
    println!();
    println!("{}", render_summary(&report));

    match report.leaderboard.best() {
        Some(best) => println!("Best model: {}", best.model),
        None => warn!("No model produced a score"),
    }

    if let Some(path) = &config.json_output {
        JsonReport::new(&config, &report).write(path)?;
        println!("Report written: {}", path.display());
    }

    Ok(())
}

/// Options of the `blend` command
#[derive(Debug)]
pub struct BlendArgs {
    pub models: Vec<String>,
    pub tracks_folder: Option<PathBuf>,
    pub threads: Option<usize>,
    pub weight_step: f64,
    pub crossover_hz: f64,
    pub strict_length: bool,
}

/// Sweep blend weights between two models and print the best pair.
pub fn blend(args: BlendArgs) -> Result<()> {
    let mut config = BlendConfig::from_models(&args.models)?;
    config.weight_step = args.weight_step;
    config.crossover_hz = args.crossover_hz;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if args.strict_length {
        config.length_policy = LengthPolicy::Strict;
    }

    let root = args
        .tracks_folder
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_ROOT));
    info!(
        "Blending {} / {} over {}",
        config.primary,
        config.secondary,
        root.display()
    );

    let songs = discover_songs(&root)?;
    let sweep = BlendSweep::new(config, Arc::new(WavLoader))?;
    let report = sweep.run(&songs)?;

    print!("{}", render_blend(&report));
    Ok(())
}
