//! SDR model comparison
//!
//! Ranks audio source separation models by how closely their vocal
//! estimates match the reference stems of a song dataset.
//!
//! # Architecture
//!
//! - `engine`: waveform container and WAV loading behind the `AudioLoader` seam
//! - `metrics`: the signal-to-distortion ratio itself
//! - `eval`: dataset discovery, per-pair evaluation, the parallel comparison
//!   engine, leaderboard aggregation and the two-model blend sweep
//! - `report`: text tables and the JSON report
//! - `dsp`: Butterworth crossover filters used by the blend sweep

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod report;

pub use config::CompareConfig;
pub use error::{Result, SdrError};
pub use eval::{ComparisonEngine, ComparisonReport, Leaderboard};
pub use metrics::{compute_sdr, LengthPolicy, MAX_SDR_DB};
