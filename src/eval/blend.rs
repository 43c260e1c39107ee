//! Two-model ensemble blend sweep
//!
//! Searches for the weighting of two models' vocal outputs that gives the
//! best mean SDR. For a weight pair `(w1, w2)` with `w1 + w2 = 10` the blend
//! of a song is
//!
//! ```text
//! low   = lowpass((w1 * m1 + w2 * m2) / (w1 + w2)) * makeup_gain
//! high  = highpass(m2)
//! blend = low + high
//! ```
//!
//! with both filters split at the crossover frequency. The secondary model
//! therefore owns everything above the crossover regardless of weights.
//!
//! Filtering is linear, so each song is filtered once (`lowpass(m1)`,
//! `lowpass(m2)`, `highpass(m2)`) and every weight pair is a cheap remix.

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::dsp::{ButterworthFilter, PassBand};
use crate::engine::{AudioLoader, Waveform};
use crate::error::{Result, SdrError};
use crate::eval::comparison::{default_threads, ExcludedSong};
use crate::eval::dataset::SongDir;
use crate::eval::track::TrackEvaluator;
use crate::metrics::{compute_sdr, LengthPolicy};

/// Total weight shared by the two models
pub const WEIGHT_SCALE: f64 = 10.0;

/// Crossover between the weighted mix and the secondary model's highs
pub const DEFAULT_CROSSOVER_HZ: f64 = 10_000.0;

/// Level correction applied to the low band after filtering
pub const DEFAULT_MAKEUP_GAIN: f64 = 1.01055;

/// Combined forward-backward order; the designed filter is half of this
pub const DEFAULT_FILTER_ORDER: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendConfig {
    pub primary: String,
    pub secondary: String,
    /// Step between primary weights, in (0, 10]
    pub weight_step: f64,
    pub crossover_hz: f64,
    pub makeup_gain: f64,
    pub filter_order: usize,
    pub length_policy: LengthPolicy,
    pub threads: usize,
}

impl BlendConfig {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            weight_step: 1.0,
            crossover_hz: DEFAULT_CROSSOVER_HZ,
            makeup_gain: DEFAULT_MAKEUP_GAIN,
            filter_order: DEFAULT_FILTER_ORDER,
            length_policy: LengthPolicy::default(),
            threads: default_threads(),
        }
    }

    /// Build from a model list that must name exactly two models
    pub fn from_models(models: &[String]) -> Result<Self> {
        match models {
            [primary, secondary] => Ok(Self::new(primary.clone(), secondary.clone())),
            _ => Err(SdrError::InvalidConfig {
                reason: format!(
                    "blend sweep needs exactly two models, got {}",
                    models.len()
                ),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.weight_step > 0.0 && self.weight_step <= WEIGHT_SCALE) {
            return Err(SdrError::InvalidConfig {
                reason: format!("weight step {} must be in (0, 10]", self.weight_step),
            });
        }
        if !(self.crossover_hz > 0.0 && self.crossover_hz.is_finite()) {
            return Err(SdrError::InvalidConfig {
                reason: format!("crossover {} Hz must be positive and finite", self.crossover_hz),
            });
        }
        if !(self.makeup_gain > 0.0 && self.makeup_gain.is_finite()) {
            return Err(SdrError::InvalidConfig {
                reason: format!("makeup gain {} must be positive and finite", self.makeup_gain),
            });
        }
        if self.filter_order < 2 {
            return Err(SdrError::InvalidConfig {
                reason: "filter order must be at least 2".to_string(),
            });
        }
        if self.threads == 0 {
            return Err(SdrError::InvalidConfig {
                reason: "thread count must be at least 1".to_string(),
            });
        }
        if self.primary == self.secondary {
            return Err(SdrError::InvalidConfig {
                reason: "blend sweep needs two different models".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightPair {
    pub primary: f64,
    pub secondary: f64,
}

/// Weight pairs `(w, 10 - w)` for `w = 0, step, 2 * step, ...` up to 10
pub fn weight_pairs(step: f64) -> Vec<WeightPair> {
    let count = (WEIGHT_SCALE / step + 1e-9).floor() as usize;
    (0..=count)
        .map(|k| {
            let primary = (k as f64 * step).min(WEIGHT_SCALE);
            WeightPair {
                primary,
                secondary: WEIGHT_SCALE - primary,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendScore {
    pub weights: WeightPair,
    /// `None` when no song could be blended
    pub mean_sdr: Option<f64>,
    pub songs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendSweepReport {
    pub primary: String,
    pub secondary: String,
    /// One entry per weight pair, in ascending primary weight
    pub scores: Vec<BlendScore>,
    /// Highest mean SDR; the lowest primary weight wins a tie
    pub best: Option<BlendScore>,
    pub skipped_songs: Vec<ExcludedSong>,
}

pub struct BlendSweep {
    config: BlendConfig,
    evaluator: TrackEvaluator,
}

impl BlendSweep {
    pub fn new(config: BlendConfig, loader: Arc<dyn AudioLoader>) -> Result<Self> {
        config.validate()?;
        let evaluator = TrackEvaluator::new(loader).with_length_policy(config.length_policy);
        Ok(Self { config, evaluator })
    }

    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    /// Score every weight pair over `songs`
    ///
    /// Songs that cannot be blended (missing or mismatched files, silent
    /// reference) are skipped as a whole and listed in the report.
    pub fn run(&self, songs: &[SongDir]) -> Result<BlendSweepReport> {
        let pairs = weight_pairs(self.config.weight_step);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| SdrError::ThreadPool {
                reason: e.to_string(),
            })?;

        info!(
            "Blend sweep {} / {}: {} weight pair(s) over {} song(s)",
            self.config.primary,
            self.config.secondary,
            pairs.len(),
            songs.len()
        );

        let results: Vec<(&SongDir, Result<Vec<f64>>)> = pool.install(|| {
            songs
                .par_iter()
                .map(|song| (song, self.blend_song(song, &pairs)))
                .collect()
        });

        let mut per_song: Vec<(&str, Vec<f64>)> = Vec::new();
        let mut skipped_songs = Vec::new();
        for (song, result) in results {
            match result {
                Ok(sdrs) => per_song.push((song.name.as_str(), sdrs)),
                Err(e) => {
                    warn!("Skipping song '{}' in blend sweep: {}", song.name, e);
                    skipped_songs.push(ExcludedSong::new(song, &e));
                }
            }
        }
        per_song.sort_by(|a, b| a.0.cmp(b.0));
        skipped_songs.sort_by(|a, b| a.song.cmp(&b.song));

        let scores: Vec<BlendScore> = pairs
            .iter()
            .enumerate()
            .map(|(i, weights)| {
                let sum: f64 = per_song.iter().map(|(_, sdrs)| sdrs[i]).sum();
                BlendScore {
                    weights: *weights,
                    mean_sdr: (!per_song.is_empty()).then(|| sum / per_song.len() as f64),
                    songs: per_song.len(),
                }
            })
            .collect();

        let best = scores
            .iter()
            .filter(|s| s.mean_sdr.is_some())
            .fold(None::<&BlendScore>, |best, s| match best {
                Some(b) if b.mean_sdr >= s.mean_sdr => Some(b),
                _ => Some(s),
            })
            .cloned();

        Ok(BlendSweepReport {
            primary: self.config.primary.clone(),
            secondary: self.config.secondary.clone(),
            scores,
            best,
            skipped_songs,
        })
    }

    /// SDR of every weight pair for one song
    fn blend_song(&self, song: &SongDir, pairs: &[WeightPair]) -> Result<Vec<f64>> {
        let references = self.evaluator.load_references(song)?;
        let loader = self.evaluator.loader();
        let first = loader.load(&song.model_vocals_path(&self.config.primary))?;
        let second = loader.load(&song.model_vocals_path(&self.config.secondary))?;

        let reference = &references.vocals;
        for estimate in [&first, &second] {
            if estimate.sample_rate() != reference.sample_rate() {
                return Err(SdrError::SampleRateMismatch {
                    reference: reference.sample_rate(),
                    estimate: estimate.sample_rate(),
                });
            }
            if estimate.num_channels() != reference.num_channels() {
                return Err(SdrError::ChannelMismatch {
                    reference: reference.num_channels(),
                    estimate: estimate.num_channels(),
                });
            }
            if self.config.length_policy == LengthPolicy::Strict
                && estimate.num_frames() != reference.num_frames()
            {
                return Err(SdrError::LengthMismatch {
                    reference: reference.num_frames(),
                    estimate: estimate.num_frames(),
                });
            }
        }

        let frames = reference
            .num_frames()
            .min(first.num_frames())
            .min(second.num_frames());
        let reference = reference.truncated(frames);
        let first = first.truncated(frames);
        let second = second.truncated(frames);

        let sample_rate = reference.sample_rate();
        let order = self.config.filter_order / 2;
        let crossover = self.config.crossover_hz;
        let lowpass = ButterworthFilter::new(PassBand::LowPass, order, crossover, sample_rate)?;
        let highpass = ButterworthFilter::new(PassBand::HighPass, order, crossover, sample_rate)?;

        let low_first = lowpass.apply(&first)?;
        let low_second = lowpass.apply(&second)?;
        let high_second = highpass.apply(&second)?;

        let sdrs = pairs
            .iter()
            .map(|weights| {
                let blend = mix(
                    &low_first,
                    &low_second,
                    &high_second,
                    weights,
                    self.config.makeup_gain,
                )?;
                compute_sdr(&reference, &blend, self.config.length_policy)
            })
            .collect::<Result<Vec<f64>>>()?;

        debug!("Blended '{}' over {} weight pair(s)", song.name, pairs.len());
        Ok(sdrs)
    }
}

fn mix(
    low_first: &Waveform,
    low_second: &Waveform,
    high_second: &Waveform,
    weights: &WeightPair,
    makeup_gain: f64,
) -> Result<Waveform> {
    let total = weights.primary + weights.secondary;
    let a = (weights.primary / total * makeup_gain) as f32;
    let b = (weights.secondary / total * makeup_gain) as f32;

    let channels = low_first
        .channels()
        .iter()
        .zip(low_second.channels())
        .zip(high_second.channels())
        .map(|((l1, l2), h2)| {
            l1.iter()
                .zip(l2)
                .zip(h2)
                .map(|((&x1, &x2), &h)| a * x1 + b * x2 + h)
                .collect()
        })
        .collect();

    Waveform::new(channels, low_first.sample_rate())
}
