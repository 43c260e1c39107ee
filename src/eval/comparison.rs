//! Comparison engine
//!
//! Runs every (song, model) pair on a bounded rayon pool and reduces the
//! outcomes into a [`Leaderboard`].
//!
//! ```text
//!  songs ──par_iter──► load references (once per song)
//!                          │
//!                          ├─ fail ──► ExcludedSong
//!                          │
//!                          └─ models ──par_iter──► TrackEvaluator::evaluate
//!                                                         │
//!                                     ProgressObserver ◄──┤
//!                                                         ▼
//!                                         sort ──► Leaderboard::from_outcomes
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::CompareConfig;
use crate::engine::AudioLoader;
use crate::error::{Result, SdrError};
use crate::eval::dataset::{discover_songs, SongDir};
use crate::eval::leaderboard::Leaderboard;
use crate::eval::progress::{NoProgress, ProgressObserver};
use crate::eval::track::{EvaluationOutcome, ScoreRecord, SkippedResult, TrackEvaluator};

/// A song left out of the comparison because its references failed to load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedSong {
    pub song: String,
    pub error_code: String,
    pub reason: String,
}

impl ExcludedSong {
    pub fn new(song: &SongDir, err: &SdrError) -> Self {
        Self {
            song: song.name.clone(),
            error_code: err.error_code().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Everything one comparison run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Models in the order they were supplied, duplicates removed
    pub models: Vec<String>,
    pub leaderboard: Leaderboard,
    /// Sorted by song name, then by model position
    pub outcomes: Vec<EvaluationOutcome>,
    pub excluded_songs: Vec<ExcludedSong>,
    pub songs_total: usize,
    /// Set when cancellation stopped some units from running
    pub interrupted: bool,
}

impl ComparisonReport {
    pub fn scored(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.outcomes.iter().filter_map(|o| o.score())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedResult> {
        self.outcomes.iter().filter_map(|o| match o {
            EvaluationOutcome::Skipped(s) => Some(s),
            EvaluationOutcome::Scored(_) => None,
        })
    }
}

enum SongResult {
    Evaluated {
        outcomes: Vec<EvaluationOutcome>,
        complete: bool,
    },
    Excluded(ExcludedSong),
    Cancelled,
}

/// Default worker count: one per available CPU
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Collapse repeated model names, keeping the first occurrence
pub fn dedupe_models(models: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(models.len());
    for model in models {
        if unique.contains(model) {
            warn!("Model '{}' listed more than once; evaluating it once", model);
        } else {
            unique.push(model.clone());
        }
    }
    unique
}

/// Orchestrates evaluation of songs × models
pub struct ComparisonEngine {
    evaluator: TrackEvaluator,
    threads: usize,
    observer: Arc<dyn ProgressObserver>,
    cancel: Arc<AtomicBool>,
}

impl ComparisonEngine {
    pub fn new(evaluator: TrackEvaluator) -> Self {
        Self {
            evaluator,
            threads: default_threads(),
            observer: Arc::new(NoProgress),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build an engine with the evaluator settings and pool size of `config`
    pub fn from_config(config: &CompareConfig, loader: Arc<dyn AudioLoader>) -> Self {
        let evaluator = TrackEvaluator::new(loader)
            .with_length_policy(config.length_policy)
            .with_other(config.evaluate_other);
        Self::new(evaluator).with_threads(config.threads)
    }

    /// Maximum number of worker threads
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share a cancellation flag; setting it stops units that have not started
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Discover the songs under `root`, then [`run`](Self::run)
    ///
    /// # Errors
    /// Dataset-level failures from [`discover_songs`] abort before any
    /// evaluation starts.
    pub fn run_dataset(&self, root: &Path, models: &[String]) -> Result<ComparisonReport> {
        let songs = discover_songs(root)?;
        self.run(&songs, models)
    }

    /// Evaluate every model against every song and rank the models
    ///
    /// # Errors
    /// * `InvalidConfig` - empty model list or zero threads
    /// * `ThreadPool` - the worker pool could not be created
    ///
    /// Per-song and per-pair failures never abort the run.
    pub fn run(&self, songs: &[SongDir], models: &[String]) -> Result<ComparisonReport> {
        if models.is_empty() {
            return Err(SdrError::InvalidConfig {
                reason: "at least one model name is required".to_string(),
            });
        }
        if self.threads == 0 {
            return Err(SdrError::InvalidConfig {
                reason: "thread count must be at least 1".to_string(),
            });
        }

        let models = dedupe_models(models);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| SdrError::ThreadPool {
                reason: e.to_string(),
            })?;

        info!(
            "Comparing {} model(s) over {} song(s) on {} thread(s)",
            models.len(),
            songs.len(),
            self.threads
        );
        self.observer.on_start(songs.len(), models.len());

        let results: Vec<SongResult> = pool.install(|| {
            songs
                .par_iter()
                .map(|song| self.run_song(song, &models))
                .collect()
        });

        let mut outcomes = Vec::new();
        let mut excluded_songs = Vec::new();
        let mut interrupted = false;

        for result in results {
            match result {
                SongResult::Evaluated {
                    outcomes: song_outcomes,
                    complete,
                } => {
                    interrupted |= !complete;
                    outcomes.extend(song_outcomes);
                }
                SongResult::Excluded(excluded) => excluded_songs.push(excluded),
                SongResult::Cancelled => interrupted = true,
            }
        }

        let position: HashMap<&str, usize> = models
            .iter()
            .enumerate()
            .map(|(i, m)| (m.as_str(), i))
            .collect();
        outcomes.sort_by(|a, b| {
            a.song()
                .cmp(b.song())
                .then_with(|| position[a.model()].cmp(&position[b.model()]))
        });
        excluded_songs.sort_by(|a, b| a.song.cmp(&b.song));

        if interrupted {
            warn!(
                "Comparison interrupted; leaderboard covers {} finished unit(s)",
                outcomes.len()
            );
        }

        let leaderboard = Leaderboard::from_outcomes(&models, &outcomes);

        Ok(ComparisonReport {
            models,
            leaderboard,
            outcomes,
            excluded_songs,
            songs_total: songs.len(),
            interrupted,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn run_song(&self, song: &SongDir, models: &[String]) -> SongResult {
        if self.is_cancelled() {
            return SongResult::Cancelled;
        }

        let references = match self.evaluator.load_references(song) {
            Ok(references) => references,
            Err(e) => {
                warn!("Excluding song '{}': {}", song.name, e);
                let excluded = ExcludedSong::new(song, &e);
                self.observer.on_song_excluded(&excluded);
                return SongResult::Excluded(excluded);
            }
        };

        let outcomes: Vec<Option<EvaluationOutcome>> = models
            .par_iter()
            .map(|model| {
                if self.is_cancelled() {
                    return None;
                }
                let outcome = self.evaluator.evaluate(&references, model);
                self.observer.on_unit_complete(&outcome);
                Some(outcome)
            })
            .collect();

        let complete = outcomes.iter().all(Option::is_some);
        SongResult::Evaluated {
            outcomes: outcomes.into_iter().flatten().collect(),
            complete,
        }
    }
}
