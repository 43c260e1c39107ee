//! Evaluation pipeline
//!
//! - `dataset`: song directory layout and discovery
//! - `track`: scoring one model against one song's references
//! - `comparison`: songs × models on a worker pool
//! - `leaderboard`: per-model aggregation and ranking
//! - `progress`: completion callbacks
//! - `blend`: two-model ensemble weight search

pub mod blend;
pub mod comparison;
pub mod dataset;
pub mod leaderboard;
pub mod progress;
pub mod track;

pub use blend::{weight_pairs, BlendConfig, BlendScore, BlendSweep, BlendSweepReport, WeightPair};
pub use comparison::{ComparisonEngine, ComparisonReport, ExcludedSong};
pub use dataset::{discover_songs, SongDir};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use progress::{CountingProgress, NoProgress, ProgressObserver};
pub use track::{
    EvaluationOutcome, ScoreRecord, SkipReason, SkippedResult, SongReferences, TrackEvaluator,
};
