//! Per-song, per-model scoring
//!
//! References for a song are decoded once into [`SongReferences`] and then
//! borrowed by every model evaluated against that song. Each evaluation loads
//! exactly one model file (plus the optional instrumental estimate) and never
//! fails: problems become a [`SkippedResult`] carrying the reason.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use crate::engine::{AudioLoader, Waveform};
use crate::error::{Result, SdrError};
use crate::eval::dataset::SongDir;
use crate::metrics::{compute_sdr, LengthPolicy};

// ============================================================================
// Result records
// ============================================================================

/// Why a (song, model) pair produced no score
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// `vocals_<model>.wav` does not exist for this song
    MissingModelOutput { path: PathBuf },
    /// The model file exists but could not be decoded
    UnreadableModelOutput { reason: String },
    /// The reference stem is silent
    DegenerateSignal,
    LengthMismatch { reference: usize, estimate: usize },
    SampleRateMismatch { reference: u32, estimate: u32 },
    ChannelMismatch { reference: usize, estimate: usize },
}

impl SkipReason {
    /// Map an evaluation error onto the reason recorded for the pair
    pub fn from_error(err: SdrError) -> Self {
        match err {
            SdrError::FileNotFound { path, .. } => SkipReason::MissingModelOutput { path },
            SdrError::DegenerateSignal => SkipReason::DegenerateSignal,
            SdrError::LengthMismatch {
                reference,
                estimate,
            } => SkipReason::LengthMismatch {
                reference,
                estimate,
            },
            SdrError::SampleRateMismatch {
                reference,
                estimate,
            } => SkipReason::SampleRateMismatch {
                reference,
                estimate,
            },
            SdrError::ChannelMismatch {
                reference,
                estimate,
            } => SkipReason::ChannelMismatch {
                reference,
                estimate,
            },
            other => SkipReason::UnreadableModelOutput {
                reason: other.to_string(),
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::MissingModelOutput { .. } => "MISSING_MODEL_OUTPUT",
            SkipReason::UnreadableModelOutput { .. } => "UNREADABLE_MODEL_OUTPUT",
            SkipReason::DegenerateSignal => "DEGENERATE_SIGNAL",
            SkipReason::LengthMismatch { .. } => "LENGTH_MISMATCH",
            SkipReason::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            SkipReason::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingModelOutput { path } => {
                write!(f, "missing model output {}", path.display())
            }
            SkipReason::UnreadableModelOutput { reason } => write!(f, "unreadable: {}", reason),
            SkipReason::DegenerateSignal => write!(f, "reference has zero energy"),
            SkipReason::LengthMismatch {
                reference,
                estimate,
            } => write!(f, "length {} vs reference {}", estimate, reference),
            SkipReason::SampleRateMismatch {
                reference,
                estimate,
            } => write!(f, "{} Hz vs reference {} Hz", estimate, reference),
            SkipReason::ChannelMismatch {
                reference,
                estimate,
            } => write!(f, "{} channels vs reference {}", estimate, reference),
        }
    }
}

/// Scores for one evaluated (song, model) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub song: String,
    pub model: String,
    /// SDR of the model's vocals against the reference vocals, in dB
    pub vocals_sdr: f64,
    /// SDR of `other_<model>.wav` against the reference "other" stem
    pub other_sdr: Option<f64>,
    /// Set when the instrumental estimate existed but could not be scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_skip: Option<SkipReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedResult {
    pub song: String,
    pub model: String,
    pub reason: SkipReason,
}

/// Result of evaluating one (song, model) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Scored(ScoreRecord),
    Skipped(SkippedResult),
}

impl EvaluationOutcome {
    pub fn song(&self) -> &str {
        match self {
            EvaluationOutcome::Scored(r) => &r.song,
            EvaluationOutcome::Skipped(s) => &s.song,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            EvaluationOutcome::Scored(r) => &r.model,
            EvaluationOutcome::Skipped(s) => &s.model,
        }
    }

    pub fn score(&self) -> Option<&ScoreRecord> {
        match self {
            EvaluationOutcome::Scored(r) => Some(r),
            EvaluationOutcome::Skipped(_) => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, EvaluationOutcome::Scored(_))
    }
}

// ============================================================================
// References
// ============================================================================

/// Ground-truth stems of one song, decoded once and shared read-only
#[derive(Debug, Clone)]
pub struct SongReferences {
    pub song: SongDir,
    pub vocals: Waveform,
    pub other: Waveform,
}

// ============================================================================
// Track Evaluator
// ============================================================================

/// Scores model outputs of a song against its references
#[derive(Clone)]
pub struct TrackEvaluator {
    loader: Arc<dyn AudioLoader>,
    length_policy: LengthPolicy,
    evaluate_other: bool,
}

impl TrackEvaluator {
    pub fn new(loader: Arc<dyn AudioLoader>) -> Self {
        Self {
            loader,
            length_policy: LengthPolicy::default(),
            evaluate_other: true,
        }
    }

    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    /// Enable or disable scoring of `other_<model>.wav`
    pub fn with_other(mut self, enabled: bool) -> Self {
        self.evaluate_other = enabled;
        self
    }

    pub fn loader(&self) -> &dyn AudioLoader {
        self.loader.as_ref()
    }

    /// Decode both reference stems of `song`
    ///
    /// # Errors
    /// * `MissingReferenceFile` - a required reference file is absent
    /// * `SampleRateMismatch` - the two references disagree on sample rate
    /// * any loader error for an unreadable reference
    pub fn load_references(&self, song: &SongDir) -> Result<SongReferences> {
        let vocals = self.load_reference(song, song.reference_vocals_path())?;
        let other = self.load_reference(song, song.reference_other_path())?;

        if vocals.sample_rate() != other.sample_rate() {
            return Err(SdrError::SampleRateMismatch {
                reference: vocals.sample_rate(),
                estimate: other.sample_rate(),
            });
        }

        debug!(
            "Loaded references for '{}' ({:.1}s @ {} Hz)",
            song.name,
            vocals.duration_secs(),
            vocals.sample_rate()
        );

        Ok(SongReferences {
            song: song.clone(),
            vocals,
            other,
        })
    }

    fn load_reference(&self, song: &SongDir, path: PathBuf) -> Result<Waveform> {
        self.loader.load(&path).map_err(|e| match e {
            SdrError::FileNotFound { path, .. } => SdrError::MissingReferenceFile {
                song: song.name.clone(),
                path,
            },
            other => other,
        })
    }

    /// Score one model against preloaded references
    pub fn evaluate(&self, references: &SongReferences, model: &str) -> EvaluationOutcome {
        let song = &references.song;

        let vocals_sdr = match self.score_file(&song.model_vocals_path(model), &references.vocals) {
            Ok(sdr) => sdr,
            Err(e) => {
                let reason = SkipReason::from_error(e);
                match &reason {
                    SkipReason::MissingModelOutput { .. } => {
                        info!("Skipping '{}' / {}: {}", song.name, model, reason)
                    }
                    _ => warn!("Skipping '{}' / {}: {}", song.name, model, reason),
                }
                return EvaluationOutcome::Skipped(SkippedResult {
                    song: song.name.clone(),
                    model: model.to_string(),
                    reason,
                });
            }
        };

        let (other_sdr, other_skip) = if self.evaluate_other {
            match self.score_file(&song.model_other_path(model), &references.other) {
                Ok(sdr) => (Some(sdr), None),
                // Most separation models only emit vocals
                Err(SdrError::FileNotFound { .. }) => (None, None),
                Err(e) => {
                    let reason = SkipReason::from_error(e);
                    warn!(
                        "Instrumental estimate of {} for '{}' not scored: {}",
                        model, song.name, reason
                    );
                    (None, Some(reason))
                }
            }
        } else {
            (None, None)
        };

        debug!("'{}' / {}: vocals {:.3} dB", song.name, model, vocals_sdr);

        EvaluationOutcome::Scored(ScoreRecord {
            song: song.name.clone(),
            model: model.to_string(),
            vocals_sdr,
            other_sdr,
            other_skip,
        })
    }

    fn score_file(&self, path: &std::path::Path, reference: &Waveform) -> Result<f64> {
        let estimate = self.loader.load(path)?;
        compute_sdr(reference, &estimate, self.length_policy)
    }
}

impl fmt::Debug for TrackEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackEvaluator")
            .field("length_policy", &self.length_policy)
            .field("evaluate_other", &self.evaluate_other)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
