//! Error handling for sdr-compare
//!
//! Per-pair and per-song failures are recoverable and get turned into skip
//! records by the evaluators. Dataset-level failures abort the run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for sdr-compare operations
pub type Result<T> = std::result::Result<T, SdrError>;

/// Main error type for sdr-compare operations
#[derive(Error, Debug)]
pub enum SdrError {
    // Dataset Errors
    #[error("Dataset root not found: {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Dataset root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Song '{song}' is missing reference file {path}")]
    MissingReferenceFile { song: String, path: PathBuf },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Metric Errors
    #[error("Reference signal has zero energy, SDR is undefined")]
    DegenerateSignal,

    #[error("Length mismatch: reference={reference} frames, estimate={estimate} frames")]
    LengthMismatch { reference: usize, estimate: usize },

    #[error("Sample rate mismatch: reference={reference}Hz, estimate={estimate}Hz")]
    SampleRateMismatch { reference: u32, estimate: u32 },

    #[error("Channel count mismatch: reference={reference}, estimate={estimate}")]
    ChannelMismatch { reference: usize, estimate: usize },

    // Run Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Failed to build worker pool: {reason}")]
    ThreadPool { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SdrError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SdrError::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            SdrError::NotADirectory { .. } => "NOT_A_DIRECTORY",
            SdrError::MissingReferenceFile { .. } => "MISSING_REFERENCE_FILE",
            SdrError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SdrError::InvalidAudio { .. } => "INVALID_AUDIO",
            SdrError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SdrError::EmptyAudio => "EMPTY_AUDIO",
            SdrError::DegenerateSignal => "DEGENERATE_SIGNAL",
            SdrError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            SdrError::SampleRateMismatch { .. } => "SAMPLE_RATE_MISMATCH",
            SdrError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            SdrError::InvalidConfig { .. } => "INVALID_CONFIG",
            SdrError::ThreadPool { .. } => "THREAD_POOL",
            SdrError::Io(_) => "IO_ERROR",
            SdrError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error only affects a single song or (song, model) pair
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SdrError::DatasetNotFound { .. }
                | SdrError::NotADirectory { .. }
                | SdrError::InvalidConfig { .. }
                | SdrError::ThreadPool { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SdrError::DatasetNotFound { .. } | SdrError::NotADirectory { .. } => vec![
                "Check the --tracks-folder path",
                "The dataset root must contain one directory per song",
            ],
            SdrError::MissingReferenceFile { .. } => vec![
                "Each song directory needs original_vocals.wav and original_other.wav",
            ],
            SdrError::FileNotFound { .. } => vec![
                "Model outputs must be named vocals_<model>.wav",
                "Check that the model name matches the file suffix exactly",
            ],
            SdrError::InvalidAudio { .. } | SdrError::UnsupportedFormat { .. } => vec![
                "Re-export the file as PCM or 32-bit float WAV",
                "Check if the file plays in another application",
            ],
            SdrError::SampleRateMismatch { .. } => vec![
                "Ensure all files of a song share a sample rate, such as 44100 or 48000",
            ],
            SdrError::LengthMismatch { .. } => vec![
                "Run without --strict-length to compare the overlapping part only",
            ],
            SdrError::InvalidConfig { .. } => vec![
                "Pass at least one model with --models",
                "--threads must be at least 1",
            ],
            _ => vec![],
        }
    }
}
