//! Run configuration
//!
//! A comparison run is fully described by [`CompareConfig`]. It can be read
//! from a JSON file and then overridden field by field from the command
//! line; nothing is kept in global state.
//!
//! ```json
//! {
//!   "dataset_root": "songs",
//!   "models": ["htdemucs", "mdx23c"],
//!   "threads": 5,
//!   "length_policy": "strict",
//!   "evaluate_other": false
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdrError};
use crate::eval::comparison::{dedupe_models, default_threads};
use crate::metrics::LengthPolicy;

/// Dataset root used when none is given
pub const DEFAULT_DATASET_ROOT: &str = "songs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Directory holding one subdirectory per song
    pub dataset_root: PathBuf,
    /// Model names, matched against `vocals_<model>.wav`
    pub models: Vec<String>,
    /// Worker pool size
    pub threads: usize,
    pub length_policy: LengthPolicy,
    /// Also score `other_<model>.wav` when present
    pub evaluate_other: bool,
    /// Where to write the JSON report, if anywhere
    pub json_output: Option<PathBuf>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            models: Vec::new(),
            threads: default_threads(),
            length_policy: LengthPolicy::default(),
            evaluate_other: true,
            json_output: None,
        }
    }
}

impl CompareConfig {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            ..Default::default()
        }
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SdrError::FileNotFound {
                path: path.to_path_buf(),
                source: Some(e),
            },
            _ => SdrError::Io(e),
        })?;
        let config: CompareConfig = serde_json::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the config and collapse duplicate model names
    ///
    /// # Errors
    /// * `InvalidConfig` - no models, an empty model name, or zero threads
    pub fn validate(mut self) -> Result<Self> {
        if self.models.is_empty() {
            return Err(SdrError::InvalidConfig {
                reason: "at least one model name is required".to_string(),
            });
        }
        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(SdrError::InvalidConfig {
                reason: "model names must not be empty".to_string(),
            });
        }
        if self.threads == 0 {
            return Err(SdrError::InvalidConfig {
                reason: "thread count must be at least 1".to_string(),
            });
        }

        self.models = dedupe_models(&self.models);
        Ok(self)
    }
}
