//! Dataset layout
//!
//! One directory per song under the dataset root:
//!
//! ```text
//! songs/
//!   <song>/
//!     original_vocals.wav      required
//!     original_other.wav       required
//!     vocals_<model>.wav       optional, one per model
//!     other_<model>.wav        optional, one per model
//! ```

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Result, SdrError};

pub const REFERENCE_VOCALS_FILE: &str = "original_vocals.wav";
pub const REFERENCE_OTHER_FILE: &str = "original_other.wav";

/// A song directory in the dataset
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SongDir {
    /// Directory label, used as the song's identity in every report
    pub name: String,
    pub path: PathBuf,
}

impl SongDir {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn reference_vocals_path(&self) -> PathBuf {
        self.path.join(REFERENCE_VOCALS_FILE)
    }

    pub fn reference_other_path(&self) -> PathBuf {
        self.path.join(REFERENCE_OTHER_FILE)
    }

    /// `vocals_<model>.wav`
    pub fn model_vocals_path(&self, model: &str) -> PathBuf {
        self.path.join(format!("vocals_{}.wav", model))
    }

    /// `other_<model>.wav`
    pub fn model_other_path(&self, model: &str) -> PathBuf {
        self.path.join(format!("other_{}.wav", model))
    }
}

/// List the song directories directly under `root`, sorted by name
///
/// # Errors
/// * `DatasetNotFound` - `root` does not exist
/// * `NotADirectory` - `root` is not a directory
/// * `Io` - the directory listing failed
pub fn discover_songs(root: &Path) -> Result<Vec<SongDir>> {
    if !root.exists() {
        return Err(SdrError::DatasetNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(SdrError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut songs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let fallback = || std::io::Error::new(std::io::ErrorKind::Other, "walk failed");
            SdrError::Io(e.into_io_error().unwrap_or_else(fallback))
        })?;

        if !entry.file_type().is_dir() {
            debug!("Ignoring non-directory {}", entry.path().display());
            continue;
        }

        songs.push(SongDir::new(
            entry.file_name().to_string_lossy().into_owned(),
            entry.path(),
        ));
    }

    songs.sort();

    if songs.is_empty() {
        warn!("No song directories found under {}", root.display());
    }

    Ok(songs)
}
