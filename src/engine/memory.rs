//! In-memory audio source
//!
//! Serves pre-built waveforms keyed by path. Used by front ends that already
//! hold decoded audio and by the evaluator tests; it also counts loads per
//! path so callers can check that references are decoded once per song.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::engine::buffer::Waveform;
use crate::engine::io::AudioLoader;
use crate::error::{Result, SdrError};

#[derive(Debug, Default)]
pub struct MemoryLoader {
    waves: Mutex<HashMap<PathBuf, Waveform>>,
    loads: Mutex<HashMap<PathBuf, usize>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `wave` under `path`, replacing any previous entry
    pub fn insert(&self, path: impl Into<PathBuf>, wave: Waveform) {
        lock(&self.waves).insert(path.into(), wave);
    }

    pub fn remove(&self, path: &Path) -> Option<Waveform> {
        lock(&self.waves).remove(path)
    }

    /// How many times `path` was requested, including failed requests
    pub fn load_count(&self, path: &Path) -> usize {
        lock(&self.loads).get(path).copied().unwrap_or(0)
    }
}

impl AudioLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Waveform> {
        *lock(&self.loads).entry(path.to_path_buf()).or_insert(0) += 1;

        lock(&self.waves)
            .get(path)
            .cloned()
            .ok_or_else(|| SdrError::FileNotFound {
                path: path.to_path_buf(),
                source: None,
            })
    }
}

// A panicking test thread must not hide the map from the others
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serves_and_counts() {
        let loader = MemoryLoader::new();
        let path = PathBuf::from("/mem/a.wav");
        loader.insert(path.clone(), Waveform::mono(vec![0.1, 0.2], 44100).unwrap());

        assert_eq!(loader.load(&path).unwrap().num_frames(), 2);
        assert!(matches!(
            loader.load(Path::new("/mem/b.wav")),
            Err(SdrError::FileNotFound { .. })
        ));
        assert_eq!(loader.load_count(&path), 1);
        assert_eq!(loader.load_count(Path::new("/mem/b.wav")), 1);

        loader.remove(&path);
        assert!(loader.load(&path).is_err());
    }
}
