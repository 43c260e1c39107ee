//! Progress notifications
//!
//! The comparison engine reports each finished unit to a [`ProgressObserver`].
//! Observers are called from worker threads, in completion order.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::eval::comparison::ExcludedSong;
use crate::eval::track::EvaluationOutcome;

pub trait ProgressObserver: Send + Sync {
    /// Called once before any work is scheduled
    fn on_start(&self, _songs: usize, _models: usize) {}

    /// A song's references could not be loaded; none of its units will run
    fn on_song_excluded(&self, _excluded: &ExcludedSong) {}

    /// A (song, model) unit finished
    fn on_unit_complete(&self, outcome: &EvaluationOutcome);
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_unit_complete(&self, _outcome: &EvaluationOutcome) {}
}

/// Observer that only counts completed and excluded work
#[derive(Debug, Default)]
pub struct CountingProgress {
    completed: AtomicUsize,
    excluded: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn excluded(&self) -> usize {
        self.excluded.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for CountingProgress {
    fn on_song_excluded(&self, _excluded: &ExcludedSong) {
        self.excluded.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unit_complete(&self, _outcome: &EvaluationOutcome) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}
