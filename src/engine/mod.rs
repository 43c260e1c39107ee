//! Audio Engine Module
//!
//! Waveform storage and file I/O:
//! - Immutable planar waveforms
//! - WAV import/export and the loader seam used by the evaluators
//! - An in-memory loader

pub mod buffer;
pub mod io;
pub mod memory;

pub use buffer::{energy, power_ratio_to_db, Waveform};
pub use io::{export_wav, import_wav, AudioLoader, ExportFormat, WavLoader};
pub use memory::MemoryLoader;
