//! Separation quality metrics

pub mod sdr;

pub use sdr::{compute_sdr, LengthPolicy, MAX_SDR_DB};
