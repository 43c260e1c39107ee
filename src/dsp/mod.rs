//! DSP building blocks
//!
//! Only what the ensemble blend sweep needs: zero-phase Butterworth
//! crossover filters.

mod crossover;

pub use crossover::{ButterworthFilter, PassBand};
