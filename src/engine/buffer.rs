//! Waveform storage
//!
//! A decoded audio file: planar 32-bit float samples plus the sample rate the
//! file was recorded at. No resampling is ever applied, so the sample rate is
//! carried through to the metric code which rejects mismatched pairs.

use crate::error::{Result, SdrError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert an energy (power) ratio to decibels
///
/// # Returns
/// Value in decibels. Returns f64::INFINITY for a zero denominator and
/// f64::NEG_INFINITY for a zero numerator; callers clamp before aggregating.
#[inline]
pub fn power_ratio_to_db(numerator: f64, denominator: f64) -> f64 {
    10.0 * (numerator / denominator).log10()
}

/// Sum of squared samples over every channel, accumulated in f64
pub fn energy(channels: &[Vec<f32>]) -> f64 {
    channels
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum()
}

// ============================================================================
// Waveform
// ============================================================================

/// Immutable decoded audio
///
/// Stores audio as non-interleaved 32-bit floating point samples, one
/// `Vec<f32>` per channel, all of equal length.
///
/// # Example
/// ```
/// use sdr_compare::engine::Waveform;
///
/// let wave = Waveform::new(vec![vec![0.5, -0.5], vec![0.25, -0.25]], 44100).unwrap();
/// assert_eq!(wave.num_channels(), 2);
/// assert_eq!(wave.num_frames(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Waveform {
    /// Create a waveform from planar channel data
    ///
    /// # Errors
    /// * `InvalidAudio` - no channels, channels of unequal length, or a zero
    ///   sample rate
    pub fn new(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(SdrError::InvalidAudio {
                reason: "waveform has no channels".to_string(),
                source: None,
            });
        }

        if sample_rate == 0 {
            return Err(SdrError::InvalidAudio {
                reason: "sample rate is 0 Hz".to_string(),
                source: None,
            });
        }

        let frames = samples[0].len();
        if let Some(bad) = samples.iter().position(|ch| ch.len() != frames) {
            return Err(SdrError::InvalidAudio {
                reason: format!(
                    "channel {} has {} frames, expected {}",
                    bad,
                    samples[bad].len(),
                    frames
                ),
                source: None,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a mono waveform
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a waveform from interleaved sample data (L, R, L, R, ...)
    pub fn from_interleaved(
        interleaved: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if channels == 0 || interleaved.len() % channels != 0 {
            return Err(SdrError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
                source: None,
            });
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];

        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::new(samples, sample_rate)
    }

    /// Convert to interleaved format (L, R, L, R, ...)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.num_channels() * self.num_frames());

        for frame in 0..self.num_frames() {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }

        interleaved
    }

    /// Planar sample data, one slice per channel
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Samples of a single channel
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.samples[0].len()
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Total energy (sum of squares across all channels)
    pub fn energy(&self) -> f64 {
        energy(&self.samples)
    }

    /// Copy of the first `frames` frames of every channel
    ///
    /// Never pads: asking for more frames than exist returns a full copy.
    pub fn truncated(&self, frames: usize) -> Waveform {
        let frames = frames.min(self.num_frames());
        Waveform {
            samples: self
                .samples
                .iter()
                .map(|ch| ch[..frames].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }
}
