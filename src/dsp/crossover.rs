//! Butterworth crossover filters
//!
//! Low/high-pass Butterworth filters built from cascaded biquad sections and
//! applied forward-backward (zero phase), which squares the magnitude
//! response: an order-3 design applied this way rolls off like order 6.

use std::f64::consts::PI;

use crate::engine::Waveform;
use crate::error::{Result, SdrError};

/// Which side of the cutoff to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassBand {
    LowPass,
    HighPass,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Second-order section using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn second_order(band: PassBand, sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match band {
            PassBand::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            PassBand::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
        };
        let a0 = 1.0 + alpha;

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// First-order section (bilinear transform, prewarped at the cutoff)
    fn first_order(band: PassBand, sample_rate: f64, frequency: f64) -> Self {
        let k = (PI * frequency / sample_rate).tan();
        let norm = 1.0 / (1.0 + k);

        let (b0, b1) = match band {
            PassBand::LowPass => (k * norm, k * norm),
            PassBand::HighPass => (norm, -norm),
        };

        BiquadCoeffs {
            b0,
            b1,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
        }
    }

    fn is_first_order(&self) -> bool {
        self.b2 == 0.0 && self.a2 == 0.0
    }

    /// Gain at 0 Hz
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Biquad filter state for one pass over one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// State after an infinitely long run of `input`, so a constant signal
    /// passes through without a start-up transient
    fn steady(input: f64, coeffs: &BiquadCoeffs) -> Self {
        let output = input * coeffs.dc_gain();
        BiquadState {
            x1: input,
            x2: input,
            y1: output,
            y2: output,
        }
    }

    /// Direct Form I
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Digital Butterworth filter as a cascade of biquad sections
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthFilter {
    sections: Vec<BiquadCoeffs>,
}

impl ButterworthFilter {
    /// Design a Butterworth filter of the given order
    ///
    /// # Errors
    /// * `InvalidConfig` - order 0, or a cutoff outside (0, Nyquist)
    pub fn new(band: PassBand, order: usize, cutoff_hz: f64, sample_rate: u32) -> Result<Self> {
        let fs = sample_rate as f64;
        if order == 0 {
            return Err(SdrError::InvalidConfig {
                reason: "filter order must be at least 1".to_string(),
            });
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < fs / 2.0) {
            return Err(SdrError::InvalidConfig {
                reason: format!(
                    "crossover {} Hz must lie between 0 and Nyquist ({} Hz)",
                    cutoff_hz,
                    fs / 2.0
                ),
            });
        }

        let mut sections = Vec::with_capacity(order / 2 + order % 2);
        if order % 2 == 1 {
            sections.push(BiquadCoeffs::first_order(band, fs, cutoff_hz));
        }
        for k in 0..order / 2 {
            // Pole pair k of the analog prototype
            let q = 1.0 / (2.0 * (PI * (2 * k + 1) as f64 / (2 * order) as f64).sin());
            sections.push(BiquadCoeffs::second_order(band, fs, cutoff_hz, q));
        }

        Ok(Self { sections })
    }

    /// Single causal pass
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        let mut data: Vec<f64> = input.iter().map(|&s| s as f64).collect();
        self.run_sections(&mut data, false);
        data.into_iter().map(|s| s as f32).collect()
    }

    /// Zero-phase forward-backward filtering
    ///
    /// The signal is extended at both ends by its odd reflection, and each
    /// pass starts from the steady state for its first sample, so a constant
    /// input comes back unchanged.
    pub fn filtfilt(&self, input: &[f32]) -> Vec<f32> {
        let n = input.len();
        if n < 2 {
            return self.process(input);
        }

        let pad = self.pad_len().min(n - 1);
        let first = input[0] as f64;
        let last = input[n - 1] as f64;

        let mut data = Vec::with_capacity(n + 2 * pad);
        data.extend((1..=pad).rev().map(|i| 2.0 * first - input[i] as f64));
        data.extend(input.iter().map(|&s| s as f64));
        data.extend((1..=pad).map(|i| 2.0 * last - input[n - 1 - i] as f64));

        self.run_sections(&mut data, true);
        data.reverse();
        self.run_sections(&mut data, true);
        data.reverse();

        data[pad..pad + n].iter().map(|&s| s as f32).collect()
    }

    /// Zero-phase filter every channel of `wave`
    pub fn apply(&self, wave: &Waveform) -> Result<Waveform> {
        let channels = wave.channels().iter().map(|ch| self.filtfilt(ch)).collect();
        Waveform::new(channels, wave.sample_rate())
    }

    /// Run every section over `data` in place; `steady_start` seeds each
    /// section at rest on the first sample instead of at zero
    fn run_sections(&self, data: &mut [f64], steady_start: bool) {
        for coeffs in &self.sections {
            let mut state = match data.first() {
                Some(&first) if steady_start => BiquadState::steady(first, coeffs),
                _ => BiquadState::default(),
            };
            for sample in data.iter_mut() {
                *sample = state.process(*sample, coeffs);
            }
        }
    }

    fn pad_len(&self) -> usize {
        let first_order = self.sections.iter().filter(|s| s.is_first_order()).count();
        3 * (2 * self.sections.len() + 1 - first_order)
    }
}
