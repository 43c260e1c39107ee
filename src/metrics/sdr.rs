//! Signal-to-Distortion Ratio
//!
//! SDR(dB) = 10 * log10(||r||^2 / ||r - e||^2) with energies summed over
//! every sample of every channel.

use serde::{Deserialize, Serialize};

use crate::engine::{power_ratio_to_db, Waveform};
use crate::error::{Result, SdrError};

/// Value reported when the estimate reproduces the reference exactly
///
/// All results are clamped to this ceiling so aggregation never sees an
/// infinite score.
pub const MAX_SDR_DB: f64 = 120.0;

/// How to treat reference/estimate pairs with different frame counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Compare the overlapping frames only; never pad
    #[default]
    Truncate,
    /// Any difference in frame count is a `LengthMismatch`
    Strict,
}

/// Compute the SDR of `estimate` against `reference`, in dB
///
/// # Errors
/// * `SampleRateMismatch` - the two signals have different sample rates
/// * `ChannelMismatch` - the two signals have different channel counts
/// * `LengthMismatch` - frame counts differ under `LengthPolicy::Strict`
/// * `DegenerateSignal` - the compared part of the reference has no energy
/// * `InvalidAudio` - either signal contains NaN or infinite samples
pub fn compute_sdr(reference: &Waveform, estimate: &Waveform, policy: LengthPolicy) -> Result<f64> {
    if reference.sample_rate() != estimate.sample_rate() {
        return Err(SdrError::SampleRateMismatch {
            reference: reference.sample_rate(),
            estimate: estimate.sample_rate(),
        });
    }

    if reference.num_channels() != estimate.num_channels() {
        return Err(SdrError::ChannelMismatch {
            reference: reference.num_channels(),
            estimate: estimate.num_channels(),
        });
    }

    let frames = match policy {
        LengthPolicy::Strict if reference.num_frames() != estimate.num_frames() => {
            return Err(SdrError::LengthMismatch {
                reference: reference.num_frames(),
                estimate: estimate.num_frames(),
            });
        }
        _ => reference.num_frames().min(estimate.num_frames()),
    };

    let (signal, distortion) = energies(reference.channels(), estimate.channels(), frames);

    if !signal.is_finite() || !distortion.is_finite() {
        return Err(SdrError::InvalidAudio {
            reason: "signal contains non-finite samples".to_string(),
            source: None,
        });
    }

    if frames == 0 || signal == 0.0 {
        return Err(SdrError::DegenerateSignal);
    }

    if distortion == 0.0 {
        return Ok(MAX_SDR_DB);
    }

    Ok(power_ratio_to_db(signal, distortion).min(MAX_SDR_DB))
}

/// Reference energy and residual energy over the first `frames` frames
fn energies(reference: &[Vec<f32>], estimate: &[Vec<f32>], frames: usize) -> (f64, f64) {
    reference
        .iter()
        .zip(estimate)
        .flat_map(|(r, e)| r[..frames].iter().zip(&e[..frames]))
        .fold((0.0_f64, 0.0_f64), |(signal, distortion), (&r, &e)| {
            let r = r as f64;
            let residual = r - e as f64;
            (signal + r * r, distortion + residual * residual)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mono(samples: Vec<f32>) -> Waveform {
        Waveform::mono(samples, 44100).unwrap()
    }

    #[test]
    fn test_identical_signals_hit_ceiling() {
        let reference =
            Waveform::new(vec![vec![0.3, -0.2, 0.9], vec![0.1, 0.0, -0.7]], 48000).unwrap();
        let sdr = compute_sdr(&reference, &reference.clone(), LengthPolicy::Strict).unwrap();
        assert!(sdr >= MAX_SDR_DB);
        assert!(sdr.is_finite());
    }

    #[test]
    fn test_silent_reference_is_degenerate() {
        let reference = mono(vec![0.0; 64]);
        let estimate = mono(vec![0.5; 64]);
        let err = compute_sdr(&reference, &estimate, LengthPolicy::Truncate).unwrap_err();
        assert!(matches!(err, SdrError::DegenerateSignal));

        // Silent even when the estimate is silent too
        let err = compute_sdr(&reference, &reference.clone(), LengthPolicy::Truncate).unwrap_err();
        assert!(matches!(err, SdrError::DegenerateSignal));
    }

    #[test]
    fn test_known_ratio() {
        // residual energy is a tenth of the signal energy
        let reference = mono(vec![1.0; 100]);
        let estimate = mono(vec![1.0 - 0.1_f32.sqrt(); 100]);
        let sdr = compute_sdr(&reference, &estimate, LengthPolicy::Truncate).unwrap();
        assert_relative_eq!(sdr, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_silent_estimate_scores_zero() {
        let reference = mono(vec![0.5, -0.5, 0.25]);
        let estimate = mono(vec![0.0; 3]);
        let sdr = compute_sdr(&reference, &estimate, LengthPolicy::Truncate).unwrap();
        assert_relative_eq!(sdr, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_not_symmetric() {
        let a = mono(vec![1.0; 4]);
        let b = mono(vec![0.5; 4]);

        // ||a||^2 = 4, ||a - b||^2 = 1
        let forward = compute_sdr(&a, &b, LengthPolicy::Strict).unwrap();
        // ||b||^2 = 1, ||b - a||^2 = 1
        let backward = compute_sdr(&b, &a, LengthPolicy::Strict).unwrap();

        assert_relative_eq!(forward, 10.0 * 4.0_f64.log10(), epsilon = 1e-9);
        assert_relative_eq!(backward, 0.0, epsilon = 1e-9);
        assert!(forward > backward);
    }

    #[test]
    fn test_truncate_ignores_tail() {
        let reference = mono(vec![1.0, 1.0, 1.0, 1.0, 9.0, 9.0]);
        let estimate = mono(vec![0.5; 4]);
        let truncated = compute_sdr(&reference, &estimate, LengthPolicy::Truncate).unwrap();
        assert_relative_eq!(truncated, 10.0 * 4.0_f64.log10(), epsilon = 1e-9);
    }

    #[test]
    fn test_strict_rejects_length_difference() {
        let reference = mono(vec![1.0; 6]);
        let estimate = mono(vec![1.0; 4]);
        match compute_sdr(&reference, &estimate, LengthPolicy::Strict) {
            Err(SdrError::LengthMismatch { reference, estimate }) => {
                assert_eq!(reference, 6);
                assert_eq!(estimate, 4);
            }
            other => panic!("Expected LengthMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_sample_rate_and_channel_mismatch() {
        let reference = Waveform::mono(vec![1.0; 4], 44100).unwrap();
        let estimate = Waveform::mono(vec![1.0; 4], 48000).unwrap();
        assert!(matches!(
            compute_sdr(&reference, &estimate, LengthPolicy::Truncate),
            Err(SdrError::SampleRateMismatch { .. })
        ));

        let stereo = Waveform::new(vec![vec![1.0; 4], vec![1.0; 4]], 44100).unwrap();
        assert!(matches!(
            compute_sdr(&reference, &stereo, LengthPolicy::Truncate),
            Err(SdrError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let reference = mono(vec![1.0, f32::NAN]);
        let estimate = mono(vec![1.0, 0.0]);
        assert!(matches!(
            compute_sdr(&reference, &estimate, LengthPolicy::Truncate),
            Err(SdrError::InvalidAudio { .. })
        ));
    }

    #[test]
    fn test_length_policy_serde() {
        let policy: LengthPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, LengthPolicy::Strict);
        assert_eq!(LengthPolicy::default(), LengthPolicy::Truncate);
    }
}
