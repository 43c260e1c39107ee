//! Audio file I/O
//!
//! WAV import/export via hound. Files are decoded to planar 32-bit float at
//! their native sample rate; nothing is resampled.
//!
//! The evaluators only see the [`AudioLoader`] trait, so tests and other
//! front ends can supply audio without touching the filesystem.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::Waveform;
use crate::error::{Result, SdrError};

/// Source of decoded audio for the evaluators
///
/// Implementations must report a missing file as `SdrError::FileNotFound`;
/// the track evaluator relies on that to tell absent model outputs apart
/// from unreadable ones.
pub trait AudioLoader: Send + Sync {
    /// Load the waveform stored at `path`
    fn load(&self, path: &Path) -> Result<Waveform>;
}

/// Loader for WAV files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl AudioLoader for WavLoader {
    fn load(&self, path: &Path) -> Result<Waveform> {
        import_wav(path)
    }
}

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 is written as float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }
}

/// Import a WAV file
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the integer bit depth is not 8/16/24/32
/// * `EmptyAudio` - If the file holds no frames
pub fn import_wav(path: &Path) -> Result<Waveform> {
    if !path.exists() {
        return Err(SdrError::FileNotFound {
            path: path.to_path_buf(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| SdrError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    debug!(
        "Decoding {} ({} ch, {} Hz, {}-bit {:?})",
        path.display(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    if channels == 0 {
        return Err(SdrError::InvalidAudio {
            reason: format!("{} declares zero channels", path.display()),
            source: None,
        });
    }

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples.len() < channels {
        return Err(SdrError::EmptyAudio);
    }

    // Drop a trailing partial frame rather than rejecting the file
    let whole = samples.len() - samples.len() % channels;
    Waveform::from_interleaved(&samples[..whole], channels, spec.sample_rate)
}

/// Export a waveform to a WAV file at its own sample rate
pub fn export_wav(wave: &Waveform, path: &Path, format: ExportFormat) -> Result<()> {
    let spec = WavSpec {
        channels: wave.num_channels() as u16,
        sample_rate: wave.sample_rate(),
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    if !matches!(format.bit_depth, 16 | 24 | 32) {
        return Err(SdrError::UnsupportedFormat {
            format: format!("{}-bit export (only 16, 24, 32 supported)", format.bit_depth),
        });
    }

    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;
    let full_scale = int_full_scale(format.bit_depth);

    for sample in wave.to_interleaved() {
        match format.bit_depth {
            32 => writer.write_sample(sample),
            16 => writer.write_sample(quantize(sample, full_scale) as i16),
            // hound carries 24-bit samples in an i32
            _ => writer.write_sample(quantize(sample, full_scale)),
        }
        .map_err(hound_to_io)?;
    }

    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn hound_to_io(e: hound::Error) -> SdrError {
    match e {
        hound::Error::IoError(io) => SdrError::Io(io),
        other => SdrError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Largest magnitude of a signed integer sample of `bits` width
fn int_full_scale(bits: u16) -> f32 {
    (1u64 << (bits - 1)) as f32
}

fn quantize(sample: f32, full_scale: f32) -> i32 {
    (sample * (full_scale - 1.0)).clamp(-full_scale, full_scale - 1.0) as i32
}

/// Decode every sample to f32; integer formats are normalized to [-1, 1)
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decoded: std::result::Result<Vec<f32>, hound::Error> = match sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect(),
        SampleFormat::Int if matches!(bits_per_sample, 8 | 16 | 24 | 32) => {
            let scale = 1.0 / int_full_scale(bits_per_sample);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect()
        }
        SampleFormat::Int => {
            return Err(SdrError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            })
        }
    };

    decoded.map_err(|e| SdrError::InvalidAudio {
        reason: format!(
            "Failed to decode {}-bit {:?} samples: {}",
            bits_per_sample, sample_format, e
        ),
        source: Some(Box::new(e)),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tone(frames: usize, channels: usize, sample_rate: u32) -> Waveform {
        let data = (0..channels)
            .map(|ch| {
                (0..frames)
                    .map(|i| (0.01 * i as f32 + ch as f32).sin() * 0.5)
                    .collect()
            })
            .collect();
        Waveform::new(data, sample_rate).unwrap()
    }

    #[test]
    fn test_float_export_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let original = tone(1000, 2, 44100);

        export_wav(&original, &path, ExportFormat::default()).unwrap();
        let imported = WavLoader.load(&path).unwrap();

        assert_eq!(imported, original);
    }

    #[test]
    fn test_16bit_keeps_native_sample_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono16.wav");
        let original = tone(500, 1, 22050);

        export_wav(&original, &path, ExportFormat::new(16)).unwrap();
        let imported = import_wav(&path).unwrap();

        assert_eq!(imported.sample_rate(), 22050);
        assert_eq!(imported.num_frames(), 500);
        for (orig, imp) in original.channel(0).iter().zip(imported.channel(0)) {
            assert!((orig - imp).abs() < 0.001, "Sample mismatch: {} vs {}", orig, imp);
        }
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_wav(Path::new("/nonexistent/path/vocals_x.wav"));
        match result.unwrap_err() {
            SdrError::FileNotFound { path, .. } => {
                assert!(path.to_string_lossy().contains("nonexistent"));
            }
            other => panic!("Expected FileNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_import_garbage_is_invalid_audio() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();

        let err = import_wav(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }

    #[test]
    fn test_unsupported_export_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.wav");
        let result = export_wav(&tone(10, 1, 44100), &path, ExportFormat::new(12));
        assert!(result.is_err());
    }
}
