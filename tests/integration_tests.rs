//! Integration Tests
//!
//! End-to-end runs over small WAV datasets written to a temp directory.

use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use tempfile::{tempdir, TempDir};

use sdr_compare::config::CompareConfig;
use sdr_compare::engine::{export_wav, ExportFormat, WavLoader, Waveform};
use sdr_compare::eval::{
    discover_songs, BlendConfig, BlendSweep, ComparisonEngine, CountingProgress,
    EvaluationOutcome, SkipReason,
};
use sdr_compare::report::{render_leaderboard, JsonReport};
use sdr_compare::LengthPolicy;

const SAMPLE_RATE: u32 = 44100;

/// Two-channel tone used as every song's vocal reference
fn reference_wave(freq: f64, frames: usize) -> Waveform {
    let left: Vec<f32> = (0..frames)
        .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / SAMPLE_RATE as f64).sin()) as f32)
        .collect();
    let right: Vec<f32> = left.iter().map(|s| s * 0.8).collect();
    Waveform::new(vec![left, right], SAMPLE_RATE).unwrap()
}

/// Scale `reference` so that its SDR against the original is `sdr_db`
fn estimate_with_sdr(reference: &Waveform, sdr_db: f64) -> Waveform {
    let error_gain = 10f64.powf(-sdr_db / 20.0);
    scaled(reference, 1.0 - error_gain)
}

fn scaled(wave: &Waveform, gain: f64) -> Waveform {
    let channels = wave
        .channels()
        .iter()
        .map(|ch| ch.iter().map(|&s| (s as f64 * gain) as f32).collect())
        .collect();
    Waveform::new(channels, wave.sample_rate()).unwrap()
}

fn write(dir: &Path, name: &str, wave: &Waveform) {
    export_wav(wave, &dir.join(name), ExportFormat::default()).unwrap();
}

/// Song directory with both references in place
fn add_song(root: &Path, name: &str, reference: &Waveform) -> std::path::PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    write(&dir, "original_vocals.wav", reference);
    write(&dir, "original_other.wav", &scaled(reference, 0.3));
    dir
}

/// Two songs, two models: A scores 12 and 10 dB, B scores 8 and 8 dB
fn scenario_dataset() -> TempDir {
    let root = tempdir().unwrap();

    let ref1 = reference_wave(220.0, 4410);
    let song1 = add_song(root.path(), "song1", &ref1);
    write(&song1, "vocals_A.wav", &estimate_with_sdr(&ref1, 12.0));
    write(&song1, "vocals_B.wav", &estimate_with_sdr(&ref1, 8.0));

    let ref2 = reference_wave(330.0, 4410);
    let song2 = add_song(root.path(), "song2", &ref2);
    write(&song2, "vocals_A.wav", &estimate_with_sdr(&ref2, 10.0));
    write(&song2, "vocals_B.wav", &estimate_with_sdr(&ref2, 8.0));

    root
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Comparison runs
// ============================================================================

#[test]
fn test_two_model_ranking() {
    let root = scenario_dataset();
    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A", "B"])),
        Arc::new(WavLoader),
    )
    .with_threads(2);

    let report = engine.run_dataset(root.path(), &models(&["A", "B"])).unwrap();

    assert_eq!(report.songs_total, 2);
    assert_eq!(report.scored().count(), 4);
    assert!(!report.interrupted);

    let entries = report.leaderboard.entries();
    assert_eq!(entries[0].model, "A");
    assert_eq!(entries[0].rank, 1);
    assert_abs_diff_eq!(entries[0].mean_vocals_sdr.unwrap(), 11.0, epsilon = 1e-3);
    assert_eq!(entries[1].model, "B");
    assert_abs_diff_eq!(entries[1].mean_vocals_sdr.unwrap(), 8.0, epsilon = 1e-3);

    // other_<model>.wav files were never written
    assert!(report.scored().all(|r| r.other_sdr.is_none() && r.other_skip.is_none()));

    let table = render_leaderboard(&report.leaderboard);
    assert!(table.contains("11.00"));
}

#[test]
fn test_model_order_does_not_change_scores() {
    let root = scenario_dataset();
    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["B", "A"])),
        Arc::new(WavLoader),
    );

    let report = engine.run_dataset(root.path(), &models(&["B", "A"])).unwrap();
    assert_eq!(report.leaderboard.entries()[0].model, "A");
    assert_eq!(report.outcomes[0].model(), "B");
    assert_eq!(report.outcomes[0].song(), "song1");
}

#[test]
fn test_repeated_runs_are_identical() {
    let root = scenario_dataset();
    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A", "B"])),
        Arc::new(WavLoader),
    )
    .with_threads(4);

    let first = engine.run_dataset(root.path(), &models(&["A", "B"])).unwrap();
    let second = engine.run_dataset(root.path(), &models(&["A", "B"])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_song_without_reference_is_excluded() {
    let root = scenario_dataset();
    let broken = root.path().join("song3");
    fs::create_dir_all(&broken).unwrap();
    let reference = reference_wave(440.0, 4410);
    write(&broken, "vocals_A.wav", &reference);

    let progress = Arc::new(CountingProgress::new());
    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A", "B"])),
        Arc::new(WavLoader),
    )
    .with_observer(progress.clone());

    let report = engine.run_dataset(root.path(), &models(&["A", "B"])).unwrap();

    assert_eq!(report.songs_total, 3);
    assert_eq!(report.excluded_songs.len(), 1);
    assert_eq!(report.excluded_songs[0].song, "song3");
    assert_eq!(report.excluded_songs[0].error_code, "MISSING_REFERENCE_FILE");
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(progress.completed(), 4);
    assert_eq!(progress.excluded(), 1);
}

#[test]
fn test_missing_and_mismatched_outputs_are_skipped() {
    let root = scenario_dataset();
    let song1 = root.path().join("song1");
    let reference = reference_wave(220.0, 4410);
    let resampled = Waveform::new(reference.channels().to_vec(), 48000).unwrap();
    write(&song1, "vocals_C.wav", &resampled);

    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A", "C"])),
        Arc::new(WavLoader),
    );
    let report = engine.run_dataset(root.path(), &models(&["A", "C"])).unwrap();

    let reasons: Vec<&SkipReason> = report.skipped().map(|s| &s.reason).collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.iter().any(|r| matches!(
        r,
        SkipReason::SampleRateMismatch {
            reference: 44100,
            estimate: 48000
        }
    )));
    assert!(reasons
        .iter()
        .any(|r| matches!(r, SkipReason::MissingModelOutput { .. })));

    let c = report.leaderboard.entry("C").unwrap();
    assert!(!c.has_data());
    assert_eq!(c.rank, 2);
    assert_eq!(c.songs_skipped, 2);
}

#[test]
fn test_strict_length_skips_short_estimate() {
    let root = tempdir().unwrap();
    let reference = reference_wave(220.0, 4410);
    let song = add_song(root.path(), "song1", &reference);
    write(&song, "vocals_A.wav", &reference.truncated(4000));

    let mut config = CompareConfig::new(models(&["A"]));
    config.length_policy = LengthPolicy::Strict;
    let strict = ComparisonEngine::from_config(&config, Arc::new(WavLoader))
        .run_dataset(root.path(), &config.models)
        .unwrap();
    let expected = SkipReason::LengthMismatch {
        reference: 4410,
        estimate: 4000,
    };
    assert!(matches!(
        &strict.outcomes[0],
        EvaluationOutcome::Skipped(s) if s.reason == expected
    ));

    config.length_policy = LengthPolicy::Truncate;
    let truncated = ComparisonEngine::from_config(&config, Arc::new(WavLoader))
        .run_dataset(root.path(), &config.models)
        .unwrap();
    assert!(truncated.outcomes[0].score().unwrap().vocals_sdr >= 100.0);
}

#[test]
fn test_other_stem_is_scored_when_present() {
    let root = tempdir().unwrap();
    let reference = reference_wave(220.0, 4410);
    let song = add_song(root.path(), "song1", &reference);
    write(&song, "vocals_A.wav", &estimate_with_sdr(&reference, 10.0));
    let other_reference = scaled(&reference, 0.3);
    write(&song, "other_A.wav", &estimate_with_sdr(&other_reference, 6.0));

    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A"])),
        Arc::new(WavLoader),
    );
    let report = engine.run_dataset(root.path(), &models(&["A"])).unwrap();
    let record = report.outcomes[0].score().unwrap();
    assert_abs_diff_eq!(record.other_sdr.unwrap(), 6.0, epsilon = 1e-3);

    let entry = report.leaderboard.entry("A").unwrap();
    assert_abs_diff_eq!(entry.mean_other_sdr.unwrap(), 6.0, epsilon = 1e-3);
    assert_eq!(entry.other_count, 1);
}

#[test]
fn test_missing_dataset_is_fatal() {
    let engine = ComparisonEngine::from_config(
        &CompareConfig::new(models(&["A"])),
        Arc::new(WavLoader),
    );
    let err = engine
        .run_dataset(Path::new("/nonexistent/songs"), &models(&["A"]))
        .unwrap_err();
    assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
    assert!(!err.is_recoverable());
}

#[test]
fn test_json_report_file() {
    let root = scenario_dataset();
    let out = tempdir().unwrap();
    let path = out.path().join("report.json");

    let mut config = CompareConfig::new(models(&["A", "B"]));
    config.dataset_root = root.path().to_path_buf();
    let report = ComparisonEngine::from_config(&config, Arc::new(WavLoader))
        .run_dataset(&config.dataset_root, &config.models)
        .unwrap();
    JsonReport::new(&config, &report).write(&path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["leaderboard"][0]["model"], "A");
    assert_eq!(value["leaderboard"][1]["model"], "B");
    assert_eq!(value["outcomes"].as_array().unwrap().len(), 4);
    assert_eq!(value["songs_total"], 2);
    assert_eq!(value["config"]["models"][1], "B");
}

// ============================================================================
// Blend sweep
// ============================================================================

#[test]
fn test_blend_prefers_exact_model() {
    let root = tempdir().unwrap();
    for (name, freq) in [("song1", 200.0), ("song2", 300.0)] {
        let reference = reference_wave(freq, 8820);
        let song = add_song(root.path(), name, &reference);
        write(&song, "vocals_exact.wav", &reference);
        write(&song, "vocals_half.wav", &scaled(&reference, 0.5));
    }
    // Missing one estimate drops the song from the sweep
    let partial = add_song(root.path(), "song3", &reference_wave(250.0, 8820));
    write(&partial, "vocals_exact.wav", &reference_wave(250.0, 8820));

    let songs = discover_songs(root.path()).unwrap();
    let mut config = BlendConfig::new("exact", "half");
    config.threads = 2;
    let report = BlendSweep::new(config, Arc::new(WavLoader))
        .unwrap()
        .run(&songs)
        .unwrap();

    assert_eq!(report.scores.len(), 11);
    assert!(report.scores.iter().all(|s| s.songs == 2));
    assert_eq!(report.skipped_songs.len(), 1);
    assert_eq!(report.skipped_songs[0].song, "song3");

    let best = report.best.unwrap();
    assert_eq!(best.weights.primary, 10.0);
    assert_eq!(best.weights.secondary, 0.0);

    let worst = &report.scores[0];
    assert!(worst.mean_sdr.unwrap() < best.mean_sdr.unwrap());
}
