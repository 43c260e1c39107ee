//! Reporting
//!
//! Plain-text rendering of leaderboards and sweeps, the JSON report
//! document, and a progress observer that logs each finished unit.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::config::CompareConfig;
use crate::error::Result;
use crate::eval::{
    BlendSweepReport, ComparisonReport, EvaluationOutcome, ExcludedSong, Leaderboard,
    ProgressObserver,
};

fn db(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "no data".to_string(),
    }
}

/// Ranked table, one row per model
pub fn render_leaderboard(board: &Leaderboard) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<5} {:<24} {:>10} {:>10} {:>10} {:>9}",
        "Rank", "Model", "Mean SDR", "Median", "Other SDR", "Songs"
    );
    let _ = writeln!(out, "{:-<73}", "");

    for entry in board.entries() {
        let _ = writeln!(
            out,
            "{:<5} {:<24} {:>10} {:>10} {:>10} {:>9}",
            entry.rank,
            entry.model,
            db(entry.mean_vocals_sdr),
            db(entry.median_vocals_sdr),
            db(entry.mean_other_sdr),
            format!("{}/{}", entry.songs_scored, entry.songs_attempted),
        );
    }

    out
}

/// Per-pair scores, skips and excluded songs
pub fn render_details(report: &ComparisonReport) -> String {
    let mut out = String::new();

    for outcome in &report.outcomes {
        match outcome {
            EvaluationOutcome::Scored(record) => {
                let _ = write!(
                    out,
                    "{} / {}: vocals {:.2} dB",
                    record.song, record.model, record.vocals_sdr
                );
                if let Some(other) = record.other_sdr {
                    let _ = write!(out, ", other {:.2} dB", other);
                }
                if let Some(reason) = &record.other_skip {
                    let _ = write!(out, ", other not scored ({})", reason);
                }
                out.push('\n');
            }
            EvaluationOutcome::Skipped(skipped) => {
                let _ = writeln!(
                    out,
                    "{} / {}: skipped [{}] {}",
                    skipped.song,
                    skipped.model,
                    skipped.reason.code(),
                    skipped.reason
                );
            }
        }
    }

    out.push_str(&render_excluded(&report.excluded_songs));
    out
}

fn render_excluded(excluded: &[ExcludedSong]) -> String {
    let mut out = String::new();
    for song in excluded {
        let _ = writeln!(out, "{}: excluded [{}] {}", song.song, song.error_code, song.reason);
    }
    out
}

/// One-line run summary
pub fn render_summary(report: &ComparisonReport) -> String {
    let scored = report.scored().count();
    let mut line = format!(
        "{} song(s), {} excluded, {} model(s): {} scored, {} skipped",
        report.songs_total,
        report.excluded_songs.len(),
        report.models.len(),
        scored,
        report.outcomes.len() - scored,
    );
    if report.interrupted {
        line.push_str(" (interrupted, partial results)");
    }
    line
}

/// Weight table and best pair of a blend sweep
pub fn render_blend(report: &BlendSweepReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8} {:>8} {:>10} {:>6}",
        report.primary, report.secondary, "Mean SDR", "Songs"
    );

    for score in &report.scores {
        let _ = writeln!(
            out,
            "{:>8.2} {:>8.2} {:>10} {:>6}",
            score.weights.primary,
            score.weights.secondary,
            db(score.mean_sdr),
            score.songs
        );
    }

    match (&report.best, report.best.as_ref().and_then(|b| b.mean_sdr)) {
        (Some(best), Some(sdr)) => {
            let _ = writeln!(
                out,
                "Best AVG SDR: {:.2} with weights {} / {} ({}, {})",
                sdr, report.primary, report.secondary, best.weights.primary, best.weights.secondary
            );
        }
        _ => {
            let _ = writeln!(out, "Best AVG SDR: no data");
        }
    }

    out.push_str(&render_excluded(&report.skipped_songs));
    out
}

/// JSON document written by `--json`
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub tool_version: &'static str,
    pub config: &'a CompareConfig,
    #[serde(flatten)]
    pub report: &'a ComparisonReport,
}

impl<'a> JsonReport<'a> {
    pub fn new(config: &'a CompareConfig, report: &'a ComparisonReport) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION"),
            config,
            report,
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Wrote report {} to {}", self.run_id, path.display());
        Ok(())
    }
}

/// Logs every completed unit as `[done/total] song / model: result`
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_start(&self, songs: usize, models: usize) {
        self.total.store(songs * models, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
    }

    fn on_song_excluded(&self, excluded: &ExcludedSong) {
        warn!("Song '{}' excluded: {}", excluded.song, excluded.reason);
    }

    fn on_unit_complete(&self, outcome: &EvaluationOutcome) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        match outcome {
            EvaluationOutcome::Scored(record) => info!(
                "[{}/{}] {} / {}: {:.2} dB",
                done, total, record.song, record.model, record.vocals_sdr
            ),
            EvaluationOutcome::Skipped(skipped) => info!(
                "[{}/{}] {} / {}: skipped ({})",
                done, total, skipped.song, skipped.model, skipped.reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{ScoreRecord, SkipReason, SkippedResult};

    fn sample_report() -> ComparisonReport {
        let outcomes = vec![
            EvaluationOutcome::Scored(ScoreRecord {
                song: "s1".into(),
                model: "A".into(),
                vocals_sdr: 9.5,
                other_sdr: Some(14.25),
                other_skip: None,
            }),
            EvaluationOutcome::Skipped(SkippedResult {
                song: "s1".into(),
                model: "B".into(),
                reason: SkipReason::DegenerateSignal,
            }),
        ];
        let models = vec!["A".to_string(), "B".to_string()];
        ComparisonReport {
            leaderboard: Leaderboard::from_outcomes(&models, &outcomes),
            models,
            outcomes,
            excluded_songs: vec![ExcludedSong {
                song: "s9".into(),
                error_code: "MISSING_REFERENCE_FILE".into(),
                reason: "missing original_vocals.wav".into(),
            }],
            songs_total: 2,
            interrupted: false,
        }
    }

    #[test]
    fn test_leaderboard_table() {
        let table = render_leaderboard(&sample_report().leaderboard);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains('A') && lines[2].contains("9.50") && lines[2].contains("1/1"));
        assert!(lines[3].contains('B') && lines[3].contains("no data") && lines[3].contains("0/1"));
    }

    #[test]
    fn test_details_and_summary() {
        let report = sample_report();
        let details = render_details(&report);
        assert!(details.contains("s1 / A: vocals 9.50 dB, other 14.25 dB"));
        assert!(details.contains("[DEGENERATE_SIGNAL]"));
        assert!(details.contains("s9: excluded [MISSING_REFERENCE_FILE]"));

        let summary = render_summary(&report);
        assert_eq!(summary, "2 song(s), 1 excluded, 2 model(s): 1 scored, 1 skipped");
    }

    #[test]
    fn test_json_document() {
        let report = sample_report();
        let config = CompareConfig::new(report.models.clone());
        let value = JsonReport::new(&config, &report).to_value().unwrap();

        assert_eq!(value["leaderboard"][0]["model"], "A");
        assert_eq!(value["leaderboard"][1]["mean_vocals_sdr"], serde_json::Value::Null);
        assert_eq!(value["outcomes"][0]["status"], "scored");
        assert_eq!(value["outcomes"][1]["reason"]["kind"], "degenerate_signal");
        assert_eq!(value["config"]["length_policy"], "truncate");
        assert!(value["run_id"].is_string());
    }

    #[test]
    fn test_console_progress_counts() {
        let progress = ConsoleProgress::new();
        progress.on_start(2, 3);
        for outcome in &sample_report().outcomes {
            progress.on_unit_complete(outcome);
        }
        assert_eq!(progress.total.load(Ordering::SeqCst), 6);
        assert_eq!(progress.done.load(Ordering::SeqCst), 2);
    }
}
