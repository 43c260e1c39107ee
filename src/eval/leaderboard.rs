//! Per-model aggregation and ranking
//!
//! The leaderboard is a pure function of the model list and the evaluation
//! outcomes. Contributing scores are sorted by song name before they are
//! summed, so the floating-point result does not depend on the order in
//! which worker threads finished.

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::eval::track::EvaluationOutcome;

/// Aggregate scores of one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position in the ranking
    pub rank: usize,
    pub model: String,
    /// Arithmetic mean of vocals SDR over scored songs; `None` means no data
    pub mean_vocals_sdr: Option<f64>,
    pub median_vocals_sdr: Option<f64>,
    /// Mean instrumental SDR over songs where `other_<model>.wav` was scored
    pub mean_other_sdr: Option<f64>,
    pub other_count: usize,
    /// Songs that contributed a vocals score
    pub songs_scored: usize,
    /// Songs the model was evaluated against (references loaded)
    pub songs_attempted: usize,
    pub songs_skipped: usize,
}

impl LeaderboardEntry {
    pub fn has_data(&self) -> bool {
        self.mean_vocals_sdr.is_some()
    }
}

/// Ranked models, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

#[derive(Default)]
struct Tally<'a> {
    vocals: Vec<(&'a str, f64)>,
    other: Vec<(&'a str, f64)>,
    attempted: usize,
    skipped: usize,
}

impl Leaderboard {
    /// Aggregate `outcomes` for every model in `models`
    ///
    /// Models are ranked by descending mean vocals SDR. Ties keep the order
    /// of `models`; models without a single scored song come last, also in
    /// the order of `models`. Outcomes for models not in the list are ignored
    /// and repeated model names count once.
    pub fn from_outcomes(models: &[String], outcomes: &[EvaluationOutcome]) -> Self {
        let mut order: Vec<&str> = Vec::with_capacity(models.len());
        let mut index: HashMap<&str, usize> = HashMap::new();
        for model in models {
            if !index.contains_key(model.as_str()) {
                index.insert(model.as_str(), order.len());
                order.push(model.as_str());
            }
        }

        let mut tallies: Vec<Tally> = order.iter().map(|_| Tally::default()).collect();

        for outcome in outcomes {
            let Some(&i) = index.get(outcome.model()) else {
                debug!("Ignoring outcome for unlisted model {}", outcome.model());
                continue;
            };
            let tally = &mut tallies[i];
            tally.attempted += 1;

            match outcome {
                EvaluationOutcome::Scored(record) => {
                    tally.vocals.push((record.song.as_str(), record.vocals_sdr));
                    if let Some(other) = record.other_sdr {
                        tally.other.push((record.song.as_str(), other));
                    }
                }
                EvaluationOutcome::Skipped(_) => tally.skipped += 1,
            }
        }

        let mut ranked: Vec<(usize, LeaderboardEntry)> = tallies
            .into_iter()
            .enumerate()
            .map(|(i, tally)| (i, summarize(order[i], tally)))
            .collect();

        ranked.sort_by(|(ia, a), (ib, b)| {
            match (a.mean_vocals_sdr, b.mean_vocals_sdr) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then(ia.cmp(ib))
        });

        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(pos, (_, mut entry))| {
                entry.rank = pos + 1;
                entry
            })
            .collect();

        Leaderboard { entries }
    }

    /// Entries in rank order
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn entry(&self, model: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.model == model)
    }

    /// Top-ranked model, if any model has data
    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.entries.first().filter(|e| e.has_data())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn summarize(model: &str, mut tally: Tally<'_>) -> LeaderboardEntry {
    by_song(&mut tally.vocals);
    by_song(&mut tally.other);

    LeaderboardEntry {
        rank: 0,
        model: model.to_string(),
        mean_vocals_sdr: mean(&tally.vocals),
        median_vocals_sdr: median(&tally.vocals),
        mean_other_sdr: mean(&tally.other),
        other_count: tally.other.len(),
        songs_scored: tally.vocals.len(),
        songs_attempted: tally.attempted,
        songs_skipped: tally.skipped,
    }
}

fn by_song(values: &mut [(&str, f64)]) {
    values.sort_by(|a, b| a.0.cmp(b.0).then(a.1.total_cmp(&b.1)));
}

fn mean(values: &[(&str, f64)]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|(_, v)| v).sum();
    Some(sum / values.len() as f64)
}

fn median(values: &[(&str, f64)]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
