//! Lap Analysis
//!
//! Segments a vehicle's telemetry by lap number and derives lap times,
//! consistency and best lap. All lap numbers present in the data produce a
//! lap, including partial out/in laps.

mod leaderboard;

pub use leaderboard::{rank_drivers, LeaderboardEntry};

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::telemetry::Sample;

/// Timing of one lap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapStat {
    /// Lap number
    pub lap: i64,
    /// Earliest sample of the lap
    pub start: NaiveDateTime,
    /// Latest sample of the lap
    pub end: NaiveDateTime,
    /// `end - start` in seconds (zero for single-timestamp laps)
    pub duration: f64,
}

/// Per-driver lap statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapSummary {
    /// Lap number -> duration in seconds, ascending by lap
    pub lap_times: BTreeMap<i64, f64>,
    /// Sample standard deviation of lap durations (0 with fewer than 2 laps)
    pub consistency: f64,
    /// Shortest lap duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_lap: Option<f64>,
}

impl LapSummary {
    /// Check if there are no laps (unknown vehicle or no samples)
    pub fn is_empty(&self) -> bool {
        self.lap_times.is_empty()
    }

    /// Number of laps with a duration
    pub fn laps_completed(&self) -> usize {
        self.lap_times.len()
    }

    /// Duration of the highest-numbered lap
    pub fn last_lap(&self) -> Option<f64> {
        self.lap_times.values().next_back().copied()
    }
}

/// Group samples by lap and time each lap, ascending by lap number
pub fn segment_laps(samples: &[Sample]) -> Vec<LapStat> {
    let mut bounds: BTreeMap<i64, (NaiveDateTime, NaiveDateTime)> = BTreeMap::new();
    for sample in samples {
        bounds
            .entry(sample.lap)
            .and_modify(|(start, end)| {
                *start = (*start).min(sample.timestamp);
                *end = (*end).max(sample.timestamp);
            })
            .or_insert((sample.timestamp, sample.timestamp));
    }

    bounds
        .into_iter()
        .map(|(lap, (start, end))| LapStat {
            lap,
            start,
            end,
            duration: seconds_between(start, end),
        })
        .collect()
}

/// Summarize timed laps
pub fn summarize_laps(laps: &[LapStat]) -> LapSummary {
    let durations: Vec<f64> = laps.iter().map(|l| l.duration).collect();

    LapSummary {
        lap_times: laps.iter().map(|l| (l.lap, l.duration)).collect(),
        consistency: sample_std_dev(&durations),
        best_lap: durations.iter().copied().reduce(f64::min),
    }
}

/// Segment and summarize in one step
pub fn lap_summary(samples: &[Sample]) -> LapSummary {
    summarize_laps(&segment_laps(samples))
}

fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Sample (n - 1) standard deviation; 0 when undefined
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std.is_finite() {
        std
    } else {
        0.0
    }
}
