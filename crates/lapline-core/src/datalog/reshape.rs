//! Replay reshaping
//!
//! Prepares an aligned table for paced playback: fill gaps, thin the rows,
//! attach an inter-frame delay and format the timestamp.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::{AlignedRow, AlignedTable, ReplayRecord};

/// Keep every Nth aligned row (source logs run at roughly 5x the replay rate)
pub const REPLAY_DECIMATION: usize = 5;

/// Delay of the first frame, which has no predecessor
pub const DEFAULT_DELAY_S: f64 = 0.1;

/// Shortest wait between frames
pub const MIN_DELAY_S: f64 = 0.01;

/// Longest wait between frames; gaps in the log are compressed to this
pub const MAX_DELAY_S: f64 = 1.0;

/// Wire format of replay timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Forward-fill every channel column
///
/// Each missing value takes the most recent earlier value of its channel. A
/// channel with no earlier value is filled with zero. Every returned row
/// carries every channel of the table.
pub fn forward_fill(table: &AlignedTable) -> Vec<AlignedRow> {
    let mut last_seen: BTreeMap<&str, f64> = BTreeMap::new();

    table
        .rows()
        .iter()
        .map(|row| {
            let mut filled = AlignedRow::new(row.timestamp, row.lap);
            for channel in table.channels() {
                let value = match row.get(channel) {
                    Some(value) => {
                        last_seen.insert(channel.as_str(), value);
                        value
                    }
                    None => last_seen.get(channel.as_str()).copied().unwrap_or(0.0),
                };
                filled.values.insert(channel.clone(), value);
            }
            filled
        })
        .collect()
}

/// Reshape an aligned table into replay frames
///
/// Steps, in order: forward fill, keep every [`REPLAY_DECIMATION`]th row
/// starting at the first, compute the delay from the previous kept row
/// (first frame [`DEFAULT_DELAY_S`]) clamped to
/// [`MIN_DELAY_S`]..=[`MAX_DELAY_S`], and format the timestamp.
pub fn reshape_for_replay(table: &AlignedTable) -> Vec<ReplayRecord> {
    let filled = forward_fill(table);
    let mut previous: Option<NaiveDateTime> = None;

    filled
        .into_iter()
        .step_by(REPLAY_DECIMATION)
        .map(|row| {
            let delay = match previous {
                Some(prev) => {
                    let gap = row.timestamp - prev;
                    gap.num_microseconds()
                        .map(|us| us as f64 / 1_000_000.0)
                        .unwrap_or(MAX_DELAY_S)
                }
                None => DEFAULT_DELAY_S,
            };
            previous = Some(row.timestamp);

            ReplayRecord {
                timestamp: row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                channels: row.values,
                lap: row.lap,
                delay: delay.clamp(MIN_DELAY_S, MAX_DELAY_S),
            }
        })
        .collect()
}
