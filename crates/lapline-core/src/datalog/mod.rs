//! Time-Aligned Data Logs
//!
//! Turns sparse per-channel samples into dense rows and plays them back.

mod align;
mod playback;
mod reshape;

pub use align::{align_samples, align_vehicle};
pub use playback::{ReplayStream, StreamEnd};
pub use reshape::{
    forward_fill, reshape_for_replay, DEFAULT_DELAY_S, MAX_DELAY_S, MIN_DELAY_S,
    REPLAY_DECIMATION, TIMESTAMP_FORMAT,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One timestamp of one vehicle's telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    /// Row timestamp (unique within a table)
    pub timestamp: NaiveDateTime,
    /// Lap active at this timestamp
    pub lap: i64,
    /// Channel values observed at this timestamp
    pub values: BTreeMap<String, f64>,
}

impl AlignedRow {
    /// Create an empty row
    pub fn new(timestamp: NaiveDateTime, lap: i64) -> Self {
        Self {
            timestamp,
            lap,
            values: BTreeMap::new(),
        }
    }

    /// Value of a channel at this timestamp, if recorded
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.values.get(channel).copied()
    }
}

/// Dense, timestamp-ordered telemetry for one vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedTable {
    vehicle_id: String,
    /// Every channel seen for the vehicle, sorted by name
    channels: Vec<String>,
    rows: Vec<AlignedRow>,
}

impl AlignedTable {
    /// A table with no rows, the "no data" answer for unknown vehicles
    pub fn empty(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            channels: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        vehicle_id: String,
        channels: Vec<String>,
        rows: Vec<AlignedRow>,
    ) -> Self {
        Self {
            vehicle_id,
            channels,
            rows,
        }
    }

    /// Vehicle the table belongs to
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Channel columns
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Rows in ascending timestamp order
    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A paced replay frame as sent to the dashboard
///
/// Serializes flat: `{"timestamp": ..., "speed": ..., ..., "lap": 3, "delay": 0.1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// `YYYY-MM-DDTHH:MM:SS.ffffff`
    pub timestamp: String,
    /// Forward-filled channel values
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
    /// Lap active at this frame
    pub lap: i64,
    /// Seconds to wait before delivering this frame
    pub delay: f64,
}

impl ReplayRecord {
    /// The delay as a [`Duration`]; negative or non-finite delays wait zero
    pub fn delay_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay).unwrap_or(Duration::ZERO)
    }
}
