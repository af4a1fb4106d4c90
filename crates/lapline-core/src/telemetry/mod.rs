//! Telemetry Samples
//!
//! Loads long-format race telemetry (one row per timestamp, vehicle and
//! channel) and keeps the channels the dashboard displays.

mod channels;
mod error;
mod loader;

pub use channels::{
    filter_channels, is_dashboard_channel, BRAKE_PRESSURE, DASHBOARD_CHANNELS, ENGINE_SPEED,
    GEAR, GPS_LATITUDE, GPS_LONGITUDE, LAP_DISTANCE, LATERAL_ACCEL, LONGITUDINAL_ACCEL, SPEED,
    STEERING_ANGLE, THROTTLE,
};
pub use error::LoadError;
pub use loader::{parse_timestamp, Dataset, LoadReport};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single telemetry reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken (UTC)
    pub timestamp: NaiveDateTime,
    /// Vehicle that produced the reading
    pub vehicle_id: String,
    /// Channel name, e.g. `speed`
    pub channel: String,
    /// Channel value
    pub value: f64,
    /// Lap number reported alongside the reading
    pub lap: i64,
}

impl Sample {
    /// Create a new sample
    pub fn new(
        timestamp: NaiveDateTime,
        vehicle_id: impl Into<String>,
        channel: impl Into<String>,
        value: f64,
        lap: i64,
    ) -> Self {
        Self {
            timestamp,
            vehicle_id: vehicle_id.into(),
            channel: channel.into(),
            value,
            lap,
        }
    }
}
