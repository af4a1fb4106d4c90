//! Track outline
//!
//! Derives the circuit shape from one reference vehicle's GPS channels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::datalog::AlignedTable;
use crate::telemetry::{GPS_LATITUDE, GPS_LONGITUDE};

/// Keep every Nth GPS fix
pub const TRACK_MAP_DECIMATION: usize = 10;

/// A point on the circuit outline
///
/// Serialized as a `[lat, lon]` pair, which map polylines take directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    /// Latitude (minutes, as logged)
    pub lat: f64,
    /// Longitude (minutes, as logged)
    pub lon: f64,
}

impl Serialize for TrackPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.lat, self.lon).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TrackPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (lat, lon) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self { lat, lon })
    }
}

/// Build the track outline from an aligned table
///
/// Rows lacking either GPS channel are dropped, then every
/// [`TRACK_MAP_DECIMATION`]th remaining row is kept, in time order.
pub fn build_track_map(table: &AlignedTable) -> Vec<TrackPoint> {
    let points: Vec<TrackPoint> = table
        .rows()
        .iter()
        .filter_map(|row| {
            Some(TrackPoint {
                lat: row.get(GPS_LATITUDE)?,
                lon: row.get(GPS_LONGITUDE)?,
            })
        })
        .step_by(TRACK_MAP_DECIMATION)
        .collect();

    info!(
        "Generated track map with {} points from {}",
        points.len(),
        table.vehicle_id()
    );
    points
}
