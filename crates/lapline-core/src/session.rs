//! Telemetry Session
//!
//! A [`TelemetrySession`] owns one loaded dataset together with everything
//! derived from it. It is the surface the transport layer talks to: every
//! query on an unknown vehicle answers with an empty result, never an error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lapline_core::session::TelemetrySession;
//!
//! let session = TelemetrySession::load("R1_barber_telemetry_data.csv")?;
//! for entry in session.leaderboard().iter() {
//!     println!("{} {:.3} +{:.3}", entry.driver, entry.best_lap, entry.gap);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::ResultCache;
use crate::datalog::{
    align_vehicle, reshape_for_replay, AlignedTable, ReplayRecord, ReplayStream,
};
use crate::laps::{lap_summary, rank_drivers, LapSummary, LeaderboardEntry};
use crate::telemetry::{Dataset, LoadError, LoadReport, SPEED};
use crate::track::{build_track_map, TrackPoint};

/// Session-wide figures shown on the dashboard header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Highest `speed` value per vehicle (vehicles without speed are absent)
    pub top_speeds: BTreeMap<String, f64>,
    /// Number of vehicles discovered
    pub total_drivers: usize,
}

/// One loaded telemetry dataset and its derived results
#[derive(Debug)]
pub struct TelemetrySession {
    dataset: Dataset,
    /// Outline from the first discovered vehicle
    track_map: Vec<TrackPoint>,
    stats: SessionStats,
    cache: ResultCache,
}

impl TelemetrySession {
    /// Load a telemetry CSV and prepare a session
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Ok(Self::new(Dataset::load(path)?))
    }

    /// Prepare a session over an already loaded dataset
    ///
    /// Builds the track map and session stats up front; everything else is
    /// computed on demand.
    pub fn new(dataset: Dataset) -> Self {
        let track_map = match dataset.drivers().first() {
            Some(reference) => build_track_map(&align_vehicle(&dataset, reference)),
            None => Vec::new(),
        };
        let stats = compute_stats(&dataset);

        Self {
            dataset,
            track_map,
            stats,
            cache: ResultCache::new(),
        }
    }

    /// Vehicle ids in order of first appearance
    pub fn list_drivers(&self) -> &[String] {
        self.dataset.drivers()
    }

    /// Circuit outline
    pub fn track_map(&self) -> &[TrackPoint] {
        &self.track_map
    }

    /// Top speeds and driver count
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// What the loader kept and skipped
    pub fn load_report(&self) -> &LoadReport {
        self.dataset.report()
    }

    /// Dense time-aligned table for a vehicle
    pub fn aligned_table(&self, vehicle_id: &str) -> AlignedTable {
        align_vehicle(&self.dataset, vehicle_id)
    }

    /// Lap times, consistency and best lap for a vehicle
    pub fn lap_stats(&self, vehicle_id: &str) -> LapSummary {
        lap_summary(self.dataset.vehicle_samples(vehicle_id))
    }

    /// Standings ranked by best lap
    pub fn leaderboard(&self) -> Arc<[LeaderboardEntry]> {
        self.cache.leaderboard_or_init_with(|| {
            let ranked = rank_drivers(
                self.dataset
                    .drivers()
                    .iter()
                    .map(|driver| (driver.as_str(), self.lap_stats(driver))),
            );
            debug!("Computed leaderboard with {} entries", ranked.len());
            ranked
        })
    }

    /// Replay frames for a vehicle (empty if there is no data)
    pub fn replay_records(&self, vehicle_id: &str) -> Arc<[ReplayRecord]> {
        if !self.dataset.contains_vehicle(vehicle_id) {
            debug!("Vehicle {} not found in drivers list", vehicle_id);
            return Arc::from(Vec::new());
        }
        self.cache.replay_or_insert_with(vehicle_id, || {
            let records = reshape_for_replay(&self.aligned_table(vehicle_id));
            debug!("Prepared {} replay frames for {}", records.len(), vehicle_id);
            records
        })
    }

    /// Open a paced replay of a vehicle
    ///
    /// `None` means there is no data for the vehicle.
    pub fn open_replay_stream(&self, vehicle_id: &str) -> Option<ReplayStream> {
        ReplayStream::new(vehicle_id, self.replay_records(vehicle_id))
    }
}

fn compute_stats(dataset: &Dataset) -> SessionStats {
    let mut top_speeds = BTreeMap::new();
    for driver in dataset.drivers() {
        let top = dataset
            .vehicle_samples(driver)
            .iter()
            .filter(|s| s.channel == SPEED)
            .map(|s| s.value)
            .reduce(f64::max);
        if let Some(top) = top {
            top_speeds.insert(driver.clone(), top);
        }
    }

    SessionStats {
        top_speeds,
        total_drivers: dataset.drivers().len(),
    }
}
