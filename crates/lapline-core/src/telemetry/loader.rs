//! Telemetry CSV loader
//!
//! Reads the long-format telemetry export into a [`Dataset`]. Rows that
//! cannot be parsed are skipped and counted; only a missing or unreadable
//! file (or a missing required column) fails the load.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{filter_channels, LoadError, Sample};

/// Columns the loader needs; any others are ignored
const REQUIRED_COLUMNS: [&str; 5] = [
    "timestamp",
    "vehicle_id",
    "telemetry_name",
    "telemetry_value",
    "lap",
];

/// Malformed rows past this count are only logged at debug level
const MAX_WARNED_ROWS: usize = 5;

/// Naive timestamp layouts tried after RFC 3339
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Deserialize)]
struct RawRow {
    timestamp: String,
    vehicle_id: String,
    telemetry_name: String,
    telemetry_value: String,
    lap: String,
}

impl RawRow {
    fn into_sample(self) -> Result<Sample, String> {
        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| format!("unparseable timestamp '{}'", self.timestamp))?;
        let value = self
            .telemetry_value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("non-numeric value '{}'", self.telemetry_value))?;
        let lap = parse_lap(&self.lap).ok_or_else(|| format!("invalid lap '{}'", self.lap))?;

        Ok(Sample {
            timestamp,
            vehicle_id: self.vehicle_id,
            channel: self.telemetry_name,
            value,
            lap,
        })
    }
}

/// Parse a telemetry timestamp
///
/// Accepts RFC 3339 (normalized to UTC) and naive `YYYY-MM-DD[T ]HH:MM:SS[.f]`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Lap numbers sometimes arrive as `3.0` when the exporter went through floats
fn parse_lap(text: &str) -> Option<i64> {
    if let Ok(lap) = text.parse::<i64>() {
        return Some(lap);
    }
    let lap = text.parse::<f64>().ok()?;
    if lap.is_finite() && lap.fract() == 0.0 && lap.abs() < i64::MAX as f64 {
        Some(lap as i64)
    } else {
        None
    }
}

/// Summary of a completed load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Data rows encountered (header excluded)
    pub rows_read: usize,
    /// Rows dropped as malformed
    pub rows_skipped: usize,
    /// Samples kept after channel filtering
    pub samples_kept: usize,
}

/// All telemetry loaded for one run
///
/// Read-only once built. Samples are bucketed per vehicle in input order, and
/// only dashboard channels are kept.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Vehicle ids in order of first appearance
    drivers: Vec<String>,
    /// Filtered samples per vehicle
    by_vehicle: HashMap<String, Vec<Sample>>,
    report: LoadReport,
}

impl Dataset {
    /// Load a telemetry CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        info!("Loading telemetry from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load telemetry CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(LoadError::MissingColumn(column.to_string()));
            }
        }

        let mut samples = Vec::new();
        let mut rows_read = 0usize;
        let mut rows_skipped = 0usize;
        let mut record = csv::StringRecord::new();

        loop {
            let parsed = match rdr.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => record
                    .deserialize::<RawRow>(Some(&headers))
                    .map_err(|e| e.to_string())
                    .and_then(RawRow::into_sample),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => Err(e.to_string()),
            };
            rows_read += 1;

            match parsed {
                Ok(sample) => samples.push(sample),
                Err(reason) => {
                    let line = record.position().map(|p| p.line()).unwrap_or_default();
                    if rows_skipped < MAX_WARNED_ROWS {
                        warn!("Skipping malformed telemetry row at line {line}: {reason}");
                    } else {
                        debug!("Skipping malformed telemetry row at line {line}: {reason}");
                    }
                    rows_skipped += 1;
                }
            }
        }

        let mut dataset = Self::from_samples(samples);
        dataset.report.rows_read = rows_read;
        dataset.report.rows_skipped = rows_skipped;

        info!(
            "Loaded {} rows ({} skipped), {} dashboard samples across {} drivers",
            rows_read,
            rows_skipped,
            dataset.report.samples_kept,
            dataset.drivers.len()
        );
        Ok(dataset)
    }

    /// Build a dataset from samples already in memory
    ///
    /// Drivers are discovered over every sample; only dashboard channels are
    /// retained afterwards.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let samples: Vec<Sample> = samples.into_iter().collect();
        let rows = samples.len();

        let mut drivers: Vec<String> = Vec::new();
        let mut by_vehicle: HashMap<String, Vec<Sample>> = HashMap::new();
        for sample in &samples {
            if let Entry::Vacant(slot) = by_vehicle.entry(sample.vehicle_id.clone()) {
                drivers.push(slot.key().clone());
                slot.insert(Vec::new());
            }
        }

        let filtered = filter_channels(samples);
        let samples_kept = filtered.len();
        for sample in filtered {
            if let Some(bucket) = by_vehicle.get_mut(&sample.vehicle_id) {
                bucket.push(sample);
            }
        }

        Self {
            drivers,
            by_vehicle,
            report: LoadReport {
                rows_read: rows,
                rows_skipped: 0,
                samples_kept,
            },
        }
    }

    /// Vehicle ids in discovery order
    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }

    /// Check whether a vehicle appeared in the input
    pub fn contains_vehicle(&self, vehicle_id: &str) -> bool {
        self.by_vehicle.contains_key(vehicle_id)
    }

    /// Filtered samples for one vehicle in input order (empty if unknown)
    pub fn vehicle_samples(&self, vehicle_id: &str) -> &[Sample] {
        self.by_vehicle
            .get(vehicle_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Load summary
    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}
