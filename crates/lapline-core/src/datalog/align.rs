//! Timestamp alignment
//!
//! Pivots long-format samples (one value per row) into one row per distinct
//! timestamp. When a channel is reported twice at the same timestamp the
//! first reading in input order wins; the row's lap is likewise the first lap
//! reported at that timestamp.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use tracing::debug;

use super::{AlignedRow, AlignedTable};
use crate::telemetry::{Dataset, Sample};

/// Align one vehicle's samples into a dense table
///
/// Samples belonging to other vehicles are ignored. Every timestamp seen is
/// emitted, even when most channels are missing from it.
pub fn align_samples<'a, I>(vehicle_id: &str, samples: I) -> AlignedTable
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut rows: BTreeMap<NaiveDateTime, AlignedRow> = BTreeMap::new();
    let mut channels: BTreeSet<&str> = BTreeSet::new();

    for sample in samples {
        if sample.vehicle_id != vehicle_id {
            continue;
        }
        let row = rows
            .entry(sample.timestamp)
            .or_insert_with(|| AlignedRow::new(sample.timestamp, sample.lap));
        row.values
            .entry(sample.channel.clone())
            .or_insert(sample.value);
        channels.insert(sample.channel.as_str());
    }

    AlignedTable::from_parts(
        vehicle_id.to_string(),
        channels.into_iter().map(str::to_string).collect(),
        rows.into_values().collect(),
    )
}

/// Align a vehicle from the dataset; unknown vehicles give an empty table
pub fn align_vehicle(dataset: &Dataset, vehicle_id: &str) -> AlignedTable {
    if !dataset.contains_vehicle(vehicle_id) {
        debug!("No samples for {}, nothing to align", vehicle_id);
        return AlignedTable::empty(vehicle_id);
    }
    let table = align_samples(vehicle_id, dataset.vehicle_samples(vehicle_id));
    debug!(
        "Aligned {} into {} rows x {} channels",
        vehicle_id,
        table.len(),
        table.channels().len()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use pretty_assertions::assert_eq;

    fn at(millis: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 6)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
            + TimeDelta::milliseconds(millis)
    }

    #[test]
    fn test_first_occurrence_wins() {
        let samples = vec![
            Sample::new(at(0), "V1", "speed", 100.0, 1),
            Sample::new(at(0), "V1", "speed", 999.0, 2),
            Sample::new(at(0), "V1", "gear", 3.0, 2),
        ];

        let table = align_samples("V1", &samples);
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.get("speed"), Some(100.0));
        assert_eq!(row.get("gear"), Some(3.0));
        // Lap comes from the first sample at the timestamp
        assert_eq!(row.lap, 1);
    }

    #[test]
    fn test_rows_sorted_and_unique() {
        let samples = vec![
            Sample::new(at(200), "V1", "speed", 3.0, 1),
            Sample::new(at(0), "V1", "speed", 1.0, 1),
            Sample::new(at(100), "V1", "gear", 2.0, 1),
            Sample::new(at(0), "V1", "gear", 1.0, 1),
            Sample::new(at(200), "V1", "nmot", 5000.0, 1),
        ];

        let table = align_samples("V1", &samples);
        let stamps: Vec<NaiveDateTime> = table.rows().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![at(0), at(100), at(200)]);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.channels(), &["gear", "nmot", "speed"]);
        // Sparse rows are still emitted
        assert_eq!(table.rows()[1].get("speed"), None);
    }

    #[test]
    fn test_other_vehicles_ignored() {
        let samples = vec![
            Sample::new(at(0), "V1", "speed", 1.0, 1),
            Sample::new(at(50), "V2", "speed", 2.0, 1),
        ];
        assert_eq!(align_samples("V1", &samples).len(), 1);
        assert!(align_samples("V3", &samples).is_empty());
    }

    #[test]
    fn test_unknown_vehicle_in_dataset_is_empty() {
        let dataset = Dataset::from_samples(vec![Sample::new(at(0), "V1", "speed", 1.0, 1)]);
        let table = align_vehicle(&dataset, "V2");
        assert!(table.is_empty());
        assert_eq!(table.vehicle_id(), "V2");
    }
}
