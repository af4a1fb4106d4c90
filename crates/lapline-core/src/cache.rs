//! Result Cache - derived data memoized for one loaded dataset
//!
//! The ResultCache holds results that are expensive to derive and never
//! change while a dataset is loaded:
//! - Replay frames per vehicle
//! - The leaderboard
//!
//! Entries are filled on first access and never replaced or invalidated.
//! Concurrent first accesses may both compute a value; the first one stored
//! is kept and returned to everyone.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::datalog::ReplayRecord;
use crate::laps::LeaderboardEntry;

/// Write-once store for derived results
#[derive(Debug, Default)]
pub struct ResultCache {
    /// Replay frames keyed by vehicle id
    replays: RwLock<HashMap<String, Arc<[ReplayRecord]>>>,
    /// Standings across all vehicles
    leaderboard: OnceLock<Arc<[LeaderboardEntry]>>,
}

impl ResultCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cached replay frames for a vehicle
    pub fn replay(&self, vehicle_id: &str) -> Option<Arc<[ReplayRecord]>> {
        self.replays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(vehicle_id)
            .cloned()
    }

    /// Get replay frames, computing them on first access
    ///
    /// Empty results are returned but not stored, so unknown vehicle ids
    /// never grow the cache.
    pub fn replay_or_insert_with<F>(&self, vehicle_id: &str, compute: F) -> Arc<[ReplayRecord]>
    where
        F: FnOnce() -> Vec<ReplayRecord>,
    {
        if let Some(records) = self.replay(vehicle_id) {
            return records;
        }

        // Computed outside the lock; a racing writer may beat us to it
        let computed: Arc<[ReplayRecord]> = compute().into();
        if computed.is_empty() {
            return computed;
        }

        self.replays
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(vehicle_id.to_string())
            .or_insert(computed)
            .clone()
    }

    /// Get the leaderboard, computing it on first access
    pub fn leaderboard_or_init_with<F>(&self, compute: F) -> Arc<[LeaderboardEntry]>
    where
        F: FnOnce() -> Vec<LeaderboardEntry>,
    {
        self.leaderboard
            .get_or_init(|| compute().into())
            .clone()
    }
}
