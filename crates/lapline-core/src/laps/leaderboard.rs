//! Leaderboard ranking

use serde::{Deserialize, Serialize};

use super::LapSummary;

/// One row of the standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Vehicle id
    pub driver: String,
    /// Best lap time in seconds
    pub best_lap: f64,
    /// Duration of the highest-numbered lap
    pub last_lap: f64,
    /// Laps with a duration
    pub laps_completed: usize,
    /// Seconds behind the fastest best lap (0 for the leader)
    pub gap: f64,
}

/// Rank drivers by best lap
///
/// `summaries` must be in driver discovery order: ties keep that order.
/// Drivers without a positive best lap are left out.
pub fn rank_drivers<I, S>(summaries: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = (S, LapSummary)>,
    S: Into<String>,
{
    let mut entries: Vec<LeaderboardEntry> = summaries
        .into_iter()
        .filter_map(|(driver, summary)| {
            let best_lap = summary.best_lap.filter(|best| *best > 0.0)?;
            Some(LeaderboardEntry {
                driver: driver.into(),
                best_lap,
                last_lap: summary.last_lap().unwrap_or_default(),
                laps_completed: summary.laps_completed(),
                gap: 0.0,
            })
        })
        .collect();

    // Stable: equal best laps keep discovery order
    entries.sort_by(|a, b| a.best_lap.total_cmp(&b.best_lap));

    if let Some(leader) = entries.first().map(|e| e.best_lap) {
        for entry in &mut entries {
            entry.gap = entry.best_lap - leader;
        }
    }
    entries
}
