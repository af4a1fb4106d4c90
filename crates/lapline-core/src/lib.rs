//! # Lapline Core Library
//!
//! Core functionality for the Lapline race telemetry dashboard.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Long-format telemetry CSV loading with channel filtering
//! - Timestamp alignment of sparse channels into dense rows
//! - Track outline extraction from GPS channels
//! - Lap segmentation, consistency and leaderboard ranking
//! - Replay reshaping and paced, cancellable playback
//!
//! ## Example
//!
//! ```rust,ignore
//! use lapline_core::prelude::*;
//!
//! // Load one race export
//! let session = TelemetrySession::load("R1_barber_telemetry_data.csv")?;
//!
//! // Replay the first driver
//! let driver = &session.list_drivers()[0];
//! if let Some(mut stream) = session.open_replay_stream(driver) {
//!     while let Some(frame) = stream.next_record().await {
//!         println!("{} lap {}", frame.timestamp, frame.lap);
//!     }
//! }
//! ```

pub mod cache;
pub mod datalog;
pub mod laps;
pub mod session;
pub mod telemetry;
pub mod track;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::ResultCache;
    pub use crate::datalog::{AlignedRow, AlignedTable, ReplayRecord, ReplayStream, StreamEnd};
    pub use crate::laps::{LapStat, LapSummary, LeaderboardEntry};
    pub use crate::session::{SessionStats, TelemetrySession};
    pub use crate::telemetry::{Dataset, LoadError, LoadReport, Sample};
    pub use crate::track::TrackPoint;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
