//! Tests for paced replay through a session

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use lapline_core::prelude::*;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn at(millis: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 9, 6)
        .unwrap()
        .and_hms_opt(18, 0, 0)
        .unwrap()
        + TimeDelta::milliseconds(millis)
}

/// 25 rows 40ms apart, so each kept frame sits 200ms after the previous
fn session() -> TelemetrySession {
    let samples = (0..25).map(|i| Sample::new(at(i * 40), "V1", "speed", i as f64, 1));
    TelemetrySession::new(Dataset::from_samples(samples))
}

#[tokio::test(start_paused = true)]
async fn test_stream_paces_frames() {
    let session = session();
    let mut stream = session.open_replay_stream("V1").unwrap();
    assert_eq!(stream.record_count(), 5);
    assert_eq!(stream.total_delay(), Duration::from_millis(900));

    let start = Instant::now();
    let mut speeds = Vec::new();
    while let Some(frame) = stream.next_record().await {
        speeds.push(frame.channels["speed"]);
    }

    assert_eq!(speeds, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    assert_eq!(start.elapsed(), Duration::from_millis(900));
}

#[tokio::test(start_paused = true)]
async fn test_streams_are_independent() {
    let session = session();
    let mut first = session.open_replay_stream("V1").unwrap();
    let mut second = session.open_replay_stream("V1").unwrap();

    first.next_record().await.unwrap();
    first.next_record().await.unwrap();
    first.cancellation_token().cancel();

    assert!(first.next_record().await.is_none());
    assert!(!second.cancellation_token().is_cancelled());
    assert_eq!(second.remaining(), 5);
    assert_eq!(second.next_record().await.unwrap().channels["speed"], 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_token_stops_run() {
    let session = session();
    let shutdown = CancellationToken::new();
    let stream = session
        .open_replay_stream("V1")
        .unwrap()
        .with_cancellation(shutdown.child_token());

    let (tx, mut rx) = mpsc::channel(1);
    let handle = tokio::spawn(stream.run(tx));

    assert_eq!(rx.recv().await.unwrap().channels["speed"], 0.0);
    shutdown.cancel();

    assert_eq!(handle.await.unwrap(), StreamEnd::Cancelled);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_unknown_vehicle_has_no_stream() {
    assert!(session().open_replay_stream("V9").is_none());
}
