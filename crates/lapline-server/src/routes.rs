//! HTTP and WebSocket routes
//!
//! Every REST handler answers from the shared [`TelemetrySession`]; unknown
//! vehicles produce empty bodies rather than errors.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use futures::{Sink, SinkExt, Stream, StreamExt};
use lapline_core::prelude::*;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sent to a replay socket when the vehicle has no frames
const NO_DATA_MESSAGE: &str = "No data for this driver";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    session: Arc<TelemetrySession>,
    /// Cancelled on server shutdown; replays run on child tokens
    shutdown: CancellationToken,
}

impl AppState {
    /// Wrap a loaded session
    pub fn new(session: TelemetrySession, shutdown: CancellationToken) -> Self {
        Self {
            session: Arc::new(session),
            shutdown,
        }
    }
}

/// Build the dashboard router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/drivers", get(drivers))
        .route("/api/track", get(track))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/stats", get(stats))
        .route("/api/history/{vehicle_id}", get(history))
        .route("/ws/telemetry/{vehicle_id}", get(telemetry_socket))
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

async fn drivers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "drivers": state.session.list_drivers() }))
}

async fn track(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "track_map": state.session.track_map() }))
}

async fn leaderboard(State(state): State<AppState>) -> Json<Vec<LeaderboardEntry>> {
    Json(state.session.leaderboard().to_vec())
}

async fn stats(State(state): State<AppState>) -> Json<SessionStats> {
    Json(state.session.stats().clone())
}

async fn history(State(state): State<AppState>, Path(vehicle_id): Path<String>) -> Response {
    let summary = state.session.lap_stats(&vehicle_id);
    if summary.is_empty() {
        Json(json!({})).into_response()
    } else {
        Json(summary).into_response()
    }
}

async fn telemetry_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| stream_replay(socket, state, vehicle_id))
}

/// How a replay socket session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketEnd {
    /// The vehicle had no frames; the client got the error message
    NoData,
    /// A replay ran and stopped
    Replayed(StreamEnd),
}

async fn stream_replay(socket: WebSocket, state: AppState, vehicle_id: String) {
    info!("Replay socket connected for {}", vehicle_id);

    let stream = state
        .session
        .open_replay_stream(&vehicle_id)
        .map(|stream| stream.with_cancellation(state.shutdown.child_token()));
    let (sink, incoming) = socket.split();

    let end = pump_replay(sink, incoming, &vehicle_id, stream).await;
    info!("Replay socket closed for {}: {:?}", vehicle_id, end);
}

/// Pump one vehicle's replay into a socket until it ends or the client leaves
///
/// `incoming` is watched on its own task, so a client that stops reading and
/// then disconnects still stops the replay.
async fn pump_replay<S, R, E>(
    mut sink: S,
    incoming: R,
    vehicle_id: &str,
    stream: Option<ReplayStream>,
) -> SocketEnd
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
    E: Send + 'static,
{
    let Some(stream) = stream else {
        warn!("No replay data for {}", vehicle_id);
        let body = json!({ "error": NO_DATA_MESSAGE }).to_string();
        if sink.send(Message::Text(body.into())).await.is_ok() {
            let _ = sink.send(Message::Close(None)).await;
        }
        return SocketEnd::NoData;
    };

    info!(
        "Replaying {} frames ({:.1}s) for {}",
        stream.record_count(),
        stream.total_delay().as_secs_f64(),
        vehicle_id
    );

    let cancel = stream.cancellation_token();
    let watcher = tokio::spawn(watch_for_disconnect(incoming, cancel.clone()));
    let (tx, mut rx) = mpsc::channel(1);
    let replay = tokio::spawn(stream.run(tx));

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = rx.recv() => frame,
        };

        let message = match frame {
            Some(record) => match serde_json::to_string(&record) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    error!("Failed to encode replay frame for {}: {}", vehicle_id, e);
                    break;
                }
            },
            None => Message::Close(None),
        };
        let closing = matches!(message, Message::Close(_));

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            result = sink.send(message) => match result {
                Ok(()) => true,
                Err(e) => {
                    debug!("Replay socket for {} stopped accepting frames: {}", vehicle_id, e);
                    false
                }
            },
        };
        if closing || !sent {
            break;
        }
    }

    // The replay task may be parked on a full channel; let it go first
    drop(rx);
    cancel.cancel();
    let _ = watcher.await;

    match replay.await {
        Ok(end) => SocketEnd::Replayed(end),
        Err(e) => {
            warn!("Replay task for {} failed: {}", vehicle_id, e);
            SocketEnd::Replayed(StreamEnd::Cancelled)
        }
    }
}

/// Cancel `cancel` once the client closes, errors or goes away
async fn watch_for_disconnect<R, E>(mut incoming: R, cancel: CancellationToken)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    cancel.cancel();
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const EXPORT: &str = "\
timestamp,vehicle_id,telemetry_name,telemetry_value,lap
2025-09-06T18:00:00.000Z,GR86-002-2,speed,100,1
2025-09-06T18:00:01.000Z,GR86-002-2,speed,120,1
2025-09-06T18:00:00.000Z,GR86-004-78,speed,110,1
";

    fn state() -> AppState {
        let dataset = Dataset::from_reader(EXPORT.as_bytes()).unwrap();
        AppState::new(TelemetrySession::new(dataset), CancellationToken::new())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_drivers_in_discovery_order() {
        let Json(body) = drivers(State(state())).await;
        assert_eq!(body, json!({ "drivers": ["GR86-002-2", "GR86-004-78"] }));
    }

    #[tokio::test]
    async fn test_track_wrapped_in_object() {
        let Json(body) = track(State(state())).await;
        assert_eq!(body, json!({ "track_map": [] }));
    }

    #[tokio::test]
    async fn test_stats() {
        let Json(body) = stats(State(state())).await;
        assert_eq!(body.total_drivers, 2);
        assert_eq!(body.top_speeds["GR86-002-2"], 120.0);
    }

    #[tokio::test]
    async fn test_history_for_known_vehicle() {
        let response = history(State(state()), Path("GR86-002-2".to_string())).await;
        let body = body_json(response).await;
        assert_eq!(body["best_lap"], json!(1.0));
        assert_eq!(body["lap_times"], json!({ "1": 1.0 }));
    }

    #[tokio::test]
    async fn test_history_for_unknown_vehicle_is_empty_object() {
        let response = history(State(state()), Path("GR86-999-9".to_string())).await;
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_leaderboard_ranked() {
        let Json(entries) = leaderboard(State(state())).await;
        // GR86-004-78 has a zero-length lap and is left off
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].driver, "GR86-002-2");
        assert_eq!(entries[0].gap, 0.0);
    }

    #[tokio::test]
    async fn test_cors_header_added() {
        let response = allow_any_origin(Response::new(Body::empty())).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
    }

    const REPLAY_VEHICLE: &str = "GR86-010-16";

    /// Thirty readings a second apart: six frames, the first after 0.1s
    /// and the rest after 1s each
    fn replay_state() -> AppState {
        let mut csv = String::from("timestamp,vehicle_id,telemetry_name,telemetry_value,lap\n");
        for i in 0..30 {
            csv += &format!(
                "2025-09-06T18:00:{i:02}.000Z,{REPLAY_VEHICLE},speed,{},1\n",
                100 + i
            );
        }
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        AppState::new(TelemetrySession::new(dataset), CancellationToken::new())
    }

    fn frame_speed(message: &Message) -> Option<f64> {
        match message {
            Message::Text(text) => {
                serde_json::from_str::<Value>(text.as_str()).ok()?["speed"].as_f64()
            }
            _ => None,
        }
    }

    fn client() -> (
        futures::channel::mpsc::UnboundedSender<Result<Message, axum::Error>>,
        futures::channel::mpsc::UnboundedReceiver<Result<Message, axum::Error>>,
    ) {
        futures::channel::mpsc::unbounded()
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_without_data_gets_error_then_close() {
        let state = replay_state();
        let (sink, sent) = futures::channel::mpsc::channel(8);
        let (_client, incoming) = client();

        let stream = state.session.open_replay_stream("GR86-999-9");
        let end = pump_replay(sink, incoming, "GR86-999-9", stream).await;
        assert_eq!(end, SocketEnd::NoData);

        let messages: Vec<Message> = sent.collect().await;
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            Message::Text(text) => assert_eq!(
                serde_json::from_str::<Value>(text.as_str()).unwrap(),
                json!({ "error": "No data for this driver" })
            ),
            other => panic!("expected error text, got {other:?}"),
        }
        assert!(matches!(messages[1], Message::Close(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_replays_every_frame_then_closes() {
        let state = replay_state();
        let (sink, sent) = futures::channel::mpsc::channel(8);
        let (_client, incoming) = client();

        let stream = state.session.open_replay_stream(REPLAY_VEHICLE);
        let end = pump_replay(sink, incoming, REPLAY_VEHICLE, stream).await;
        assert_eq!(end, SocketEnd::Replayed(StreamEnd::Completed));

        let messages: Vec<Message> = sent.collect().await;
        let speeds: Vec<f64> = messages.iter().filter_map(frame_speed).collect();
        assert_eq!(speeds, vec![100.0, 105.0, 110.0, 115.0, 120.0, 125.0]);
        assert_eq!(messages.len(), 7);
        assert!(matches!(messages.last(), Some(Message::Close(None))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_close_cancels_replay() {
        let state = replay_state();
        let (sink, mut sent) = futures::channel::mpsc::channel(8);
        let (client, incoming) = client();
        let stream = state.session.open_replay_stream(REPLAY_VEHICLE).unwrap();
        let token = stream.cancellation_token();

        let pump = tokio::spawn(pump_replay(sink, incoming, REPLAY_VEHICLE, Some(stream)));

        let first = sent.next().await.unwrap();
        assert_eq!(frame_speed(&first), Some(100.0));
        client.unbounded_send(Ok(Message::Close(None))).unwrap();

        let end = tokio::time::timeout(Duration::from_secs(60), pump)
            .await
            .expect("socket pump kept running after the client closed")
            .unwrap();
        assert_eq!(end, SocketEnd::Replayed(StreamEnd::Cancelled));
        assert!(token.is_cancelled());
        assert!(sent.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_client_disconnect_does_not_hang() {
        let state = replay_state();
        // One slot: the first frame fills it and nobody ever reads
        let (sink, sent) = futures::channel::mpsc::channel(0);
        let (client, incoming) = client();
        let stream = state.session.open_replay_stream(REPLAY_VEHICLE);

        let pump = tokio::spawn(pump_replay(sink, incoming, REPLAY_VEHICLE, stream));

        tokio::time::sleep(Duration::from_secs(3)).await;
        drop(client);

        let end = tokio::time::timeout(Duration::from_secs(60), pump)
            .await
            .expect("socket pump hung after a slow client left")
            .unwrap();
        assert_eq!(end, SocketEnd::Replayed(StreamEnd::Cancelled));

        let messages: Vec<Message> = sent.collect().await;
        let speeds: Vec<f64> = messages.iter().filter_map(frame_speed).collect();
        assert_eq!(speeds, vec![100.0]);
    }
}
