//! Replay playback
//!
//! Paces a vehicle's replay frames out to a consumer, waiting each frame's
//! delay before handing it over. A stream can be cancelled at any wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ReplayRecord;

/// How a replay stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every frame was delivered
    Completed,
    /// The consumer went away or the stream was cancelled
    Cancelled,
}

enum Step {
    Deliver(ReplayRecord),
    Finished,
    Disconnected,
}

/// Paced, cancellable playback of one vehicle's replay frames
pub struct ReplayStream {
    /// Vehicle being replayed
    vehicle_id: String,
    /// Frames shared with the result cache
    records: Arc<[ReplayRecord]>,
    /// Next frame to deliver
    position: usize,
    cancel: CancellationToken,
}

impl ReplayStream {
    /// Create a stream over a vehicle's frames
    ///
    /// Returns `None` when there is nothing to replay.
    pub fn new(vehicle_id: impl Into<String>, records: Arc<[ReplayRecord]>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            vehicle_id: vehicle_id.into(),
            records,
            position: 0,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token (e.g. a child of a
    /// server-wide shutdown token)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this stream when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Vehicle being replayed
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Total number of frames
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Frames not yet delivered
    pub fn remaining(&self) -> usize {
        self.records.len().saturating_sub(self.position)
    }

    /// Wall-clock time a full replay takes
    pub fn total_delay(&self) -> Duration {
        self.records.iter().map(ReplayRecord::delay_duration).sum()
    }

    /// Wait for the next frame's delay and return it
    ///
    /// Returns `None` once all frames are delivered or the stream is
    /// cancelled. Cancellation during the wait drops the timer immediately
    /// and the frame is not delivered. Dropping the returned future mid-wait
    /// leaves the position unchanged.
    pub async fn next_record(&mut self) -> Option<ReplayRecord> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let delay = self.records.get(self.position)?.delay_duration();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        let record = self.records.get(self.position).cloned();
        self.position += 1;
        record
    }

    /// Deliver every frame into `sink`
    ///
    /// A closed receiver counts as a consumer disconnect: the stream cancels
    /// itself and stops without error. A consumer that is slow to make room
    /// does not hold off cancellation; the pending frame is dropped.
    pub async fn run(mut self, sink: mpsc::Sender<ReplayRecord>) -> StreamEnd {
        debug!(
            "Replaying {} frames for {}",
            self.remaining(),
            self.vehicle_id
        );

        loop {
            let step = tokio::select! {
                biased;
                _ = sink.closed() => Step::Disconnected,
                next = self.next_record() => match next {
                    Some(record) => Step::Deliver(record),
                    None => Step::Finished,
                },
            };

            let record = match step {
                Step::Deliver(record) => record,
                Step::Finished => return self.end_state(),
                Step::Disconnected => return self.disconnect(),
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.end_state(),
                sent = sink.send(record) => {
                    if sent.is_err() {
                        return self.disconnect();
                    }
                }
            }
        }
    }

    fn disconnect(&self) -> StreamEnd {
        self.cancel.cancel();
        debug!("Replay consumer for {} went away", self.vehicle_id);
        StreamEnd::Cancelled
    }

    fn end_state(&self) -> StreamEnd {
        if self.cancel.is_cancelled() {
            debug!(
                "Replay for {} cancelled at frame {}/{}",
                self.vehicle_id,
                self.position,
                self.records.len()
            );
            StreamEnd::Cancelled
        } else {
            debug!("Replay for {} completed", self.vehicle_id);
            StreamEnd::Completed
        }
    }
}
