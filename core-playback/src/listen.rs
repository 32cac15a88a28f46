//! # Listen Recording
//!
//! Samples the engine at a fixed interval and reports a listen once per
//! media key after enough playing time has accumulated.
//!
//! [`ListenRecorder::sample`] is pure bookkeeping and can be driven directly;
//! [`ListenRecorder::run`] wires it to the engine's snapshot channel and a
//! [`ListenReporter`]. Reports are fire-and-forget: a failed report is logged
//! and announced on the event bus but never retried.

use crate::config::ListenConfig;
use crate::types::{PlaybackSnapshot, PlayingState};
use bridge_traits::{Clock, ListenReport, ListenReporter, MediaKey, TrackId};
use core_runtime::events::{CoreEvent, EventBus, ListenEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// What the recorder needs from one engine observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenSample {
    pub state: PlayingState,
    pub position: Duration,
    pub media_key: Option<MediaKey>,
    pub track_id: Option<TrackId>,
}

impl From<&PlaybackSnapshot> for ListenSample {
    fn from(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            state: snapshot.state,
            position: snapshot.position,
            media_key: snapshot.media_key,
            track_id: snapshot.track_id,
        }
    }
}

/// A listen that crossed the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenRecord {
    pub track_id: TrackId,
    pub media_key: MediaKey,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ListenRecorder {
    config: ListenConfig,
    key: Option<MediaKey>,
    accumulated: Duration,
    reported: bool,
}

impl ListenRecorder {
    pub fn new(config: ListenConfig) -> Self {
        Self {
            config,
            key: None,
            accumulated: Duration::ZERO,
            reported: false,
        }
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }

    /// Account for one sampling interval.
    ///
    /// A new media key restarts the count. Only `Playing` samples add time.
    /// Returns a record the first time the count reaches the threshold for
    /// the current key.
    pub fn sample(&mut self, sample: &ListenSample) -> Option<ListenRecord> {
        let (Some(media_key), Some(track_id)) = (sample.media_key, sample.track_id) else {
            return None;
        };

        if self.key != Some(media_key) {
            trace!(%media_key, "Listen counter reset for new media key");
            self.key = Some(media_key);
            self.accumulated = Duration::ZERO;
            self.reported = false;
        }

        if self.reported || sample.state != PlayingState::Playing {
            return None;
        }

        self.accumulated += self.config.sample_interval;
        if self.accumulated < self.config.threshold {
            return None;
        }

        self.reported = true;
        Some(ListenRecord {
            track_id,
            media_key,
            elapsed: self.accumulated,
        })
    }

    /// Sample `snapshots` until `cancel` fires or the engine goes away.
    pub async fn run(
        mut self,
        mut snapshots: watch::Receiver<PlaybackSnapshot>,
        reporter: Arc<dyn ListenReporter>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        cancel: CancellationToken,
    ) {
        let period = self.config.sample_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval_ms = period.as_millis() as u64, "Listen recorder started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if snapshots.has_changed().is_err() {
                debug!("Playback engine gone; listen recorder exiting");
                break;
            }

            let sample = ListenSample::from(&*snapshots.borrow_and_update());
            let Some(record) = self.sample(&sample) else {
                continue;
            };

            info!(
                track_id = %record.track_id,
                media_key = %record.media_key,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "Listen recorded"
            );
            let _ = events.emit(CoreEvent::Listen(ListenEvent::Recorded {
                track_id: record.track_id,
                media_key: record.media_key,
                elapsed_ms: record.elapsed.as_millis() as u64,
            }));

            let report = ListenReport {
                track_id: record.track_id,
                media_key: record.media_key,
                elapsed_seconds: record.elapsed.as_secs_f64(),
                recorded_at: clock.now(),
            };
            let reporter = Arc::clone(&reporter);
            let events = events.clone();
            tokio::spawn(async move {
                if let Err(e) = reporter.report_listen(report).await {
                    debug!(track_id = %record.track_id, error = %e, "Listen report failed");
                    let _ = events.emit(CoreEvent::Listen(ListenEvent::ReportFailed {
                        track_id: record.track_id,
                        message: e.to_string(),
                    }));
                }
            });
        }

        debug!("Listen recorder stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: PlayingState, key: MediaKey) -> ListenSample {
        ListenSample {
            state,
            position: Duration::ZERO,
            media_key: Some(key),
            track_id: Some(TrackId(4)),
        }
    }

    fn recorder(interval_ms: u64, threshold_ms: u64) -> ListenRecorder {
        ListenRecorder::new(ListenConfig {
            sample_interval: Duration::from_millis(interval_ms),
            threshold: Duration::from_millis(threshold_ms),
        })
    }

    #[test]
    fn reports_once_per_key() {
        let mut recorder = recorder(1000, 1000);
        let key = MediaKey::new();

        let record = recorder.sample(&sample(PlayingState::Playing, key)).unwrap();
        assert_eq!(record.elapsed, Duration::from_secs(1));
        assert_eq!(record.media_key, key);

        for _ in 0..5 {
            assert!(recorder.sample(&sample(PlayingState::Playing, key)).is_none());
        }
        assert!(recorder.has_reported());
    }

    #[test]
    fn only_playing_samples_accumulate() {
        let mut recorder = recorder(500, 1500);
        let key = MediaKey::new();

        assert!(recorder.sample(&sample(PlayingState::Playing, key)).is_none());
        assert!(recorder.sample(&sample(PlayingState::Paused, key)).is_none());
        assert!(recorder.sample(&sample(PlayingState::Buffering, key)).is_none());
        assert!(recorder.sample(&sample(PlayingState::Playing, key)).is_none());
        assert_eq!(recorder.accumulated(), Duration::from_secs(1));
        assert!(recorder.sample(&sample(PlayingState::Playing, key)).is_some());
    }

    #[test]
    fn new_key_restarts_count() {
        let mut recorder = recorder(1000, 2000);
        let first = MediaKey::new();
        let second = MediaKey::new();

        assert!(recorder.sample(&sample(PlayingState::Playing, first)).is_none());
        assert!(recorder.sample(&sample(PlayingState::Playing, second)).is_none());
        assert_eq!(recorder.accumulated(), Duration::from_secs(1));
        assert!(recorder.sample(&sample(PlayingState::Playing, second)).is_some());
    }

    #[test]
    fn unarmed_samples_are_ignored() {
        let mut recorder = recorder(1000, 1000);
        let unarmed = ListenSample {
            state: PlayingState::Playing,
            position: Duration::ZERO,
            media_key: None,
            track_id: None,
        };
        assert!(recorder.sample(&unarmed).is_none());
        assert_eq!(recorder.accumulated(), Duration::ZERO);
    }
}
