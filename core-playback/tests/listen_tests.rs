mod common;

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, BridgeError, ListenReport, ListenReporter, ManualClock,
};
use chrono::{TimeZone, Utc};
use common::{three_segment_track, wait_for, FakeFetcher, FakeOutput};
use core_playback::{EngineConfig, ListenConfig, ListenRecorder, PlaybackEngine, PlayingState};
use core_runtime::events::{CoreEvent, EventBus, ListenEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingReporter {
    reports: Mutex<Vec<ListenReport>>,
    fail: bool,
}

#[async_trait]
impl ListenReporter for RecordingReporter {
    async fn report_listen(&self, report: ListenReport) -> BridgeResult<()> {
        self.reports.lock().push(report);
        if self.fail {
            return Err(BridgeError::Network("collector unreachable".into()));
        }
        Ok(())
    }
}

struct Harness {
    engine: PlaybackEngine,
    reporter: Arc<RecordingReporter>,
    bus: EventBus,
    cancel: CancellationToken,
}

async fn harness(reporter: RecordingReporter) -> Harness {
    let bus = EventBus::new(256);
    let engine = PlaybackEngine::spawn(
        Arc::new(FakeFetcher::default()),
        Arc::new(FakeOutput::default()),
        EngineConfig::default(),
        bus.clone(),
    )
    .unwrap();
    engine.init_audio().await;
    engine.load_track(three_segment_track(5)).await;

    let reporter = Arc::new(reporter);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    ));
    let cancel = CancellationToken::new();
    let recorder = ListenRecorder::new(ListenConfig::default());
    tokio::spawn(recorder.run(
        engine.subscribe(),
        reporter.clone(),
        clock,
        bus.clone(),
        cancel.clone(),
    ));

    Harness {
        engine,
        reporter,
        bus,
        cancel,
    }
}

#[tokio::test(start_paused = true)]
async fn test_listen_reported_once_after_threshold() {
    let h = harness(RecordingReporter::default()).await;
    let mut events = h.bus.subscribe();

    h.engine.toggle_play().await;
    wait_for(&h.engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(8)).await;

    let reports = h.reporter.reports.lock().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].track_id, h.engine.snapshot().track_id.unwrap());
    assert_eq!(Some(reports[0].media_key), h.engine.snapshot().media_key);
    assert_eq!(reports[0].elapsed_seconds, 1.0);

    let mut recorded = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Listen(ListenEvent::Recorded { .. })) {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);
    h.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_no_listen_without_playing() {
    let h = harness(RecordingReporter::default()).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.reporter.reports.lock().is_empty());
    h.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_new_track_is_reported_separately() {
    let h = harness(RecordingReporter::default()).await;

    h.engine.toggle_play().await;
    wait_for(&h.engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    h.engine.load_track(three_segment_track(6)).await;
    h.engine.toggle_play().await;
    wait_for(&h.engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    let reports = h.reporter.reports.lock().clone();
    assert_eq!(reports.len(), 2);
    assert_ne!(reports[0].media_key, reports[1].media_key);
    h.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_failed_report_is_announced_not_retried() {
    let h = harness(RecordingReporter {
        fail: true,
        ..RecordingReporter::default()
    })
    .await;
    let mut events = h.bus.subscribe();

    h.engine.toggle_play().await;
    wait_for(&h.engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(h.reporter.reports.lock().len(), 1);

    let mut failed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, CoreEvent::Listen(ListenEvent::ReportFailed { .. })) {
            failed += 1;
        }
    }
    assert_eq!(failed, 1);
    h.cancel.cancel();
}
