mod common;

use bridge_traits::TrackId;
use common::{three_segment_track, wait_for, FakeFetcher, FakeOutput, OutputCall};
use core_playback::{EngineConfig, PlaybackEngine, PlaybackError, PlayingState, Track};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn spawn_engine(
    fetcher: FakeFetcher,
    output: Arc<FakeOutput>,
    config: EngineConfig,
) -> (PlaybackEngine, broadcast::Receiver<CoreEvent>) {
    let bus = EventBus::new(256);
    let events = bus.subscribe();
    let engine = PlaybackEngine::spawn(Arc::new(fetcher), output, config, bus).unwrap();
    (engine, events)
}

fn drain(events: &mut broadcast::Receiver<CoreEvent>) -> Vec<PlaybackEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Playback(event) = event {
            out.push(event);
        }
    }
    out
}

fn completed_count(events: &[PlaybackEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::Completed { .. }))
        .count()
}

async fn armed_engine(
    fetcher: FakeFetcher,
) -> (PlaybackEngine, Arc<FakeOutput>, broadcast::Receiver<CoreEvent>) {
    let output = Arc::new(FakeOutput::default());
    let (engine, events) = spawn_engine(fetcher, output.clone(), EngineConfig::default());
    engine.init_audio().await;
    let loaded = engine.load_track(three_segment_track(7)).await;
    assert!(loaded.armed);
    (engine, output, events)
}

#[tokio::test(start_paused = true)]
async fn test_track_plays_through_every_segment_and_completes_once() {
    let (engine, output, mut events) = armed_engine(FakeFetcher::default()).await;
    assert_eq!(engine.snapshot().duration, Duration::from_secs(30));

    let snapshot = engine.toggle_play().await;
    assert_eq!(snapshot.state, PlayingState::Buffering);

    let done = wait_for(&engine, |s| {
        s.state == PlayingState::Stopped && s.position == s.duration
    })
    .await;
    assert_eq!(done.position, Duration::from_secs(30));
    assert!(done.error.is_none());

    let segments: Vec<usize> = output.starts().into_iter().map(|(i, _)| i).collect();
    assert_eq!(segments, vec![0, 1, 2]);

    let seen = drain(&mut events);
    assert_eq!(completed_count(&seen), 1);
    assert!(seen
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Started { .. })));

    // Staying at the end produces no further notification.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(completed_count(&drain(&mut events)), 0);
}

#[tokio::test(start_paused = true)]
async fn test_toggles_while_buffering_collapse_into_one_pause() {
    let (engine, output, _events) =
        armed_engine(FakeFetcher::delayed(Duration::from_secs(5))).await;

    assert_eq!(engine.toggle_play().await.state, PlayingState::Buffering);
    for _ in 0..3 {
        assert_eq!(engine.toggle_play().await.state, PlayingState::Buffering);
    }

    let settled = wait_for(&engine, |s| s.state != PlayingState::Buffering).await;
    assert_eq!(settled.state, PlayingState::Paused);
    assert_eq!(settled.position, Duration::ZERO);
    assert!(output.starts().is_empty());

    // The buffered segment is reused when resuming.
    let resumed = engine.toggle_play().await;
    assert_eq!(resumed.state, PlayingState::Playing);
    assert_eq!(output.starts(), vec![(0, Duration::ZERO)]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_reuse_the_output() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default()).await;

    engine.toggle_play().await;
    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let paused = engine.toggle_play().await;
    assert_eq!(paused.state, PlayingState::Paused);
    let held = paused.position;
    assert!(held >= Duration::from_secs(2));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.snapshot().position, held);

    let resumed = engine.toggle_play().await;
    assert_eq!(resumed.state, PlayingState::Playing);

    let calls = output.calls();
    assert!(calls.contains(&OutputCall::Pause));
    assert!(calls.contains(&OutputCall::Resume));
    assert_eq!(output.starts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_seek_is_clamped_to_the_track() {
    let (engine, _output, mut events) = armed_engine(FakeFetcher::default()).await;

    assert_eq!(engine.seek_to(-5.0).await.position, Duration::ZERO);
    assert_eq!(
        engine.seek_to(12.5).await.position,
        Duration::from_millis(12_500)
    );
    assert_eq!(engine.seek_to(f64::NAN).await.position, Duration::ZERO);

    let past_end = engine.seek_to(999.0).await;
    assert_eq!(past_end.position, Duration::from_secs(30));
    assert_eq!(past_end.state, PlayingState::Stopped);
    // Not active, so this is only a reposition.
    assert_eq!(completed_count(&drain(&mut events)), 0);

    // Playing again from the end restarts the track.
    let restarted = engine.toggle_play().await;
    assert_eq!(restarted.position, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_seek_past_end_while_paused_finishes_track() {
    let (engine, _output, mut events) = armed_engine(FakeFetcher::default()).await;

    engine.toggle_play().await;
    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    engine.toggle_play().await;

    let snapshot = engine.seek_to(1e9).await;
    assert_eq!(snapshot.state, PlayingState::Stopped);
    assert_eq!(snapshot.position, snapshot.duration);
    assert_eq!(completed_count(&drain(&mut events)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_playing_rebuffers_target_segment() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default()).await;

    engine.toggle_play().await;
    wait_for(&engine, |s| s.state == PlayingState::Playing).await;

    let seeking = engine.seek_to(25.0).await;
    assert!(matches!(
        seeking.state,
        PlayingState::Buffering | PlayingState::Playing
    ));
    assert_eq!(seeking.position, Duration::from_secs(25));

    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    assert_eq!(
        output.starts().last().copied(),
        Some((2, Duration::from_secs(5)))
    );
    assert!(output.calls().contains(&OutputCall::Halt));
}

#[tokio::test(start_paused = true)]
async fn test_last_seek_during_buffering_wins() {
    let (engine, output, _events) =
        armed_engine(FakeFetcher::delayed(Duration::from_secs(1))).await;

    engine.toggle_play().await;
    engine.seek_to(15.0).await;
    let snapshot = engine.seek_to(25.0).await;
    assert_eq!(snapshot.state, PlayingState::Buffering);

    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    assert_eq!(output.starts(), vec![(2, Duration::from_secs(5))]);
}

#[tokio::test(start_paused = true)]
async fn test_media_key_changes_only_with_new_audio() {
    let (engine, _output, _events) = armed_engine(FakeFetcher::default()).await;
    let first = engine.snapshot().media_key.unwrap();

    let same = engine.load_track(three_segment_track(7)).await;
    assert_eq!(same.media_key, Some(first));

    let other = engine.load_track(three_segment_track(8)).await;
    let second = other.media_key.unwrap();
    assert_ne!(second, first);

    let back = engine.load_track(three_segment_track(7)).await;
    assert_ne!(back.media_key, Some(first));
    assert_ne!(back.media_key, Some(second));
}

#[tokio::test(start_paused = true)]
async fn test_stop_rewinds_and_keeps_output_open() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default()).await;
    let key = engine.snapshot().media_key;

    engine.toggle_play().await;
    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    let stopped = engine.stop().await;
    assert_eq!(stopped.state, PlayingState::Stopped);
    assert_eq!(stopped.position, Duration::ZERO);
    assert!(stopped.audio_ready);
    assert!(stopped.armed);
    assert_eq!(stopped.media_key, key);

    let calls = output.calls();
    assert!(calls.contains(&OutputCall::Halt));
    assert!(!calls.contains(&OutputCall::Close));
}

#[tokio::test(start_paused = true)]
async fn test_load_before_init_reports_error() {
    let output = Arc::new(FakeOutput::default());
    let (engine, _events) = spawn_engine(FakeFetcher::default(), output, EngineConfig::default());

    let snapshot = engine.load_track(three_segment_track(3)).await;
    assert!(!snapshot.armed);
    assert_eq!(snapshot.error, Some(PlaybackError::AudioNotInitialized));
    assert_eq!(snapshot.track_id, Some(TrackId(3)));

    assert_eq!(engine.toggle_play().await.state, PlayingState::Stopped);

    let ready = engine.init_audio().await;
    assert!(ready.audio_ready);
    assert!(ready.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_track_leaves_engine_unarmed() {
    let output = Arc::new(FakeOutput::default());
    let (engine, _events) = spawn_engine(FakeFetcher::default(), output, EngineConfig::default());
    engine.init_audio().await;

    let snapshot = engine.load_track(Track::new(9, Vec::new(), 10.0)).await;
    assert!(!snapshot.armed);
    assert_eq!(snapshot.media_key, None);
    assert_eq!(snapshot.error, Some(PlaybackError::EmptyTrack(TrackId(9))));

    let recovered = engine.load_track(three_segment_track(10)).await;
    assert!(recovered.armed);
    assert!(recovered.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_open_is_reported() {
    let output = Arc::new(FakeOutput::failing_open());
    let (engine, _events) = spawn_engine(FakeFetcher::default(), output, EngineConfig::default());

    let snapshot = engine.init_audio().await;
    assert!(!snapshot.audio_ready);
    assert!(matches!(snapshot.error, Some(PlaybackError::AudioOutput(_))));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_stalls_with_position_kept() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default().failing(1)).await;

    engine.seek_to(14.0).await;
    engine.toggle_play().await;

    let stalled = wait_for(&engine, |s| s.error.is_some()).await;
    assert_eq!(stalled.state, PlayingState::Stopped);
    assert_eq!(stalled.position, Duration::from_secs(14));
    assert!(stalled.armed);
    assert!(matches!(
        stalled.error,
        Some(PlaybackError::BufferStall { index: 1, .. })
    ));
    assert!(output.starts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reloading_stalled_track_clears_error_and_retries() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default().failing_once(0)).await;
    let key = engine.snapshot().media_key;

    engine.toggle_play().await;
    let stalled = wait_for(&engine, |s| s.error.is_some()).await;
    assert_eq!(stalled.state, PlayingState::Stopped);

    let reloaded = engine.load_track(three_segment_track(7)).await;
    assert_eq!(reloaded.state, PlayingState::Stopped);
    assert!(reloaded.armed);
    assert!(reloaded.error.is_none());
    assert_eq!(reloaded.media_key, key);

    engine.toggle_play().await;
    let playing = wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    assert!(playing.error.is_none());
    assert_eq!(output.starts()[0].0, 0);
}

#[tokio::test(start_paused = true)]
async fn test_loading_new_track_while_buffering_drops_late_segment() {
    let (engine, output, _events) =
        armed_engine(FakeFetcher::default().with_delay(0, Duration::from_secs(5))).await;

    let buffering = engine.toggle_play().await;
    assert_eq!(buffering.state, PlayingState::Buffering);
    let old_key = buffering.media_key;

    let loaded = engine.load_track(three_segment_track(8)).await;
    assert_eq!(loaded.state, PlayingState::Stopped);
    assert_eq!(loaded.track_id, Some(TrackId(8)));
    assert_ne!(loaded.media_key, old_key);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let after = engine.snapshot();
    assert_eq!(after.state, PlayingState::Stopped);
    assert!(after.error.is_none());
    assert_eq!(after.position, Duration::ZERO);
    assert!(output.starts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_buffering_times_out() {
    let output = Arc::new(FakeOutput::default());
    let config = EngineConfig {
        buffering_timeout: Duration::from_secs(2),
        ..EngineConfig::default()
    };
    let (engine, _events) = spawn_engine(
        FakeFetcher::delayed(Duration::from_secs(60)),
        output,
        config,
    );
    engine.init_audio().await;
    engine.load_track(three_segment_track(1)).await;
    engine.toggle_play().await;

    let stalled = wait_for(&engine, |s| s.error.is_some()).await;
    assert_eq!(stalled.state, PlayingState::Stopped);
    assert_eq!(
        stalled.error,
        Some(PlaybackError::BufferTimeout {
            index: 0,
            timeout: Duration::from_secs(2),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_next_segment_rebuffers_mid_track() {
    let fetcher = FakeFetcher::default().with_delay(1, Duration::from_secs(12));
    let (engine, output, _events) = armed_engine(fetcher).await;

    engine.toggle_play().await;
    wait_for(&engine, |s| s.state == PlayingState::Playing).await;

    let waiting = wait_for(&engine, |s| s.state == PlayingState::Buffering).await;
    assert!(waiting.position >= Duration::from_secs(10));

    wait_for(&engine, |s| s.state == PlayingState::Playing).await;
    let segments: Vec<usize> = output.starts().into_iter().map(|(i, _)| i).collect();
    assert_eq!(segments, vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_release_closes_output() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default()).await;

    let released = engine.release().await;
    assert!(!released.audio_ready);
    assert!(!released.armed);
    assert_eq!(released.media_key, None);
    assert!(output.calls().contains(&OutputCall::Close));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_releases_output() {
    let (engine, output, _events) = armed_engine(FakeFetcher::default()).await;
    drop(engine);

    for _ in 0..100 {
        if output.calls().contains(&OutputCall::Close) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("output was not closed after the engine was dropped");
}

#[test]
fn test_invalid_config_is_rejected() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let config = EngineConfig {
            command_buffer: 0,
            ..EngineConfig::default()
        };
        let result = PlaybackEngine::spawn(
            Arc::new(FakeFetcher::default()),
            Arc::new(FakeOutput::default()),
            config,
            EventBus::new(8),
        );
        assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
    });
}
