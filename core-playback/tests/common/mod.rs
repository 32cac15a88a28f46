//! Scripted host capabilities shared by the engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, AudioOutput, BridgeError, ResolvedSegment, SegmentAudio,
    SegmentDescriptor, SegmentFetcher,
};
use bytes::Bytes;
use core_playback::{PlaybackEngine, PlaybackSnapshot, Track};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Open,
    Close,
    Start { index: usize, offset: Duration },
    Pause,
    Resume,
    Halt,
}

/// Records every control call; fails `open` when asked to.
#[derive(Default)]
pub struct FakeOutput {
    calls: Mutex<Vec<OutputCall>>,
    fail_open: bool,
}

impl FakeOutput {
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.calls.lock().clone()
    }

    pub fn starts(&self) -> Vec<(usize, Duration)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                OutputCall::Start { index, offset } => Some((*index, *offset)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: OutputCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn open(&self) -> BridgeResult<()> {
        if self.fail_open {
            return Err(BridgeError::AudioOutput("no output device".into()));
        }
        self.record(OutputCall::Open);
        Ok(())
    }

    async fn close(&self) -> BridgeResult<()> {
        self.record(OutputCall::Close);
        Ok(())
    }

    async fn start(&self, audio: &SegmentAudio, offset: Duration) -> BridgeResult<()> {
        self.record(OutputCall::Start {
            index: audio.index,
            offset,
        });
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(OutputCall::Pause);
        Ok(())
    }

    async fn resume(&self) -> BridgeResult<()> {
        self.record(OutputCall::Resume);
        Ok(())
    }

    async fn halt(&self) -> BridgeResult<()> {
        self.record(OutputCall::Halt);
        Ok(())
    }
}

/// Serves every segment, optionally after a delay or with a failure.
#[derive(Default)]
pub struct FakeFetcher {
    delay: Option<Duration>,
    delays: HashMap<usize, Duration>,
    failing: HashSet<usize>,
    failing_once: Mutex<HashSet<usize>>,
    fetched: Mutex<Vec<usize>>,
}

impl FakeFetcher {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    pub fn failing(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// Fail the first fetch of `index`, serve it afterwards.
    pub fn failing_once(self, index: usize) -> Self {
        self.failing_once.lock().insert(index);
        self
    }

    pub fn fetched(&self) -> Vec<usize> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl SegmentFetcher for FakeFetcher {
    async fn fetch(&self, segment: &ResolvedSegment) -> BridgeResult<SegmentAudio> {
        self.fetched.lock().push(segment.index);

        let delay = self.delays.get(&segment.index).copied().or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&segment.index) || self.failing_once.lock().remove(&segment.index) {
            return Err(BridgeError::Network("gateway returned 502".into()));
        }
        Ok(SegmentAudio::new(segment.index, Bytes::from_static(b"segment")))
    }
}

/// Three unhinted segments over 30 seconds.
pub fn three_segment_track(id: u64) -> Track {
    Track::new(
        id,
        vec![
            SegmentDescriptor::new(format!("Qm{}a", id)),
            SegmentDescriptor::new(format!("Qm{}b", id)),
            SegmentDescriptor::new(format!("Qm{}c", id)),
        ],
        30.0,
    )
}

/// Wait until a published snapshot satisfies `predicate`.
pub async fn wait_for(
    engine: &PlaybackEngine,
    predicate: impl FnMut(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let mut rx = engine.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(300), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("engine stopped publishing");
    snapshot.clone()
}
