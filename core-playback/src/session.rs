//! The one loaded track and its mutable playback state.

use crate::source::SegmentSource;
use crate::timeline::SegmentTimeline;
use crate::types::{PlayingState, Track};
use bridge_traits::MediaKey;
use std::time::Duration;
use tokio::time::Instant;

/// Where buffering resumes once the needed segment is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTarget {
    pub index: usize,
    pub offset: Duration,
    pub deadline: Instant,
}

#[derive(Debug)]
pub struct PlaybackSession {
    pub track: Track,
    pub media_key: MediaKey,
    pub timeline: SegmentTimeline,
    pub source: SegmentSource,
    pub state: PlayingState,
    /// Play head at `anchor` (or the current play head when not playing).
    position: Duration,
    /// Set only while playing.
    anchor: Option<Instant>,
    /// Segment the output is rendering or holding paused.
    pub current: Option<usize>,
    /// The output holds audio for the current position and can `resume`.
    pub primed: bool,
    pub target: Option<BufferTarget>,
    /// A toggle received while buffering; honoured once when it completes.
    pub pending_toggle: bool,
    /// The end-of-track notification was sent for this playthrough.
    pub completed: bool,
}

impl PlaybackSession {
    pub fn new(track: Track, source: SegmentSource) -> Self {
        let timeline = SegmentTimeline::from_track(&track);
        Self {
            track,
            media_key: MediaKey::new(),
            timeline,
            source,
            state: PlayingState::Stopped,
            position: Duration::ZERO,
            anchor: None,
            current: None,
            primed: false,
            target: None,
            pending_toggle: false,
            completed: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.timeline.total()
    }

    pub fn clamp(&self, position: Duration) -> Duration {
        position.min(self.duration())
    }

    /// Play head as of `now`, clamped to the track.
    pub fn position_at(&self, now: Instant) -> Duration {
        let base = match self.anchor {
            Some(anchor) => self.position + now.saturating_duration_since(anchor),
            None => self.position,
        };
        self.clamp(base)
    }

    /// Fold elapsed play time into the stored position.
    pub fn settle(&mut self, now: Instant) -> Duration {
        self.position = self.position_at(now);
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
        self.position
    }

    /// Start the play clock at the stored position.
    pub fn run_clock(&mut self, now: Instant) {
        self.anchor = Some(now);
    }

    /// Freeze the play clock at the position reached by `now`.
    pub fn hold_clock(&mut self, now: Instant) {
        self.settle(now);
        self.anchor = None;
    }

    pub fn set_position(&mut self, position: Duration) {
        self.position = self.clamp(position);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    /// Drop everything tied to the output; the play head is kept.
    pub fn detach_output(&mut self, now: Instant) {
        self.hold_clock(now);
        self.current = None;
        self.primed = false;
        self.target = None;
    }

    pub fn is_last_segment(&self, index: usize) -> bool {
        index + 1 >= self.timeline.len()
    }
}
