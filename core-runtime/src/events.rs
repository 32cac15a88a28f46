//! # Event Bus
//!
//! Broadcast channel carrying typed notifications between the engine, the
//! listen recorder, the remote bridge and whoever embeds the widget.
//!
//! ## Overview
//!
//! ```text
//! ┌────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ PlaybackEngine ├────────>│           ├────────────>│ EmbedPlayer│
//! └────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ ListenRecorder ├────────>│  channel) ├────────────>│   Host UI  │
//! └────────────────┘         │           │             └────────────┘
//! ┌────────────────┐  emit   │           │
//! │  RemoteBridge  ├────────>│           │
//! └────────────────┘         └───────────┘
//! ```
//!
//! Emitting never blocks. With no subscribers `emit` returns an error that
//! producers ignore. Slow subscribers see `RecvError::Lagged` and carry on;
//! `RecvError::Closed` means every producer is gone.
//!
//! The observable playback state itself travels on the engine's snapshot
//! watch channel. Events here are edges: a track completed, a listen was
//! recorded, a remote command arrived.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//! use bridge_traits::TrackId;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Stopped { track_id: TrackId(7) })).ok();
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Playback(_))));
//! # }
//! ```

use bridge_traits::{MediaKey, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Listen(ListenEvent),
    Remote(RemoteEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Listen(e) => e.description(),
            CoreEvent::Remote(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Listen(ListenEvent::ReportFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Listen(ListenEvent::Recorded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Playback session transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new session was armed.
    Loaded {
        track_id: TrackId,
        media_key: MediaKey,
        duration_ms: u64,
    },
    /// Buffering finished and audio is rendering.
    Started { track_id: TrackId, position_ms: u64 },
    Paused { track_id: TrackId, position_ms: u64 },
    /// Waiting on a segment fetch.
    Buffering { track_id: TrackId, position_ms: u64 },
    Stopped { track_id: TrackId },
    Seeked { track_id: TrackId, position_ms: u64 },
    /// The last segment finished. Emitted once per playthrough.
    Completed {
        track_id: TrackId,
        media_key: MediaKey,
    },
    Error {
        track_id: Option<TrackId>,
        message: String,
        /// Whether re-issuing load or toggle may recover.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loaded { .. } => "Track loaded",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Buffering { .. } => "Playback buffering",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

/// Listen analytics outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ListenEvent {
    /// The threshold was crossed and a report was handed to the reporter.
    Recorded {
        track_id: TrackId,
        media_key: MediaKey,
        elapsed_ms: u64,
    },
    /// Delivery failed; the report is not retried.
    ReportFailed { track_id: TrackId, message: String },
}

impl ListenEvent {
    fn description(&self) -> &str {
        match self {
            ListenEvent::Recorded { .. } => "Listen recorded",
            ListenEvent::ReportFailed { .. } => "Listen report failed",
        }
    }
}

/// Remote-control bridge activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RemoteEvent {
    Subscribed,
    /// A valid command was decoded and forwarded to the engine.
    CommandApplied { method: String },
    Unsubscribed,
}

impl RemoteEvent {
    fn description(&self) -> &str {
        match self {
            RemoteEvent::Subscribed => "Remote control listening",
            RemoteEvent::CommandApplied { .. } => "Remote command applied",
            RemoteEvent::Unsubscribed => "Remote control detached",
        }
    }
}

/// Cloneable producer handle over a broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber. Fails only when nobody listens.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver for future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate applied before events are returned.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when drained.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
