//! # Playback Engine
//!
//! Segmented track playback for the embed player.
//!
//! ## Overview
//!
//! This crate handles:
//! - Arming a session for a track and fetching its segments on demand
//! - The `Stopped / Buffering / Playing / Paused` state machine
//! - Seeking, prefetch, buffering timeouts and end-of-track notification
//! - Listen accounting and the one-shot autoplay decision
//!
//! Audio never passes through the engine as samples: segments are fetched as
//! opaque bytes and handed to the host's [`AudioOutput`](bridge_traits::AudioOutput).

pub mod autoplay;
pub mod config;
pub mod engine;
pub mod error;
pub mod listen;
pub mod session;
pub mod source;
pub mod timeline;
pub mod types;

pub use autoplay::AutoplayPolicy;
pub use config::{EngineConfig, ListenConfig};
pub use engine::{PlaybackControl, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use listen::{ListenRecord, ListenRecorder, ListenSample};
pub use timeline::SegmentTimeline;
pub use types::{Collection, PlaybackSnapshot, PlayingState, Track};
