//! Track descriptors and the observable engine state.

use crate::error::PlaybackError;
use bridge_traits::{MediaKey, SegmentDescriptor, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable track as delivered by the metadata service.
///
/// Display fields are carried for the host UI; the engine only reads `id`,
/// `segments` and `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub owner_id: u64,
    pub segments: Vec<SegmentDescriptor>,
    /// Declared length in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub url_path: String,
    #[serde(default)]
    pub is_verified: bool,
}

impl Track {
    /// Minimal track carrying only what the engine needs.
    pub fn new(id: impl Into<TrackId>, segments: Vec<SegmentDescriptor>, duration: f64) -> Self {
        Self {
            id: id.into(),
            owner_id: 0,
            segments,
            duration,
            title: String::new(),
            handle: String::new(),
            user_name: String::new(),
            cover_art: None,
            url_path: String::new(),
            is_verified: false,
        }
    }

    /// Same identity and the same audio. Reloading such a track keeps the
    /// current session.
    pub fn same_source(&self, other: &Track) -> bool {
        self.id == other.id && self.segments == other.segments
    }

    pub fn declared_duration(&self) -> Duration {
        seconds(self.duration)
    }
}

/// An ordered set of tracks rendered as one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: u64,
    #[serde(default)]
    pub owner_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_handle: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default, rename = "collectionURLPath", alias = "collectionUrlPath")]
    pub collection_url_path: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayingState {
    #[default]
    Stopped,
    Buffering,
    Playing,
    Paused,
}

impl PlayingState {
    /// A session is active while it is playing, buffering or paused.
    pub fn is_active(&self) -> bool {
        !matches!(self, PlayingState::Stopped)
    }
}

/// Observable engine state, republished after every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlayingState,
    /// Always within `[0, duration]`.
    pub position: Duration,
    pub duration: Duration,
    /// Set while a session is armed.
    pub media_key: Option<MediaKey>,
    /// Last track passed to `load_track`, armed or not.
    pub track_id: Option<TrackId>,
    pub armed: bool,
    pub audio_ready: bool,
    pub error: Option<PlaybackError>,
}

impl PlaybackSnapshot {
    pub fn position_secs(&self) -> f64 {
        self.position.as_secs_f64()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayingState::Playing
    }
}

/// Convert host-supplied seconds, mapping negative, NaN and overflowing
/// values to zero.
pub(crate) fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}
