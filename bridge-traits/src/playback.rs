//! Playback bridge traits and the identifiers shared with the core.
//!
//! The embed core never decodes audio or opens sockets itself. A host supplies
//! a [`SegmentFetcher`] that turns opaque segment locators into audio buffers
//! and an [`AudioOutput`] that renders them. Both are async so a host may
//! suspend on network or device work without blocking the engine.

use crate::{
    error::{BridgeError, Result},
    platform::PlatformSendSync,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Numeric track identifier as issued by the metadata service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque token identifying one loaded playback session.
///
/// Consumers compare keys to notice "a different session is loaded" without
/// comparing track identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaKey(Uuid);

impl MediaKey {
    /// Generate a fresh key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct a key from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a track's ordered segment list, as delivered by the metadata
/// service. The locator is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Content locator (a multihash for gateway-hosted audio).
    #[serde(alias = "multihash")]
    pub locator: String,
    /// Playback length of the segment in seconds, when the service knows it.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl SegmentDescriptor {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }
}

/// A segment the fetcher knows how to retrieve.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    /// Position of the segment within the track.
    pub index: usize,
    /// Fetchable address produced by [`SegmentFetcher::resolve`].
    pub url: String,
}

/// Audio for one segment, ready to hand to an [`AudioOutput`].
#[derive(Debug, Clone)]
pub struct SegmentAudio {
    pub index: usize,
    /// Encoded audio as fetched; the output decides how to render it.
    pub data: Bytes,
    /// Actual playback length, when the fetcher could determine it.
    pub duration: Option<Duration>,
}

impl SegmentAudio {
    pub fn new(index: usize, data: Bytes) -> Self {
        Self {
            index,
            data,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Turns segment descriptors into audio buffers.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait SegmentFetcher: PlatformSendSync {
    /// Map a descriptor to something fetchable. Must not perform I/O.
    ///
    /// The default accepts any non-blank locator verbatim.
    fn resolve(&self, index: usize, segment: &SegmentDescriptor) -> Result<ResolvedSegment> {
        let locator = segment.locator.trim();
        if locator.is_empty() {
            return Err(BridgeError::InvalidLocator(format!(
                "segment {} has an empty locator",
                index
            )));
        }
        Ok(ResolvedSegment {
            index,
            url: locator.to_string(),
        })
    }

    /// Fetch and prepare the audio for one resolved segment.
    async fn fetch(&self, segment: &ResolvedSegment) -> Result<SegmentAudio>;
}

/// The single audio output resource owned by an engine instance.
///
/// Calls arrive serialised from the engine task; implementations never see
/// concurrent control calls for the same instance.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioOutput: PlatformSendSync {
    /// Acquire the underlying device or media element.
    async fn open(&self) -> Result<()>;

    /// Release everything acquired by [`open`](Self::open).
    async fn close(&self) -> Result<()>;

    /// Render `audio` starting `offset` into the segment, replacing whatever
    /// was rendering before.
    async fn start(&self, audio: &SegmentAudio, offset: Duration) -> Result<()>;

    /// Pause rendering, keeping the current buffer.
    async fn pause(&self) -> Result<()>;

    /// Continue rendering after [`pause`](Self::pause).
    async fn resume(&self) -> Result<()>;

    /// Stop rendering and drop any queued audio. The output stays open.
    async fn halt(&self) -> Result<()>;
}
