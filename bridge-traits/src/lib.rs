//! # Host Bridge Traits
//!
//! Capabilities the embed player core needs from whatever hosts it.
//!
//! ## Overview
//!
//! The core owns the playback state machine, listen accounting and the remote
//! control protocol. Everything that touches the outside world is injected
//! through the traits defined here, so the same core runs in a browser frame, a
//! desktop shell or a test harness with fakes.
//!
//! ## Traits
//!
//! ### Audio
//! - [`SegmentFetcher`](playback::SegmentFetcher) - resolve and fetch track segments
//! - [`AudioOutput`](playback::AudioOutput) - the single output device or media element
//!
//! ### Embedding
//! - [`EmbedContext`](context::EmbedContext) - social embed and mobile detection
//! - [`MessageSource`](messaging::MessageSource) - cross-frame message delivery
//!
//! ### Analytics & Utilities
//! - [`ListenReporter`](analytics::ListenReporter) - listen event delivery
//! - [`Clock`](time::Clock) - wall clock for report timestamps
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to the host
//!
//! ## Fail-Fast Strategy
//!
//! Missing required capabilities are reported when the widget is configured,
//! not when they are first used:
//!
//! ```ignore
//! let config = WidgetConfig::builder()
//!     .embed_context(Arc::new(StaticEmbedContext::new(true, false)))
//!     .build()?; // Err(CapabilityMissing { capability: "SegmentFetcher", .. })
//! ```
//!
//! ## Error Handling
//!
//! Every trait returns [`BridgeError`](error::BridgeError). Implementations
//! should map host failures onto the closest variant so the core can tell a
//! transient network fault from a bad locator.
//!
//! ## Thread Safety
//!
//! On native targets every capability is `Send + Sync` so it can be shared
//! between the engine task and spawned fetch tasks. On `wasm32` the bounds
//! are relaxed; see [`platform`].

pub mod analytics;
pub mod context;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod platform;
pub mod playback;
pub mod time;

pub use error::BridgeError;

pub use analytics::{ListenReport, ListenReporter, NoopListenReporter};
pub use context::{is_mobile_user_agent, EmbedContext, StaticEmbedContext};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use messaging::{ChannelMessageSource, MessageSource, MessageSubscription};
pub use platform::{PlatformSend, PlatformSendSync};
pub use playback::{
    AudioOutput, MediaKey, ResolvedSegment, SegmentAudio, SegmentDescriptor, SegmentFetcher,
    TrackId,
};
pub use time::{Clock, ManualClock, SystemClock};
