//! Embed player façade and bootstrap helpers.
//!
//! This crate wires host-provided capabilities (segment fetching, audio
//! output, listen reporting, embedding detection, frame messaging) into one
//! mounted [`EmbedPlayer`]. Desktop hosts typically enable the
//! `desktop-shims` feature, which supplies reqwest-backed defaults from
//! `bridge-desktop`.
//!
//! ```ignore
//! let config = WidgetConfig::builder()
//!     .audio_output(Arc::new(MyOutput::new()))
//!     .embed_context(Arc::new(StaticEmbedContext::from_user_agent(true, ua)))
//!     .message_source(Arc::new(frames.clone()))
//!     .listen_reporter(Arc::new(HttpListenReporter::new(endpoint)?))
//!     .build()?;
//!
//! let player = EmbedPlayer::mount(
//!     PlayerRequest::track(track.id.0, track.owner_id),
//!     PlayerContent::Track(track),
//!     config,
//!     PlayerSettings::default(),
//! )
//! .await?;
//! player.toggle_play().await;
//! ```

pub mod error;
pub mod player;
pub mod request;

pub use error::{CoreError, Result};
pub use player::{EmbedPlayer, PlayerSettings};
pub use request::{PlayerContent, PlayerFlavor, PlayerKey, PlayerRequest, RequestType};

pub use core_playback::{Collection, PlaybackSnapshot, PlayingState, Track};
pub use core_runtime::config::{FeatureFlags, WidgetConfig, WidgetConfigBuilder};
pub use core_runtime::logging::{init_logging, LoggingConfig};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{GatewayConfig, HttpListenReporter, ReqwestSegmentFetcher, RetryPolicy};
