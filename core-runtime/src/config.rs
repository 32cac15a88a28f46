//! # Widget Configuration
//!
//! Collects the host capabilities and feature switches one mounted widget
//! needs, and refuses to build when something required is missing.
//!
//! ## Required capabilities
//!
//! - `AudioOutput` - always; there is no portable default
//! - `SegmentFetcher` - always (desktop default: reqwest gateway fetcher)
//!
//! ## Feature-dependent capabilities
//!
//! - `ListenReporter` - when listen tracking is enabled
//! - `EmbedContext` - when autoplay is enabled
//! - `MessageSource` - when remote control is enabled
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::WidgetConfig;
//! use std::sync::Arc;
//!
//! let config = WidgetConfig::builder()
//!     .segment_fetcher(Arc::new(MyFetcher))
//!     .audio_output(Arc::new(MyOutput))
//!     .listen_reporter(Arc::new(MyReporter))
//!     .embed_context(Arc::new(StaticEmbedContext::new(true, false)))
//!     .message_source(Arc::new(ChannelMessageSource::new()))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioOutput, Clock, EmbedContext, ListenReporter, MessageSource, SegmentFetcher, SystemClock,
};
use std::sync::Arc;

/// Origin tag remote-control payloads must carry unless configured otherwise.
pub const DEFAULT_REMOTE_ORIGIN: &str = "audiusapi";

/// Optional behaviour of a mounted widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Evaluate the autoplay policy on mount (requires `EmbedContext`).
    pub autoplay: bool,
    /// Listen for cross-frame commands (requires `MessageSource`).
    pub remote_control: bool,
    /// Record and report listens (requires `ListenReporter`).
    pub listen_tracking: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            autoplay: true,
            remote_control: true,
            listen_tracking: true,
        }
    }
}

/// Everything a widget needs from its host.
#[derive(Clone)]
pub struct WidgetConfig {
    pub segment_fetcher: Arc<dyn SegmentFetcher>,
    pub audio_output: Arc<dyn AudioOutput>,
    pub listen_reporter: Option<Arc<dyn ListenReporter>>,
    pub embed_context: Option<Arc<dyn EmbedContext>>,
    pub message_source: Option<Arc<dyn MessageSource>>,
    pub clock: Arc<dyn Clock>,
    pub features: FeatureFlags,
    /// Exact `from` value accepted on remote-control payloads.
    pub remote_origin: String,
    /// Per-subscriber event bus buffer.
    pub event_buffer: usize,
}

impl std::fmt::Debug for WidgetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetConfig")
            .field("segment_fetcher", &"SegmentFetcher { ... }")
            .field("audio_output", &"AudioOutput { ... }")
            .field(
                "listen_reporter",
                &self
                    .listen_reporter
                    .as_ref()
                    .map(|_| "ListenReporter { ... }"),
            )
            .field(
                "embed_context",
                &self.embed_context.as_ref().map(|_| "EmbedContext { ... }"),
            )
            .field(
                "message_source",
                &self.message_source.as_ref().map(|_| "MessageSource { ... }"),
            )
            .field("features", &self.features)
            .field("remote_origin", &self.remote_origin)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

impl WidgetConfig {
    pub fn builder() -> WidgetConfigBuilder {
        WidgetConfigBuilder::default()
    }

    /// Checks feature flags against the capabilities that were provided.
    pub fn validate(&self) -> Result<()> {
        if self.features.listen_tracking && self.listen_reporter.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "ListenReporter".to_string(),
                message: "Listen tracking is enabled but no ListenReporter was provided. \
                          Disable listen tracking or inject a reporter."
                    .to_string(),
            });
        }

        if self.features.autoplay && self.embed_context.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "EmbedContext".to_string(),
                message: "Autoplay is enabled but no EmbedContext was provided to answer \
                          social-embed and mobile detection. Disable autoplay or inject one."
                    .to_string(),
            });
        }

        if self.features.remote_control && self.message_source.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "MessageSource".to_string(),
                message: "Remote control is enabled but no MessageSource was provided. \
                          Web: forward window message events. Tests: use ChannelMessageSource."
                    .to_string(),
            });
        }

        if self.features.remote_control && self.remote_origin.trim().is_empty() {
            return Err(Error::Config(
                "Remote origin tag cannot be empty when remote control is enabled".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "Event buffer must hold at least one event".to_string(),
            ));
        }

        Ok(())
    }
}

fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "AudioOutput implementation is required to render audio. \
                  Web: wrap the page's media element. Desktop: wrap the platform audio device."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_segment_fetcher() -> Result<Arc<dyn SegmentFetcher>> {
    use bridge_desktop::ReqwestSegmentFetcher;

    let fetcher = ReqwestSegmentFetcher::with_defaults().map_err(|e| {
        Error::Internal(format!("Failed to create default SegmentFetcher: {}", e))
    })?;
    Ok(Arc::new(fetcher))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_segment_fetcher() -> Result<Arc<dyn SegmentFetcher>> {
    Err(Error::CapabilityMissing {
        capability: "SegmentFetcher".to_string(),
        message: "SegmentFetcher implementation is required to load track audio. \
                  Desktop: enable the 'desktop-shims' feature for the reqwest gateway fetcher. \
                  Web: inject a fetch-based implementation."
            .to_string(),
    })
}

/// Builder for [`WidgetConfig`].
pub struct WidgetConfigBuilder {
    segment_fetcher: Option<Arc<dyn SegmentFetcher>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    listen_reporter: Option<Arc<dyn ListenReporter>>,
    embed_context: Option<Arc<dyn EmbedContext>>,
    message_source: Option<Arc<dyn MessageSource>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
    remote_origin: Option<String>,
    event_buffer: Option<usize>,
}

impl Default for WidgetConfigBuilder {
    fn default() -> Self {
        Self {
            segment_fetcher: None,
            audio_output: None,
            listen_reporter: None,
            embed_context: None,
            message_source: None,
            clock: None,
            features: FeatureFlags::default(),
            remote_origin: None,
            event_buffer: None,
        }
    }
}

impl WidgetConfigBuilder {
    pub fn segment_fetcher(mut self, fetcher: Arc<dyn SegmentFetcher>) -> Self {
        self.segment_fetcher = Some(fetcher);
        self
    }

    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn listen_reporter(mut self, reporter: Arc<dyn ListenReporter>) -> Self {
        self.listen_reporter = Some(reporter);
        self
    }

    pub fn embed_context(mut self, context: Arc<dyn EmbedContext>) -> Self {
        self.embed_context = Some(context);
        self
    }

    pub fn message_source(mut self, source: Arc<dyn MessageSource>) -> Self {
        self.message_source = Some(source);
        self
    }

    /// Wall clock used for listen report timestamps. Default: system time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn enable_autoplay(mut self, enabled: bool) -> Self {
        self.features.autoplay = enabled;
        self
    }

    pub fn enable_remote_control(mut self, enabled: bool) -> Self {
        self.features.remote_control = enabled;
        self
    }

    pub fn enable_listen_tracking(mut self, enabled: bool) -> Self {
        self.features.listen_tracking = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Default: `"audiusapi"`.
    pub fn remote_origin(mut self, origin: impl Into<String>) -> Self {
        self.remote_origin = Some(origin.into());
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Validates and assembles the configuration.
    ///
    /// Fails with [`Error::CapabilityMissing`] naming the first absent
    /// capability, or [`Error::Config`] for invalid values.
    pub fn build(self) -> Result<WidgetConfig> {
        let audio_output = self.audio_output.ok_or_else(audio_output_missing_error)?;

        let segment_fetcher = match self.segment_fetcher {
            Some(fetcher) => fetcher,
            None => provide_default_segment_fetcher()?,
        };

        let config = WidgetConfig {
            segment_fetcher,
            audio_output,
            listen_reporter: self.listen_reporter,
            embed_context: self.embed_context,
            message_source: self.message_source,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
            remote_origin: self
                .remote_origin
                .unwrap_or_else(|| DEFAULT_REMOTE_ORIGIN.to_string()),
            event_buffer: self
                .event_buffer
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
