//! Start playback on mount when the embedding page allows it.

use crate::engine::PlaybackEngine;
use crate::types::{PlaybackSnapshot, Track};
use bridge_traits::EmbedContext;
use tracing::{debug, info};

/// One-shot autoplay decision for a mounted widget.
#[derive(Debug, Default)]
pub struct AutoplayPolicy {
    fired: bool,
}

impl AutoplayPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Autoplay is only allowed inside a social embed on a non-mobile device.
    pub fn permits(context: &dyn EmbedContext) -> bool {
        context.is_embedded_social_context() && !context.is_mobile_device()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Evaluate the policy once. When permitted, initialize audio, load
    /// `track` and start it. Later calls do nothing and return `None`.
    pub async fn evaluate(
        &mut self,
        context: &dyn EmbedContext,
        engine: &PlaybackEngine,
        track: &Track,
    ) -> Option<PlaybackSnapshot> {
        if std::mem::replace(&mut self.fired, true) {
            return None;
        }

        if !Self::permits(context) {
            debug!(
                social = context.is_embedded_social_context(),
                mobile = context.is_mobile_device(),
                "Autoplay not permitted"
            );
            return None;
        }

        info!(track_id = %track.id, "Autoplaying track");
        engine.init_audio().await;
        engine.load_track(track.clone()).await;
        Some(engine.toggle_play().await)
    }
}
