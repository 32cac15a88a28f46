//! Listen analytics delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    platform::PlatformSendSync,
    playback::{MediaKey, TrackId},
};

/// A single "this session was listened to" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenReport {
    pub track_id: TrackId,
    pub media_key: MediaKey,
    /// Listened time accumulated when the threshold was crossed.
    pub elapsed_seconds: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Delivers listen reports to the analytics collaborator.
///
/// The core calls this fire-and-forget: errors are logged and dropped, and a
/// report is never retried.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ListenReporter: PlatformSendSync {
    async fn report_listen(&self, report: ListenReport) -> Result<()>;
}

/// Reporter that discards everything. Used when listen tracking is disabled.
#[derive(Debug, Clone, Default)]
pub struct NoopListenReporter;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl ListenReporter for NoopListenReporter {
    async fn report_listen(&self, _report: ListenReport) -> Result<()> {
        Ok(())
    }
}
