//! Subscription task that feeds decoded remote commands to the engine.

use crate::protocol::RemoteCommand;
use bridge_traits::{error::Result as BridgeResult, MessageSource};
use core_playback::PlaybackControl;
use core_runtime::events::{CoreEvent, EventBus, RemoteEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Live remote-control subscription.
///
/// Messages are handled on a spawned task in arrival order. Dropping the
/// bridge stops the task, which drops the host subscription.
pub struct RemoteControlBridge {
    task: JoinHandle<()>,
    events: EventBus,
}

impl RemoteControlBridge {
    /// Subscribe to `source` and forward commands tagged `origin` to
    /// `control`.
    pub fn subscribe(
        source: &dyn MessageSource,
        control: Arc<dyn PlaybackControl>,
        origin: impl Into<String>,
        events: EventBus,
    ) -> BridgeResult<Self> {
        let origin = origin.into();
        let mut subscription = source.subscribe()?;
        info!(%origin, "Remote control subscribed");
        let _ = events.emit(CoreEvent::Remote(RemoteEvent::Subscribed));

        let bus = events.clone();
        let task = tokio::spawn(async move {
            while let Some(payload) = subscription.next().await {
                let Some(command) = RemoteCommand::parse(&payload, &origin) else {
                    continue;
                };
                apply(control.as_ref(), command).await;
                let _ = bus.emit(CoreEvent::Remote(RemoteEvent::CommandApplied {
                    method: command.method().to_string(),
                }));
            }
            debug!("Remote message source closed");
        });

        Ok(Self { task, events })
    }

    /// Whether the subscription task is still receiving.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn apply(control: &dyn PlaybackControl, command: RemoteCommand) {
    debug!(method = command.method(), "Applying remote command");
    match command {
        RemoteCommand::TogglePlay => control.toggle_play().await,
        RemoteCommand::Stop => control.stop().await,
        RemoteCommand::SeekTo(seconds) => control.seek_to(seconds).await,
    }
}

impl Drop for RemoteControlBridge {
    fn drop(&mut self) {
        self.task.abort();
        info!("Remote control unsubscribed");
        let _ = self.events.emit(CoreEvent::Remote(RemoteEvent::Unsubscribed));
    }
}

impl std::fmt::Debug for RemoteControlBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControlBridge")
            .field("active", &self.is_active())
            .finish()
    }
}
