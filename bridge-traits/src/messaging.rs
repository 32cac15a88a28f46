//! Cross-frame message delivery.
//!
//! A [`MessageSource`] stands in for the page's `message` event: each
//! subscription receives every raw string posted to the widget until it is
//! dropped, at which point the host listener is deregistered.

use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    StreamExt,
};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    error::Result,
    platform::{PlatformSendSync, Unsubscribe},
};

/// Live subscription to inbound messages.
pub struct MessageSubscription {
    receiver: UnboundedReceiver<String>,
    unsubscribe: Option<Unsubscribe>,
}

impl MessageSubscription {
    pub fn new(receiver: UnboundedReceiver<String>) -> Self {
        Self {
            receiver,
            unsubscribe: None,
        }
    }

    /// Attach a hook that runs when the subscription is dropped.
    pub fn with_unsubscribe(mut self, hook: Unsubscribe) -> Self {
        self.unsubscribe = Some(hook);
        self
    }

    /// Next raw payload, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.next().await
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.unsubscribe.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for MessageSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSubscription")
            .field("has_unsubscribe", &self.unsubscribe.is_some())
            .finish()
    }
}

pub trait MessageSource: PlatformSendSync {
    fn subscribe(&self) -> Result<MessageSubscription>;
}

/// In-process message source. Hosts that already receive frame messages on
/// their side forward them through [`post`](Self::post).
#[derive(Clone, Default)]
pub struct ChannelMessageSource {
    subscribers: Arc<Mutex<Vec<UnboundedSender<String>>>>,
}

impl ChannelMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every live subscriber.
    pub fn post(&self, payload: impl Into<String>) {
        let payload = payload.into();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.unbounded_send(payload.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl MessageSource for ChannelMessageSource {
    fn subscribe(&self) -> Result<MessageSubscription> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        let subscribers = Arc::clone(&self.subscribers);
        Ok(MessageSubscription::new(rx).with_unsubscribe(Box::new(move || {
            subscribers.lock().retain(|tx| !tx.is_closed());
        })))
    }
}
