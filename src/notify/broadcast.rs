//! In-process channel backed by a `tokio` broadcast queue.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::{Notifier, NotifyError};
use crate::config::{CaptureConfig, ConfigError};
use crate::event::{self, ChangeEvent};

/// A tenant channel fanning payloads out to every connected [`Subscription`].
///
/// `publish` never blocks: when a subscriber falls more than the channel
/// capacity behind, its oldest payloads are dropped.
#[derive(Debug)]
pub struct BroadcastNotifier {
    channel: String,
    max_payload_bytes: usize,
    sender: RwLock<Option<broadcast::Sender<Arc<str>>>>,
}

impl BroadcastNotifier {
    /// Opens a channel with the default capacity and payload limit.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        let defaults = CaptureConfig::default();
        Self::open(
            channel.into(),
            defaults.subscriber_capacity,
            defaults.max_payload_bytes,
        )
    }

    /// Opens the channel named in `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: &CaptureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::open(
            config.channel.clone(),
            config.subscriber_capacity,
            config.max_payload_bytes,
        ))
    }

    fn open(channel: String, capacity: usize, max_payload_bytes: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            channel,
            max_payload_bytes,
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Connects a new subscriber. It only sees payloads published from now on.
    ///
    /// Returns `None` once the channel is closed.
    #[must_use]
    pub fn subscribe(&self) -> Option<Subscription> {
        let sender = self.sender.read();
        sender.as_ref().map(|sender| Subscription {
            channel: self.channel.clone(),
            receiver: sender.subscribe(),
        })
    }

    /// Number of connected subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Closes the channel. Later publishes fail with [`NotifyError::Unreachable`];
    /// subscribers drain what they already received and then see the end.
    pub fn close(&self) {
        self.sender.write().take();
    }
}

impl Notifier for BroadcastNotifier {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        if payload.len() > self.max_payload_bytes {
            return Err(NotifyError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        let sender = self.sender.read();
        let sender = sender
            .as_ref()
            .ok_or_else(|| NotifyError::Unreachable(self.channel.clone()))?;

        // A send without receivers is the normal at-most-once loss.
        match sender.send(Arc::from(payload)) {
            Ok(receivers) => {
                tracing::debug!(channel = %self.channel, receivers, "published change event");
            }
            Err(_) => {
                tracing::trace!(channel = %self.channel, "no subscriber listening, event dropped");
            }
        }
        Ok(())
    }
}

/// A consumer connected to a [`BroadcastNotifier`].
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    receiver: broadcast::Receiver<Arc<str>>,
}

impl Subscription {
    /// Name of the channel this subscription listens on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Returns the next buffered payload without waiting.
    ///
    /// Returns `None` when nothing is buffered or the channel is closed.
    /// Payloads lost to lag are skipped with a warning.
    pub fn try_recv(&mut self) -> Option<Arc<str>> {
        loop {
            match self.receiver.try_recv() {
                Ok(payload) => return Some(payload),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(channel = %self.channel, missed, "subscriber lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next payload. Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(channel = %self.channel, missed, "subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next buffered payload decoded as a [`ChangeEvent`].
    pub fn try_next_event(&mut self) -> Option<Result<ChangeEvent, serde_json::Error>> {
        self.try_recv().map(|payload| event::parse(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let notifier = BroadcastNotifier::new("shop");
        assert_eq!(notifier.subscriber_count(), 0);
        assert!(notifier.publish("{}").is_ok());
    }

    #[test]
    fn test_subscriber_only_sees_later_payloads() {
        let notifier = BroadcastNotifier::new("shop");
        notifier.publish("before").unwrap();

        let mut subscription = notifier.subscribe().unwrap();
        notifier.publish("after").unwrap();

        assert_eq!(subscription.channel(), "shop");
        assert_eq!(subscription.try_recv().as_deref(), Some("after"));
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn test_every_subscriber_receives_each_payload() {
        let notifier = BroadcastNotifier::new("shop");
        let mut first = notifier.subscribe().unwrap();
        let mut second = notifier.subscribe().unwrap();
        notifier.publish("one").unwrap();

        assert_eq!(first.try_recv().as_deref(), Some("one"));
        assert_eq!(second.try_recv().as_deref(), Some("one"));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let config = CaptureConfig {
            max_payload_bytes: 4,
            ..CaptureConfig::new("shop")
        };
        let notifier = BroadcastNotifier::from_config(&config).unwrap();
        assert_eq!(
            notifier.publish("12345"),
            Err(NotifyError::PayloadTooLarge { size: 5, limit: 4 })
        );
        assert!(notifier.publish("1234").is_ok());
    }

    #[test]
    fn test_lagging_subscriber_skips_dropped_payloads() {
        let config = CaptureConfig {
            subscriber_capacity: 2,
            ..CaptureConfig::new("shop")
        };
        let notifier = BroadcastNotifier::from_config(&config).unwrap();
        let mut subscription = notifier.subscribe().unwrap();
        for payload in ["1", "2", "3", "4"] {
            notifier.publish(payload).unwrap();
        }

        assert_eq!(subscription.try_recv().as_deref(), Some("3"));
        assert_eq!(subscription.try_recv().as_deref(), Some("4"));
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn test_closed_channel_is_unreachable() {
        let notifier = BroadcastNotifier::new("shop");
        let mut subscription = notifier.subscribe().unwrap();
        notifier.publish("last").unwrap();
        notifier.close();

        assert_eq!(
            notifier.publish("late"),
            Err(NotifyError::Unreachable("shop".into()))
        );
        assert!(notifier.subscribe().is_none());
        assert_eq!(subscription.try_recv().as_deref(), Some("last"));
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn test_oversized_capacity_fails_to_open() {
        let config = CaptureConfig {
            subscriber_capacity: usize::MAX / 2 + 1,
            ..CaptureConfig::new("shop")
        };
        assert!(matches!(
            BroadcastNotifier::from_config(&config),
            Err(ConfigError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_recv_waits_for_published_payload() {
        let notifier = Arc::new(BroadcastNotifier::new("shop"));
        let mut subscription = notifier.subscribe().unwrap();

        let publisher = Arc::clone(&notifier);
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            publisher.publish("delayed").unwrap();
        });

        assert_eq!(subscription.recv().await.as_deref(), Some("delayed"));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_skips_lagged_payloads() {
        let config = CaptureConfig {
            subscriber_capacity: 2,
            ..CaptureConfig::new("shop")
        };
        let notifier = BroadcastNotifier::from_config(&config).unwrap();
        let mut subscription = notifier.subscribe().unwrap();
        for payload in ["1", "2", "3", "4"] {
            notifier.publish(payload).unwrap();
        }

        assert_eq!(subscription.recv().await.as_deref(), Some("3"));
        assert_eq!(subscription.recv().await.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_recv_ends_after_close() {
        let notifier = BroadcastNotifier::new("shop");
        let mut subscription = notifier.subscribe().unwrap();
        notifier.publish("last").unwrap();
        notifier.close();

        assert_eq!(subscription.recv().await.as_deref(), Some("last"));
        assert_eq!(subscription.recv().await, None);
    }
}
