//! Best-effort publication of change events on a per-tenant channel.
//!
//! Publishing never waits for subscribers and gets no acknowledgement. A
//! subscriber that is not listening when an event is published misses it;
//! the audit trail is the only durable copy.

mod broadcast;

pub use broadcast::{BroadcastNotifier, Subscription};

/// Errors raised while publishing a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The payload exceeds the channel's size limit.
    #[error("payload of {size} bytes exceeds the {limit} byte channel limit")]
    PayloadTooLarge {
        /// Size of the rejected payload in bytes.
        size: usize,
        /// Channel limit in bytes.
        limit: usize,
    },

    /// The event could not be serialized.
    #[error("cannot serialize change event: {0}")]
    Serialize(String),

    /// The channel can no longer be published on.
    #[error("channel '{0}' is unreachable")]
    Unreachable(String),
}

/// A publish/subscribe channel scoped to one tenant.
pub trait Notifier {
    /// Name of the channel events are published on.
    fn channel(&self) -> &str;

    /// Publishes `payload` without waiting for any subscriber.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] if the channel rejects the payload or cannot
    /// be reached. Having no subscriber is not an error.
    fn publish(&self, payload: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    #[inline]
    fn channel(&self) -> &str {
        N::channel(self)
    }

    #[inline]
    fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        N::publish(self, payload)
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    #[inline]
    fn channel(&self) -> &str {
        N::channel(self)
    }

    #[inline]
    fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        N::publish(self, payload)
    }
}
