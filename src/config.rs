//! Capture configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default bound on a published payload. The live channel rejects payloads of
/// 8000 bytes or more.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 7999;

/// Default number of payloads buffered per subscriber.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Largest accepted number of payloads buffered per subscriber.
pub const MAX_SUBSCRIBER_CAPACITY: usize = 1 << 20;

/// Errors raised by an invalid [`CaptureConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The channel name is empty.
    #[error("channel name must not be empty")]
    EmptyChannel,

    /// A size setting is zero.
    #[error("'{0}' must be greater than zero")]
    Zero(&'static str),

    /// A size setting exceeds its upper bound.
    #[error("'{setting}' must be at most {max}")]
    TooLarge {
        /// Name of the setting.
        setting: &'static str,
        /// Largest accepted value.
        max: usize,
    },

    /// The configuration text could not be parsed.
    #[error("invalid capture configuration: {0}")]
    Parse(String),
}

/// Settings of a capture hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Name of the owning tenant or database, used as the channel name.
    pub channel: String,
    /// Largest payload, in bytes, the channel accepts.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Payloads buffered per subscriber before the oldest are dropped.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,
    /// JSON-lines file the audit trail is appended to, if any.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_subscriber_capacity() -> usize {
    DEFAULT_SUBSCRIBER_CAPACITY
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            audit_log: None,
        }
    }
}

impl CaptureConfig {
    /// Default settings for `channel`.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the JSON is malformed or the settings are
    /// invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Zero("max_payload_bytes"));
        }
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::Zero("subscriber_capacity"));
        }
        if self.subscriber_capacity > MAX_SUBSCRIBER_CAPACITY {
            return Err(ConfigError::TooLarge {
                setting: "subscriber_capacity",
                max: MAX_SUBSCRIBER_CAPACITY,
            });
        }
        Ok(())
    }
}
