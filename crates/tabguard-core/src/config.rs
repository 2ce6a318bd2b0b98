#![forbid(unsafe_code)]

//! Guard configuration.
//!
//! The JS host passes a plain options object (`{ delayMs, destinationUrl }`);
//! every field is optional and falls back to [`GuardConfig::default`].

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between the tab becoming hidden and the redirect firing.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(65);

/// Default redirect destination.
pub const DEFAULT_DESTINATION_URL: &str = "https://www.google.com";

/// Errors produced while building or validating a [`GuardConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `destinationUrl` was empty or whitespace.
    EmptyDestination,
    /// `destinationUrl` used the `javascript:` scheme, which is not a navigation.
    ScriptDestination(String),
    /// The options payload could not be decoded.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDestination => write!(f, "destination url is empty"),
            Self::ScriptDestination(url) => {
                write!(f, "destination url is a script url: {url}")
            }
            Self::Parse(msg) => write!(f, "invalid guard options: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Redirect behavior shared by every host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuardConfig {
    /// Delay before a hidden tab is redirected, encoded as `delayMs`.
    #[serde(rename = "delayMs", with = "duration_millis")]
    pub delay: Duration,
    /// Where the redirect (timer or Space key) navigates to.
    pub destination_url: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_REDIRECT_DELAY,
            destination_url: DEFAULT_DESTINATION_URL.to_owned(),
        }
    }
}

impl GuardConfig {
    /// Replace the redirect delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the redirect destination.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination_url = url.into();
        self
    }

    /// Check that the destination is usable for a hard navigation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.destination_url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyDestination);
        }
        let is_script = url
            .split_once(':')
            .is_some_and(|(scheme, _)| scheme.trim().eq_ignore_ascii_case("javascript"));
        if is_script {
            return Err(ConfigError::ScriptDestination(url.to_owned()));
        }
        Ok(())
    }

    /// Parse and validate options encoded as JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

mod duration_millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        ser.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        // JS numbers arrive as f64; negative or NaN delays clamp to zero.
        let millis = f64::deserialize(de)?;
        if !millis.is_finite() || millis <= 0.0 {
            return Ok(Duration::ZERO);
        }
        Ok(Duration::from_millis(millis.round() as u64))
    }
}
