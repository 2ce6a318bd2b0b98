#![forbid(unsafe_code)]

//! Options object accepted by the JS constructor.
//!
//! ```json
//! { "delayMs": 65, "destinationUrl": "https://www.google.com",
//!   "overlayId": "overlay", "toggleId": "toggle-switch",
//!   "iconId": "switch-icon", "statusId": "protection-status" }
//! ```
//!
//! Every field is optional.

use serde::{Deserialize, Serialize};
use tabguard_core::{ConfigError, GuardConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebGuardOptions {
    #[serde(flatten)]
    pub guard: GuardConfig,
    /// Id of the cover element; reused if already in the page.
    pub overlay_id: String,
    pub toggle_id: String,
    pub icon_id: String,
    pub status_id: String,
}

impl Default for WebGuardOptions {
    fn default() -> Self {
        Self {
            guard: GuardConfig::default(),
            overlay_id: "overlay".to_owned(),
            toggle_id: "toggle-switch".to_owned(),
            icon_id: "switch-icon".to_owned(),
            status_id: "protection-status".to_owned(),
        }
    }
}

impl WebGuardOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.guard.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_yields_reference_ids() {
        let options = WebGuardOptions::from_json_str("{}").unwrap();
        assert_eq!(options, WebGuardOptions::default());
        assert_eq!(options.overlay_id, "overlay");
        assert_eq!(options.status_id, "protection-status");
    }

    #[test]
    fn guard_fields_are_flattened() {
        let options = WebGuardOptions::from_json_str(
            r#"{"delayMs": 120, "destinationUrl": "/bye", "overlayId": "cover"}"#,
        )
        .unwrap();
        assert_eq!(options.guard.delay, Duration::from_millis(120));
        assert_eq!(options.guard.destination_url, "/bye");
        assert_eq!(options.overlay_id, "cover");
        assert_eq!(options.toggle_id, "toggle-switch");
    }

    #[test]
    fn invalid_destination_is_rejected() {
        let err = WebGuardOptions::from_json_str(r#"{"destinationUrl": ""}"#).unwrap_err();
        assert_eq!(err, ConfigError::EmptyDestination);
    }
}
