//! Relay to payload message contract
//!
//! The relay and the payload share no memory. The payload is seeded once
//! through a page global at injection time; afterwards every change arrives
//! as a [`PageMessage`] broadcast on the page's message channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bumped when the message shape changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Page global holding the configuration snapshot.
pub const CONFIG_GLOBAL: &str = "__TRACERY_CONFIG";

/// Extension resource loaded as the payload.
pub const PAYLOAD_SCRIPT: &str = "page-protections.js";

/// Runtime message kind the relay forwards into the page.
pub const UPDATE_PROTECTION_CONFIG: &str = "UPDATE_PROTECTION_CONFIG";

fn protocol_version() -> u32 {
    PROTOCOL_VERSION
}

/// Message posted from the relay into the page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    /// Partial configuration to merge over the live one.
    #[serde(rename = "TRACERY_UPDATE_CONFIG")]
    UpdateConfig {
        #[serde(default)]
        config: Value,
        #[serde(default = "protocol_version")]
        version: u32,
    },
}

impl PageMessage {
    pub fn update(config: Value) -> Self {
        Self::UpdateConfig { config, version: PROTOCOL_VERSION }
    }

    /// Parse a page message event payload. Anything that is not one of ours
    /// yields `None`; pages post unrelated messages on the same channel.
    pub fn parse(data: &Value) -> Option<Self> {
        let message: Self = serde_json::from_value(data.clone()).ok()?;
        match &message {
            Self::UpdateConfig { version, .. } if *version > PROTOCOL_VERSION => {
                log::debug!("Ignoring config update with protocol version {}", version);
                None
            }
            _ => Some(message),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Inline script that seeds the configuration global.
pub fn seed_script(config: &Value) -> String {
    format!("window.{} = {};", CONFIG_GLOBAL, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let message = PageMessage::update(json!({ "canvas": false }));
        assert_eq!(
            message.to_json(),
            json!({ "type": "TRACERY_UPDATE_CONFIG", "config": { "canvas": false }, "version": 1 })
        );
    }

    #[test]
    fn parse_accepts_unversioned_and_rejects_foreign() {
        let parsed = PageMessage::parse(&json!({ "type": "TRACERY_UPDATE_CONFIG", "config": { "webgl": false } }));
        assert_eq!(parsed, Some(PageMessage::update(json!({ "webgl": false }))));

        assert_eq!(PageMessage::parse(&json!({ "type": "SOMETHING_ELSE" })), None);
        assert_eq!(PageMessage::parse(&json!("hello")), None);
        assert_eq!(
            PageMessage::parse(&json!({ "type": "TRACERY_UPDATE_CONFIG", "config": {}, "version": 2 })),
            None
        );
    }

    #[test]
    fn seed_script_assigns_global() {
        let script = seed_script(&json!({ "canvas": true }));
        assert_eq!(script, "window.__TRACERY_CONFIG = {\"canvas\":true};");
    }
}
