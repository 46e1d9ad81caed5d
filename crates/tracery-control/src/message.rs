//! Control-plane message surface
//!
//! Requests arrive as JSON objects discriminated by `type`. Parsing is split
//! in two so a caller always learns whether the kind itself was unknown or a
//! known kind was missing a field.

use serde::Deserialize;
use serde_json::{json, Value};

use tracery_core::TabId;

/// Every request kind the control plane answers.
pub const KINDS: &[&str] = &[
    "GET_DOMAINS",
    "GET_TAB_STATISTICS",
    "GET_THREAT_ATTEMPTS",
    "GET_FINGERPRINTING_ATTEMPTS",
    "TOGGLE_GLOBAL",
    "SET_GLOBAL_BLOCKLIST",
    "SWITCH_PRIVACY_PROFILE",
    "GET_PRIVACY_PROFILES",
    "UPDATE_PROTECTION_CONFIG",
    "GET_WHITELIST",
    "ADD_TO_WHITELIST",
    "REMOVE_FROM_WHITELIST",
    "GET_TRACKER_INFO",
];

/// Error type for messages that cannot be handled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Message has no type")]
    MissingKind,
    #[error("Unknown message type: {0}")]
    UnknownKind(String),
    #[error("Malformed {kind} message: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("Unknown privacy profile: {0}")]
    UnknownProfile(String),
}

impl MessageError {
    /// Failure response sent back to the caller.
    pub fn to_response(&self) -> Value {
        json!({ "success": false, "error": self.to_string() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    GetDomains {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    GetTabStatistics {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    GetThreatAttempts {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    GetFingerprintingAttempts {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    /// `add` absent or null toggles current membership.
    ToggleGlobal {
        domain: String,
        #[serde(default)]
        add: Option<bool>,
    },
    SetGlobalBlocklist {
        domains: Vec<String>,
    },
    SwitchPrivacyProfile {
        profile: String,
    },
    GetPrivacyProfiles {},
    /// Forwarded as-is; the shape is not checked here.
    UpdateProtectionConfig {
        #[serde(default)]
        config: Value,
    },
    GetWhitelist {},
    AddToWhitelist {
        domain: String,
    },
    RemoveFromWhitelist {
        domain: String,
    },
    GetTrackerInfo {
        domain: String,
    },
}

impl Request {
    pub fn parse(message: &Value) -> Result<Self, MessageError> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or(MessageError::MissingKind)?;
        if !KINDS.contains(&kind) {
            return Err(MessageError::UnknownKind(kind.to_string()));
        }
        serde_json::from_value(message.clone()).map_err(|e| MessageError::Malformed {
            kind: kind.to_string(),
            reason: e.to_string(),
        })
    }
}
