//! Persisted settings document
//!
//! Settings are stored flat, one key per field. Any subset of keys may be
//! missing from storage; missing keys take the defaults below (protections
//! on, `balanced` profile, empty lists).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profile::PrivacyProfile;

/// Storage keys, as written by the extension shell.
pub mod keys {
    pub const GLOBAL_BLOCK: &str = "globalBlock";
    pub const WHITELIST: &str = "whitelist";
    pub const CURRENT_PROFILE: &str = "currentProfile";
}

/// Flat settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredSettings {
    pub global_block: Vec<String>,
    pub whitelist: Vec<String>,
    pub current_profile: PrivacyProfile,

    pub canvas_protection: bool,
    pub webgl_protection: bool,
    pub font_protection: bool,
    pub screen_protection: bool,
    pub webrtc_protection: bool,
    pub timing_protection: bool,
    pub user_agent_protection: bool,
    pub timezone_protection: bool,

    pub block_advertising: bool,
    pub block_analytics: bool,
    pub block_social: bool,
    pub block_fingerprinting: bool,
    #[serde(rename = "allowCDN")]
    pub allow_cdn: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            global_block: Vec::new(),
            whitelist: Vec::new(),
            current_profile: PrivacyProfile::default(),
            canvas_protection: true,
            webgl_protection: true,
            font_protection: true,
            screen_protection: true,
            webrtc_protection: true,
            timing_protection: true,
            user_agent_protection: true,
            timezone_protection: true,
            block_advertising: true,
            block_analytics: true,
            block_social: false,
            block_fingerprinting: true,
            allow_cdn: true,
        }
    }
}

impl StoredSettings {
    /// Read settings from a JSON object, tolerating absent keys. A value
    /// that does not parse falls back to its default without affecting the
    /// other keys.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => return serde_json::from_value(other),
        };

        let mut accepted = Map::new();
        for (key, field) in fields {
            let mut single = Map::new();
            single.insert(key.clone(), field.clone());
            match serde_json::from_value::<Self>(Value::Object(single)) {
                Ok(_) => {
                    accepted.insert(key, field);
                }
                Err(e) => log::warn!("Ignoring stored setting {}: {}", key, e),
            }
        }
        serde_json::from_value(Value::Object(accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_takes_defaults() {
        let settings = StoredSettings::from_value(json!({})).expect("empty object parses");
        assert_eq!(settings, StoredSettings::default());
        assert!(settings.canvas_protection);
        assert!(settings.timezone_protection);
        assert_eq!(settings.current_profile, PrivacyProfile::Balanced);
        assert!(settings.global_block.is_empty());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let settings = StoredSettings::from_value(json!({
            "globalBlock": ["tracker.com"],
            "currentProfile": "strict",
            "webglProtection": false,
            "allowCDN": false
        }))
        .expect("partial object parses");

        assert_eq!(settings.global_block, vec!["tracker.com".to_string()]);
        assert_eq!(settings.current_profile, PrivacyProfile::Strict);
        assert!(!settings.webgl_protection);
        assert!(!settings.allow_cdn);
        assert!(settings.canvas_protection);
        assert!(settings.whitelist.is_empty());
    }

    #[test]
    fn serializes_flat_camel_case_keys() {
        let value = serde_json::to_value(StoredSettings::default()).expect("serializes");
        assert_eq!(value["allowCDN"], json!(true));
        assert_eq!(value["userAgentProtection"], json!(true));
        assert_eq!(value[keys::CURRENT_PROFILE], json!("balanced"));
        assert_eq!(value[keys::GLOBAL_BLOCK], json!([]));
    }

    #[test]
    fn bad_value_defaults_only_its_own_key() {
        let settings = StoredSettings::from_value(json!({
            "globalBlock": ["a.com", "b.com"],
            "currentProfile": "custom",
            "whitelist": "example.com",
            "canvasProtection": false
        }))
        .expect("lenient parse");

        assert_eq!(settings.global_block, vec!["a.com".to_string(), "b.com".to_string()]);
        assert_eq!(settings.current_profile, PrivacyProfile::Balanced);
        assert!(settings.whitelist.is_empty());
        assert!(!settings.canvas_protection);
    }
}
