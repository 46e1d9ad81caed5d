//! Countermeasure configuration
//!
//! One live instance per page. It starts from the snapshot seeded by the
//! relay and later update messages merge over it field by field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tracery_core::settings::StoredSettings;

/// Which protections are enabled. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CountermeasureConfig {
    pub canvas: bool,
    pub webgl: bool,
    pub fonts: bool,
    pub screen: bool,
    pub webrtc: bool,
    pub timing: bool,
    pub user_agent: bool,
    pub timezone: bool,
}

impl Default for CountermeasureConfig {
    fn default() -> Self {
        Self {
            canvas: true,
            webgl: true,
            fonts: true,
            screen: true,
            webrtc: true,
            timing: true,
            user_agent: true,
            timezone: true,
        }
    }
}

impl CountermeasureConfig {
    /// Snapshot derived from persisted settings.
    pub fn from_settings(settings: &StoredSettings) -> Self {
        Self {
            canvas: settings.canvas_protection,
            webgl: settings.webgl_protection,
            fonts: settings.font_protection,
            screen: settings.screen_protection,
            webrtc: settings.webrtc_protection,
            timing: settings.timing_protection,
            user_agent: settings.user_agent_protection,
            timezone: settings.timezone_protection,
        }
    }

    /// Defaults with a seeded snapshot merged over them.
    pub fn from_seed(seed: Option<&Value>) -> Self {
        let mut config = Self::default();
        if let Some(seed) = seed {
            config.merge(seed);
        }
        config
    }

    /// Merge boolean fields from a JSON object. Unknown keys and
    /// non-boolean values are ignored. Returns how many fields changed.
    pub fn merge(&mut self, update: &Value) -> usize {
        let fields = match update.as_object() {
            Some(fields) => fields,
            None => return 0,
        };

        let mut changed = 0;
        for (key, value) in fields {
            let enabled = match value.as_bool() {
                Some(enabled) => enabled,
                None => continue,
            };
            let slot = match key.as_str() {
                "canvas" => &mut self.canvas,
                "webgl" => &mut self.webgl,
                "fonts" => &mut self.fonts,
                "screen" => &mut self.screen,
                "webrtc" => &mut self.webrtc,
                "timing" => &mut self.timing,
                "userAgent" => &mut self.user_agent,
                "timezone" => &mut self.timezone,
                _ => continue,
            };
            if *slot != enabled {
                *slot = enabled;
                changed += 1;
            }
        }
        changed
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_is_partial_and_lenient() {
        let mut config = CountermeasureConfig::default();
        let changed = config.merge(&json!({
            "canvas": false,
            "userAgent": false,
            "webgl": "no",
            "audio": false
        }));
        assert_eq!(changed, 2);
        assert!(!config.canvas);
        assert!(!config.user_agent);
        assert!(config.webgl);
        assert!(config.fonts);
    }

    #[test]
    fn later_merges_never_replace_wholesale() {
        let mut config = CountermeasureConfig::from_seed(Some(&json!({ "timing": false })));
        config.merge(&json!({ "screen": false }));
        assert!(!config.timing);
        assert!(!config.screen);
        assert_eq!(config.merge(&json!(null)), 0);
        assert_eq!(config.merge(&json!({})), 0);
    }

    #[test]
    fn seeds_from_settings() {
        let settings = StoredSettings { webrtc_protection: false, ..StoredSettings::default() };
        let config = CountermeasureConfig::from_settings(&settings);
        assert!(!config.webrtc);
        assert!(config.timezone);
        assert_eq!(config.to_json()["webrtc"], json!(false));
        assert_eq!(config.to_json()["userAgent"], json!(true));
    }
}
