//! Privacy profile presets

use serde::{Deserialize, Serialize};

/// Named preset bundle of category-blocking preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyProfile {
    Minimal,
    #[default]
    Balanced,
    Strict,
}

/// Category toggles carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub block_advertising: bool,
    pub block_analytics: bool,
    pub block_social: bool,
    pub block_fingerprinting: bool,
    #[serde(rename = "allowCDN")]
    pub allow_cdn: bool,
}

impl PrivacyProfile {
    /// All presets in display order.
    pub const ALL: [PrivacyProfile; 3] = [Self::Minimal, Self::Balanced, Self::Strict];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Balanced => "balanced",
            Self::Strict => "strict",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|profile| profile.as_str() == name)
    }

    pub const fn settings(self) -> ProfileSettings {
        match self {
            Self::Minimal => ProfileSettings {
                block_advertising: true,
                block_analytics: false,
                block_social: false,
                block_fingerprinting: true,
                allow_cdn: true,
            },
            Self::Balanced => ProfileSettings {
                block_advertising: true,
                block_analytics: true,
                block_social: false,
                block_fingerprinting: true,
                allow_cdn: true,
            },
            Self::Strict => ProfileSettings {
                block_advertising: true,
                block_analytics: true,
                block_social: true,
                block_fingerprinting: true,
                allow_cdn: false,
            },
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|profile| profile.as_str()).collect()
    }
}

impl std::fmt::Display for PrivacyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
