//! Core type definitions for Tracery
//!
//! These types mirror the JSON shapes exchanged with the extension shell
//! (knowledge base file, message responses) and are shared by every crate
//! in the workspace.

use serde::{Deserialize, Serialize};

/// Browser tab identifier. Negative ids belong to non-tab contexts.
pub type TabId = i32;

// =============================================================================
// Tracker Categories
// =============================================================================

/// Category a tracker host belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Advertising,
    Analytics,
    Social,
    Fingerprinting,
    Cdn,
    /// Explicitly marked unknown in the knowledge base
    Unknown,
    /// Nothing matched
    Other,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Advertising => "advertising",
            Self::Analytics => "analytics",
            Self::Social => "social",
            Self::Fingerprinting => "fingerprinting",
            Self::Cdn => "cdn",
            Self::Unknown => "unknown",
            Self::Other => "other",
        }
    }

    /// Parse a category name. Unrecognized names map to `Other`.
    pub fn parse(name: &str) -> Self {
        match name {
            "advertising" => Self::Advertising,
            "analytics" => Self::Analytics,
            "social" => Self::Social,
            "fingerprinting" => Self::Fingerprinting,
            "cdn" => Self::Cdn,
            "unknown" => Self::Unknown,
            _ => Self::Other,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Threat Levels
// =============================================================================

/// Assessed threat level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a threat level name. Unrecognized names map to `Low`.
    pub fn parse(name: &str) -> Self {
        match name {
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Low,
        }
    }

    /// `high` and `critical` hosts produce threat-attempt records.
    #[inline]
    pub fn is_alarming(self) -> bool {
        self >= Self::High
    }
}

impl From<String> for ThreatLevel {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ThreatLevel> for String {
    fn from(value: ThreatLevel) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Knowledge Base Records
// =============================================================================

/// What a tracker collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataCollection {
    pub personal_info: bool,
    pub behavioral_data: bool,
    pub device_fingerprinting: bool,
    pub location_tracking: bool,
}

/// A known tracker host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerRecord {
    pub category: Category,
    pub threat_level: ThreatLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fingerprinting_methods: Vec<String>,
    #[serde(default)]
    pub data_collection: DataCollection,
}

/// Defaults applied to hosts that only resolve to a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefault {
    #[serde(default)]
    pub description: String,
    pub default_threat_level: ThreatLevel,
    #[serde(default)]
    pub common_methods: Vec<String>,
}

// =============================================================================
// Resource Types (bit mask for rule conditions)
// =============================================================================

bitflags::bitflags! {
    /// Resource type bit mask, named after the browser's request types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUB_FRAME = 1 << 5;
        const MAIN_FRAME = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const CSP_REPORT = 1 << 12;

        /// Types covered by synthesized block rules
        const BLOCKABLE = Self::SCRIPT.bits()
            | Self::IMAGE.bits()
            | Self::XMLHTTPREQUEST.bits()
            | Self::SUB_FRAME.bits()
            | Self::FONT.bits()
            | Self::MEDIA.bits();
    }
}

const RESOURCE_NAMES: &[(ResourceType, &str)] = &[
    (ResourceType::MAIN_FRAME, "main_frame"),
    (ResourceType::SUB_FRAME, "sub_frame"),
    (ResourceType::STYLESHEET, "stylesheet"),
    (ResourceType::SCRIPT, "script"),
    (ResourceType::IMAGE, "image"),
    (ResourceType::FONT, "font"),
    (ResourceType::OBJECT, "object"),
    (ResourceType::XMLHTTPREQUEST, "xmlhttprequest"),
    (ResourceType::PING, "ping"),
    (ResourceType::CSP_REPORT, "csp_report"),
    (ResourceType::MEDIA, "media"),
    (ResourceType::WEBSOCKET, "websocket"),
    (ResourceType::OTHER, "other"),
];

impl ResourceType {
    /// Parse from browser request type string.
    pub fn from_request_name(s: &str) -> Self {
        RESOURCE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(ty, _)| *ty)
            .unwrap_or(Self::OTHER)
    }

    /// Browser names of every single type set in this mask.
    pub fn names(self) -> Vec<&'static str> {
        RESOURCE_NAMES
            .iter()
            .filter(|(ty, _)| self.contains(*ty))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl Serialize for ResourceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names
            .iter()
            .fold(Self::empty(), |mask, name| mask | Self::from_request_name(name)))
    }
}

// =============================================================================
// Per-Tab Records
// =============================================================================

/// A fingerprinting attempt attributed to a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintAttempt {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub url: String,
    pub timestamp: u64,
}

/// A request to a high or critical threat host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatAttempt {
    pub domain: String,
    pub url: String,
    pub level: ThreatLevel,
    pub timestamp: u64,
}

/// Per-tab counters reported to the popup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStatistics {
    pub total_trackers: usize,
    pub fingerprinting_attempts: usize,
    pub threat_attempts: usize,
    pub blocked_trackers: usize,
}

// =============================================================================
// Badge
// =============================================================================

/// Badge background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BadgeColor {
    /// Fingerprinting or threat attempts seen
    Alert,
    /// Only plain third-party hosts seen
    Neutral,
}

impl BadgeColor {
    pub const fn css(self) -> &'static str {
        match self {
            Self::Alert => "#dc2626",
            Self::Neutral => "#D3D3D3",
        }
    }
}

/// Visible badge state for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub color: Option<BadgeColor>,
}

impl Badge {
    pub fn empty() -> Self {
        Self { text: String::new(), color: None }
    }
}
