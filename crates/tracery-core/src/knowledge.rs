//! Tracker Knowledge Base
//!
//! Loaded once per session from `trackers.json`:
//!
//! ```json
//! { "trackers":   { "<host>": TrackerRecord, ... },
//!   "categories": { "<category>": CategoryDefault, ... } }
//! ```
//!
//! Tracker entries keep their document order; containment matching in the
//! classifier walks them in that order, so the first listed key wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::types::{Category, CategoryDefault, TrackerRecord};

/// Error type for knowledge base loading.
#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Malformed knowledge base: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),
}

/// Immutable tracker lookup.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    trackers: Vec<(String, TrackerRecord)>,
    index: HashMap<String, usize>,
    categories: HashMap<Category, CategoryDefault>,
}

#[derive(Deserialize)]
struct RawKnowledgeBase {
    #[serde(default)]
    trackers: OrderedTrackers,
    #[serde(default)]
    categories: HashMap<String, CategoryDefault>,
}

#[derive(Default)]
struct OrderedTrackers(Vec<(String, TrackerRecord)>);

impl<'de> Deserialize<'de> for OrderedTrackers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = OrderedTrackers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of tracker hosts to records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((host, record)) = map.next_entry::<String, TrackerRecord>()? {
                    entries.push((host, record));
                }
                Ok(OrderedTrackers(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

impl KnowledgeBase {
    /// Parse a knowledge base document.
    pub fn from_json(text: &str) -> Result<Self, KnowledgeError> {
        let raw: RawKnowledgeBase = serde_json::from_str(text)?;
        Ok(Self::from_parts(raw.trackers.0, known_categories(raw.categories)))
    }

    /// Parse a knowledge base, degrading to an empty one on failure.
    pub fn from_json_or_empty(text: &str) -> Self {
        match Self::from_json(text) {
            Ok(kb) => kb,
            Err(e) => {
                log::warn!("Failed to load tracker database: {}", e);
                Self::default()
            }
        }
    }

    /// Build from already-parsed entries. A repeated host keeps its first position
    /// and its last record.
    pub fn from_parts(
        trackers: Vec<(String, TrackerRecord)>,
        categories: HashMap<Category, CategoryDefault>,
    ) -> Self {
        let mut ordered: Vec<(String, TrackerRecord)> = Vec::with_capacity(trackers.len());
        let mut index = HashMap::with_capacity(trackers.len());
        for (host, record) in trackers {
            match index.get(&host).copied() {
                Some(pos) => ordered[pos] = (host, record),
                None => {
                    index.insert(host.clone(), ordered.len());
                    ordered.push((host, record));
                }
            }
        }
        Self { trackers: ordered, index, categories }
    }

    /// Shared empty database used before the real one is loaded.
    pub fn empty() -> &'static KnowledgeBase {
        static EMPTY: OnceLock<KnowledgeBase> = OnceLock::new();
        EMPTY.get_or_init(KnowledgeBase::default)
    }

    /// Exact host lookup returning the stored key as well.
    pub fn get_entry(&self, host: &str) -> Option<(&str, &TrackerRecord)> {
        self.index
            .get(host)
            .map(|&pos| (self.trackers[pos].0.as_str(), &self.trackers[pos].1))
    }

    /// Tracker entries in document order.
    pub fn trackers(&self) -> impl Iterator<Item = (&str, &TrackerRecord)> {
        self.trackers.iter().map(|(host, record)| (host.as_str(), record))
    }

    pub fn category(&self, category: Category) -> Option<&CategoryDefault> {
        self.categories.get(&category)
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty() && self.categories.is_empty()
    }
}

/// Key category defaults by category. Names that do not parse to a known
/// category are dropped so they cannot overwrite each other under `Other`.
fn known_categories(raw: HashMap<String, CategoryDefault>) -> HashMap<Category, CategoryDefault> {
    let mut categories = HashMap::with_capacity(raw.len());
    for (name, default) in raw {
        let category = Category::parse(&name);
        if category == Category::Other && name != Category::Other.as_str() {
            log::warn!("Ignoring unknown tracker category {:?}", name);
            continue;
        }
        categories.insert(category, default);
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreatLevel;

    const SAMPLE: &str = r#"{
        "trackers": {
            "zeta-ads.com": { "category": "advertising", "threatLevel": "high" },
            "alpha-stats.io": { "category": "analytics", "threatLevel": "medium",
                                "company": "Alpha", "description": "stats",
                                "fingerprintingMethods": ["canvas"],
                                "dataCollection": { "behavioralData": true } }
        },
        "categories": {
            "analytics": { "description": "Analytics", "defaultThreatLevel": "medium",
                           "commonMethods": ["cookies"] }
        }
    }"#;

    #[test]
    fn loads_records_in_document_order() {
        let kb = KnowledgeBase::from_json(SAMPLE).expect("sample should parse");
        let hosts: Vec<&str> = kb.trackers().map(|(host, _)| host).collect();
        assert_eq!(hosts, vec!["zeta-ads.com", "alpha-stats.io"]);

        let (_, record) = kb.get_entry("alpha-stats.io").expect("record present");
        assert_eq!(record.company.as_deref(), Some("Alpha"));
        assert!(record.data_collection.behavioral_data);
        assert!(!record.data_collection.personal_info);

        let analytics = kb.category(Category::Analytics).expect("category present");
        assert_eq!(analytics.default_threat_level, ThreatLevel::Medium);
        assert!(kb.category(Category::Social).is_none());
    }

    #[test]
    fn malformed_document_degrades_to_empty() {
        assert!(KnowledgeBase::from_json("{ not json").is_err());
        let kb = KnowledgeBase::from_json_or_empty("{ not json");
        assert!(kb.is_empty());
        assert_eq!(kb.tracker_count(), 0);
    }

    #[test]
    fn missing_sections_are_empty() {
        let kb = KnowledgeBase::from_json("{}").expect("empty object parses");
        assert!(kb.is_empty());
    }

    #[test]
    fn duplicate_hosts_keep_first_position() {
        let kb = KnowledgeBase::from_json(
            r#"{"trackers": {
                "a.com": {"category": "cdn", "threatLevel": "low"},
                "b.com": {"category": "cdn", "threatLevel": "low"},
                "a.com": {"category": "social", "threatLevel": "high"}
            }}"#,
        )
        .expect("duplicates parse");
        let hosts: Vec<&str> = kb.trackers().map(|(host, _)| host).collect();
        assert_eq!(hosts, vec!["a.com", "b.com"]);
        assert_eq!(kb.get_entry("a.com").map(|(_, r)| r.category), Some(Category::Social));
    }

    #[test]
    fn unknown_category_names_are_dropped() {
        let kb = KnowledgeBase::from_json(
            r#"{"categories": {
                "advertising": {"defaultThreatLevel": "medium"},
                "crypto-mining": {"defaultThreatLevel": "critical"},
                "other": {"defaultThreatLevel": "low"},
                "malware": {"defaultThreatLevel": "high"}
            }}"#,
        )
        .expect("categories parse");
        assert_eq!(kb.category_count(), 2);
        assert_eq!(kb.category(Category::Other).map(|c| c.default_threat_level), Some(ThreatLevel::Low));
        assert_eq!(
            kb.category(Category::Advertising).map(|c| c.default_threat_level),
            Some(ThreatLevel::Medium)
        );
    }
}
