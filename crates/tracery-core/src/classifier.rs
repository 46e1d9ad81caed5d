//! Tracker classification and threat assessment
//!
//! Resolution order, first match wins:
//!
//! 1. Exact host match in the knowledge base.
//! 2. Containment match: the host contains a tracker key, or a tracker key
//!    contains the host. This is deliberately loose. It catches subdomains in
//!    both directions and also produces false positives for short keys
//!    embedded in unrelated hosts.
//! 3. Keyword heuristics on the lower-cased host.
//! 4. `Category::Other`.
//!
//! Threat assessment uses the record found by steps 1-2, then the category
//! default, then `low`. Everything here is a pure read of the knowledge base.

use crate::knowledge::KnowledgeBase;
use crate::types::{Category, ThreatLevel, TrackerRecord};

/// Keyword sets tried in order when no record matches.
const KEYWORD_PATTERNS: &[(Category, &[&str])] = &[
    (Category::Analytics, &["analytics", "tracking", "stats", "metrics", "insights"]),
    (Category::Advertising, &["ads", "doubleclick", "adsystem", "adnxs", "adsense"]),
    (Category::Social, &["facebook", "twitter", "linkedin", "pinterest", "instagram"]),
    (Category::Fingerprinting, &["fingerprint", "captcha", "recaptcha", "maxmind"]),
    (Category::Cdn, &["cdn", "cloudflare", "amazonaws", "gstatic"]),
];

/// How a host was resolved to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Containment,
}

/// A knowledge base record matched for a host.
#[derive(Debug, Clone, Copy)]
pub struct RecordMatch<'a> {
    /// Tracker key that matched
    pub key: &'a str,
    pub record: &'a TrackerRecord,
    pub kind: MatchKind,
}

/// Classifier over a borrowed knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> Classifier<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn knowledge(&self) -> &'a KnowledgeBase {
        self.kb
    }

    /// Find the record for a host (steps 1-2).
    pub fn lookup(&self, host: &str) -> Option<RecordMatch<'a>> {
        if let Some((key, record)) = self.kb.get_entry(host) {
            return Some(RecordMatch { key, record, kind: MatchKind::Exact });
        }
        self.kb
            .trackers()
            .find(|(key, _)| host.contains(key) || key.contains(host))
            .map(|(key, record)| RecordMatch { key, record, kind: MatchKind::Containment })
    }

    /// Resolve a host to its category.
    pub fn classify(&self, host: &str) -> Category {
        if let Some(found) = self.lookup(host) {
            return found.record.category;
        }
        keyword_category(host).unwrap_or(Category::Other)
    }

    /// Resolve a host to its threat level.
    pub fn assess_threat(&self, host: &str) -> ThreatLevel {
        if let Some(found) = self.lookup(host) {
            return found.record.threat_level;
        }
        let category = keyword_category(host).unwrap_or(Category::Other);
        self.kb
            .category(category)
            .map(|defaults| defaults.default_threat_level)
            .unwrap_or(ThreatLevel::Low)
    }

    /// Full assessment in one pass.
    pub fn assess(&self, host: &str) -> Assessment<'a> {
        match self.lookup(host) {
            Some(found) => Assessment {
                category: found.record.category,
                threat_level: found.record.threat_level,
                record: Some(found),
            },
            None => {
                let category = keyword_category(host).unwrap_or(Category::Other);
                let threat_level = self
                    .kb
                    .category(category)
                    .map(|defaults| defaults.default_threat_level)
                    .unwrap_or(ThreatLevel::Low);
                Assessment { category, threat_level, record: None }
            }
        }
    }
}

/// Combined classification result.
#[derive(Debug, Clone, Copy)]
pub struct Assessment<'a> {
    pub category: Category,
    pub threat_level: ThreatLevel,
    pub record: Option<RecordMatch<'a>>,
}

/// Keyword heuristic (step 3).
pub fn keyword_category(host: &str) -> Option<Category> {
    let lowered = host.to_ascii_lowercase();
    KEYWORD_PATTERNS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::from_json(
            r#"{
                "trackers": {
                    "ads.example.com": { "category": "advertising", "threatLevel": "high" },
                    "tracker.net": { "category": "analytics", "threatLevel": "medium" },
                    "fp.io": { "category": "fingerprinting", "threatLevel": "critical",
                               "fingerprintingMethods": ["canvas", "webgl"] }
                },
                "categories": {
                    "social": { "description": "Social widgets", "defaultThreatLevel": "medium" },
                    "cdn": { "description": "CDN", "defaultThreatLevel": "low" }
                }
            }"#,
        )
        .expect("sample knowledge base parses")
    }

    #[test]
    fn exact_match_wins() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);
        assert_eq!(classifier.classify("ads.example.com"), Category::Advertising);
        assert_eq!(classifier.assess_threat("ads.example.com"), ThreatLevel::High);
        assert_eq!(classifier.lookup("ads.example.com").map(|m| m.kind), Some(MatchKind::Exact));
    }

    #[test]
    fn containment_matches_both_directions() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);

        // host contains key
        assert_eq!(classifier.classify("cdn.tracker.net"), Category::Analytics);
        // key contains host
        assert_eq!(classifier.classify("example.com"), Category::Advertising);
        assert_eq!(classifier.assess_threat("example.com"), ThreatLevel::High);

        let found = classifier.lookup("cdn.tracker.net").expect("containment match");
        assert_eq!(found.key, "tracker.net");
        assert_eq!(found.kind, MatchKind::Containment);
    }

    #[test]
    fn containment_false_positive_is_preserved() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);
        // "fp.io" is embedded in an unrelated host
        assert_eq!(classifier.classify("myfp.io"), Category::Fingerprinting);
        assert_eq!(classifier.assess_threat("myfp.io"), ThreatLevel::Critical);
    }

    #[test]
    fn keyword_fallback_and_category_defaults() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);

        assert_eq!(classifier.classify("connect.facebook.com"), Category::Social);
        assert_eq!(classifier.assess_threat("connect.facebook.com"), ThreatLevel::Medium);

        assert_eq!(classifier.classify("static.cloudflare.com"), Category::Cdn);
        assert_eq!(classifier.assess_threat("static.cloudflare.com"), ThreatLevel::Low);

        // matched category without defaults falls back to low
        assert_eq!(classifier.classify("metrics.somewhere.org"), Category::Analytics);
        assert_eq!(classifier.assess_threat("metrics.somewhere.org"), ThreatLevel::Low);
    }

    #[test]
    fn keyword_order_prefers_analytics() {
        assert_eq!(keyword_category("adsanalytics.com"), Some(Category::Analytics));
        assert_eq!(keyword_category("WWW.RECAPTCHA.NET"), Some(Category::Fingerprinting));
        assert_eq!(keyword_category("plain.org"), None);
    }

    #[test]
    fn unmatched_host_is_other_and_low() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);
        assert_eq!(classifier.classify("plain-site.org"), Category::Other);
        assert_eq!(classifier.assess_threat("plain-site.org"), ThreatLevel::Low);
    }

    #[test]
    fn classification_is_deterministic() {
        let kb = sample_kb();
        let classifier = Classifier::new(&kb);
        for host in ["ads.example.com", "cdn.tracker.net", "stats.x.org", "nothing.example"] {
            let first = classifier.assess(host);
            for _ in 0..5 {
                let again = classifier.assess(host);
                assert_eq!(first.category, again.category);
                assert_eq!(first.threat_level, again.threat_level);
            }
        }
    }

    #[test]
    fn empty_database_uses_heuristics_only() {
        let classifier = Classifier::new(KnowledgeBase::empty());
        assert_eq!(classifier.classify("ads.example.com"), Category::Advertising);
        assert_eq!(classifier.assess_threat("ads.example.com"), ThreatLevel::Low);
    }
}
