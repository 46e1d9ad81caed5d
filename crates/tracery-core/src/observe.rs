//! Per-tab observation store
//!
//! One `TabObservation` per live tab, created on the first third-party
//! request and dropped when the tab closes. Threat and fingerprinting
//! attempts are only recorded the first time a host is seen in a tab, so
//! repeated requests to the same host never add duplicate entries.

use std::collections::{HashMap, HashSet};

use crate::classifier::Classifier;
use crate::types::{
    Badge, BadgeColor, Category, FingerprintAttempt, TabId, TabStatistics, ThreatAttempt,
};
use crate::url::extract_host;

/// Method recorded when neither the record nor the category names one.
const FALLBACK_FINGERPRINT_METHOD: &str = "fingerprinting-script";

/// A network request as seen by the control plane.
#[derive(Debug, Clone, Copy)]
pub struct ObservedRequest<'a> {
    pub tab_id: TabId,
    /// Full request URL
    pub url: &'a str,
    /// Initiator origin, absent for browser-initiated requests
    pub initiator: Option<&'a str>,
    /// Milliseconds since the epoch
    pub timestamp: u64,
}

/// Why a request did or did not change tab state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// Sentinel or negative tab id
    NotATab,
    /// Request or initiator URL has no usable host
    Unparseable,
    /// Request host equals initiator host
    FirstParty,
    /// Host recorded; `newly_seen` is false for repeat hosts
    Recorded { host: String, newly_seen: bool, badge: Badge },
}

/// Everything observed for one tab.
#[derive(Debug, Clone, Default)]
pub struct TabObservation {
    hosts: HashSet<String>,
    fingerprinting_attempts: Vec<FingerprintAttempt>,
    threat_attempts: Vec<ThreatAttempt>,
}

impl TabObservation {
    pub fn hosts(&self) -> &HashSet<String> {
        &self.hosts
    }

    pub fn fingerprinting_attempts(&self) -> &[FingerprintAttempt] {
        &self.fingerprinting_attempts
    }

    pub fn threat_attempts(&self) -> &[ThreatAttempt] {
        &self.threat_attempts
    }

    /// Badge projection: attempts first, then host count, else empty.
    pub fn badge(&self) -> Badge {
        if !self.fingerprinting_attempts.is_empty() || !self.threat_attempts.is_empty() {
            Badge {
                text: self.fingerprinting_attempts.len().to_string(),
                color: Some(BadgeColor::Alert),
            }
        } else if !self.hosts.is_empty() {
            Badge {
                text: self.hosts.len().to_string(),
                color: Some(BadgeColor::Neutral),
            }
        } else {
            Badge::empty()
        }
    }
}

/// Tab-keyed arena of observations.
#[derive(Debug, Default)]
pub struct ObservationStore {
    tabs: HashMap<TabId, TabObservation>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one request in arrival order.
    pub fn observe(&mut self, classifier: &Classifier<'_>, request: &ObservedRequest<'_>) -> ObserveOutcome {
        if request.tab_id < 0 {
            return ObserveOutcome::NotATab;
        }

        let host = match extract_host(request.url) {
            Some(host) => host,
            None => return ObserveOutcome::Unparseable,
        };
        let initiator_host = match request.initiator {
            Some(initiator) => match extract_host(initiator) {
                Some(initiator_host) => initiator_host,
                None => return ObserveOutcome::Unparseable,
            },
            None => String::new(),
        };

        // No subdomain normalization: sub.example.com -> example.com is third-party
        if host == initiator_host {
            return ObserveOutcome::FirstParty;
        }

        let tab = self.tabs.entry(request.tab_id).or_default();
        let newly_seen = !tab.hosts.contains(&host);

        if newly_seen {
            let assessment = classifier.assess(&host);

            if assessment.threat_level.is_alarming() {
                tab.threat_attempts.push(ThreatAttempt {
                    domain: host.clone(),
                    url: request.url.to_string(),
                    level: assessment.threat_level,
                    timestamp: request.timestamp,
                });
            }

            if assessment.category == Category::Fingerprinting {
                let defaults = classifier.knowledge().category(Category::Fingerprinting);
                let method = assessment
                    .record
                    .and_then(|found| found.record.fingerprinting_methods.first())
                    .or_else(|| defaults.and_then(|d| d.common_methods.first()))
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_FINGERPRINT_METHOD.to_string());
                let details = assessment
                    .record
                    .map(|found| found.record.description.as_str())
                    .or_else(|| defaults.map(|d| d.description.as_str()))
                    .filter(|text| !text.is_empty())
                    .map(str::to_string);
                tab.fingerprinting_attempts.push(FingerprintAttempt {
                    method,
                    details,
                    url: request.url.to_string(),
                    timestamp: request.timestamp,
                });
            }

            tab.hosts.insert(host.clone());
        }

        ObserveOutcome::Recorded { host, newly_seen, badge: tab.badge() }
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&TabObservation> {
        self.tabs.get(&tab_id)
    }

    /// Observed hosts, sorted for stable output.
    pub fn domains(&self, tab_id: TabId) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .tabs
            .get(&tab_id)
            .map(|tab| tab.hosts.iter().cloned().collect())
            .unwrap_or_default();
        hosts.sort();
        hosts
    }

    pub fn fingerprinting_attempts(&self, tab_id: TabId) -> Vec<FingerprintAttempt> {
        self.tabs
            .get(&tab_id)
            .map(|tab| tab.fingerprinting_attempts.clone())
            .unwrap_or_default()
    }

    pub fn threat_attempts(&self, tab_id: TabId) -> Vec<ThreatAttempt> {
        self.tabs
            .get(&tab_id)
            .map(|tab| tab.threat_attempts.clone())
            .unwrap_or_default()
    }

    /// Counters for a tab. `is_blocked` answers global blocklist membership.
    pub fn statistics(&self, tab_id: TabId, is_blocked: impl Fn(&str) -> bool) -> TabStatistics {
        match self.tabs.get(&tab_id) {
            Some(tab) => TabStatistics {
                total_trackers: tab.hosts.len(),
                fingerprinting_attempts: tab.fingerprinting_attempts.len(),
                threat_attempts: tab.threat_attempts.len(),
                blocked_trackers: tab.hosts.iter().filter(|host| is_blocked(host)).count(),
            },
            None => TabStatistics::default(),
        }
    }

    pub fn badge(&self, tab_id: TabId) -> Badge {
        self.tabs.get(&tab_id).map(TabObservation::badge).unwrap_or_else(Badge::empty)
    }

    /// Drop everything recorded for a closed tab.
    pub fn remove_tab(&mut self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }
}
