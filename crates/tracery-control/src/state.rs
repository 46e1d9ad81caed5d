//! Block state
//!
//! Global blocklist, whitelist and current profile. Both lists keep first
//! insertion order and never hold duplicates; blocklist order decides rule
//! ids.

use tracery_core::{PrivacyProfile, StoredSettings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockState {
    global_block: Vec<String>,
    whitelist: Vec<String>,
    profile: PrivacyProfile,
}

fn dedup(domains: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for domain in domains {
        if !unique.contains(&domain) {
            unique.push(domain);
        }
    }
    unique
}

impl BlockState {
    pub fn from_settings(settings: &StoredSettings) -> Self {
        Self {
            global_block: dedup(settings.global_block.iter().cloned()),
            whitelist: dedup(settings.whitelist.iter().cloned()),
            profile: settings.current_profile,
        }
    }

    pub fn global_block(&self) -> &[String] {
        &self.global_block
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn profile(&self) -> PrivacyProfile {
        self.profile
    }

    pub fn is_blocked(&self, domain: &str) -> bool {
        self.global_block.iter().any(|d| d == domain)
    }

    /// Add or remove a domain. `None` flips current membership. Returns
    /// whether the domain ends up blocked.
    pub fn toggle_global(&mut self, domain: &str, add: Option<bool>) -> bool {
        let add = add.unwrap_or_else(|| !self.is_blocked(domain));
        if add {
            if !self.is_blocked(domain) {
                self.global_block.push(domain.to_string());
            }
        } else {
            self.global_block.retain(|d| d != domain);
        }
        add
    }

    pub fn set_global_block(&mut self, domains: Vec<String>) {
        self.global_block = dedup(domains);
    }

    /// Returns false if already present.
    pub fn add_to_whitelist(&mut self, domain: &str) -> bool {
        if self.whitelist.iter().any(|d| d == domain) {
            return false;
        }
        self.whitelist.push(domain.to_string());
        true
    }

    /// Returns false if absent.
    pub fn remove_from_whitelist(&mut self, domain: &str) -> bool {
        let before = self.whitelist.len();
        self.whitelist.retain(|d| d != domain);
        self.whitelist.len() != before
    }

    pub fn set_profile(&mut self, profile: PrivacyProfile) {
        self.profile = profile;
    }
}
