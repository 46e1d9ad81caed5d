//! Rule engine port and in-memory engine
//!
//! The browser's declarative rule engine is reached through [`RuleEngine`].
//! An update removes ids and then adds rules as one atomic batch: either the
//! whole batch commits or the table is left untouched.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tracery_core::types::ResourceType;
use tracery_core::url::{extract_host, is_same_or_subdomain};

use crate::rule::{DeclarativeRule, RuleActionType, UrlFilter};

/// Dynamic rule quota enforced by the browser.
pub const MAX_DYNAMIC_RULES: usize = 5000;

/// Error type for rule engine calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Rule with id {0} does not have a unique ID")]
    DuplicateRuleId(u32),
    #[error("Dynamic rule count exceeded: {requested} > {limit}")]
    QuotaExceeded { limit: usize, requested: usize },
    #[error("Rule with id {id} is invalid: {reason}")]
    InvalidRule { id: u32, reason: String },
    #[error("Rule engine unavailable: {0}")]
    Unavailable(String),
}

/// One batch update, in the browser's `updateDynamicRules` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<DeclarativeRule>,
}

impl RuleUpdate {
    pub fn remove(ids: Vec<u32>) -> Self {
        Self { remove_rule_ids: ids, add_rules: Vec::new() }
    }

    pub fn add(rules: Vec<DeclarativeRule>) -> Self {
        Self { remove_rule_ids: Vec::new(), add_rules: rules }
    }
}

/// Declarative rule engine.
#[async_trait(?Send)]
pub trait RuleEngine {
    /// Every active dynamic rule.
    async fn dynamic_rules(&self) -> Result<Vec<DeclarativeRule>, EngineError>;

    /// Apply removals then additions atomically.
    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<(), EngineError>;
}

// =============================================================================
// In-Memory Engine
// =============================================================================

struct ActiveRule {
    rule: DeclarativeRule,
    filter: UrlFilter,
}

/// Rule table with the browser's validation and matching behaviour.
pub struct MemoryRuleEngine {
    rules: RefCell<BTreeMap<u32, ActiveRule>>,
    quota: usize,
}

impl Default for MemoryRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::with_quota(MAX_DYNAMIC_RULES)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { rules: RefCell::new(BTreeMap::new()), quota }
    }

    /// Synchronous form of [`RuleEngine::update_dynamic_rules`].
    pub fn apply(&self, update: RuleUpdate) -> Result<(), EngineError> {
        let mut table = self.rules.borrow_mut();

        let removed: HashSet<u32> = update.remove_rule_ids.iter().copied().collect();
        let mut seen: HashSet<u32> = table.keys().copied().filter(|id| !removed.contains(id)).collect();
        let mut staged = Vec::with_capacity(update.add_rules.len());

        for rule in update.add_rules {
            rule.validate()
                .map_err(|reason| EngineError::InvalidRule { id: rule.id, reason })?;
            if !seen.insert(rule.id) {
                return Err(EngineError::DuplicateRuleId(rule.id));
            }
            let filter = UrlFilter::compile(&rule.condition.url_filter)
                .map_err(|reason| EngineError::InvalidRule { id: rule.id, reason })?;
            staged.push(ActiveRule { rule, filter });
        }

        if seen.len() > self.quota {
            return Err(EngineError::QuotaExceeded { limit: self.quota, requested: seen.len() });
        }

        // Unknown removal ids are ignored
        for id in &removed {
            table.remove(id);
        }
        for active in staged {
            table.insert(active.rule.id, active);
        }
        Ok(())
    }

    pub fn rules(&self) -> Vec<DeclarativeRule> {
        self.rules.borrow().values().map(|active| active.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.borrow().is_empty()
    }

    /// Rule deciding a request, if any. Higher priority wins; allow wins ties.
    pub fn matching_rule(
        &self,
        url: &str,
        initiator: Option<&str>,
        resource_type: ResourceType,
    ) -> Option<DeclarativeRule> {
        let initiator_host = initiator.and_then(extract_host);
        let table = self.rules.borrow();

        table
            .values()
            .filter(|active| active.rule.condition.resource_types.intersects(resource_type))
            .filter(|active| match &initiator_host {
                Some(host) => !active
                    .rule
                    .condition
                    .excluded_initiator_domains
                    .iter()
                    .any(|domain| is_same_or_subdomain(host, &domain.to_ascii_lowercase())),
                None => true,
            })
            .filter(|active| active.filter.matches(url))
            .max_by_key(|active| (active.rule.priority, active.rule.action.kind == RuleActionType::Allow))
            .map(|active| active.rule.clone())
    }

    /// Whether the active rules block a request.
    pub fn blocks(&self, url: &str, initiator: Option<&str>, resource_type: ResourceType) -> bool {
        self.matching_rule(url, initiator, resource_type)
            .map(|rule| rule.action.kind == RuleActionType::Block)
            .unwrap_or(false)
    }
}

#[async_trait(?Send)]
impl RuleEngine for MemoryRuleEngine {
    async fn dynamic_rules(&self) -> Result<Vec<DeclarativeRule>, EngineError> {
        Ok(self.rules())
    }

    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<(), EngineError> {
        self.apply(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: u32, domain: &str) -> DeclarativeRule {
        DeclarativeRule::block_domain(id, domain, &[])
    }

    #[test]
    fn test_remove_then_add_in_one_batch() {
        let engine = MemoryRuleEngine::new();
        engine.apply(RuleUpdate::add(vec![rule(1, "a.com"), rule(2, "b.com")])).unwrap();

        engine
            .apply(RuleUpdate { remove_rule_ids: vec![1, 2, 99], add_rules: vec![rule(1, "c.com")] })
            .unwrap();

        let rules = engine.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target_domain(), Some("c.com"));
    }

    #[test]
    fn test_duplicate_id_rejects_whole_batch() {
        let engine = MemoryRuleEngine::new();
        engine.apply(RuleUpdate::add(vec![rule(1, "a.com")])).unwrap();

        let err = engine
            .apply(RuleUpdate::add(vec![rule(2, "b.com"), rule(1, "c.com")]))
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateRuleId(1));
        assert_eq!(engine.len(), 1);

        let err = engine
            .apply(RuleUpdate::add(vec![rule(5, "b.com"), rule(5, "c.com")]))
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateRuleId(5));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_invalid_rule_leaves_table_untouched() {
        let engine = MemoryRuleEngine::new();
        engine.apply(RuleUpdate::add(vec![rule(1, "a.com")])).unwrap();

        let err = engine
            .apply(RuleUpdate { remove_rule_ids: vec![1], add_rules: vec![rule(1, "bad domain")] })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRule { id: 1, .. }));
        assert_eq!(engine.rules()[0].target_domain(), Some("a.com"));
    }

    #[test]
    fn test_quota_is_enforced() {
        let engine = MemoryRuleEngine::with_quota(2);
        let err = engine
            .apply(RuleUpdate::add(vec![rule(1, "a.com"), rule(2, "b.com"), rule(3, "c.com")]))
            .unwrap_err();
        assert_eq!(err, EngineError::QuotaExceeded { limit: 2, requested: 3 });
        assert!(engine.is_empty());
    }

    #[test]
    fn test_matching_honours_types_and_initiators() {
        let engine = MemoryRuleEngine::new();
        engine
            .apply(RuleUpdate::add(vec![DeclarativeRule::block_domain(
                1,
                "tracker.com",
                &["bank.org".to_string()],
            )]))
            .unwrap();

        assert!(engine.blocks("https://cdn.tracker.com/t.js", Some("https://news.site"), ResourceType::SCRIPT));
        assert!(engine.blocks("https://tracker.com/p.gif", None, ResourceType::IMAGE));
        // stylesheets are outside the blockable set
        assert!(!engine.blocks("https://tracker.com/s.css", Some("https://news.site"), ResourceType::STYLESHEET));
        // whitelisted initiators, including subdomains
        assert!(!engine.blocks("https://tracker.com/t.js", Some("https://bank.org"), ResourceType::SCRIPT));
        assert!(!engine.blocks("https://tracker.com/t.js", Some("https://www.bank.org"), ResourceType::SCRIPT));
        assert!(!engine.blocks("https://example.org/", Some("https://news.site"), ResourceType::SCRIPT));
    }

    #[test]
    fn test_allow_wins_priority_ties() {
        let engine = MemoryRuleEngine::new();
        let mut allow = rule(2, "ads.com");
        allow.action.kind = RuleActionType::Allow;
        engine.apply(RuleUpdate::add(vec![rule(1, "ads.com"), allow])).unwrap();
        assert!(!engine.blocks("https://ads.com/x.js", None, ResourceType::SCRIPT));

        let mut strong = rule(3, "ads.com");
        strong.priority = 5;
        engine.apply(RuleUpdate::add(vec![strong])).unwrap();
        assert!(engine.blocks("https://ads.com/x.js", None, ResourceType::SCRIPT));
    }
}
