//! Rule synthesis and synchronization
//!
//! The dynamic rule table is owned by this module. Every synchronization
//! resets it: read the active rules, remove all of them in one call, then add
//! a freshly built generation in a second call. Rule `i` (1-based) blocks
//! `blocklist[i - 1]`, so ids are positional and change between generations.
//!
//! Between the two calls no custom rules are active. If the engine rejects
//! the new generation, the rules captured at the start are put back once so
//! the last known good set stays in force. Nothing is retried.

use crate::engine::{EngineError, RuleEngine, RuleUpdate};
use crate::rule::DeclarativeRule;

/// Error type for a failed synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to read active rules: {0}")]
    Read(#[source] EngineError),
    #[error("Failed to remove stale rules: {0}")]
    Remove(#[source] EngineError),
    #[error("Rule batch rejected: {source}")]
    Add {
        #[source]
        source: EngineError,
        /// Whether the previous generation was put back
        restored: bool,
    },
}

/// Outcome of a successful synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub removed: usize,
    pub added: usize,
}

/// Build one rule generation.
pub fn build_rules<B, W>(blocklist: &[B], whitelist: &[W]) -> Vec<DeclarativeRule>
where
    B: AsRef<str>,
    W: AsRef<str>,
{
    let excluded: Vec<String> = whitelist.iter().map(|domain| domain.as_ref().to_string()).collect();
    blocklist
        .iter()
        .enumerate()
        .map(|(index, domain)| DeclarativeRule::block_domain(index as u32 + 1, domain.as_ref(), &excluded))
        .collect()
}

/// Replace the engine's rule table with a generation built from the inputs.
pub async fn synchronize<E, B, W>(engine: &E, blocklist: &[B], whitelist: &[W]) -> Result<SyncReport, SyncError>
where
    E: RuleEngine + ?Sized,
    B: AsRef<str>,
    W: AsRef<str>,
{
    let previous = engine.dynamic_rules().await.map_err(SyncError::Read)?;
    let stale_ids: Vec<u32> = previous.iter().map(|rule| rule.id).collect();

    if !stale_ids.is_empty() {
        engine
            .update_dynamic_rules(RuleUpdate::remove(stale_ids))
            .await
            .map_err(|e| {
                log::warn!("Failed to remove blocking rules: {}", e);
                SyncError::Remove(e)
            })?;
    }

    let rules = build_rules(blocklist, whitelist);
    let added = rules.len();

    if !rules.is_empty() {
        if let Err(e) = engine.update_dynamic_rules(RuleUpdate::add(rules)).await {
            log::warn!("Failed to update blocking rules: {}", e);
            let restored = restore(engine, previous).await;
            return Err(SyncError::Add { source: e, restored });
        }
    }

    log::debug!("Synchronized {} blocking rules ({} removed)", added, previous.len());
    Ok(SyncReport { removed: previous.len(), added })
}

async fn restore<E: RuleEngine + ?Sized>(engine: &E, previous: Vec<DeclarativeRule>) -> bool {
    if previous.is_empty() {
        return true;
    }
    let count = previous.len();
    match engine.update_dynamic_rules(RuleUpdate::add(previous)).await {
        Ok(()) => {
            log::info!("Restored {} previously active blocking rules", count);
            true
        }
        Err(e) => {
            log::warn!("Failed to restore previous blocking rules: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryRuleEngine;
    use futures::executor::block_on;
    use tracery_core::types::ResourceType;

    fn blocked_domains(engine: &MemoryRuleEngine) -> Vec<String> {
        engine
            .rules()
            .iter()
            .filter_map(|rule| rule.target_domain().map(str::to_string))
            .collect()
    }

    #[test]
    fn builds_positional_ids() {
        let rules = build_rules(&["a.com", "b.com", "c.com"], &["safe.org"]);
        let ids: Vec<u32> = rules.iter().map(|rule| rule.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rules[1].target_domain(), Some("b.com"));
        assert_eq!(rules[2].condition.excluded_initiator_domains, vec!["safe.org".to_string()]);
        assert!(build_rules::<&str, &str>(&[], &[]).is_empty());
    }

    #[test]
    fn replaces_previous_generation() {
        let engine = MemoryRuleEngine::new();
        block_on(synchronize(&engine, &["a.com", "b.com", "c.com"], &[] as &[&str])).unwrap();

        let report = block_on(synchronize(&engine, &["b.com"], &["safe.org"])).unwrap();
        assert_eq!(report, SyncReport { removed: 3, added: 1 });
        assert_eq!(blocked_domains(&engine), vec!["b.com".to_string()]);
        assert!(!engine.blocks("https://a.com/x.js", None, ResourceType::SCRIPT));
        assert!(!engine.blocks("https://b.com/x.js", Some("https://safe.org"), ResourceType::SCRIPT));
    }

    #[test]
    fn synchronization_is_idempotent() {
        let engine = MemoryRuleEngine::new();
        let blocklist = ["tracker.com", "ads.net"];
        let whitelist = ["bank.org"];

        block_on(synchronize(&engine, &blocklist, &whitelist)).unwrap();
        let first = engine.rules();
        block_on(synchronize(&engine, &blocklist, &whitelist)).unwrap();
        assert_eq!(engine.rules(), first);
    }

    #[test]
    fn empty_blocklist_clears_rules() {
        let engine = MemoryRuleEngine::new();
        block_on(synchronize(&engine, &["a.com"], &[] as &[&str])).unwrap();
        let report = block_on(synchronize(&engine, &[] as &[&str], &[] as &[&str])).unwrap();
        assert_eq!(report.added, 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn rejected_batch_restores_last_known_good() {
        let engine = MemoryRuleEngine::with_quota(2);
        block_on(synchronize(&engine, &["a.com", "b.com"], &[] as &[&str])).unwrap();

        let err = block_on(synchronize(&engine, &["a.com", "b.com", "c.com"], &[] as &[&str])).unwrap_err();
        match err {
            SyncError::Add { source, restored } => {
                assert!(matches!(source, EngineError::QuotaExceeded { .. }));
                assert!(restored);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(blocked_domains(&engine), vec!["a.com".to_string(), "b.com".to_string()]);
    }

    #[test]
    fn malformed_domain_is_rejected_not_retried() {
        let engine = MemoryRuleEngine::new();
        let err = block_on(synchronize(&engine, &["fine.com", "not fine"], &[] as &[&str])).unwrap_err();
        assert!(matches!(err, SyncError::Add { restored: true, .. }));
        assert!(engine.is_empty());
    }
}
