//! Tracery Rule Synthesizer
//!
//! This crate turns the global blocklist and whitelist into declarative block
//! rules and keeps the browser's dynamic rule table in step with them.

pub mod engine;
pub mod rule;
pub mod sync;

pub use engine::{EngineError, MemoryRuleEngine, RuleEngine, RuleUpdate, MAX_DYNAMIC_RULES};
pub use rule::{DeclarativeRule, RuleAction, RuleActionType, RuleCondition, UrlFilter};
pub use sync::{build_rules, synchronize, SyncError, SyncReport};
