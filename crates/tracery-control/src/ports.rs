//! Browser-facing ports of the control plane
//!
//! Storage and the rule engine come from `tracery-core` and `tracery-rules`.
//! The rest are defined here.

use async_trait::async_trait;
use serde_json::Value;

use tracery_core::{Badge, TabId};

/// Error type for browser calls made through a port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("{0}")]
    Failed(String),
    #[error("No active tab")]
    NoActiveTab,
}

/// Source of the bundled knowledge base document.
#[async_trait(?Send)]
pub trait KnowledgeSource {
    async fn fetch(&self) -> Result<String, PortError>;
}

/// Toolbar badge. Updates are fire-and-forget.
pub trait BadgeSink {
    fn show(&self, tab_id: TabId, badge: &Badge);
}

/// Messaging to the relay in a tab.
#[async_trait(?Send)]
pub trait TabMessenger {
    async fn send_to_active_tab(&self, message: Value) -> Result<(), PortError>;
}

/// Relay injection into a tab's top-level frame.
#[async_trait(?Send)]
pub trait ScriptInjector {
    async fn inject_relay(&self, tab_id: TabId) -> Result<(), PortError>;
}

/// Knowledge base held in memory, for tests and offline tooling.
pub struct StaticKnowledge(pub String);

#[async_trait(?Send)]
impl KnowledgeSource for StaticKnowledge {
    async fn fetch(&self) -> Result<String, PortError> {
        Ok(self.0.clone())
    }
}

/// Badge sink that drops every update.
pub struct NoBadge;

impl BadgeSink for NoBadge {
    fn show(&self, _tab_id: TabId, _badge: &Badge) {}
}
