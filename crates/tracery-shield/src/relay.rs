//! Isolated-world relay
//!
//! Runs at document start with extension privileges. It resolves the
//! configuration snapshot from storage, seeds it into the page and loads
//! the payload script, then forwards later configuration updates into the
//! page as [`PageMessage`]s.

use serde_json::{json, Value};

use tracery_core::store::{load_settings, KeyValueStore, StoreError};
use tracery_core::url::matches_domain_list;

use crate::config::CountermeasureConfig;
use crate::message::{seed_script, PageMessage, PAYLOAD_SCRIPT, UPDATE_PROTECTION_CONFIG};

/// Error type for injection into the page.
#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("Could not read settings: {0}")]
    Settings(#[from] StoreError),
    #[error("Document refused script: {0}")]
    Refused(String),
    #[error("Could not post to page: {0}")]
    Post(String),
}

/// Script insertion into the current document.
pub trait DocumentInjector {
    /// Append an inline script and remove it once it has run.
    fn inject_inline(&self, source: &str) -> Result<(), InjectionError>;
    /// Append a script loaded from an extension resource.
    fn inject_src(&self, resource: &str, async_load: bool) -> Result<(), InjectionError>;
}

/// Message channel into the page context.
pub trait PagePort {
    fn post(&self, message: &PageMessage) -> Result<(), InjectionError>;
}

#[derive(Debug, PartialEq)]
pub enum RelayOutcome {
    /// Host is whitelisted, nothing injected.
    Whitelisted,
    /// Payload injected with this configuration snapshot.
    Injected(CountermeasureConfig),
    /// Injection was abandoned for this page load.
    Failed,
}

pub struct Relay<'a, S: KeyValueStore + ?Sized, D, P> {
    store: &'a S,
    document: D,
    page: P,
}

impl<'a, S, D, P> Relay<'a, S, D, P>
where
    S: KeyValueStore + ?Sized,
    D: DocumentInjector,
    P: PagePort,
{
    pub fn new(store: &'a S, document: D, page: P) -> Self {
        Self { store, document, page }
    }

    /// Decide whether this page gets countermeasures and inject them if so.
    /// Never fails outward; problems are logged and reported as `Failed`.
    pub async fn initialize(&self, hostname: &str) -> RelayOutcome {
        match self.try_initialize(hostname).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Some protections failed to initialize: {}", e);
                RelayOutcome::Failed
            }
        }
    }

    async fn try_initialize(&self, hostname: &str) -> Result<RelayOutcome, InjectionError> {
        let settings = load_settings(self.store).await?;
        if matches_domain_list(hostname, &settings.whitelist) {
            log::info!("Protections disabled on whitelisted site: {}", hostname);
            return Ok(RelayOutcome::Whitelisted);
        }

        let config = CountermeasureConfig::from_settings(&settings);
        self.document.inject_inline(&seed_script(&config.to_json()))?;
        self.document.inject_src(PAYLOAD_SCRIPT, false)?;
        log::info!("Anti-fingerprinting protections injected");
        Ok(RelayOutcome::Injected(config))
    }

    /// Handle a runtime message addressed to this tab. Config updates are
    /// forwarded into the page unvalidated and acknowledged even when posting
    /// fails. Other kinds get no response.
    pub fn handle_runtime_message(&self, message: &Value) -> Option<Value> {
        if message.get("type").and_then(Value::as_str) != Some(UPDATE_PROTECTION_CONFIG) {
            return None;
        }
        let config = message.get("config").cloned().unwrap_or(Value::Null);
        if let Err(e) = self.page.post(&PageMessage::update(config)) {
            log::debug!("Config update not forwarded: {}", e);
        }
        Some(json!({ "success": true }))
    }
}
