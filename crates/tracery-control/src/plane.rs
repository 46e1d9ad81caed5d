//! The control plane
//!
//! Owns the block state and the observation store. Nothing else mutates
//! them; every change goes through the request hooks or [`ControlPlane::handle_message`].
//!
//! State lives in `RefCell`s and no borrow is held across an `.await`, so
//! several messages may be in flight at once. Mutations update memory first,
//! then persist, then resynchronize the rule table. Concurrent
//! synchronizations are not serialized; whichever finishes last decides the
//! active rules.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use serde_json::{json, Map, Value};

use tracery_core::settings::keys;
use tracery_core::store::{load_settings, KeyValueStore};
use tracery_core::{
    Classifier, KnowledgeBase, ObservationStore, ObserveOutcome, ObservedRequest, PrivacyProfile, TabId,
};
use tracery_rules::{synchronize, RuleEngine, SyncError, SyncReport};

use crate::message::{MessageError, Request};
use crate::ports::{BadgeSink, KnowledgeSource, ScriptInjector, TabMessenger};
use crate::state::BlockState;

/// Browser collaborators.
pub struct Ports {
    pub knowledge: Rc<dyn KnowledgeSource>,
    pub store: Rc<dyn KeyValueStore>,
    pub rules: Rc<dyn RuleEngine>,
    pub badges: Rc<dyn BadgeSink>,
    pub tabs: Rc<dyn TabMessenger>,
    pub injector: Rc<dyn ScriptInjector>,
}

pub struct ControlPlane {
    ports: Ports,
    knowledge: OnceCell<KnowledgeBase>,
    state: RefCell<BlockState>,
    observations: RefCell<ObservationStore>,
}

impl ControlPlane {
    pub fn new(ports: Ports) -> Self {
        Self {
            ports,
            knowledge: OnceCell::new(),
            state: RefCell::new(BlockState::default()),
            observations: RefCell::new(ObservationStore::new()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the knowledge base and persisted state, then push rules.
    /// Never fails: every problem degrades to defaults and is logged.
    pub async fn initialize(&self) {
        if self.knowledge.get().is_none() {
            let knowledge = match self.ports.knowledge.fetch().await {
                Ok(text) => KnowledgeBase::from_json_or_empty(&text),
                Err(e) => {
                    log::warn!("Failed to load tracker database: {}", e);
                    KnowledgeBase::default()
                }
            };
            log::info!(
                "Tracker database loaded: {} trackers, {} categories",
                knowledge.tracker_count(),
                knowledge.category_count()
            );
            // A concurrent initialize may have won; its copy is equivalent.
            let _ = self.knowledge.set(knowledge);
        }

        let settings = match load_settings(self.ports.store.as_ref()).await {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {}", e);
                Default::default()
            }
        };
        *self.state.borrow_mut() = BlockState::from_settings(&settings);

        let _ = self.resync().await;
        log::info!("Extension initialized");
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        self.knowledge.get().unwrap_or_else(|| KnowledgeBase::empty())
    }

    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(self.knowledge())
    }

    pub fn state(&self) -> BlockState {
        self.state.borrow().clone()
    }

    // =========================================================================
    // Browser Events
    // =========================================================================

    /// Record one intercepted request and refresh the tab's badge.
    pub fn on_request(&self, request: &ObservedRequest<'_>) -> ObserveOutcome {
        let outcome = self.observations.borrow_mut().observe(&self.classifier(), request);
        match &outcome {
            ObserveOutcome::Recorded { badge, .. } => self.ports.badges.show(request.tab_id, badge),
            ignored => log::debug!("Request {} not recorded: {:?}", request.url, ignored),
        }
        outcome
    }

    pub fn on_tab_removed(&self, tab_id: TabId) -> bool {
        self.observations.borrow_mut().remove_tab(tab_id)
    }

    /// Inject the relay on top-level navigations. Returns whether it was
    /// injected; failures (restricted pages) are swallowed.
    pub async fn on_navigation_committed(&self, tab_id: TabId, frame_id: i64) -> bool {
        if frame_id != 0 {
            return false;
        }
        match self.ports.injector.inject_relay(tab_id).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Relay not injected into tab {}: {}", tab_id, e);
                false
            }
        }
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Answer one message. Always produces a response.
    pub async fn handle_message(&self, message: &Value) -> Value {
        let request = match Request::parse(message) {
            Ok(request) => request,
            Err(e) => {
                log::debug!("Rejected message: {}", e);
                return e.to_response();
            }
        };
        match self.handle_request(request).await {
            Ok(response) => response,
            Err(e) => e.to_response(),
        }
    }

    pub async fn handle_request(&self, request: Request) -> Result<Value, MessageError> {
        let response = match request {
            Request::GetDomains { tab_id } => json!(self.observations.borrow().domains(tab_id)),
            Request::GetTabStatistics { tab_id } => {
                let state = self.state.borrow();
                let stats = self.observations.borrow().statistics(tab_id, |host| state.is_blocked(host));
                json!(stats)
            }
            Request::GetThreatAttempts { tab_id } => json!(self.observations.borrow().threat_attempts(tab_id)),
            Request::GetFingerprintingAttempts { tab_id } => {
                json!(self.observations.borrow().fingerprinting_attempts(tab_id))
            }
            Request::ToggleGlobal { domain, add } => {
                self.state.borrow_mut().toggle_global(&domain, add);
                self.commit_blocklist().await
            }
            Request::SetGlobalBlocklist { domains } => {
                self.state.borrow_mut().set_global_block(domains);
                self.commit_blocklist().await
            }
            Request::SwitchPrivacyProfile { profile } => {
                let profile = PrivacyProfile::parse(&profile).ok_or(MessageError::UnknownProfile(profile))?;
                self.state.borrow_mut().set_profile(profile);
                self.persist(keys::CURRENT_PROFILE, json!(profile)).await;
                json!({ "success": true, "currentProfile": profile })
            }
            Request::GetPrivacyProfiles {} => {
                let current = self.state.borrow().profile();
                json!({
                    "profiles": PrivacyProfile::names(),
                    "current": current,
                    "settings": current.settings(),
                })
            }
            Request::UpdateProtectionConfig { config } => {
                if !config.is_null() {
                    let forward = json!({ "type": "UPDATE_PROTECTION_CONFIG", "config": config });
                    if let Err(e) = self.ports.tabs.send_to_active_tab(forward).await {
                        log::debug!("Protection config not forwarded: {}", e);
                    }
                }
                json!({ "success": true })
            }
            Request::GetWhitelist {} => json!({ "whitelist": self.state.borrow().whitelist() }),
            Request::AddToWhitelist { domain } => {
                self.state.borrow_mut().add_to_whitelist(&domain);
                self.commit_whitelist().await
            }
            Request::RemoveFromWhitelist { domain } => {
                self.state.borrow_mut().remove_from_whitelist(&domain);
                self.commit_whitelist().await
            }
            Request::GetTrackerInfo { domain } => self.tracker_info(&domain),
        };
        Ok(response)
    }

    fn tracker_info(&self, domain: &str) -> Value {
        let assessment = self.classifier().assess(domain);
        let mut info = json!({
            "domain": domain,
            "category": assessment.category,
            "threatLevel": assessment.threat_level,
        });
        if let Some(found) = assessment.record {
            info["matchedKey"] = json!(found.key);
            info["record"] = serde_json::to_value(found.record).unwrap_or(Value::Null);
        }
        info
    }

    // =========================================================================
    // Persistence and Rules
    // =========================================================================

    async fn commit_blocklist(&self) -> Value {
        let blocklist = self.state.borrow().global_block().to_vec();
        self.persist(keys::GLOBAL_BLOCK, json!(blocklist)).await;
        let _ = self.resync().await;
        json!(blocklist)
    }

    async fn commit_whitelist(&self) -> Value {
        let whitelist = self.state.borrow().whitelist().to_vec();
        self.persist(keys::WHITELIST, json!(whitelist)).await;
        let _ = self.resync().await;
        json!({ "success": true, "whitelist": whitelist })
    }

    async fn persist(&self, key: &str, value: Value) {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value);
        if let Err(e) = self.ports.store.save(entries).await {
            log::warn!("Failed to persist {}: {}", key, e);
        }
    }

    /// Rebuild the rule table from a snapshot of the current lists. Failures
    /// are logged by the synchronizer and not retried.
    pub async fn resync(&self) -> Result<SyncReport, SyncError> {
        let (blocklist, whitelist) = {
            let state = self.state.borrow();
            (state.global_block().to_vec(), state.whitelist().to_vec())
        };
        synchronize(self.ports.rules.as_ref(), &blocklist, &whitelist).await
    }
}
