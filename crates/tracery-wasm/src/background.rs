//! Service worker bindings

use std::rc::Rc;

use js_sys::Promise;
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use tracery_control::{ControlPlane, Ports};
use tracery_core::{ObserveOutcome, ObservedRequest};

use crate::callbacks::JsCallbacks;
use crate::js;

/// The control plane, driven from the extension's service worker.
#[wasm_bindgen]
pub struct Background {
    plane: Rc<ControlPlane>,
}

#[wasm_bindgen]
impl Background {
    /// `callbacks` provides `fetchKnowledge`, `storageGet`, `storageSet`,
    /// `getDynamicRules`, `updateDynamicRules`, `setBadge`,
    /// `sendToActiveTab` and `injectRelay`.
    #[wasm_bindgen(constructor)]
    pub fn new(callbacks: JsValue) -> Result<Background, JsValue> {
        let callbacks = Rc::new(JsCallbacks::new(callbacks)?);
        let ports = Ports {
            knowledge: callbacks.clone(),
            store: callbacks.clone(),
            rules: callbacks.clone(),
            badges: callbacks.clone(),
            tabs: callbacks.clone(),
            injector: callbacks,
        };
        Ok(Background { plane: Rc::new(ControlPlane::new(ports)) })
    }

    /// Resolves once the knowledge base, settings and rules are loaded.
    pub fn initialize(&self) -> Promise {
        let plane = self.plane.clone();
        future_to_promise(async move {
            plane.initialize().await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// `webRequest.onBeforeRequest` hook. Returns the newly recorded host,
    /// or `null` when nothing new was recorded.
    #[wasm_bindgen(js_name = onRequest)]
    pub fn on_request(&self, tab_id: i32, url: &str, initiator: Option<String>, timestamp: f64) -> JsValue {
        let request = ObservedRequest { tab_id, url, initiator: initiator.as_deref(), timestamp: timestamp as u64 };
        match self.plane.on_request(&request) {
            ObserveOutcome::Recorded { host, newly_seen: true, .. } => JsValue::from_str(&host),
            _ => JsValue::NULL,
        }
    }

    #[wasm_bindgen(js_name = onTabRemoved)]
    pub fn on_tab_removed(&self, tab_id: i32) -> bool {
        self.plane.on_tab_removed(tab_id)
    }

    /// Resolves to whether the relay was injected.
    #[wasm_bindgen(js_name = onNavigationCommitted)]
    pub fn on_navigation_committed(&self, tab_id: i32, frame_id: f64) -> Promise {
        let plane = self.plane.clone();
        future_to_promise(async move {
            let injected = plane.on_navigation_committed(tab_id, frame_id as i64).await;
            Ok(JsValue::from_bool(injected))
        })
    }

    /// `runtime.onMessage` handler. Always resolves; failures are reported
    /// as `{ success: false, error }`.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, message: JsValue) -> Promise {
        let plane = self.plane.clone();
        future_to_promise(async move {
            let response = match js::from_js::<serde_json::Value>(message) {
                Ok(message) => plane.handle_message(&message).await,
                Err(e) => json!({ "success": false, "error": js::describe(&e) }),
            };
            js::to_js(&response)
        })
    }
}
