//! Browser callbacks
//!
//! The extension's JavaScript glue passes an object of functions that wrap
//! `chrome.*` calls. [`JsCallbacks`] adapts that object to every port the
//! control plane and relay need. A callback may return a plain value or a
//! promise.

use async_trait::async_trait;
use js_sys::Function;
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use tracery_control::{BadgeSink, KnowledgeSource, PortError, ScriptInjector, TabMessenger};
use tracery_core::{Badge, KeyValueStore, StoreError, TabId};
use tracery_rules::{DeclarativeRule, EngineError, RuleEngine, RuleUpdate};

use crate::js;

pub struct JsCallbacks {
    target: JsValue,
}

impl JsCallbacks {
    pub fn new(target: JsValue) -> Result<Self, JsValue> {
        if !target.is_object() {
            return Err(js::error("callbacks must be an object"));
        }
        Ok(Self { target })
    }

    fn function(&self, name: &str) -> Result<Function, JsValue> {
        js::get_function(&self.target, name)?.ok_or_else(|| js::error(&format!("callback {} missing", name)))
    }

    fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        js::call(&self.function(name)?, &self.target, &js::to_array(args))
    }

    async fn invoke(&self, name: &str, args: &[JsValue]) -> Result<JsValue, String> {
        let value = self.call(name, args).map_err(|e| js::describe(&e))?;
        js::settle(value).await.map_err(|e| js::describe(&e))
    }
}

#[async_trait(?Send)]
impl KnowledgeSource for JsCallbacks {
    async fn fetch(&self) -> Result<String, PortError> {
        let text = self.invoke("fetchKnowledge", &[]).await.map_err(PortError::Failed)?;
        text.as_string().ok_or_else(|| PortError::Failed("knowledge base is not text".to_string()))
    }
}

#[async_trait(?Send)]
impl KeyValueStore for JsCallbacks {
    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let document = self.invoke("storageGet", &[]).await.map_err(StoreError::Unavailable)?;
        if document.is_undefined() || document.is_null() {
            return Ok(Map::new());
        }
        js::from_js(document).map_err(|e| StoreError::Unavailable(js::describe(&e)))
    }

    async fn save(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
        let entries = js::to_js(&entries).map_err(|e| StoreError::Unavailable(js::describe(&e)))?;
        self.invoke("storageSet", &[entries]).await.map_err(StoreError::Unavailable)?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl RuleEngine for JsCallbacks {
    async fn dynamic_rules(&self) -> Result<Vec<DeclarativeRule>, EngineError> {
        let rules = self.invoke("getDynamicRules", &[]).await.map_err(EngineError::Unavailable)?;
        js::from_js(rules).map_err(|e| EngineError::Unavailable(js::describe(&e)))
    }

    async fn update_dynamic_rules(&self, update: RuleUpdate) -> Result<(), EngineError> {
        let update = js::to_js(&update).map_err(|e| EngineError::Unavailable(js::describe(&e)))?;
        self.invoke("updateDynamicRules", &[update]).await.map_err(EngineError::Unavailable)?;
        Ok(())
    }
}

impl BadgeSink for JsCallbacks {
    fn show(&self, tab_id: TabId, badge: &Badge) {
        let color = match badge.color {
            Some(color) => JsValue::from_str(color.css()),
            None => JsValue::NULL,
        };
        let args = [JsValue::from(tab_id), JsValue::from_str(&badge.text), color];
        if let Err(e) = self.call("setBadge", &args) {
            log::debug!("Badge update failed: {}", js::describe(&e));
        }
    }
}

#[async_trait(?Send)]
impl TabMessenger for JsCallbacks {
    async fn send_to_active_tab(&self, message: Value) -> Result<(), PortError> {
        let message = js::to_js(&message).map_err(|e| PortError::Failed(js::describe(&e)))?;
        let delivered = self.invoke("sendToActiveTab", &[message]).await.map_err(PortError::Failed)?;
        if delivered == JsValue::FALSE {
            return Err(PortError::NoActiveTab);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ScriptInjector for JsCallbacks {
    async fn inject_relay(&self, tab_id: TabId) -> Result<(), PortError> {
        self.invoke("injectRelay", &[JsValue::from(tab_id)]).await.map_err(PortError::Failed)?;
        Ok(())
    }
}
