//! Content script bindings
//!
//! The relay side of countermeasure injection. Scripts are added to the
//! document as `<script>` elements; the seed runs inline and is removed
//! right away, the payload loads from the extension bundle.

use std::rc::Rc;

use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{Document, HtmlScriptElement, Window};

use tracery_shield::{DocumentInjector, InjectionError, PageMessage, PagePort, Relay, RelayOutcome};

use crate::callbacks::JsCallbacks;
use crate::js;

fn refused(value: JsValue) -> InjectionError {
    InjectionError::Refused(js::describe(&value))
}

struct DomInjector {
    document: Document,
}

impl DomInjector {
    fn script(&self) -> Result<HtmlScriptElement, InjectionError> {
        self.document
            .create_element("script")
            .map_err(refused)?
            .dyn_into::<HtmlScriptElement>()
            .map_err(|_| InjectionError::Refused("not a script element".to_string()))
    }

    fn append(&self, script: &HtmlScriptElement) -> Result<(), InjectionError> {
        let parent = self
            .document
            .head()
            .map(Into::into)
            .or_else(|| self.document.document_element())
            .ok_or_else(|| InjectionError::Refused("document has no root element".to_string()))?;
        parent.append_child(script).map_err(refused)?;
        Ok(())
    }
}

impl DocumentInjector for DomInjector {
    fn inject_inline(&self, source: &str) -> Result<(), InjectionError> {
        let script = self.script()?;
        script.set_text_content(Some(source));
        self.append(&script)?;
        script.remove();
        Ok(())
    }

    fn inject_src(&self, resource: &str, async_load: bool) -> Result<(), InjectionError> {
        let runtime = js::get(&js::get_global("chrome").map_err(refused)?, "runtime").map_err(refused)?;
        let get_url = js::get_function(&runtime, "getURL")
            .map_err(refused)?
            .ok_or_else(|| InjectionError::Refused("runtime.getURL unavailable".to_string()))?;
        let url = js::call(&get_url, &runtime, &js::to_array(&[js::key(resource)]))
            .map_err(refused)?
            .as_string()
            .ok_or_else(|| InjectionError::Refused(format!("no URL for {}", resource)))?;

        let script = self.script()?;
        script.set_src(&url);
        script.set_async(async_load);
        let loaded = script.clone();
        let on_load = Closure::once_into_js(move || loaded.remove());
        script.set_onload(Some(on_load.unchecked_ref()));
        self.append(&script)
    }
}

struct WindowPort {
    window: Window,
}

impl PagePort for WindowPort {
    fn post(&self, message: &PageMessage) -> Result<(), InjectionError> {
        let message = js::to_js(&message.to_json()).map_err(|e| InjectionError::Post(js::describe(&e)))?;
        self.window.post_message(&message, "*").map_err(|e| InjectionError::Post(js::describe(&e)))
    }
}

/// Content script entry points.
#[wasm_bindgen]
pub struct ContentRelay {
    store: Rc<JsCallbacks>,
    window: Window,
    document: Document,
}

#[wasm_bindgen]
impl ContentRelay {
    /// `callbacks` provides `storageGet` and `storageSet`.
    #[wasm_bindgen(constructor)]
    pub fn new(callbacks: JsValue) -> Result<ContentRelay, JsValue> {
        let window = web_sys::window().ok_or_else(|| js::error("no window"))?;
        let document = window.document().ok_or_else(|| js::error("no document"))?;
        Ok(ContentRelay { store: Rc::new(JsCallbacks::new(callbacks)?), window, document })
    }

    /// Resolves to `"whitelisted"`, `"injected"` or `"failed"`.
    pub fn initialize(&self) -> Promise {
        let store = self.store.clone();
        let injector = DomInjector { document: self.document.clone() };
        let port = WindowPort { window: self.window.clone() };
        let hostname = self.window.location().hostname().unwrap_or_default();
        future_to_promise(async move {
            let relay = Relay::new(&*store, injector, port);
            let status = match relay.initialize(&hostname).await {
                RelayOutcome::Whitelisted => "whitelisted",
                RelayOutcome::Injected(_) => "injected",
                RelayOutcome::Failed => "failed",
            };
            Ok(JsValue::from_str(status))
        })
    }

    /// `runtime.onMessage` handler. Returns the response, or `undefined`
    /// for messages this relay does not answer.
    #[wasm_bindgen(js_name = handleRuntimeMessage)]
    pub fn handle_runtime_message(&self, message: JsValue) -> Result<JsValue, JsValue> {
        let message: serde_json::Value = js::from_js(message)?;
        let relay = Relay::new(
            &*self.store,
            DomInjector { document: self.document.clone() },
            WindowPort { window: self.window.clone() },
        );
        match relay.handle_runtime_message(&message) {
            Some(response) => js::to_js(&response),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}
