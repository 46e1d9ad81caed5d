//! WebAssembly bindings for Tracery
//!
//! Three entry points, one per extension context:
//!
//! - [`Background`] in the service worker drives the control plane
//! - [`ContentRelay`] in the content script seeds and forwards configuration
//! - [`apply_page_protections`] in the page installs countermeasures

use wasm_bindgen::prelude::*;

mod background;
mod callbacks;
mod js;
mod page;
mod relay;

pub use background::Background;
pub use page::{apply_page_protections, JsPage};
pub use relay::ContentRelay;

#[wasm_bindgen(start)]
pub fn start() {
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Message protocol version shared by relay and payload.
#[wasm_bindgen]
pub fn protocol_version() -> u32 {
    tracery_shield::PROTOCOL_VERSION
}
