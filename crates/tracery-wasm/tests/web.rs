//! Browser tests for the page host. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Function, Reflect};
use serde_json::json;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

use tracery_shield::{Noise, Payload, Protection};
use tracery_wasm::JsPage;

wasm_bindgen_test_configure!(run_in_browser);

fn global(name: &str) -> JsValue {
    Reflect::get(&js_sys::global(), &name.into()).unwrap()
}

fn call_method(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &name.into()).unwrap().unchecked_into();
    Reflect::apply(&method, target, args)
}

fn drawn_canvas() -> JsValue {
    let document = global("document");
    let canvas = call_method(&document, "createElement", &Array::of1(&"canvas".into())).unwrap();
    Reflect::set(&canvas, &"width".into(), &16.into()).unwrap();
    Reflect::set(&canvas, &"height".into(), &16.into()).unwrap();
    let context = call_method(&canvas, "getContext", &Array::of1(&"2d".into())).unwrap();
    Reflect::set(&context, &"fillStyle".into(), &"#808080".into()).unwrap();
    call_method(&context, "fillRect", &Array::of4(&0.into(), &0.into(), &16.into(), &16.into())).unwrap();
    canvas
}

#[wasm_bindgen_test]
fn page_protections_install_into_live_page() {
    let page = JsPage::new().unwrap();
    let payload = Payload::with_noise(page, Some(&json!({ "timing": false })), Noise::seeded(9));
    let applied = payload.apply_all();

    assert!(applied.contains(&Protection::Canvas));
    assert!(applied.contains(&Protection::Timezone));
    assert!(!applied.contains(&Protection::Timing));

    let navigator = global("navigator");
    let platform = Reflect::get(&navigator, &"platform".into()).unwrap();
    assert_eq!(platform.as_string().as_deref(), Some("Win32"));

    let canvas = drawn_canvas();
    let first = call_method(&canvas, "toDataURL", &Array::new()).unwrap();
    let second = call_method(&canvas, "toDataURL", &Array::new()).unwrap();
    assert_ne!(first.as_string(), second.as_string());

    let date = Reflect::construct(&global("Date").unchecked_into(), &Array::new()).unwrap();
    let offset = call_method(&date, "getTimezoneOffset", &Array::new()).unwrap();
    assert_eq!(offset.as_f64(), Some(0.0));

    let installs = payload.host().installs();
    assert!(payload.handle_message(&json!({
        "type": "TRACERY_UPDATE_CONFIG",
        "config": { "timing": true },
        "version": 1
    })));
    assert!(payload.installed().contains(&Protection::Timing));
    assert_eq!(payload.host().installs(), installs + 1);
}

#[wasm_bindgen_test]
fn blocked_battery_rejects() {
    let payload = Payload::with_noise(JsPage::new().unwrap(), None, Noise::seeded(1));
    payload.apply_all();

    let navigator = global("navigator");
    if Reflect::get(&navigator, &"getBattery".into()).unwrap().is_undefined() {
        return;
    }
    let result = call_method(&navigator, "getBattery", &Array::new()).unwrap();
    assert!(result.is_instance_of::<js_sys::Promise>());
}

#[wasm_bindgen_test]
fn empty_image_rect_throws_like_native() {
    let payload = Payload::with_noise(JsPage::new().unwrap(), None, Noise::seeded(4));
    payload.apply_all();

    let canvas = drawn_canvas();
    let context = call_method(&canvas, "getContext", &Array::of1(&"2d".into())).unwrap();
    let rect = |w: JsValue, h: JsValue| Array::of4(&0.into(), &0.into(), &w, &h);

    assert!(call_method(&context, "getImageData", &rect(0.into(), 4.into())).is_err());
    assert!(call_method(&context, "getImageData", &rect(f64::NAN.into(), 4.into())).is_err());

    let flipped = call_method(&context, "getImageData", &rect((-4).into(), 4.into())).unwrap();
    let width = Reflect::get(&flipped, &"width".into()).unwrap();
    assert_eq!(width.as_f64(), Some(4.0));
}
