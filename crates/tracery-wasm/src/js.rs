//! Reflect and Proxy helpers
//!
//! Interceptions are installed as `Proxy` objects whose traps are wasm
//! closures. Closures are leaked with `forget`: they live as long as the page.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

pub type Trap = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;

pub fn key(name: &str) -> JsValue {
    JsValue::from_str(name)
}

pub fn get(target: &JsValue, name: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &key(name))
}

pub fn get_global(name: &str) -> Result<JsValue, JsValue> {
    get(&js_sys::global(), name)
}

/// `Constructor.prototype`, or `None` when the constructor is absent.
pub fn get_prototype(constructor: &str) -> Result<Option<JsValue>, JsValue> {
    let ctor = get_global(constructor)?;
    if ctor.is_undefined() {
        return Ok(None);
    }
    let proto = get(&ctor, "prototype")?;
    Ok(if proto.is_undefined() { None } else { Some(proto) })
}

/// A method looked up on a target, `None` when it is not a function.
pub fn get_function(target: &JsValue, name: &str) -> Result<Option<Function>, JsValue> {
    Ok(get(target, name)?.dyn_into::<Function>().ok())
}

pub fn call(func: &Function, this: &JsValue, args: &Array) -> Result<JsValue, JsValue> {
    Reflect::apply(func, this, args)
}

/// Convert a trap's `argumentsList` into a vector.
pub fn arguments(args: &JsValue) -> Vec<JsValue> {
    match args.dyn_ref::<Array>() {
        Some(array) => array.iter().collect(),
        None => Vec::new(),
    }
}

pub fn to_array(values: &[JsValue]) -> Array {
    values.iter().collect()
}

fn proxy(target: &JsValue, handler: &Object) -> Result<JsValue, JsValue> {
    let proxy_ctor: Function = get_global("Proxy")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("Proxy not found"))?;
    Reflect::construct(&proxy_ctor, &Array::of2(target, handler))
}

/// Proxy around a function with an `apply` trap `(target, thisArg, argumentsList)`.
pub fn proxy_function_with_apply(target: &JsValue, apply_trap: Trap) -> Result<JsValue, JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &key("apply"), apply_trap.as_ref())?;
    apply_trap.forget();
    proxy(target, &handler)
}

/// Proxy around a constructor with a `construct` trap `(target, argumentsList, newTarget)`.
pub fn proxy_constructor_with_construct(target: &JsValue, construct_trap: Trap) -> Result<JsValue, JsValue> {
    let handler = Object::new();
    Reflect::set(&handler, &key("construct"), construct_trap.as_ref())?;
    construct_trap.forget();
    proxy(target, &handler)
}

/// Replace `target[name]` with a proxy of itself. Returns the original.
pub fn intercept(target: &JsValue, name: &str, apply_trap: Trap) -> Result<Function, JsValue> {
    let original = get_function(target, name)?
        .ok_or_else(|| JsValue::from_str(&format!("{} is not a function", name)))?;
    let proxied = proxy_function_with_apply(&original, apply_trap)?;
    Reflect::set(target, &key(name), &proxied)?;
    Ok(original)
}

/// Own-property descriptor's `configurable`, `None` if the property is not own.
pub fn own_configurable(target: &JsValue, name: &str) -> Option<bool> {
    let object = target.dyn_ref::<Object>()?;
    let descriptor = Object::get_own_property_descriptor(object, &key(name));
    if descriptor.is_undefined() {
        return None;
    }
    Some(get(&descriptor, "configurable").ok()?.as_bool().unwrap_or(false))
}

/// Define a configurable getter returning a fixed value. `Ok(false)` when
/// the engine refused the definition.
pub fn define_getter(target: &JsValue, name: &str, value: JsValue) -> Result<bool, JsValue> {
    let object = target
        .dyn_ref::<Object>()
        .ok_or_else(|| JsValue::from_str("target is not an object"))?;
    let getter = Closure::wrap(Box::new(move || -> JsValue { value.clone() }) as Box<dyn FnMut() -> JsValue>);
    let descriptor = Object::new();
    Reflect::set(&descriptor, &key("get"), getter.as_ref())?;
    Reflect::set(&descriptor, &key("configurable"), &JsValue::TRUE)?;
    Reflect::set(&descriptor, &key("enumerable"), &JsValue::TRUE)?;
    let defined = Reflect::define_property(object, &key(name), &descriptor)?;
    getter.forget();
    Ok(defined)
}

pub fn frozen_string_array(items: &[&str]) -> JsValue {
    let array: Array = items.iter().map(|item| JsValue::from_str(item)).collect();
    Object::freeze(&array).into()
}

/// `new Error(message)`
pub fn error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

pub fn rejected(message: &str) -> JsValue {
    Promise::reject(&error(message)).into()
}

/// Human-readable form of a thrown value.
pub fn describe(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{:?}", value)
}

/// Await a value if it is a promise.
pub async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}
