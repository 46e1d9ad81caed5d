//! Page-context host
//!
//! [`JsPage`] implements [`PageHost`] over the live page. Each slot starts
//! with a native capability that calls the browser's original functions.
//! The first time a slot is replaced, the matching browser method is wrapped
//! in a `Proxy` whose trap forwards to whatever capability is in the slot
//! at call time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Reflect, Uint8ClampedArray};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use tracery_shield::capability::*;
use tracery_shield::{Payload, Protection};

use crate::js;

fn host_error(value: JsValue) -> CapabilityError {
    CapabilityError::Host(js::describe(&value))
}

/// Surface a capability error the way the browser would: blocked calls
/// throw an `Error` carrying the message.
fn throw(err: CapabilityError) -> JsValue {
    js::error(&err.to_string())
}

fn number(args: &[JsValue], index: usize) -> f64 {
    args.get(index).and_then(JsValue::as_f64).unwrap_or(0.0)
}

/// `getImageData` arguments converted the way the browser converts them:
/// truncated to integers, non-finite values read as zero, negative sizes
/// flipping the rectangle. `None` for an empty rectangle, which the browser
/// rejects.
fn image_rect([x, y, width, height]: [f64; 4]) -> Option<(i32, i32, u32, u32)> {
    let long = |v: f64| if v.is_finite() { v.trunc() } else { 0.0 };
    let (mut x, mut y, mut width, mut height) = (long(x), long(y), long(width), long(height));
    if width == 0.0 || height == 0.0 {
        return None;
    }
    if width < 0.0 {
        x += width;
        width = -width;
    }
    if height < 0.0 {
        y += height;
        height = -height;
    }
    Some((x as i32, y as i32, width as u32, height as u32))
}

// =============================================================================
// Native Capabilities
// =============================================================================

struct NativeCanvas {
    get_image_data: Function,
    put_image_data: Function,
    to_data_url: Function,
    to_blob: Function,
    image_data: Function,
}

impl NativeCanvas {
    fn context_2d(canvas: &JsValue) -> Option<JsValue> {
        let get_context = js::get_function(canvas, "getContext").ok()??;
        let context = js::call(&get_context, canvas, &Array::of1(&js::key("2d"))).ok()?;
        if context.is_null() || context.is_undefined() {
            None
        } else {
            Some(context)
        }
    }

    fn to_js_image(&self, image: &ImageData) -> CapResult<JsValue> {
        let data = Uint8ClampedArray::new_with_length(image.data.len() as u32);
        data.copy_from(&image.data);
        let args = Array::of3(&data, &JsValue::from(image.width), &JsValue::from(image.height));
        Reflect::construct(&self.image_data, &args).map_err(host_error)
    }
}

impl CanvasApi<JsValue, JsValue> for NativeCanvas {
    fn size(&self, canvas: &JsValue) -> (u32, u32) {
        let dimension = |name| js::get(canvas, name).ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as u32;
        (dimension("width"), dimension("height"))
    }

    fn has_context_2d(&self, canvas: &JsValue) -> bool {
        Self::context_2d(canvas).is_some()
    }

    fn get_image_data(&self, canvas: &JsValue, x: i32, y: i32, width: u32, height: u32) -> CapResult<ImageData> {
        let context = Self::context_2d(canvas).ok_or(CapabilityError::Unavailable("CanvasRenderingContext2D"))?;
        let args = Array::of4(&x.into(), &y.into(), &width.into(), &height.into());
        let result = js::call(&self.get_image_data, &context, &args).map_err(host_error)?;
        let data: Uint8ClampedArray = js::get(&result, "data").map_err(host_error)?.unchecked_into();
        Ok(ImageData { width, height, data: data.to_vec() })
    }

    fn put_image_data(&self, canvas: &JsValue, image: &ImageData, x: i32, y: i32) -> CapResult<()> {
        let context = Self::context_2d(canvas).ok_or(CapabilityError::Unavailable("CanvasRenderingContext2D"))?;
        let image = self.to_js_image(image)?;
        js::call(&self.put_image_data, &context, &Array::of3(&image, &x.into(), &y.into())).map_err(host_error)?;
        Ok(())
    }

    fn to_data_url(&self, canvas: &JsValue, args: &[JsValue]) -> CapResult<JsValue> {
        js::call(&self.to_data_url, canvas, &js::to_array(args)).map_err(host_error)
    }

    fn to_blob(&self, canvas: &JsValue, args: &[JsValue]) -> CapResult<JsValue> {
        js::call(&self.to_blob, canvas, &js::to_array(args)).map_err(host_error)
    }
}

/// `getParameter` originals for WebGL 1 and 2, keyed by prototype.
struct NativeWebGl {
    originals: Vec<(JsValue, Function)>,
}

impl WebGlApi<JsValue, JsValue> for NativeWebGl {
    fn get_parameter(&self, context: &JsValue, pname: u32) -> CapResult<JsValue> {
        let proto: JsValue = Reflect::get_prototype_of(context).map_err(host_error)?.into();
        let original = self
            .originals
            .iter()
            .find(|(candidate, _)| *candidate == proto)
            .or_else(|| self.originals.first())
            .map(|(_, f)| f)
            .ok_or(CapabilityError::Unavailable("WebGLRenderingContext"))?;
        js::call(original, context, &Array::of1(&pname.into())).map_err(host_error)
    }
}

struct NativePeers {
    constructor: Function,
    create_data_channel: Function,
}

impl PeerConnectionApi<JsValue, JsValue> for NativePeers {
    fn construct(&self, args: &[JsValue]) -> CapResult<JsValue> {
        Reflect::construct(&self.constructor, &js::to_array(args)).map_err(host_error)
    }

    fn create_data_channel(&self, connection: &JsValue, args: &[JsValue]) -> CapResult<JsValue> {
        js::call(&self.create_data_channel, connection, &js::to_array(args)).map_err(host_error)
    }
}

/// Calls `original.apply(this, args)` for promise-returning navigator APIs.
struct NativeMethod {
    this: JsValue,
    original: Function,
}

impl MediaDevicesApi<JsValue> for NativeMethod {
    fn get_user_media(&self, args: &[JsValue]) -> CapResult<JsValue> {
        js::call(&self.original, &self.this, &js::to_array(args)).map_err(host_error)
    }
}

impl BatteryApi<JsValue> for NativeMethod {
    fn get_battery(&self) -> CapResult<JsValue> {
        js::call(&self.original, &self.this, &Array::new()).map_err(host_error)
    }
}

struct NativeClock {
    performance: JsValue,
    now: Function,
    get_time: Function,
}

impl TimingApi<JsValue> for NativeClock {
    fn performance_now(&self) -> f64 {
        js::call(&self.now, &self.performance, &Array::new()).ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    fn get_time(&self, date: &JsValue) -> f64 {
        js::call(&self.get_time, date, &Array::new()).ok().and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
    }
}

struct NativeFonts {
    fonts: JsValue,
    check: Function,
}

impl FontsApi for NativeFonts {
    fn check(&self, font: &str, text: Option<&str>) -> CapResult<bool> {
        let args = match text {
            Some(text) => Array::of2(&js::key(font), &js::key(text)),
            None => Array::of1(&js::key(font)),
        };
        let result = js::call(&self.check, &self.fonts, &args).map_err(host_error)?;
        Ok(result.as_bool().unwrap_or(false))
    }
}

struct NativeTimezone {
    get_timezone_offset: Function,
    date_time_format: Function,
    resolved_options: Function,
}

impl TimezoneApi<JsValue> for NativeTimezone {
    fn timezone_offset(&self, date: &JsValue) -> i32 {
        js::call(&self.get_timezone_offset, date, &Array::new())
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as i32
    }

    fn time_zone(&self) -> String {
        Reflect::construct(&self.date_time_format, &Array::new())
            .and_then(|format| js::call(&self.resolved_options, &format, &Array::new()))
            .and_then(|options| js::get(&options, "timeZone"))
            .ok()
            .and_then(|zone| zone.as_string())
            .unwrap_or_default()
    }
}

// =============================================================================
// Property Bags
// =============================================================================

struct JsBag {
    target: JsValue,
}

impl PropertyBag for JsBag {
    fn descriptor(&self, name: &str) -> Option<PropertyDescriptor> {
        js::own_configurable(&self.target, name).map(|configurable| PropertyDescriptor { configurable })
    }

    fn define_getter(&self, name: &str, value: PropertyValue) -> CapResult<()> {
        let value = match value {
            PropertyValue::Number(n) => JsValue::from_f64(n),
            PropertyValue::Text(text) => JsValue::from_str(text),
            PropertyValue::TextList(items) => js::frozen_string_array(items),
        };
        match js::define_getter(&self.target, name, value) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CapabilityError::NonConfigurable(name.to_string())),
            Err(e) => Err(host_error(e)),
        }
    }
}

// =============================================================================
// Slots
// =============================================================================

#[derive(Default)]
struct Slots {
    canvas: RefCell<Option<CanvasSlot<JsValue, JsValue>>>,
    webgl: RefCell<Option<WebGlSlot<JsValue, JsValue>>>,
    peers: RefCell<Option<PeerConnectionSlot<JsValue, JsValue>>>,
    media: RefCell<Option<MediaDevicesSlot<JsValue>>>,
    battery: RefCell<Option<BatterySlot<JsValue>>>,
    timing: RefCell<Option<TimingSlot<JsValue>>>,
    fonts: RefCell<Option<FontsSlot>>,
    timezone: RefCell<Option<TimezoneSlot<JsValue>>>,
}

/// Current handle in a slot. The borrow ends before the handle is called.
fn current<T: Clone>(slot: &RefCell<Option<T>>) -> Result<T, JsValue> {
    slot.borrow().clone().ok_or_else(|| js::error("capability missing"))
}

/// Trap closure type shorthand.
fn trap<F>(f: F) -> js::Trap
where
    F: FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue> + 'static,
{
    Closure::wrap(Box::new(f) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>)
}

/// The live page.
pub struct JsPage {
    slots: Rc<Slots>,
    routed: RefCell<Vec<&'static str>>,
    screen: Option<JsValue>,
    navigator: Option<JsValue>,
    installs: Cell<usize>,
}

impl JsPage {
    /// Capture the page's original APIs.
    pub fn new() -> Result<Self, JsValue> {
        let slots = Rc::new(Slots::default());
        let defined = |value: JsValue| if value.is_undefined() || value.is_null() { None } else { Some(value) };

        if let (Some(ctx_proto), Some(canvas_proto)) =
            (js::get_prototype("CanvasRenderingContext2D")?, js::get_prototype("HTMLCanvasElement")?)
        {
            let image_data: Option<Function> = js::get_global("ImageData")?.dyn_into().ok();
            if let (Some(gid), Some(pid), Some(tdu), Some(tb), Some(image_data)) = (
                js::get_function(&ctx_proto, "getImageData")?,
                js::get_function(&ctx_proto, "putImageData")?,
                js::get_function(&canvas_proto, "toDataURL")?,
                js::get_function(&canvas_proto, "toBlob")?,
                image_data,
            ) {
                let native: CanvasSlot<JsValue, JsValue> = Rc::new(NativeCanvas {
                    get_image_data: gid,
                    put_image_data: pid,
                    to_data_url: tdu,
                    to_blob: tb,
                    image_data,
                });
                *slots.canvas.borrow_mut() = Some(native);
            }
        }

        let mut originals = Vec::new();
        for name in ["WebGLRenderingContext", "WebGL2RenderingContext"] {
            if let Some(proto) = js::get_prototype(name)? {
                if let Some(f) = js::get_function(&proto, "getParameter")? {
                    originals.push((proto, f));
                }
            }
        }
        if !originals.is_empty() {
            let native: WebGlSlot<JsValue, JsValue> = Rc::new(NativeWebGl { originals });
            *slots.webgl.borrow_mut() = Some(native);
        }

        if let Some(proto) = js::get_prototype("RTCPeerConnection")? {
            let constructor: Option<Function> = js::get_global("RTCPeerConnection")?.dyn_into().ok();
            if let (Some(constructor), Some(create)) = (constructor, js::get_function(&proto, "createDataChannel")?) {
                let native: PeerConnectionSlot<JsValue, JsValue> =
                    Rc::new(NativePeers { constructor, create_data_channel: create });
                *slots.peers.borrow_mut() = Some(native);
            }
        }

        let navigator = defined(js::get_global("navigator")?);
        if let Some(navigator) = &navigator {
            if let Some(devices) = defined(js::get(navigator, "mediaDevices")?) {
                if let Some(original) = js::get_function(&devices, "getUserMedia")? {
                    let native: MediaDevicesSlot<JsValue> = Rc::new(NativeMethod { this: devices, original });
                    *slots.media.borrow_mut() = Some(native);
                }
            }
            if let Some(original) = js::get_function(navigator, "getBattery")? {
                let native: BatterySlot<JsValue> = Rc::new(NativeMethod { this: navigator.clone(), original });
                *slots.battery.borrow_mut() = Some(native);
            }
        }

        if let (Some(performance), Some(date_proto)) = (defined(js::get_global("performance")?), js::get_prototype("Date")?) {
            if let (Some(now), Some(get_time)) =
                (js::get_function(&performance, "now")?, js::get_function(&date_proto, "getTime")?)
            {
                let native: TimingSlot<JsValue> = Rc::new(NativeClock { performance, now, get_time });
                *slots.timing.borrow_mut() = Some(native);
            }
        }

        if let Some(fonts) = defined(js::get(&js::get_global("document")?, "fonts")?) {
            if let Some(check) = js::get_function(&fonts, "check")? {
                let native: FontsSlot = Rc::new(NativeFonts { fonts, check });
                *slots.fonts.borrow_mut() = Some(native);
            }
        }

        let intl = js::get_global("Intl")?;
        if let (Some(date_proto), false) = (js::get_prototype("Date")?, intl.is_undefined()) {
            let date_time_format: Option<Function> = js::get(&intl, "DateTimeFormat")?.dyn_into().ok();
            if let (Some(offset), Some(format)) = (js::get_function(&date_proto, "getTimezoneOffset")?, date_time_format) {
                let format_proto = js::get(&format, "prototype")?;
                if let Some(resolved) = js::get_function(&format_proto, "resolvedOptions")? {
                    let native: TimezoneSlot<JsValue> = Rc::new(NativeTimezone {
                        get_timezone_offset: offset,
                        date_time_format: format,
                        resolved_options: resolved,
                    });
                    *slots.timezone.borrow_mut() = Some(native);
                }
            }
        }

        Ok(Self {
            slots,
            routed: RefCell::new(Vec::new()),
            screen: defined(js::get_global("screen")?),
            navigator,
            installs: Cell::new(0),
        })
    }

    /// Number of slot replacements so far.
    pub fn installs(&self) -> usize {
        self.installs.get()
    }

    /// Install the browser-side routing for a slot once.
    fn route(&self, name: &'static str, install: impl FnOnce(&Rc<Slots>) -> Result<(), JsValue>) -> CapResult<()> {
        self.installs.set(self.installs.get() + 1);
        if self.routed.borrow().contains(&name) {
            return Ok(());
        }
        install(&self.slots).map_err(host_error)?;
        self.routed.borrow_mut().push(name);
        Ok(())
    }
}

// =============================================================================
// Routing
// =============================================================================

fn route_canvas(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let ctx_proto = js::get_prototype("CanvasRenderingContext2D")?.ok_or_else(|| js::error("no 2d context"))?;
    let canvas_proto = js::get_prototype("HTMLCanvasElement")?.ok_or_else(|| js::error("no canvas"))?;

    let s = slots.clone();
    js::intercept(
        &ctx_proto,
        "getImageData",
        trap(move |target, context, args| {
            let raw = js::arguments(&args);
            let Some((x, y, width, height)) =
                image_rect([number(&raw, 0), number(&raw, 1), number(&raw, 2), number(&raw, 3)])
            else {
                // Let the browser raise its own IndexSizeError.
                return js::call(target.unchecked_ref(), &context, args.unchecked_ref());
            };
            let canvas = js::get(&context, "canvas")?;
            let api = current(&s.canvas)?;
            let image = api.get_image_data(&canvas, x, y, width, height).map_err(throw)?;
            let data = Uint8ClampedArray::new_with_length(image.data.len() as u32);
            data.copy_from(&image.data);
            let ctor: Function = js::get_global("ImageData")?.unchecked_into();
            Reflect::construct(&ctor, &Array::of3(&data, &image.width.into(), &image.height.into()))
        }),
    )?;

    let s = slots.clone();
    js::intercept(
        &canvas_proto,
        "toDataURL",
        trap(move |_target, canvas, args| {
            let api = current(&s.canvas)?;
            api.to_data_url(&canvas, &js::arguments(&args)).map_err(throw)
        }),
    )?;

    let s = slots.clone();
    js::intercept(
        &canvas_proto,
        "toBlob",
        trap(move |_target, canvas, args| {
            let api = current(&s.canvas)?;
            api.to_blob(&canvas, &js::arguments(&args)).map_err(throw)
        }),
    )?;
    Ok(())
}

fn route_webgl(slots: &Rc<Slots>) -> Result<(), JsValue> {
    for name in ["WebGLRenderingContext", "WebGL2RenderingContext"] {
        let proto = match js::get_prototype(name)? {
            Some(proto) => proto,
            None => continue,
        };
        let s = slots.clone();
        js::intercept(
            &proto,
            "getParameter",
            trap(move |_target, context, args| {
                let pname = number(&js::arguments(&args), 0) as u32;
                let api = current(&s.webgl)?;
                api.get_parameter(&context, pname).map_err(throw)
            }),
        )?;
    }
    Ok(())
}

fn route_peers(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let proto = js::get_prototype("RTCPeerConnection")?.ok_or_else(|| js::error("no RTCPeerConnection"))?;

    let s = slots.clone();
    js::intercept(
        &proto,
        "createDataChannel",
        trap(move |_target, connection, args| {
            let api = current(&s.peers)?;
            api.create_data_channel(&connection, &js::arguments(&args)).map_err(throw)
        }),
    )?;

    let constructor = js::get_global("RTCPeerConnection")?;
    let s = slots.clone();
    let proxied = js::proxy_constructor_with_construct(
        &constructor,
        trap(move |_target, args, _new_target| {
            let api = current(&s.peers)?;
            api.construct(&js::arguments(&args)).map_err(throw)
        }),
    )?;
    Reflect::set(&js_sys::global(), &js::key("RTCPeerConnection"), &proxied)?;
    Ok(())
}

fn route_media(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let devices = js::get(&js::get_global("navigator")?, "mediaDevices")?;
    let s = slots.clone();
    js::intercept(
        &devices,
        "getUserMedia",
        trap(move |_target, _this, args| {
            let api = current(&s.media)?;
            Ok(match api.get_user_media(&js::arguments(&args)) {
                Ok(value) => value,
                Err(e) => js::rejected(&e.to_string()),
            })
        }),
    )?;
    Ok(())
}

fn route_battery(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let navigator = js::get_global("navigator")?;
    let s = slots.clone();
    js::intercept(
        &navigator,
        "getBattery",
        trap(move |_target, _this, _args| {
            let api = current(&s.battery)?;
            Ok(match api.get_battery() {
                Ok(value) => value,
                Err(e) => js::rejected(&e.to_string()),
            })
        }),
    )?;
    Ok(())
}

fn route_timing(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let performance = js::get_global("performance")?;
    let s = slots.clone();
    js::intercept(
        &performance,
        "now",
        trap(move |_target, _this, _args| Ok(JsValue::from_f64(current(&s.timing)?.performance_now()))),
    )?;

    let date_proto = js::get_prototype("Date")?.ok_or_else(|| js::error("no Date"))?;
    let s = slots.clone();
    js::intercept(
        &date_proto,
        "getTime",
        trap(move |_target, date, _args| Ok(JsValue::from_f64(current(&s.timing)?.get_time(&date)))),
    )?;
    Ok(())
}

fn route_fonts(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let fonts = js::get(&js::get_global("document")?, "fonts")?;
    let s = slots.clone();
    js::intercept(
        &fonts,
        "check",
        trap(move |_target, _this, args| {
            let args = js::arguments(&args);
            let font = args.first().and_then(JsValue::as_string).unwrap_or_default();
            let text = args.get(1).and_then(JsValue::as_string);
            let api = current(&s.fonts)?;
            api.check(&font, text.as_deref()).map(JsValue::from_bool).map_err(throw)
        }),
    )?;
    Ok(())
}

fn route_timezone(slots: &Rc<Slots>) -> Result<(), JsValue> {
    let date_proto = js::get_prototype("Date")?.ok_or_else(|| js::error("no Date"))?;
    let s = slots.clone();
    js::intercept(
        &date_proto,
        "getTimezoneOffset",
        trap(move |_target, date, _args| Ok(JsValue::from(current(&s.timezone)?.timezone_offset(&date)))),
    )?;

    let format_proto = js::get(&js::get(&js::get_global("Intl")?, "DateTimeFormat")?, "prototype")?;
    let original = js::get_function(&format_proto, "resolvedOptions")?
        .ok_or_else(|| js::error("no resolvedOptions"))?;
    let s = slots.clone();
    js::intercept(
        &format_proto,
        "resolvedOptions",
        trap(move |_target, this, args| {
            let options = js::call(&original, &this, args.unchecked_ref())?;
            let zone = current(&s.timezone)?.time_zone();
            Reflect::set(&options, &js::key("timeZone"), &JsValue::from_str(&zone))?;
            Ok(options)
        }),
    )?;
    Ok(())
}

impl PageHost for JsPage {
    type Handle = JsValue;
    type Value = JsValue;

    fn canvas(&self) -> Option<CanvasSlot<JsValue, JsValue>> {
        self.slots.canvas.borrow().clone()
    }

    fn set_canvas(&self, api: CanvasSlot<JsValue, JsValue>) -> CapResult<()> {
        self.route("canvas", route_canvas)?;
        *self.slots.canvas.borrow_mut() = Some(api);
        Ok(())
    }

    fn webgl(&self) -> Option<WebGlSlot<JsValue, JsValue>> {
        self.slots.webgl.borrow().clone()
    }

    fn set_webgl(&self, api: WebGlSlot<JsValue, JsValue>) -> CapResult<()> {
        self.route("webgl", route_webgl)?;
        *self.slots.webgl.borrow_mut() = Some(api);
        Ok(())
    }

    fn screen(&self) -> Option<Rc<dyn PropertyBag>> {
        let target = self.screen.clone()?;
        Some(Rc::new(JsBag { target }))
    }

    fn navigator(&self) -> Option<Rc<dyn PropertyBag>> {
        let target = self.navigator.clone()?;
        Some(Rc::new(JsBag { target }))
    }

    fn peer_connections(&self) -> Option<PeerConnectionSlot<JsValue, JsValue>> {
        self.slots.peers.borrow().clone()
    }

    fn set_peer_connections(&self, api: PeerConnectionSlot<JsValue, JsValue>) -> CapResult<()> {
        self.route("peers", route_peers)?;
        *self.slots.peers.borrow_mut() = Some(api);
        Ok(())
    }

    fn media_devices(&self) -> Option<MediaDevicesSlot<JsValue>> {
        self.slots.media.borrow().clone()
    }

    fn set_media_devices(&self, api: MediaDevicesSlot<JsValue>) -> CapResult<()> {
        self.route("media", route_media)?;
        *self.slots.media.borrow_mut() = Some(api);
        Ok(())
    }

    fn battery(&self) -> Option<BatterySlot<JsValue>> {
        self.slots.battery.borrow().clone()
    }

    fn set_battery(&self, api: BatterySlot<JsValue>) -> CapResult<()> {
        self.route("battery", route_battery)?;
        *self.slots.battery.borrow_mut() = Some(api);
        Ok(())
    }

    fn timing(&self) -> Option<TimingSlot<JsValue>> {
        self.slots.timing.borrow().clone()
    }

    fn set_timing(&self, api: TimingSlot<JsValue>) -> CapResult<()> {
        self.route("timing", route_timing)?;
        *self.slots.timing.borrow_mut() = Some(api);
        Ok(())
    }

    fn fonts(&self) -> Option<FontsSlot> {
        self.slots.fonts.borrow().clone()
    }

    fn set_fonts(&self, api: FontsSlot) -> CapResult<()> {
        self.route("fonts", route_fonts)?;
        *self.slots.fonts.borrow_mut() = Some(api);
        Ok(())
    }

    fn timezone(&self) -> Option<TimezoneSlot<JsValue>> {
        self.slots.timezone.borrow().clone()
    }

    fn set_timezone(&self, api: TimezoneSlot<JsValue>) -> CapResult<()> {
        self.route("timezone", route_timezone)?;
        *self.slots.timezone.borrow_mut() = Some(api);
        Ok(())
    }
}

// =============================================================================
// Entry Point
// =============================================================================

fn names(protections: &[Protection]) -> Array {
    protections.iter().map(|p| JsValue::from_str(p.name())).collect()
}

/// Payload entry point. Reads the seeded configuration global, installs the
/// enabled protections and starts listening for config updates.
///
/// Returns `{ applied: string[], count: number }`.
#[wasm_bindgen]
pub fn apply_page_protections() -> Result<JsValue, JsValue> {
    let seed = js::get_global(tracery_shield::message::CONFIG_GLOBAL)?;
    let seed: Option<serde_json::Value> = if seed.is_undefined() || seed.is_null() {
        None
    } else {
        js::from_js(seed).ok()
    };

    let payload = Rc::new(Payload::new(JsPage::new()?, seed.as_ref()));
    let applied = payload.apply_all();

    let window = web_sys::window().ok_or_else(|| js::error("no window"))?;
    let listener_payload = payload.clone();
    let own_window: JsValue = window.clone().into();
    let on_message = Closure::wrap(Box::new(move |event: web_sys::MessageEvent| {
        let from_self = event.source().map(|source| JsValue::from(source) == own_window).unwrap_or(false);
        if !from_self {
            return;
        }
        if let Ok(data) = js::from_js::<serde_json::Value>(event.data()) {
            listener_payload.handle_message(&data);
        }
    }) as Box<dyn FnMut(web_sys::MessageEvent)>);
    window.add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())?;
    on_message.forget();

    let result = js_sys::Object::new();
    Reflect::set(&result, &js::key("applied"), &names(&applied))?;
    Reflect::set(&result, &js::key("count"), &JsValue::from(applied.len() as u32))?;
    Ok(result.into())
}
