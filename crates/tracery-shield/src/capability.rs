//! Capability handles for page-context APIs
//!
//! Each fingerprintable browser surface is reached through a small trait.
//! A [`PageHost`] owns one slot per surface; protections read the current
//! handle, wrap it in a decorator, and put the decorator back. The page-side
//! bindings route every call to the intercepted browser method through the
//! handle currently in its slot.
//!
//! `H` is the host's object handle (canvas element, WebGL context, peer
//! connection, `Date`) and `V` its opaque value type. Both are `JsValue` in
//! the browser.

use std::rc::Rc;

/// Error type for capability calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Rejected by a protection. The message is surfaced to the page as-is.
    #[error("{0}")]
    Blocked(&'static str),
    #[error("API not available: {0}")]
    Unavailable(&'static str),
    #[error("Property {0} is not configurable")]
    NonConfigurable(String),
    #[error("{0}")]
    Host(String),
}

pub type CapResult<T> = Result<T, CapabilityError>;

// =============================================================================
// Canvas
// =============================================================================

/// RGBA pixel buffer, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Canvas readback surface (`HTMLCanvasElement` plus its 2D context).
pub trait CanvasApi<H, V> {
    fn size(&self, canvas: &H) -> (u32, u32);
    fn has_context_2d(&self, canvas: &H) -> bool;
    fn get_image_data(&self, canvas: &H, x: i32, y: i32, width: u32, height: u32) -> CapResult<ImageData>;
    fn put_image_data(&self, canvas: &H, image: &ImageData, x: i32, y: i32) -> CapResult<()>;
    /// `toDataURL`, with the caller's arguments passed through.
    fn to_data_url(&self, canvas: &H, args: &[V]) -> CapResult<V>;
    /// `toBlob`, with the caller's arguments passed through.
    fn to_blob(&self, canvas: &H, args: &[V]) -> CapResult<V>;
}

// =============================================================================
// WebGL
// =============================================================================

pub const GL_VENDOR: u32 = 0x1F00;
pub const GL_RENDERER: u32 = 0x1F01;
pub const GL_VERSION: u32 = 0x1F02;
pub const GL_SHADING_LANGUAGE_VERSION: u32 = 0x8B8C;

pub trait WebGlApi<H, V> {
    fn get_parameter(&self, context: &H, pname: u32) -> CapResult<V>;
}

// =============================================================================
// Property Bags (screen, navigator)
// =============================================================================

/// Own-property descriptor as far as protections care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub configurable: bool,
}

/// Value a redefined getter returns.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Text(&'static str),
    TextList(&'static [&'static str]),
}

/// An object whose properties can be redefined with fixed getters.
pub trait PropertyBag {
    /// Own-property descriptor, `None` when the property is inherited or absent.
    fn descriptor(&self, name: &str) -> Option<PropertyDescriptor>;
    fn define_getter(&self, name: &str, value: PropertyValue) -> CapResult<()>;
}

// =============================================================================
// WebRTC and Media
// =============================================================================

pub trait PeerConnectionApi<H, V> {
    /// `new RTCPeerConnection(...args)`
    fn construct(&self, args: &[V]) -> CapResult<H>;
    fn create_data_channel(&self, connection: &H, args: &[V]) -> CapResult<V>;
}

pub trait MediaDevicesApi<V> {
    /// `navigator.mediaDevices.getUserMedia(constraints)`
    fn get_user_media(&self, args: &[V]) -> CapResult<V>;
}

pub trait BatteryApi<V> {
    /// `navigator.getBattery()`
    fn get_battery(&self) -> CapResult<V>;
}

// =============================================================================
// Timing, Fonts, Timezone
// =============================================================================

pub trait TimingApi<H> {
    /// `performance.now()`, milliseconds
    fn performance_now(&self) -> f64;
    /// `Date.prototype.getTime`, milliseconds since the epoch
    fn get_time(&self, date: &H) -> f64;
}

pub trait FontsApi {
    /// `document.fonts.check(font, text)`
    fn check(&self, font: &str, text: Option<&str>) -> CapResult<bool>;
}

pub trait TimezoneApi<H> {
    /// `Date.prototype.getTimezoneOffset`, minutes
    fn timezone_offset(&self, date: &H) -> i32;
    /// `Intl.DateTimeFormat().resolvedOptions().timeZone`
    fn time_zone(&self) -> String;
}

// =============================================================================
// Host
// =============================================================================

pub type CanvasSlot<H, V> = Rc<dyn CanvasApi<H, V>>;
pub type WebGlSlot<H, V> = Rc<dyn WebGlApi<H, V>>;
pub type PeerConnectionSlot<H, V> = Rc<dyn PeerConnectionApi<H, V>>;
pub type MediaDevicesSlot<V> = Rc<dyn MediaDevicesApi<V>>;
pub type BatterySlot<V> = Rc<dyn BatteryApi<V>>;
pub type TimingSlot<H> = Rc<dyn TimingApi<H>>;
pub type FontsSlot = Rc<dyn FontsApi>;
pub type TimezoneSlot<H> = Rc<dyn TimezoneApi<H>>;

/// Page context seen by the payload.
///
/// A getter returns `None` when the page does not expose that API. Setters
/// replace the slot; the host decides how calls reach the new handle.
pub trait PageHost {
    type Handle: 'static;
    type Value: From<&'static str> + 'static;

    fn canvas(&self) -> Option<CanvasSlot<Self::Handle, Self::Value>>;
    fn set_canvas(&self, api: CanvasSlot<Self::Handle, Self::Value>) -> CapResult<()>;

    fn webgl(&self) -> Option<WebGlSlot<Self::Handle, Self::Value>>;
    fn set_webgl(&self, api: WebGlSlot<Self::Handle, Self::Value>) -> CapResult<()>;

    fn screen(&self) -> Option<Rc<dyn PropertyBag>>;
    fn navigator(&self) -> Option<Rc<dyn PropertyBag>>;

    fn peer_connections(&self) -> Option<PeerConnectionSlot<Self::Handle, Self::Value>>;
    fn set_peer_connections(&self, api: PeerConnectionSlot<Self::Handle, Self::Value>) -> CapResult<()>;

    fn media_devices(&self) -> Option<MediaDevicesSlot<Self::Value>>;
    fn set_media_devices(&self, api: MediaDevicesSlot<Self::Value>) -> CapResult<()>;

    fn battery(&self) -> Option<BatterySlot<Self::Value>>;
    fn set_battery(&self, api: BatterySlot<Self::Value>) -> CapResult<()>;

    fn timing(&self) -> Option<TimingSlot<Self::Handle>>;
    fn set_timing(&self, api: TimingSlot<Self::Handle>) -> CapResult<()>;

    fn fonts(&self) -> Option<FontsSlot>;
    fn set_fonts(&self, api: FontsSlot) -> CapResult<()>;

    fn timezone(&self) -> Option<TimezoneSlot<Self::Handle>>;
    fn set_timezone(&self, api: TimezoneSlot<Self::Handle>) -> CapResult<()>;
}
