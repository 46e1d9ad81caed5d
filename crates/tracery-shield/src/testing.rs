//! In-memory page used by the protection tests.
//!
//! Handles are plain `u32` ids and values are `String`s, so assertions can
//! compare against literals.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use crate::capability::*;

// =============================================================================
// Fake APIs
// =============================================================================

#[derive(Default)]
pub struct FakeCanvases {
    bitmaps: RefCell<HashMap<u32, ImageData>>,
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

impl CanvasApi<u32, String> for FakeCanvases {
    fn size(&self, canvas: &u32) -> (u32, u32) {
        self.bitmaps.borrow().get(canvas).map(|b| (b.width, b.height)).unwrap_or((0, 0))
    }

    fn has_context_2d(&self, canvas: &u32) -> bool {
        self.bitmaps.borrow().contains_key(canvas)
    }

    fn get_image_data(&self, canvas: &u32, x: i32, y: i32, width: u32, height: u32) -> CapResult<ImageData> {
        let bitmaps = self.bitmaps.borrow();
        let source = bitmaps.get(canvas).ok_or_else(|| CapabilityError::Host("no such canvas".into()))?;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                let (sx, sy) = (x + col, y + row);
                if sx < 0 || sy < 0 || sx as u32 >= source.width || sy as u32 >= source.height {
                    data.extend_from_slice(&[0, 0, 0, 0]);
                } else {
                    let offset = ((sy as u32 * source.width + sx as u32) * 4) as usize;
                    data.extend_from_slice(&source.data[offset..offset + 4]);
                }
            }
        }
        Ok(ImageData { width, height, data })
    }

    fn put_image_data(&self, canvas: &u32, image: &ImageData, x: i32, y: i32) -> CapResult<()> {
        let mut bitmaps = self.bitmaps.borrow_mut();
        let target = bitmaps.get_mut(canvas).ok_or_else(|| CapabilityError::Host("no such canvas".into()))?;
        for row in 0..image.height {
            for col in 0..image.width {
                let (tx, ty) = (x + col as i32, y + row as i32);
                if tx < 0 || ty < 0 || tx as u32 >= target.width || ty as u32 >= target.height {
                    continue;
                }
                let from = ((row * image.width + col) * 4) as usize;
                let to = ((ty as u32 * target.width + tx as u32) * 4) as usize;
                target.data[to..to + 4].copy_from_slice(&image.data[from..from + 4]);
            }
        }
        Ok(())
    }

    fn to_data_url(&self, canvas: &u32, _args: &[String]) -> CapResult<String> {
        let bitmaps = self.bitmaps.borrow();
        let data = bitmaps.get(canvas).map(|b| hex(&b.data)).unwrap_or_default();
        Ok(format!("data:image/png;base64,{}", data))
    }

    fn to_blob(&self, canvas: &u32, args: &[String]) -> CapResult<String> {
        let mime = args.first().map(String::as_str).unwrap_or("image/png");
        let bitmaps = self.bitmaps.borrow();
        let data = bitmaps.get(canvas).map(|b| hex(&b.data)).unwrap_or_default();
        Ok(format!("blob:{}:{}", mime, data))
    }
}

pub struct FakeWebGl;

impl WebGlApi<u32, String> for FakeWebGl {
    fn get_parameter(&self, _context: &u32, pname: u32) -> CapResult<String> {
        Ok(format!("native:{}", pname))
    }
}

/// Property bag where some names can be locked as non-configurable.
#[derive(Default)]
pub struct FakeBag {
    defined: RefCell<BTreeMap<String, PropertyValue>>,
    locked: RefCell<BTreeSet<String>>,
}

impl FakeBag {
    pub fn lock(&self, name: &str) {
        self.locked.borrow_mut().insert(name.to_string());
    }

    /// Value of a redefined getter, `None` if never redefined.
    pub fn value(&self, name: &str) -> Option<PropertyValue> {
        self.defined.borrow().get(name).cloned()
    }
}

impl PropertyBag for FakeBag {
    fn descriptor(&self, name: &str) -> Option<PropertyDescriptor> {
        if self.locked.borrow().contains(name) {
            return Some(PropertyDescriptor { configurable: false });
        }
        self.defined.borrow().get(name).map(|_| PropertyDescriptor { configurable: true })
    }

    fn define_getter(&self, name: &str, value: PropertyValue) -> CapResult<()> {
        if self.locked.borrow().contains(name) {
            return Err(CapabilityError::NonConfigurable(name.to_string()));
        }
        self.defined.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePeers {
    next: Cell<u32>,
}

impl PeerConnectionApi<u32, String> for FakePeers {
    fn construct(&self, _args: &[String]) -> CapResult<u32> {
        let id = self.next.get() + 1;
        self.next.set(id);
        Ok(id)
    }

    fn create_data_channel(&self, connection: &u32, _args: &[String]) -> CapResult<String> {
        Ok(format!("channel:{}", connection))
    }
}

pub struct FakeMedia;

impl MediaDevicesApi<String> for FakeMedia {
    fn get_user_media(&self, _args: &[String]) -> CapResult<String> {
        Ok("stream".into())
    }
}

pub struct FakeBattery;

impl BatteryApi<String> for FakeBattery {
    fn get_battery(&self) -> CapResult<String> {
        Ok("battery".into())
    }
}

/// (performance.now, Date.getTime)
pub struct FakeClock {
    readings: Rc<Cell<(f64, f64)>>,
}

impl TimingApi<u32> for FakeClock {
    fn performance_now(&self) -> f64 {
        self.readings.get().0
    }

    fn get_time(&self, _date: &u32) -> f64 {
        self.readings.get().1
    }
}

pub struct FakeFonts;

impl FontsApi for FakeFonts {
    fn check(&self, _font: &str, _text: Option<&str>) -> CapResult<bool> {
        Ok(true)
    }
}

pub struct FakeTimezone;

impl TimezoneApi<u32> for FakeTimezone {
    fn timezone_offset(&self, _date: &u32) -> i32 {
        -120
    }

    fn time_zone(&self) -> String {
        "Europe/Berlin".into()
    }
}

// =============================================================================
// Page
// =============================================================================

pub struct FakePage {
    canvases: Rc<FakeCanvases>,
    screen: Option<Rc<FakeBag>>,
    navigator: Option<Rc<FakeBag>>,
    clock: Rc<Cell<(f64, f64)>>,
    canvas: RefCell<Option<CanvasSlot<u32, String>>>,
    webgl: RefCell<Option<WebGlSlot<u32, String>>>,
    peers: RefCell<Option<PeerConnectionSlot<u32, String>>>,
    media: RefCell<Option<MediaDevicesSlot<String>>>,
    battery: RefCell<Option<BatterySlot<String>>>,
    timing: RefCell<Option<TimingSlot<u32>>>,
    fonts: RefCell<Option<FontsSlot>>,
    timezone: RefCell<Option<TimezoneSlot<u32>>>,
    /// Slot names in the order they were replaced.
    pub replaced: RefCell<Vec<&'static str>>,
}

impl FakePage {
    /// Page exposing every API.
    pub fn new() -> Self {
        let canvases = Rc::new(FakeCanvases::default());
        let clock = Rc::new(Cell::new((1000.0, 1_700_000_000_000.0)));
        let canvas: CanvasSlot<u32, String> = canvases.clone();
        Self {
            screen: Some(Rc::new(FakeBag::default())),
            navigator: Some(Rc::new(FakeBag::default())),
            canvas: RefCell::new(Some(canvas)),
            webgl: RefCell::new(Some(Rc::new(FakeWebGl) as WebGlSlot<u32, String>)),
            peers: RefCell::new(Some(Rc::new(FakePeers::default()) as PeerConnectionSlot<u32, String>)),
            media: RefCell::new(Some(Rc::new(FakeMedia) as MediaDevicesSlot<String>)),
            battery: RefCell::new(Some(Rc::new(FakeBattery) as BatterySlot<String>)),
            timing: RefCell::new(Some(Rc::new(FakeClock { readings: clock.clone() }) as TimingSlot<u32>)),
            fonts: RefCell::new(Some(Rc::new(FakeFonts) as FontsSlot)),
            timezone: RefCell::new(Some(Rc::new(FakeTimezone) as TimezoneSlot<u32>)),
            canvases,
            clock,
            replaced: RefCell::new(Vec::new()),
        }
    }

    /// Page exposing none of the APIs.
    pub fn bare() -> Self {
        Self {
            canvases: Rc::new(FakeCanvases::default()),
            screen: None,
            navigator: None,
            clock: Rc::new(Cell::new((0.0, 0.0))),
            canvas: RefCell::new(None),
            webgl: RefCell::new(None),
            peers: RefCell::new(None),
            media: RefCell::new(None),
            battery: RefCell::new(None),
            timing: RefCell::new(None),
            fonts: RefCell::new(None),
            timezone: RefCell::new(None),
            replaced: RefCell::new(Vec::new()),
        }
    }

    pub fn add_canvas(&self, id: u32, width: u32, height: u32, fill: u8) {
        let data = vec![fill; (width * height * 4) as usize];
        self.canvases.bitmaps.borrow_mut().insert(id, ImageData { width, height, data });
    }

    /// Raw bitmap, bypassing any installed protection.
    pub fn bitmap(&self, id: u32) -> ImageData {
        self.canvases.bitmaps.borrow().get(&id).cloned().expect("canvas exists")
    }

    pub fn screen_bag(&self) -> Rc<FakeBag> {
        self.screen.clone().expect("page has a screen")
    }

    pub fn navigator_bag(&self) -> Rc<FakeBag> {
        self.navigator.clone().expect("page has a navigator")
    }

    pub fn set_clock(&self, performance_now: f64, time: f64) {
        self.clock.set((performance_now, time));
    }

    fn replace<T>(&self, slot: &RefCell<Option<T>>, value: T, name: &'static str) -> CapResult<()> {
        *slot.borrow_mut() = Some(value);
        self.replaced.borrow_mut().push(name);
        Ok(())
    }
}

impl PageHost for FakePage {
    type Handle = u32;
    type Value = String;

    fn canvas(&self) -> Option<CanvasSlot<u32, String>> {
        self.canvas.borrow().clone()
    }

    fn set_canvas(&self, api: CanvasSlot<u32, String>) -> CapResult<()> {
        self.replace(&self.canvas, api, "canvas")
    }

    fn webgl(&self) -> Option<WebGlSlot<u32, String>> {
        self.webgl.borrow().clone()
    }

    fn set_webgl(&self, api: WebGlSlot<u32, String>) -> CapResult<()> {
        self.replace(&self.webgl, api, "webgl")
    }

    fn screen(&self) -> Option<Rc<dyn PropertyBag>> {
        self.screen.clone().map(|bag| bag as Rc<dyn PropertyBag>)
    }

    fn navigator(&self) -> Option<Rc<dyn PropertyBag>> {
        self.navigator.clone().map(|bag| bag as Rc<dyn PropertyBag>)
    }

    fn peer_connections(&self) -> Option<PeerConnectionSlot<u32, String>> {
        self.peers.borrow().clone()
    }

    fn set_peer_connections(&self, api: PeerConnectionSlot<u32, String>) -> CapResult<()> {
        self.replace(&self.peers, api, "peer_connections")
    }

    fn media_devices(&self) -> Option<MediaDevicesSlot<String>> {
        self.media.borrow().clone()
    }

    fn set_media_devices(&self, api: MediaDevicesSlot<String>) -> CapResult<()> {
        self.replace(&self.media, api, "media_devices")
    }

    fn battery(&self) -> Option<BatterySlot<String>> {
        self.battery.borrow().clone()
    }

    fn set_battery(&self, api: BatterySlot<String>) -> CapResult<()> {
        self.replace(&self.battery, api, "battery")
    }

    fn timing(&self) -> Option<TimingSlot<u32>> {
        self.timing.borrow().clone()
    }

    fn set_timing(&self, api: TimingSlot<u32>) -> CapResult<()> {
        self.replace(&self.timing, api, "timing")
    }

    fn fonts(&self) -> Option<FontsSlot> {
        self.fonts.borrow().clone()
    }

    fn set_fonts(&self, api: FontsSlot) -> CapResult<()> {
        self.replace(&self.fonts, api, "fonts")
    }

    fn timezone(&self) -> Option<TimezoneSlot<u32>> {
        self.timezone.borrow().clone()
    }

    fn set_timezone(&self, api: TimezoneSlot<u32>) -> CapResult<()> {
        self.replace(&self.timezone, api, "timezone")
    }
}
