//! Individual protections
//!
//! Each protection is a decorator over one capability handle plus an
//! `install` function that swaps the decorator into the host's slot.

use std::rc::Rc;

use crate::capability::{CapResult, PageHost, PropertyBag, PropertyValue};
use crate::config::CountermeasureConfig;
use crate::noise::Noise;

pub mod battery;
pub mod canvas;
pub mod fonts;
pub mod navigator;
pub mod screen;
pub mod timezone;
pub mod timing;
pub mod webgl;
pub mod webrtc;

/// Named, independently toggleable protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protection {
    Canvas,
    WebGl,
    Screen,
    Navigator,
    WebRtc,
    Timing,
    Battery,
    Fonts,
    Timezone,
}

impl Protection {
    /// Installation order.
    pub const ALL: [Protection; 9] = [
        Self::Canvas,
        Self::WebGl,
        Self::Screen,
        Self::Navigator,
        Self::WebRtc,
        Self::Timing,
        Self::Battery,
        Self::Fonts,
        Self::Timezone,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::WebGl => "webgl",
            Self::Screen => "screen",
            Self::Navigator => "userAgent",
            Self::WebRtc => "webrtc",
            Self::Timing => "timing",
            Self::Battery => "battery",
            Self::Fonts => "fonts",
            Self::Timezone => "timezone",
        }
    }

    /// Battery blocking has no toggle.
    pub fn enabled(self, config: &CountermeasureConfig) -> bool {
        match self {
            Self::Canvas => config.canvas,
            Self::WebGl => config.webgl,
            Self::Screen => config.screen,
            Self::Navigator => config.user_agent,
            Self::WebRtc => config.webrtc,
            Self::Timing => config.timing,
            Self::Battery => true,
            Self::Fonts => config.fonts,
            Self::Timezone => config.timezone,
        }
    }

    pub fn install<P: PageHost>(self, host: &P, noise: &Rc<Noise>) -> CapResult<()> {
        match self {
            Self::Canvas => canvas::install(host, noise),
            Self::WebGl => webgl::install(host),
            Self::Screen => screen::install(host, noise).map(|_| ()),
            Self::Navigator => navigator::install(host),
            Self::WebRtc => webrtc::install(host),
            Self::Timing => timing::install(host, noise),
            Self::Battery => battery::install(host),
            Self::Fonts => fonts::install(host),
            Self::Timezone => timezone::install(host),
        }
    }
}

impl std::fmt::Display for Protection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Redefine getters on a property bag, skipping any property whose own
/// descriptor is non-configurable. Failures are silent. Returns how many
/// properties were redefined.
pub(crate) fn define_guarded(bag: &dyn PropertyBag, values: &[(&str, PropertyValue)]) -> usize {
    let mut defined = 0;
    for (name, value) in values {
        if let Some(descriptor) = bag.descriptor(name) {
            if !descriptor.configurable {
                log::debug!("Skipping non-configurable property {}", name);
                continue;
            }
        }
        match bag.define_getter(name, value.clone()) {
            Ok(()) => defined += 1,
            Err(e) => log::debug!("Could not redefine {}: {}", name, e),
        }
    }
    defined
}
