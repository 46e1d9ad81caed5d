//! Screen geometry
//!
//! One resolution is drawn from a table of common desktop sizes when the
//! protection is installed and stays fixed for the page's lifetime.

use crate::capability::{CapResult, CapabilityError, PageHost, PropertyValue};
use crate::noise::Noise;
use crate::protections::define_guarded;

pub const COMMON_RESOLUTIONS: [(u32, u32); 5] = [
    (1920, 1080),
    (1366, 768),
    (1440, 900),
    (1536, 864),
    (1280, 720),
];

/// Height reserved for a taskbar in `availHeight`.
pub const TASKBAR_HEIGHT: u32 = 40;

/// Redefine the screen geometry getters. Returns the chosen resolution.
pub fn install<P: PageHost>(host: &P, noise: &Noise) -> CapResult<(u32, u32)> {
    let screen = host.screen().ok_or(CapabilityError::Unavailable("screen"))?;
    let (width, height) = noise.pick(&COMMON_RESOLUTIONS).copied().unwrap_or(COMMON_RESOLUTIONS[0]);

    let values = [
        ("width", PropertyValue::Number(width as f64)),
        ("height", PropertyValue::Number(height as f64)),
        ("availWidth", PropertyValue::Number(width as f64)),
        ("availHeight", PropertyValue::Number(height.saturating_sub(TASKBAR_HEIGHT) as f64)),
    ];
    define_guarded(screen.as_ref(), &values);
    Ok((width, height))
}
