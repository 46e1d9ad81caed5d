//! WebGL renderer identity

use std::rc::Rc;

use crate::capability::{
    CapResult, CapabilityError, PageHost, WebGlApi, WebGlSlot, GL_RENDERER, GL_SHADING_LANGUAGE_VERSION,
    GL_VENDOR, GL_VERSION,
};

pub const SPOOFED_VENDOR: &str = "Intel Inc.";
pub const SPOOFED_RENDERER: &str = "Intel Iris OpenGL Engine";
pub const SPOOFED_VERSION: &str = "WebGL 1.0 (OpenGL ES 2.0 Chromium)";
pub const SPOOFED_SHADING_LANGUAGE_VERSION: &str = "WebGL GLSL ES 1.0 (OpenGL ES GLSL ES 1.0 Chromium)";

/// Fixed answer for an identifying parameter, `None` for everything else.
pub fn spoofed_parameter(pname: u32) -> Option<&'static str> {
    match pname {
        GL_VENDOR => Some(SPOOFED_VENDOR),
        GL_RENDERER => Some(SPOOFED_RENDERER),
        GL_VERSION => Some(SPOOFED_VERSION),
        GL_SHADING_LANGUAGE_VERSION => Some(SPOOFED_SHADING_LANGUAGE_VERSION),
        _ => None,
    }
}

pub struct SpoofedWebGl<H, V> {
    inner: WebGlSlot<H, V>,
}

impl<H, V: From<&'static str>> WebGlApi<H, V> for SpoofedWebGl<H, V> {
    fn get_parameter(&self, context: &H, pname: u32) -> CapResult<V> {
        match spoofed_parameter(pname) {
            Some(value) => Ok(V::from(value)),
            None => self.inner.get_parameter(context, pname),
        }
    }
}

pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    let inner = host.webgl().ok_or(CapabilityError::Unavailable("WebGLRenderingContext"))?;
    host.set_webgl(Rc::new(SpoofedWebGl { inner }))
}
