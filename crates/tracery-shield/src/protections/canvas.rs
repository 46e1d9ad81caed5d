//! Canvas readback noise
//!
//! `getImageData` results get a fresh per-channel unit delta on every call.
//! `toDataURL` and `toBlob` perturb the bitmap in place before encoding, so
//! the exported image differs between calls as well.

use std::rc::Rc;

use crate::capability::{CanvasApi, CanvasSlot, CapResult, CapabilityError, ImageData, PageHost};
use crate::noise::Noise;

pub struct NoisyCanvas<H, V> {
    inner: CanvasSlot<H, V>,
    noise: Rc<Noise>,
}

impl<H, V> NoisyCanvas<H, V> {
    pub fn new(inner: CanvasSlot<H, V>, noise: Rc<Noise>) -> Self {
        Self { inner, noise }
    }

    fn perturb_bitmap(&self, canvas: &H) -> CapResult<()> {
        if !self.inner.has_context_2d(canvas) {
            return Ok(());
        }
        let (width, height) = self.inner.size(canvas);
        if width == 0 || height == 0 {
            return Ok(());
        }
        let mut image = self.inner.get_image_data(canvas, 0, 0, width, height)?;
        self.noise.perturb_pixels(&mut image.data);
        self.inner.put_image_data(canvas, &image, 0, 0)
    }
}

impl<H, V> CanvasApi<H, V> for NoisyCanvas<H, V> {
    fn size(&self, canvas: &H) -> (u32, u32) {
        self.inner.size(canvas)
    }

    fn has_context_2d(&self, canvas: &H) -> bool {
        self.inner.has_context_2d(canvas)
    }

    fn get_image_data(&self, canvas: &H, x: i32, y: i32, width: u32, height: u32) -> CapResult<ImageData> {
        let mut image = self.inner.get_image_data(canvas, x, y, width, height)?;
        self.noise.perturb_pixels(&mut image.data);
        Ok(image)
    }

    fn put_image_data(&self, canvas: &H, image: &ImageData, x: i32, y: i32) -> CapResult<()> {
        self.inner.put_image_data(canvas, image, x, y)
    }

    fn to_data_url(&self, canvas: &H, args: &[V]) -> CapResult<V> {
        self.perturb_bitmap(canvas)?;
        self.inner.to_data_url(canvas, args)
    }

    fn to_blob(&self, canvas: &H, args: &[V]) -> CapResult<V> {
        self.perturb_bitmap(canvas)?;
        self.inner.to_blob(canvas, args)
    }
}

pub fn install<P: PageHost>(host: &P, noise: &Rc<Noise>) -> CapResult<()> {
    let inner = host.canvas().ok_or(CapabilityError::Unavailable("HTMLCanvasElement"))?;
    host.set_canvas(Rc::new(NoisyCanvas::new(inner, Rc::clone(noise))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn successive_reads_differ() {
        let page = FakePage::new();
        page.add_canvas(1, 8, 8, 128);
        install(&page, &Rc::new(Noise::seeded(1))).unwrap();

        let canvas = page.canvas().unwrap();
        let first = canvas.get_image_data(&1, 0, 0, 8, 8).unwrap();
        let second = canvas.get_image_data(&1, 0, 0, 8, 8).unwrap();
        assert_ne!(first.data, second.data);
        for (a, b) in first.data.iter().zip(page.bitmap(1).data.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn exports_perturb_before_encoding() {
        let page = FakePage::new();
        page.add_canvas(2, 4, 4, 50);
        let before = page.bitmap(2);
        install(&page, &Rc::new(Noise::seeded(2))).unwrap();

        let canvas = page.canvas().unwrap();
        let url_a = canvas.to_data_url(&2, &[]).unwrap();
        let url_b = canvas.to_data_url(&2, &[]).unwrap();
        assert_ne!(url_a, url_b);
        assert_ne!(page.bitmap(2), before);

        let blob = canvas.to_blob(&2, &["image/png".to_string()]).unwrap();
        assert!(blob.starts_with("blob:image/png:"));
    }

    #[test]
    fn empty_canvas_exports_untouched() {
        let page = FakePage::new();
        page.add_canvas(3, 0, 0, 0);
        install(&page, &Rc::new(Noise::seeded(3))).unwrap();
        let url = page.canvas().unwrap().to_data_url(&3, &[]).unwrap();
        assert_eq!(url, "data:image/png;base64,");
    }

    #[test]
    fn missing_canvas_api_is_reported() {
        let page = FakePage::bare();
        let err = install(&page, &Rc::new(Noise::seeded(4))).unwrap_err();
        assert_eq!(err, CapabilityError::Unavailable("HTMLCanvasElement"));
    }
}
