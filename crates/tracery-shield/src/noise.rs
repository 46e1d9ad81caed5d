//! Randomness for countermeasures
//!
//! Unlike a session-seeded PRNG, canvas noise here is drawn fresh on every
//! read so two reads of the same bitmap differ. The generator is seeded from
//! the platform entropy source (`crypto.getRandomValues` in the browser).

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct Noise {
    rng: RefCell<StdRng>,
}

impl Noise {
    pub fn from_entropy() -> Self {
        Self { rng: RefCell::new(StdRng::from_entropy()) }
    }

    /// Reproducible noise for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self { rng: RefCell::new(StdRng::seed_from_u64(seed)) }
    }

    /// -1, 0 or 1
    pub fn unit_delta(&self) -> i32 {
        self.rng.borrow_mut().gen_range(-1..=1)
    }

    /// Uniform in `[0, upper)`.
    pub fn offset(&self, upper: f64) -> f64 {
        self.rng.borrow_mut().gen_range(0.0..upper)
    }

    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng.borrow_mut().gen_range(0..items.len());
        items.get(index)
    }

    /// Perturb every RGB channel of an RGBA buffer by a fresh unit delta.
    /// Alpha is left alone.
    pub fn perturb_pixels(&self, data: &mut [u8]) {
        let mut rng = self.rng.borrow_mut();
        for pixel in data.chunks_mut(4) {
            for channel in pixel.iter_mut().take(3) {
                let delta: i32 = rng.gen_range(-1..=1);
                *channel = (*channel as i32 + delta).clamp(0, 255) as u8;
            }
        }
    }
}

impl std::fmt::Debug for Noise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Noise").finish_non_exhaustive()
    }
}
