//! Radial falloff mask
//!
//! Suppresses height toward the edges of a square so each chunk reads as an
//! island. Distance is Chebyshev (max of |x|, |y|), so the land mass is square
//! rather than round.

use std::sync::Arc;

use crate::heightfield::HeightField;

/// Shape curve `v^a / (v^a + (b - b*v)^a)`.
///
/// `a` (transition) sharpens the land/ocean edge; `b` (deadzone) controls how far
/// out the map stays at full height before suppression starts.
pub fn evaluate(value: f32, transition: f32, deadzone: f32) -> f32 {
    let a = transition;
    let b = deadzone;
    let num = value.powf(a);
    let denom = num + (b - b * value).powf(a);
    if denom <= 0.0 {
        // v == 0 and a != 0, or both terms vanished: nothing to suppress.
        return 0.0;
    }
    num / denom
}

/// Generate a `size` x `size` falloff mask with values in [0,1].
pub fn generate(size: usize, transition: f32, deadzone: f32) -> HeightField {
    let mut mask = HeightField::new_with(size, 0, 0.0);
    for y in 0..size {
        for x in 0..size {
            let nx = x as f32 / size as f32 * 2.0 - 1.0;
            let ny = y as f32 / size as f32 * 2.0 - 1.0;
            let value = nx.abs().max(ny.abs());
            mask.set(x, y, evaluate(value, transition, deadzone).clamp(0.0, 1.0));
        }
    }
    mask
}

/// Parameters a mask was generated for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FalloffKey {
    pub size: usize,
    pub transition: f32,
    pub deadzone: f32,
}

/// Owned cache of the last generated mask.
///
/// The mask depends only on its key, so it is reused until a request with a
/// different key arrives or [`FalloffCache::invalidate`] is called.
#[derive(Debug, Default)]
pub struct FalloffCache {
    entry: Option<(FalloffKey, Arc<HeightField>)>,
}

impl FalloffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_generate(&mut self, size: usize, transition: f32, deadzone: f32) -> Arc<HeightField> {
        let key = FalloffKey { size, transition, deadzone };
        if let Some((cached_key, mask)) = &self.entry {
            if *cached_key == key {
                log::debug!("falloff cache hit for {:?}", key);
                return Arc::clone(mask);
            }
        }
        log::debug!("falloff cache miss, generating {:?}", key);
        let mask = Arc::new(generate(size, transition, deadzone));
        self.entry = Some((key, Arc::clone(&mask)));
        mask
    }

    pub fn key(&self) -> Option<FalloffKey> {
        self.entry.as_ref().map(|(key, _)| *key)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
