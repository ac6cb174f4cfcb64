//! Seed handling for noise generation
//!
//! Terrain seeds are strings. They are folded into an integer by summing their
//! bytes, which is a weak hash (anagrams collide) but keeps existing worlds
//! reproducible. The integer then seeds a ChaCha stream that places one sample
//! offset per octave.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Range that octave offsets are drawn from (half-open).
pub const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Fold a string seed into an integer by summing its byte values.
pub fn seed_to_int(seed: &str) -> u64 {
    seed.bytes().map(u64::from).sum()
}

/// Per-octave sample offsets, derived once per generation call.
///
/// `world_offset` is added on the x axis and subtracted on the y axis because
/// grid rows run opposite to world +y.
pub fn octave_offsets(seed: &str, octaves: usize, world_offset: (f64, f64)) -> Vec<(f64, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed_to_int(seed));
    (0..octaves)
        .map(|_| {
            let ox = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64 + world_offset.0;
            let oy = rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f64 - world_offset.1;
            (ox, oy)
        })
        .collect()
}
