//! Fractal noise field generation
//!
//! Sums octaves of 2D Perlin noise over a grid. Sample positions depend only on
//! the cell's absolute position (grid position plus world offset) and the seed,
//! so adjacent chunks sampling the same world coordinate get the same raw value.
//! Each call owns all of its state and can run concurrently with other calls.

use noise::{NoiseFn, Perlin};
use rayon::prelude::*;

use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::seeds;
use crate::settings::{NoiseSettings, NormalizeMode, MAX_OCTAVES, MIN_NOISE_SCALE};

/// Permutation seed for the Perlin table. Seed strings vary the field through
/// octave offsets instead, so this stays fixed.
const PERMUTATION_SEED: u32 = 0;

/// A rectangular noise grid, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl NoiseMap {
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Convert a square map into a height field with `border` cells of border.
    pub fn into_height_field(self, border: usize) -> Result<HeightField> {
        if self.width != self.height {
            return Err(TerrainError::FieldSize { expected: self.width, actual: self.height });
        }
        Ok(HeightField::from_vec(self.width, border, self.values))
    }
}

/// Sum of the octave amplitude series, the largest magnitude a sample can reach.
pub fn max_possible_height(octaves: usize, persistence: f32) -> f64 {
    let persistence = persistence as f64;
    let mut amplitude = 1.0;
    let mut total = 0.0;
    for _ in 0..octaves {
        total += amplitude;
        amplitude *= persistence;
    }
    total
}

/// Generate a `width` x `height` noise map.
///
/// `world_offset` shifts the sampling window; `settings.offset` is not applied
/// here (the compositor folds it into `world_offset`). A non-positive scale is
/// clamped to a small epsilon and the octave count is clamped to `1..=30`.
pub fn generate(width: usize, height: usize, settings: &NoiseSettings, world_offset: (f32, f32)) -> NoiseMap {
    if width == 0 || height == 0 {
        return NoiseMap { width, height, values: Vec::new() };
    }

    let scale = if settings.scale > 0.0 { settings.scale as f64 } else { MIN_NOISE_SCALE as f64 };
    let octaves = settings.octaves.clamp(1, MAX_OCTAVES);
    let persistence = settings.persistence as f64;
    let lacunarity = settings.lacunarity.max(1.0) as f64;
    let offsets = seeds::octave_offsets(
        &settings.seed,
        octaves,
        (world_offset.0 as f64, world_offset.1 as f64),
    );

    let perlin = Perlin::new(PERMUTATION_SEED);
    // Scale around the map centre rather than its corner.
    let half_width = (width / 2) as f64;
    let half_height = (height / 2) as f64;

    let mut raw = vec![0.0f64; width * height];
    raw.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, cell) in row.iter_mut().enumerate() {
            let mut amplitude = 1.0;
            let mut frequency = 1.0;
            let mut noise_height = 0.0;

            for &(ox, oy) in &offsets {
                let sample_x = (x as f64 - half_width + ox) / scale * frequency;
                let sample_y = (y as f64 - half_height + oy) / scale * frequency;

                let value = unit_perlin(&perlin, sample_x, sample_y);
                // Stretch to roughly [-1, 2] so octaves can also lower the height.
                noise_height += (value + value * 2.0 - 1.0) * amplitude;

                amplitude *= persistence;
                frequency *= lacunarity;
            }
            *cell = noise_height;
        }
    });

    let values = match settings.normalize_mode {
        NormalizeMode::Local => {
            let (min, max) = raw
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            raw.iter().map(|&v| inverse_lerp(min, max, v) as f32).collect()
        }
        NormalizeMode::Global => {
            let correction = if settings.global_correction > 0.0 {
                settings.global_correction as f64
            } else {
                crate::settings::GLOBAL_NORMALIZE_CORRECTION as f64
            };
            let bound = 2.0 * max_possible_height(octaves, settings.persistence) / correction;
            raw.iter().map(|&v| ((v + 1.0) / bound).max(0.0) as f32).collect()
        }
    };

    NoiseMap { width, height, values }
}

/// Perlin noise remapped from [-1,1] to [0,1].
fn unit_perlin(perlin: &Perlin, x: f64, y: f64) -> f64 {
    ((perlin.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0)
}

fn inverse_lerp(a: f64, b: f64, v: f64) -> f64 {
    if (b - a).abs() < f64::EPSILON {
        0.0
    } else {
        ((v - a) / (b - a)).clamp(0.0, 1.0)
    }
}
