//! Height field composition
//!
//! Builds the bordered height field for one chunk: fractal noise sampled at the
//! chunk's world position, optionally shaped by the falloff mask, plus the
//! terrain-band colour buffer for the requested LOD.

use std::sync::Arc;

use crate::falloff::FalloffCache;
use crate::heightfield::HeightField;
use crate::noise_field;
use crate::settings::{ChunkMetrics, TerrainBand, TerrainSettings};

/// Per-cell terrain colours; `None` where no band's threshold is reached.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    pub size: usize,
    pub colors: Vec<Option<[u8; 3]>>,
}

impl ColorMap {
    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        self.colors[y * self.size + x]
    }

    /// Cells that fell below every band threshold.
    pub fn unassigned_count(&self) -> usize {
        self.colors.iter().filter(|c| c.is_none()).count()
    }
}

/// Everything generated for one chunk request.
#[derive(Clone, Debug)]
pub struct MapData {
    pub height_field: Arc<HeightField>,
    pub colors: ColorMap,
    /// LOD the colour buffer was sampled at
    pub lod: usize,
}

/// Colour of the highest band whose threshold does not exceed `height`.
///
/// Bands are scanned from the last (highest) down, so equal thresholds resolve
/// to the later band.
pub fn classify(height: f32, bands: &[TerrainBand]) -> Option<[u8; 3]> {
    bands.iter().rev().find(|band| band.height <= height).map(|band| band.color)
}

/// Classify the visible region of `field`, sampling every `stride` cells.
pub fn classify_region(field: &HeightField, stride: usize, bands: &[TerrainBand]) -> ColorMap {
    let stride = stride.max(1);
    let interior = field.interior_size();
    let size = if interior == 0 { 0 } else { (interior - 1) / stride + 1 };
    let mut colors = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let h = field.get(field.border + x * stride, field.border + y * stride);
            colors.push(classify(h, bands));
        }
    }
    ColorMap { size, colors }
}

/// Combines noise and falloff into chunk height fields.
///
/// Holds only immutable inputs, so one instance is shared by every worker.
#[derive(Debug)]
pub struct HeightFieldCompositor {
    settings: Arc<TerrainSettings>,
    metrics: ChunkMetrics,
    falloff: Option<Arc<HeightField>>,
}

impl HeightFieldCompositor {
    /// `settings` should already be validated. The falloff mask, when enabled,
    /// is taken from `cache` so rebuilding a compositor with unchanged shape
    /// parameters reuses the existing mask.
    pub fn new(settings: Arc<TerrainSettings>, cache: &mut FalloffCache) -> Self {
        let metrics = settings.metrics();
        let falloff = if settings.height.falloff.enabled {
            let shape = settings.height.falloff;
            Some(cache.get_or_generate(metrics.field_size, shape.transition, shape.deadzone))
        } else {
            None
        };
        Self { settings, metrics, falloff }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn metrics(&self) -> ChunkMetrics {
        self.metrics
    }

    /// Bordered height field centred on `chunk_center` (grid units).
    pub fn height_field(&self, chunk_center: (f32, f32)) -> HeightField {
        let size = self.metrics.field_size;
        let offset = self.settings.noise.offset;
        let noise = noise_field::generate(
            size,
            size,
            &self.settings.noise,
            (chunk_center.0 + offset.0, chunk_center.1 + offset.1),
        );
        let mut field = HeightField::from_vec(size, self.metrics.border, noise.values);

        if let Some(mask) = &self.falloff {
            for y in 0..size {
                for x in 0..size {
                    let value = if field.is_border(x, y) {
                        // Border cells are discarded geometry; keep them out of interior shading.
                        0.0
                    } else {
                        (field.get(x, y) - mask.get(x, y)).clamp(0.0, 1.0)
                    };
                    field.set(x, y, value);
                }
            }
        }
        field
    }

    /// Height field plus colour buffer for `lod`. Panics if `lod` is not in the table.
    pub fn build(&self, chunk_center: (f32, f32), lod: usize) -> MapData {
        let stride = self.settings.lod.stride(lod);
        let field = self.height_field(chunk_center);
        let colors = classify_region(&field, stride, &self.settings.texture.bands);
        MapData {
            height_field: Arc::new(field),
            colors,
            lod,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::{LodLevel, LodTable};
    use crate::settings::NormalizeMode;

    fn small_settings(falloff: bool) -> TerrainSettings {
        let mut settings = TerrainSettings::default();
        settings.streaming.vertices_per_line = 13;
        settings.lod = LodTable::new(vec![
            LodLevel { stride: 1, visible_distance: 12.0, collision: true },
            LodLevel { stride: 2, visible_distance: 24.0, collision: false },
            LodLevel { stride: 4, visible_distance: 36.0, collision: false },
        ]);
        settings.noise.normalize_mode = NormalizeMode::Global;
        settings.noise.scale = 8.0;
        settings.height.falloff.enabled = falloff;
        settings
    }

    fn bands() -> Vec<TerrainBand> {
        vec![
            TerrainBand::new("water", 0.2, [0, 0, 255]),
            TerrainBand::new("grass", 0.5, [0, 255, 0]),
            TerrainBand::new("snow", 0.8, [255, 255, 255]),
        ]
    }

    #[test]
    fn test_classify_bands() {
        let bands = bands();
        assert_eq!(classify(0.1, &bands), None);
        assert_eq!(classify(0.2, &bands), Some([0, 0, 255]));
        assert_eq!(classify(0.6, &bands), Some([0, 255, 0]));
        assert_eq!(classify(0.95, &bands), Some([255, 255, 255]));
        assert_eq!(classify(0.5, &[]), None);
    }

    #[test]
    fn test_classify_ties_resolve_to_higher_band() {
        let bands = vec![
            TerrainBand::new("a", 0.5, [1, 1, 1]),
            TerrainBand::new("b", 0.5, [2, 2, 2]),
        ];
        assert_eq!(classify(0.5, &bands), Some([2, 2, 2]));
    }

    #[test]
    fn test_field_dimensions_share_border() {
        let settings = Arc::new(small_settings(false).validated());
        let compositor = HeightFieldCompositor::new(settings, &mut FalloffCache::new());
        let data = compositor.build((0.0, 0.0), 0);
        assert_eq!(data.height_field.size, 13 + 2 * 4);
        assert_eq!(data.height_field.border, 4);
        assert_eq!(data.colors.size, 13);

        let coarse = compositor.build((0.0, 0.0), 2);
        assert_eq!(coarse.height_field.size, data.height_field.size);
        assert_eq!(coarse.colors.size, 4);
        assert_eq!(coarse.height_field, data.height_field);
    }

    #[test]
    fn test_falloff_zeroes_border_and_clamps_interior() {
        let settings = Arc::new(small_settings(true).validated());
        let compositor = HeightFieldCompositor::new(settings, &mut FalloffCache::new());
        let field = compositor.height_field((0.0, 0.0));
        for (x, y, v) in field.iter() {
            if field.is_border(x, y) {
                assert_eq!(v, 0.0, "border cell ({}, {}) not zeroed", x, y);
            } else {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_falloff_lowers_terrain() {
        let plain = HeightFieldCompositor::new(Arc::new(small_settings(false).validated()), &mut FalloffCache::new())
            .height_field((24.0, 0.0));
        let island = HeightFieldCompositor::new(Arc::new(small_settings(true).validated()), &mut FalloffCache::new())
            .height_field((24.0, 0.0));
        for (x, y, v) in island.iter() {
            assert!(v <= plain.get(x, y).max(0.0) + 1e-6);
        }
    }

    #[test]
    fn test_compositors_share_cached_mask() {
        let mut cache = FalloffCache::new();
        let settings = Arc::new(small_settings(true).validated());
        let _a = HeightFieldCompositor::new(Arc::clone(&settings), &mut cache);
        let key = cache.key();
        let _b = HeightFieldCompositor::new(settings, &mut cache);
        assert_eq!(cache.key(), key);
        assert_eq!(key.map(|k| k.size), Some(21));
    }

    #[test]
    fn test_classify_region_samples_visible_cells() {
        let mut field = HeightField::new_with(7, 2, 0.0);
        field.set(2, 2, 0.9);
        field.set(4, 4, 0.6);
        let map = classify_region(&field, 2, &bands());
        assert_eq!(map.size, 2);
        assert_eq!(map.get(0, 0), Some([255, 255, 255]));
        assert_eq!(map.get(1, 1), Some([0, 255, 0]));
        assert_eq!(map.get(1, 0), None);
        assert_eq!(map.unassigned_count(), 2);
    }
}
