//! Level-of-detail table
//!
//! Each level maps to a vertex stride (1 = full resolution) and to the distance
//! up to which that level is used. Both columns increase with the level index and
//! the last threshold is the global view distance.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// One level of detail.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Vertex skip factor
    pub stride: usize,
    /// Distance (grid units, measured to the chunk bounds) up to which this level is used
    pub visible_distance: f32,
    /// Whether this level's mesh is also fetched for collision
    #[serde(default)]
    pub collision: bool,
}

/// Ordered LOD table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodTable {
    pub levels: Vec<LodLevel>,
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: vec![
                LodLevel { stride: 1, visible_distance: 200.0, collision: true },
                LodLevel { stride: 2, visible_distance: 400.0, collision: false },
                LodLevel { stride: 4, visible_distance: 600.0, collision: false },
                LodLevel { stride: 8, visible_distance: 800.0, collision: false },
            ],
        }
    }
}

impl LodTable {
    pub fn new(levels: Vec<LodLevel>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Vertex stride for `lod`. Panics when `lod` is outside the table.
    pub fn stride(&self, lod: usize) -> usize {
        self.levels[lod].stride
    }

    pub fn threshold(&self, lod: usize) -> f32 {
        self.levels[lod].visible_distance
    }

    /// Largest stride in the table; used as the shared border width.
    pub fn max_stride(&self) -> usize {
        self.levels.iter().map(|l| l.stride).max().unwrap_or(1)
    }

    /// The last threshold, which bounds visibility.
    pub fn max_view_distance(&self) -> f32 {
        self.levels.last().map(|l| l.visible_distance).unwrap_or(0.0)
    }

    /// The level flagged for collision, if any.
    pub fn collision_lod(&self) -> Option<usize> {
        self.levels.iter().position(|l| l.collision)
    }

    /// Lowest index whose threshold is at least `distance`, or the coarsest level.
    pub fn select(&self, distance: f32) -> usize {
        self.levels
            .iter()
            .position(|l| l.visible_distance >= distance)
            .unwrap_or(self.levels.len().saturating_sub(1))
    }

    /// Check ordering and that every stride tiles a chunk of `chunk_size` cells.
    pub fn validate(&self, chunk_size: usize) -> Result<()> {
        if self.levels.is_empty() {
            return Err(TerrainError::InvalidSettings("LOD table is empty".into()));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if level.stride == 0 {
                return Err(TerrainError::InvalidSettings(format!("LOD {} has stride 0", i)));
            }
            if chunk_size % level.stride != 0 {
                return Err(TerrainError::InvalidSettings(format!(
                    "LOD {} stride {} does not divide chunk size {}",
                    i, level.stride, chunk_size
                )));
            }
            if !(level.visible_distance > 0.0) {
                return Err(TerrainError::InvalidSettings(format!(
                    "LOD {} threshold must be positive, got {}",
                    i, level.visible_distance
                )));
            }
        }
        for (i, pair) in self.levels.windows(2).enumerate() {
            if pair[1].stride <= pair[0].stride {
                return Err(TerrainError::InvalidSettings(format!(
                    "LOD strides must increase (LOD {} -> {})",
                    i,
                    i + 1
                )));
            }
            if pair[1].visible_distance <= pair[0].visible_distance {
                return Err(TerrainError::InvalidSettings(format!(
                    "LOD thresholds must increase (LOD {} -> {})",
                    i,
                    i + 1
                )));
            }
        }
        if self.levels.iter().filter(|l| l.collision).count() > 1 {
            return Err(TerrainError::InvalidSettings("at most one LOD may be used for collision".into()));
        }
        Ok(())
    }
}
