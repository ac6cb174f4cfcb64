//! Shared generation state handed to background workers.

use std::sync::Arc;

use crate::compositor::{HeightFieldCompositor, MapData};
use crate::error::Result;
use crate::falloff::FalloffCache;
use crate::heightfield::HeightField;
use crate::mesh::{TerrainMesh, TerrainMeshBuilder};
use crate::settings::{ChunkMetrics, TerrainSettings};

/// Compositor and mesh builder for one validated configuration.
///
/// Immutable after construction; workers share it through an `Arc`.
#[derive(Debug)]
pub struct TerrainGenerator {
    compositor: HeightFieldCompositor,
    mesh_builder: TerrainMeshBuilder,
}

impl TerrainGenerator {
    /// Clamp and validate `settings`, then build the generation pipeline.
    pub fn new(settings: &TerrainSettings, falloff_cache: &mut FalloffCache) -> Result<Self> {
        let settings = settings.validated();
        settings.validate()?;
        let mesh_builder = TerrainMeshBuilder::from_settings(&settings);
        let compositor = HeightFieldCompositor::new(Arc::new(settings), falloff_cache);
        Ok(Self { compositor, mesh_builder })
    }

    pub fn settings(&self) -> &TerrainSettings {
        self.compositor.settings()
    }

    pub fn metrics(&self) -> ChunkMetrics {
        self.compositor.metrics()
    }

    pub fn lod_count(&self) -> usize {
        self.settings().lod.len()
    }

    pub fn map_data(&self, chunk_center: (f32, f32), lod: usize) -> MapData {
        self.compositor.build(chunk_center, lod)
    }

    pub fn mesh(&self, field: &HeightField, lod: usize) -> Result<TerrainMesh> {
        self.mesh_builder.build(field, lod)
    }
}
