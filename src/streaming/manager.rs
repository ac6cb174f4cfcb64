use std::collections::HashMap;
use std::sync::Arc;

use crate::compositor::MapData;
use crate::error::Result;
use crate::falloff::FalloffCache;
use crate::generator::TerrainGenerator;
use crate::lod::LodTable;
use crate::mesh::TerrainMesh;
use crate::scheduler::GenerationScheduler;
use crate::settings::TerrainSettings;

use super::chunk::{ChunkCoord, ChunkRecord};
use super::viewer::ViewerState;

/// Tracked chunks plus the ones touched by deliveries since the last tick.
///
/// This is the context scheduler callbacks run against.
#[derive(Debug, Default)]
pub struct ChunkTable {
    chunks: HashMap<ChunkCoord, ChunkRecord>,
    dirty: Vec<ChunkCoord>,
}

impl ChunkTable {
    fn receive_map_data(&mut self, coord: ChunkCoord, data: MapData) {
        if let Some(record) = self.chunks.get_mut(&coord) {
            record.store_map_data(data);
            self.dirty.push(coord);
        }
    }

    fn receive_mesh(&mut self, coord: ChunkCoord, mesh: TerrainMesh) {
        if let Some(record) = self.chunks.get_mut(&coord) {
            record.store_mesh(mesh);
            self.dirty.push(coord);
        }
    }

    fn take_dirty(&mut self) -> Vec<ChunkCoord> {
        let mut dirty = std::mem::take(&mut self.dirty);
        dirty.sort();
        dirty.dedup();
        dirty
    }
}

/// What one [`TerrainStreamer::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A visibility pass ran this tick
    pub recomputed: bool,
    pub height_fields_delivered: usize,
    pub meshes_delivered: usize,
    pub requests_issued: usize,
}

/// Keeps chunks around the viewer generated at the right LOD.
pub struct TerrainStreamer {
    scheduler: GenerationScheduler<ChunkTable>,
    table: ChunkTable,
    viewer: ViewerState,
    visible_last_update: Vec<ChunkCoord>,
    lod: LodTable,
    chunk_size: usize,
    terrain_scale: f32,
    chunks_visible: i32,
}

impl TerrainStreamer {
    pub fn new(settings: &TerrainSettings) -> Result<Self> {
        let generator = TerrainGenerator::new(settings, &mut FalloffCache::new())?;
        Self::with_generator(Arc::new(generator))
    }

    pub fn with_generator(generator: Arc<TerrainGenerator>) -> Result<Self> {
        let settings = generator.settings();
        let metrics = generator.metrics();
        let lod = settings.lod.clone();
        let viewer = ViewerState::new(settings.viewer_move_threshold());
        let terrain_scale = settings.height.terrain_scale;
        let chunks_visible = (lod.max_view_distance() / metrics.chunk_size as f32).round() as i32;
        let worker_threads = settings.streaming.worker_threads;

        log::info!(
            "streaming {}-unit chunks, {} chunks visible in each direction",
            metrics.chunk_size,
            chunks_visible
        );

        Ok(Self {
            scheduler: GenerationScheduler::new(generator, worker_threads)?,
            table: ChunkTable::default(),
            viewer,
            visible_last_update: Vec::new(),
            lod,
            chunk_size: metrics.chunk_size,
            terrain_scale,
            chunks_visible,
        })
    }

    /// Viewer position in world units.
    pub fn set_viewer_position(&mut self, position: (f32, f32)) {
        self.viewer
            .set_position((position.0 / self.terrain_scale, position.1 / self.terrain_scale));
    }

    /// Viewer position in grid units.
    pub fn viewer_position(&self) -> (f32, f32) {
        self.viewer.position()
    }

    /// Deliver finished work, then re-evaluate chunks if the viewer moved far enough.
    pub fn tick(&mut self) -> TickReport {
        let issued_before = self.scheduler.issued();
        let delivered = self.scheduler.tick(&mut self.table);
        for coord in self.table.take_dirty() {
            self.refresh_chunk(coord);
        }

        let recomputed = self.viewer.should_update();
        if recomputed {
            self.viewer.mark_updated();
            self.update_visible_chunks();
        }

        TickReport {
            recomputed,
            height_fields_delivered: delivered.height_fields,
            meshes_delivered: delivered.meshes,
            requests_issued: self.scheduler.issued() - issued_before,
        }
    }

    fn update_visible_chunks(&mut self) {
        for coord in std::mem::take(&mut self.visible_last_update) {
            if let Some(record) = self.table.chunks.get_mut(&coord) {
                record.set_visible(false);
            }
        }

        let center = ChunkCoord::nearest(self.viewer.position(), self.chunk_size);
        log::debug!(
            "visibility pass around chunk ({}, {}), {} chunks tracked",
            center.x,
            center.y,
            self.table.chunks.len()
        );

        let n = self.chunks_visible;
        for dy in -n..=n {
            for dx in -n..=n {
                let coord = center.offset(dx, dy);
                if !self.table.chunks.contains_key(&coord) {
                    self.create_chunk(coord);
                }
                self.refresh_chunk(coord);
            }
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        let mut record = ChunkRecord::new(coord, self.chunk_size, &self.lod);
        record.mark_height_field_requested();
        self.table.chunks.insert(coord, record);
        log::debug!("tracking chunk ({}, {})", coord.x, coord.y);

        self.scheduler
            .request_height_field(coord.center(self.chunk_size), 0, move |table: &mut ChunkTable, data| {
                table.receive_map_data(coord, data)
            });
    }

    fn refresh_chunk(&mut self, coord: ChunkCoord) {
        let Some(record) = self.table.chunks.get_mut(&coord) else {
            return;
        };
        let was_visible = record.is_visible();
        let requests = record.refresh(self.viewer.position(), &self.lod);
        if record.is_visible() && !was_visible {
            self.visible_last_update.push(coord);
        }

        let Some(field) = record.map_data().map(|data| Arc::clone(&data.height_field)) else {
            return;
        };
        for lod in requests {
            self.scheduler
                .request_mesh(Arc::clone(&field), lod, move |table: &mut ChunkTable, mesh| {
                    table.receive_mesh(coord, mesh)
                });
        }
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.table.chunks.get(&coord)
    }

    /// Every chunk ever created, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.table.chunks.values()
    }

    pub fn visible_chunks(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.chunks().filter(|record| record.is_visible())
    }

    pub fn tracked_count(&self) -> usize {
        self.table.chunks.len()
    }

    /// No work running and nothing waiting for delivery.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn scheduler(&self) -> &GenerationScheduler<ChunkTable> {
        &self.scheduler
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn terrain_scale(&self) -> f32 {
        self.terrain_scale
    }

    pub fn chunks_visible(&self) -> i32 {
        self.chunks_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::LodLevel;
    use crate::streaming::ChunkState;
    use std::time::Duration;

    fn settings() -> TerrainSettings {
        let mut settings = TerrainSettings::default();
        settings.streaming.vertices_per_line = 13;
        settings.streaming.worker_threads = Some(2);
        settings.noise.octaves = 2;
        settings.lod = LodTable::new(vec![
            LodLevel { stride: 1, visible_distance: 4.0, collision: false },
            LodLevel { stride: 2, visible_distance: 8.0, collision: false },
            LodLevel { stride: 4, visible_distance: 12.0, collision: false },
        ]);
        settings
    }

    /// Tick until all work is delivered.
    fn settle(streamer: &mut TerrainStreamer) {
        for _ in 0..100 {
            assert!(streamer.scheduler().wait_for_workers(Duration::from_secs(10)));
            streamer.tick();
            if streamer.is_idle() {
                return;
            }
        }
        panic!("streamer did not settle");
    }

    #[test]
    fn test_first_tick_tracks_window() {
        let mut streamer = TerrainStreamer::new(&settings()).unwrap();
        assert_eq!(streamer.chunks_visible(), 1);
        let report = streamer.tick();
        assert!(report.recomputed);
        assert_eq!(streamer.tracked_count(), 9);
        assert_eq!(report.requests_issued, 9);
        for record in streamer.chunks() {
            assert_eq!(record.state(), ChunkState::AwaitingHeightField);
        }
    }

    #[test]
    fn test_settles_to_ready() {
        let mut streamer = TerrainStreamer::new(&settings()).unwrap();
        streamer.tick();
        settle(&mut streamer);

        // Standing in the centre chunk: full detail there, coarser for the corners.
        let center = streamer.chunk(ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(center.state(), ChunkState::Ready(0));
        assert_eq!(center.mesh().map(|m| m.vertex_count()), Some(13 * 13));
        let edge = streamer.chunk(ChunkCoord::new(1, 0)).unwrap();
        assert_eq!(edge.state(), ChunkState::Ready(1));
        let corner = streamer.chunk(ChunkCoord::new(1, 1)).unwrap();
        assert_eq!(corner.state(), ChunkState::Ready(2));
        assert_eq!(streamer.visible_chunks().count(), 9);
    }

    #[test]
    fn test_small_moves_do_not_recompute() {
        let mut streamer = TerrainStreamer::new(&settings()).unwrap();
        streamer.tick();
        // Default threshold is a quarter chunk (3 units).
        streamer.set_viewer_position((2.0, 0.0));
        assert!(!streamer.tick().recomputed);
        streamer.set_viewer_position((3.0, 0.0));
        assert!(streamer.tick().recomputed);
    }

    #[test]
    fn test_terrain_scale_divides_viewer_position() {
        let mut settings = settings();
        settings.height.terrain_scale = 2.0;
        let mut streamer = TerrainStreamer::new(&settings).unwrap();
        streamer.set_viewer_position((24.0, -8.0));
        assert_eq!(streamer.viewer_position(), (12.0, -4.0));
        streamer.tick();
        assert!(streamer.chunk(ChunkCoord::new(2, 0)).is_some());
        let record = streamer.chunk(ChunkCoord::new(1, 0)).unwrap();
        assert_eq!(record.world_position(streamer.chunk_size(), streamer.terrain_scale()), (24.0, 0.0));
    }

    #[test]
    fn test_collision_mesh_fetched() {
        let mut settings = settings();
        settings.lod.levels[1].collision = true;
        let mut streamer = TerrainStreamer::new(&settings).unwrap();
        streamer.tick();
        settle(&mut streamer);
        // Centre chunk renders LOD 0 but also holds the LOD 1 collision mesh.
        let center = streamer.chunk(ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(center.displayed_lod(), Some(0));
        assert_eq!(center.collision_mesh().map(|m| m.lod), Some(1));
    }
}
