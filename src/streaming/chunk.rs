//! Chunk records and their lifecycle

use crate::compositor::MapData;
use crate::lod::LodTable;
use crate::mesh::TerrainMesh;

/// Integer chunk grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk whose centre is nearest to `position` (grid units).
    pub fn nearest(position: (f32, f32), chunk_size: usize) -> Self {
        let size = chunk_size as f32;
        Self {
            x: (position.0 / size).round() as i32,
            y: (position.1 / size).round() as i32,
        }
    }

    /// Chunk centre in grid units.
    pub fn center(&self, chunk_size: usize) -> (f32, f32) {
        let size = chunk_size as f32;
        (self.x as f32 * size, self.y as f32 * size)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned square covered by a chunk, in grid units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkBounds {
    pub min: (f32, f32),
    pub max: (f32, f32),
}

impl ChunkBounds {
    pub fn around(center: (f32, f32), size: f32) -> Self {
        let half = size / 2.0;
        Self {
            min: (center.0 - half, center.1 - half),
            max: (center.0 + half, center.1 + half),
        }
    }

    pub fn sqr_distance(&self, point: (f32, f32)) -> f32 {
        let dx = (self.min.0 - point.0).max(0.0).max(point.0 - self.max.0);
        let dy = (self.min.1 - point.1).max(0.0).max(point.1 - self.max.1);
        dx * dx + dy * dy
    }

    /// Distance from `point` to the nearest point of the square; zero inside.
    pub fn distance(&self, point: (f32, f32)) -> f32 {
        self.sqr_distance(point).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// No height field requested yet
    Unloaded,
    AwaitingHeightField,
    /// Waiting for the mesh of this LOD
    AwaitingMesh(usize),
    /// Displaying the mesh of this LOD
    Ready(usize),
    /// Outside view distance; data is kept
    Hidden,
}

/// Per-LOD mesh cache entry.
#[derive(Clone, Debug, Default)]
struct LodSlot {
    requested: bool,
    mesh: Option<TerrainMesh>,
}

/// One tracked chunk. Records are never removed once created.
#[derive(Debug)]
pub struct ChunkRecord {
    pub coord: ChunkCoord,
    pub bounds: ChunkBounds,
    map_data: Option<MapData>,
    height_field_requested: bool,
    slots: Vec<LodSlot>,
    target_lod: Option<usize>,
    displayed_lod: Option<usize>,
    collision_lod: Option<usize>,
    visible: bool,
}

impl ChunkRecord {
    pub fn new(coord: ChunkCoord, chunk_size: usize, lod: &LodTable) -> Self {
        Self {
            coord,
            bounds: ChunkBounds::around(coord.center(chunk_size), chunk_size as f32),
            map_data: None,
            height_field_requested: false,
            slots: vec![LodSlot::default(); lod.len()],
            target_lod: None,
            displayed_lod: None,
            collision_lod: lod.collision_lod(),
            visible: false,
        }
    }

    pub fn state(&self) -> ChunkState {
        if !self.height_field_requested {
            return ChunkState::Unloaded;
        }
        if !self.visible {
            return ChunkState::Hidden;
        }
        if self.map_data.is_none() {
            return ChunkState::AwaitingHeightField;
        }
        match (self.target_lod, self.displayed_lod) {
            (Some(target), Some(shown)) if target == shown => ChunkState::Ready(shown),
            (Some(target), _) => ChunkState::AwaitingMesh(target),
            (None, _) => ChunkState::AwaitingHeightField,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn map_data(&self) -> Option<&MapData> {
        self.map_data.as_ref()
    }

    /// Mesh currently shown, which may lag behind the target LOD.
    pub fn mesh(&self) -> Option<&TerrainMesh> {
        self.displayed_lod.and_then(|lod| self.mesh_at(lod))
    }

    pub fn displayed_lod(&self) -> Option<usize> {
        self.displayed_lod
    }

    pub fn mesh_at(&self, lod: usize) -> Option<&TerrainMesh> {
        self.slots.get(lod).and_then(|slot| slot.mesh.as_ref())
    }

    pub fn collision_mesh(&self) -> Option<&TerrainMesh> {
        self.collision_lod.and_then(|lod| self.mesh_at(lod))
    }

    pub fn cached_lods(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.mesh.is_some())
            .map(|(lod, _)| lod)
    }

    /// Chunk centre scaled into world space.
    pub fn world_position(&self, chunk_size: usize, terrain_scale: f32) -> (f32, f32) {
        let (x, y) = self.coord.center(chunk_size);
        (x * terrain_scale, y * terrain_scale)
    }

    pub(crate) fn mark_height_field_requested(&mut self) {
        self.height_field_requested = true;
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn store_map_data(&mut self, data: MapData) {
        self.map_data = Some(data);
    }

    pub(crate) fn store_mesh(&mut self, mesh: TerrainMesh) {
        let lod = mesh.lod;
        if let Some(slot) = self.slots.get_mut(lod) {
            slot.mesh = Some(mesh);
        }
    }

    /// Re-evaluate visibility and LOD against `viewer`.
    ///
    /// Swaps in a cached mesh when the target LOD changes and returns the LODs
    /// whose meshes must be requested. A LOD is returned at most once over the
    /// life of the record. Nothing is requested before the height field exists.
    pub(crate) fn refresh(&mut self, viewer: (f32, f32), lod: &LodTable) -> Vec<usize> {
        let distance = self.bounds.distance(viewer);
        self.visible = distance <= lod.max_view_distance();
        let mut requests = Vec::new();
        if !self.visible {
            return requests;
        }

        let target = lod.select(distance);
        self.target_lod = Some(target);
        if self.map_data.is_none() {
            return requests;
        }

        if self.displayed_lod != Some(target) {
            if self.slots[target].mesh.is_some() {
                self.displayed_lod = Some(target);
            } else if !self.slots[target].requested {
                self.slots[target].requested = true;
                requests.push(target);
            }
        }

        if let Some(collision) = self.collision_lod {
            if distance <= lod.threshold(collision) && !self.slots[collision].requested {
                self.slots[collision].requested = true;
                requests.push(collision);
            }
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::ColorMap;
    use crate::heightfield::HeightField;
    use crate::lod::LodLevel;
    use std::sync::Arc;

    fn table() -> LodTable {
        LodTable::new(vec![
            LodLevel { stride: 1, visible_distance: 4.0, collision: true },
            LodLevel { stride: 2, visible_distance: 8.0, collision: false },
            LodLevel { stride: 4, visible_distance: 12.0, collision: false },
        ])
    }

    fn map_data() -> MapData {
        MapData {
            height_field: Arc::new(HeightField::new_with(21, 4, 0.0)),
            colors: ColorMap { size: 0, colors: Vec::new() },
            lod: 0,
        }
    }

    fn mesh(lod: usize) -> TerrainMesh {
        TerrainMesh { lod, ..TerrainMesh::default() }
    }

    fn loaded_record() -> ChunkRecord {
        let mut record = ChunkRecord::new(ChunkCoord::new(0, 0), 12, &table());
        record.mark_height_field_requested();
        record.store_map_data(map_data());
        record
    }

    #[test]
    fn test_nearest_coord_rounds() {
        assert_eq!(ChunkCoord::nearest((5.9, -6.1), 12), ChunkCoord::new(0, -1));
        assert_eq!(ChunkCoord::nearest((6.1, 17.0), 12), ChunkCoord::new(1, 1));
        assert_eq!(ChunkCoord::new(-2, 3).center(12), (-24.0, 36.0));
    }

    #[test]
    fn test_bounds_distance() {
        let bounds = ChunkBounds::around((0.0, 0.0), 12.0);
        assert_eq!(bounds.distance((3.0, -2.0)), 0.0);
        assert_eq!(bounds.distance((10.0, 0.0)), 4.0);
        assert_eq!(bounds.distance((9.0, 10.0)), 5.0);
    }

    #[test]
    fn test_lifecycle_states() {
        let lod = table();
        let mut record = ChunkRecord::new(ChunkCoord::new(0, 0), 12, &lod);
        assert_eq!(record.state(), ChunkState::Unloaded);

        record.mark_height_field_requested();
        assert!(record.refresh((0.0, 0.0), &lod).is_empty());
        assert_eq!(record.state(), ChunkState::AwaitingHeightField);

        record.store_map_data(map_data());
        assert_eq!(record.refresh((0.0, 0.0), &lod), vec![0]);
        assert_eq!(record.state(), ChunkState::AwaitingMesh(0));

        record.store_mesh(mesh(0));
        assert!(record.refresh((0.0, 0.0), &lod).is_empty());
        assert_eq!(record.state(), ChunkState::Ready(0));
        assert_eq!(record.collision_mesh().map(|m| m.lod), Some(0));

        record.refresh((100.0, 0.0), &lod);
        assert_eq!(record.state(), ChunkState::Hidden);
        assert!(record.mesh().is_some());
    }

    #[test]
    fn test_lod_follows_distance() {
        let lod = table();
        let mut record = loaded_record();
        // 10 from the centre is 4 from the edge: still LOD 0.
        assert_eq!(record.refresh((10.0, 0.0), &lod), vec![0]);
        // 6 from the edge: LOD 1. Collision mesh already requested.
        assert_eq!(record.refresh((12.0, 0.0), &lod), vec![1]);
        assert_eq!(record.state(), ChunkState::AwaitingMesh(1));
    }

    #[test]
    fn test_cached_mesh_is_not_requested_again() {
        let lod = table();
        let mut record = loaded_record();
        assert_eq!(record.refresh((15.0, 0.0), &lod), vec![2]);
        record.store_mesh(mesh(2));
        assert!(record.refresh((15.0, 0.0), &lod).is_empty());
        assert_eq!(record.state(), ChunkState::Ready(2));

        assert_eq!(record.refresh((0.0, 0.0), &lod), vec![0]);
        record.store_mesh(mesh(0));
        record.refresh((0.0, 0.0), &lod);

        // Back out to LOD 2: swapped in from the cache with no new request.
        assert!(record.refresh((15.0, 0.0), &lod).is_empty());
        assert_eq!(record.state(), ChunkState::Ready(2));
        assert_eq!(record.cached_lods().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_pending_request_is_not_duplicated() {
        let lod = table();
        let mut record = loaded_record();
        assert_eq!(record.refresh((0.0, 0.0), &lod), vec![0]);
        assert!(record.refresh((1.0, 0.0), &lod).is_empty());
        assert!(record.refresh((0.0, 1.0), &lod).is_empty());
    }

    #[test]
    fn test_collision_requested_independently() {
        let lod = table();
        let mut record = loaded_record();
        record.refresh((15.0, 0.0), &lod);
        record.store_mesh(mesh(2));
        // Moving to LOD 1 range does not reach the collision threshold.
        assert_eq!(record.refresh((13.0, 0.0), &lod), vec![1]);
        // Inside the LOD 0 threshold: LOD 0 requested once, covering collision too.
        assert_eq!(record.refresh((9.0, 0.0), &lod), vec![0]);
    }
}
