//! Grid mesh construction from bordered height fields

use std::sync::Arc;

use crate::curve::HeightCurve;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::lod::LodTable;
use crate::settings::TerrainSettings;

use super::normals;
use super::TerrainMesh;

/// Index into one of the two vertex arrays of a [`MeshData`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexRef {
    /// Emitted vertex
    Interior(usize),
    /// Border-ring vertex, used only for normals
    Border(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [VertexRef; 3],
}

impl Triangle {
    /// Whether any corner is a border vertex; such triangles are never emitted.
    pub fn touches_border(&self) -> bool {
        self.vertices.iter().any(|v| matches!(v, VertexRef::Border(_)))
    }
}

/// Mesh under construction: interior and border vertices plus every triangle.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub border_positions: Vec<[f32; 3]>,
    /// All triangles in build order, border ones included
    pub triangles: Vec<Triangle>,
    /// Interior vertices per edge
    pub vertices_per_line: usize,
}

impl MeshData {
    pub fn position(&self, vertex: VertexRef) -> [f32; 3] {
        match vertex {
            VertexRef::Interior(i) => self.positions[i],
            VertexRef::Border(i) => self.border_positions[i],
        }
    }

    /// Triangles that are emitted, as interior vertex indices.
    pub fn interior_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles.iter().filter_map(|t| match t.vertices {
            [VertexRef::Interior(a), VertexRef::Interior(b), VertexRef::Interior(c)] => Some([a, b, c]),
            _ => None,
        })
    }

    pub fn border_triangle_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.touches_border()).count()
    }

    /// Compute smooth normals and drop the border ring.
    pub fn into_mesh(self, lod: usize) -> TerrainMesh {
        let normals = normals::smooth_normals(&self);
        let indices = self
            .interior_triangles()
            .flat_map(|tri| tri.map(|i| i as u32))
            .collect();
        TerrainMesh {
            positions: self.positions,
            uvs: self.uvs,
            normals,
            indices,
            lod,
            flat_shaded: false,
        }
    }
}

/// Lay out vertices and triangles for `field` at `stride`.
///
/// The visible region is the field minus its border. One extra ring of vertices,
/// `stride` cells outside the visible edge, becomes the border ring. Positions are
/// centred on the chunk with rows running toward -z.
pub fn build_mesh_data(field: &HeightField, multiplier: f32, curve: &HeightCurve, stride: usize) -> Result<MeshData> {
    let interior = field.interior_size();
    if stride == 0 || field.border < stride {
        return Err(TerrainError::FieldSize {
            expected: interior + 2 * stride.max(1),
            actual: field.size,
        });
    }
    if interior < 2 || (interior - 1) % stride != 0 {
        return Err(TerrainError::InvalidSettings(format!(
            "stride {} does not tile a visible region of {} cells",
            stride, interior
        )));
    }

    let chunk = (interior - 1) as f32;
    let steps = (interior - 1) / stride;
    let line = steps + 3;
    let start = field.border - stride;
    let top_left_x = -chunk / 2.0;
    let top_left_z = chunk / 2.0;

    let mut data = MeshData {
        positions: Vec::with_capacity((steps + 1) * (steps + 1)),
        uvs: Vec::with_capacity((steps + 1) * (steps + 1)),
        border_positions: Vec::with_capacity(4 * (line - 1)),
        triangles: Vec::with_capacity((line - 1) * (line - 1) * 2),
        vertices_per_line: steps + 1,
    };
    let mut refs = Vec::with_capacity(line * line);

    for ky in 0..line {
        for kx in 0..line {
            let gx = (kx as f32 - 1.0) * stride as f32;
            let gy = (ky as f32 - 1.0) * stride as f32;
            let raw = field.get(start + kx * stride, start + ky * stride);
            let position = [top_left_x + gx, curve.evaluate(raw) * multiplier, top_left_z - gy];

            let on_border = kx == 0 || ky == 0 || kx == line - 1 || ky == line - 1;
            if on_border {
                refs.push(VertexRef::Border(data.border_positions.len()));
                data.border_positions.push(position);
            } else {
                refs.push(VertexRef::Interior(data.positions.len()));
                data.positions.push(position);
                data.uvs.push([gx / chunk, gy / chunk]);
            }
        }
    }

    // The last row and column only close quads started by their neighbours.
    for ky in 0..line - 1 {
        for kx in 0..line - 1 {
            let a = refs[ky * line + kx];
            let b = refs[ky * line + kx + 1];
            let c = refs[(ky + 1) * line + kx];
            let d = refs[(ky + 1) * line + kx + 1];
            data.triangles.push(Triangle { vertices: [a, d, c] });
            data.triangles.push(Triangle { vertices: [d, a, b] });
        }
    }

    Ok(data)
}

/// Turns height fields into meshes for any LOD in its table.
#[derive(Clone, Debug)]
pub struct TerrainMeshBuilder {
    pub multiplier: f32,
    pub curve: Arc<HeightCurve>,
    pub flat_shaded: bool,
    pub lod: LodTable,
}

impl TerrainMeshBuilder {
    pub fn from_settings(settings: &TerrainSettings) -> Self {
        Self {
            multiplier: settings.height.multiplier,
            curve: Arc::new(settings.height.curve.clone()),
            flat_shaded: settings.height.flat_shading,
            lod: settings.lod.clone(),
        }
    }

    /// Build the mesh for `lod`. Panics if `lod` is not in the table; a field
    /// whose dimensions do not fit the stride is an error.
    pub fn build(&self, field: &HeightField, lod: usize) -> Result<TerrainMesh> {
        let stride = self.lod.stride(lod);
        let data = build_mesh_data(field, self.multiplier, &self.curve, stride)?;
        if self.flat_shaded {
            Ok(normals::flat_shade(&data, lod))
        } else {
            Ok(data.into_mesh(lod))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::LodLevel;

    fn table() -> LodTable {
        LodTable::new(vec![
            LodLevel { stride: 1, visible_distance: 10.0, collision: false },
            LodLevel { stride: 2, visible_distance: 20.0, collision: false },
            LodLevel { stride: 4, visible_distance: 30.0, collision: false },
        ])
    }

    fn builder(flat: bool) -> TerrainMeshBuilder {
        TerrainMeshBuilder {
            multiplier: 10.0,
            curve: Arc::new(HeightCurve::identity()),
            flat_shaded: flat,
            lod: table(),
        }
    }

    /// 13 visible cells with a 4-cell border, heights rising along x.
    fn ramp_field() -> HeightField {
        let size = 21;
        let data = (0..size * size).map(|i| (i % size) as f32 / size as f32).collect();
        HeightField::from_vec(size, 4, data)
    }

    #[test]
    fn test_vertex_and_triangle_counts() {
        let field = ramp_field();
        let data = build_mesh_data(&field, 1.0, &HeightCurve::identity(), 1).unwrap();
        assert_eq!(data.positions.len(), 13 * 13);
        assert_eq!(data.border_positions.len(), 15 * 15 - 13 * 13);
        assert_eq!(data.interior_triangles().count(), 12 * 12 * 2);
        assert_eq!(data.border_triangle_count(), 14 * 14 * 2 - 12 * 12 * 2);

        let mesh = builder(false).build(&field, 1).unwrap();
        assert_eq!(mesh.vertex_count(), 7 * 7);
        assert_eq!(mesh.triangle_count(), 6 * 6 * 2);
        assert_eq!(mesh.normals.len(), mesh.vertex_count());
        assert_eq!(mesh.lod, 1);
    }

    #[test]
    fn test_positions_are_centred() {
        let mesh = builder(false).build(&ramp_field(), 2).unwrap();
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo[0], -6.0);
        assert_eq!(hi[0], 6.0);
        assert_eq!(lo[2], -6.0);
        assert_eq!(hi[2], 6.0);
        assert_eq!(mesh.uvs[0], [0.0, 0.0]);
        assert_eq!(*mesh.uvs.last().unwrap(), [1.0, 1.0]);
    }

    #[test]
    fn test_heights_use_curve_and_multiplier() {
        let field = HeightField::new_with(21, 4, 0.5);
        let mut b = builder(false);
        b.curve = Arc::new(HeightCurve::new(&[(0.0, 0.0), (1.0, 0.5)]));
        let mesh = b.build(&field, 0).unwrap();
        assert!(mesh.positions.iter().all(|p| (p[1] - 2.5).abs() < 1e-6));
    }

    #[test]
    fn test_flat_field_normals_point_up() {
        let field = HeightField::new_with(21, 4, 0.3);
        let mesh = builder(false).build(&field, 0).unwrap();
        for n in &mesh.normals {
            assert!((n[1] - 1.0).abs() < 1e-6, "normal {:?}", n);
        }
    }

    #[test]
    fn test_border_ring_bends_edge_normals() {
        // Flat interior, raised border ring: only edge vertices should tilt.
        let mut field = HeightField::new_with(21, 4, 0.0);
        for (x, y, _) in HeightField::new_with(21, 4, 0.0).iter() {
            if field.is_border(x, y) {
                field.set(x, y, 1.0);
            }
        }
        let mesh = builder(false).build(&field, 0).unwrap();
        let center = 6 * 13 + 6;
        assert!((mesh.normals[center][1] - 1.0).abs() < 1e-6);
        // Left edge, middle row: border to the left is higher, so the normal leans +x.
        let left_edge = 6 * 13;
        assert!(mesh.normals[left_edge][0] > 0.1);
        // Border triangles never reach the emitted index list.
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_flat_shading_triples_vertices() {
        let field = ramp_field();
        let smooth = builder(false).build(&field, 0).unwrap();
        let flat = builder(true).build(&field, 0).unwrap();
        let t = smooth.triangle_count();
        assert!(flat.flat_shaded);
        assert_eq!(flat.vertex_count(), 3 * t);
        assert_eq!(flat.indices.len(), 3 * t);
        for (i, &index) in flat.indices.iter().enumerate() {
            assert_eq!(index as usize, i);
        }
        // Each triangle's three vertices share one normal.
        for tri in flat.normals.chunks(3) {
            assert_eq!(tri[0], tri[1]);
            assert_eq!(tri[1], tri[2]);
        }
        // Positions are copies of the smooth mesh's vertices.
        for (k, &index) in smooth.indices.iter().enumerate() {
            assert_eq!(flat.positions[k], smooth.positions[index as usize]);
        }
    }

    #[test]
    fn test_builds_are_bit_identical() {
        let field = ramp_field();
        let a = builder(false).build(&field, 0).unwrap();
        let b = builder(false).build(&field, 0).unwrap();
        assert_eq!(a, b);
        let bits = |m: &TerrainMesh| m.normals.iter().flatten().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_border_narrower_than_stride_is_error() {
        let field = HeightField::new_with(15, 1, 0.0);
        assert!(build_mesh_data(&field, 1.0, &HeightCurve::identity(), 2).is_err());
    }

    #[test]
    #[should_panic]
    fn test_lod_outside_table_panics() {
        let _ = builder(false).build(&ramp_field(), 3);
    }
}
