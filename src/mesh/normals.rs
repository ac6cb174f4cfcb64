//! Vertex normals and flat shading

use super::builder::{MeshData, VertexRef};
use super::TerrainMesh;

pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Unit vector in the direction of `v`; straight up for a degenerate input.
pub fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 1.0, 0.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

/// Cross product of the triangle's edges `b - a` and `c - a`.
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    cross(sub(b, a), sub(c, a))
}

/// Smooth per-vertex normals for the interior vertices of `data`.
///
/// Every triangle, border ones included, adds its face normal to each of its
/// interior vertices. Border vertices never receive contributions. Triangles
/// are visited in build order, so the result is deterministic.
pub fn smooth_normals(data: &MeshData) -> Vec<[f32; 3]> {
    let mut sums = vec![[0.0f32; 3]; data.positions.len()];
    for triangle in &data.triangles {
        let [a, b, c] = triangle.vertices.map(|v| data.position(v));
        let n = face_normal(a, b, c);
        for vertex in triangle.vertices {
            if let VertexRef::Interior(i) = vertex {
                let sum = &mut sums[i];
                sum[0] += n[0];
                sum[1] += n[1];
                sum[2] += n[2];
            }
        }
    }
    sums.into_iter().map(normalize).collect()
}

/// Give every emitted triangle its own three vertices with the face normal.
///
/// Output has `3T` vertices and index `i` refers to vertex `i`.
pub fn flat_shade(data: &MeshData, lod: usize) -> TerrainMesh {
    let emitted: Vec<[usize; 3]> = data.interior_triangles().collect();
    let mut positions = Vec::with_capacity(emitted.len() * 3);
    let mut uvs = Vec::with_capacity(emitted.len() * 3);
    let mut normals = Vec::with_capacity(emitted.len() * 3);

    for tri in &emitted {
        let [a, b, c] = tri.map(|i| data.positions[i]);
        let n = normalize(face_normal(a, b, c));
        for &i in tri {
            positions.push(data.positions[i]);
            uvs.push(data.uvs[i]);
            normals.push(n);
        }
    }

    let indices = (0..positions.len() as u32).collect();
    TerrainMesh {
        positions,
        uvs,
        normals,
        indices,
        lod,
        flat_shaded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_of_axes() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_grid_winding_faces_up() {
        // top-left, bottom-right, bottom-left with rows running toward -z
        let n = face_normal([0.0, 0.0, 0.0], [1.0, 0.0, -1.0], [0.0, 0.0, -1.0]);
        assert!(n[1] > 0.0);
        assert_eq!(normalize(n), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(normalize([0.0, 0.0, 0.0]), [0.0, 1.0, 0.0]);
        let n = normalize([3.0, 0.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 1e-6 && (n[2] - 0.8).abs() < 1e-6);
    }
}
