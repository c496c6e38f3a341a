//! Procedural geometry
//!
//! Builders produce raw float arrays and index lists that feed
//! [`AttributeSource`](super::AttributeSource) and
//! [`IndexSource::Values`](super::IndexSource::Values).

use glam::{Vec2, Vec3};

/// Vertices in a quad
pub const QUAD_VERTICES: usize = 4;
/// Floats per vertex in quad arrays: xyz followed by uv
pub const QUAD_STRIDE: usize = 5;

/// UV per quad corner, upper left first
pub const QUAD_UV: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
/// [`QUAD_UV`] with V flipped, for textures stored bottom-up
pub const QUAD_UV_FLIPPED: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

/// Interleaved (position, uv) for one quad with upper left corner at `(x, y)`.
///
/// Corners run clockwise from the upper left; the quad extends to `y - height`.
pub fn quad_positions_uv(width: f32, height: f32, x: f32, y: f32, z: f32) -> [f32; 20] {
    quad_positions_with_uv(width, height, x, y, z, &QUAD_UV)
}

/// Same as [`quad_positions_uv`] with caller-supplied corner UVs.
pub fn quad_positions_with_uv(
    width: f32,
    height: f32,
    x: f32,
    y: f32,
    z: f32,
    uv: &[f32; 8],
) -> [f32; 20] {
    let corners = [(x, y), (x + width, y), (x + width, y - height), (x, y - height)];
    let mut out = [0.0; 20];
    for (i, (cx, cy)) in corners.into_iter().enumerate() {
        out[i * QUAD_STRIDE..(i + 1) * QUAD_STRIDE]
            .copy_from_slice(&[cx, cy, z, uv[i * 2], uv[i * 2 + 1]]);
    }
    out
}

/// Two triangles per quad: `i, i+1, i+2, i, i+2, i+3`.
pub fn quad_indices(count: usize, start_vertex: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(count * 6);
    for quad in 0..count as u32 {
        let i = start_vertex + quad * QUAD_VERTICES as u32;
        indices.extend_from_slice(&[i, i + 1, i + 2, i, i + 2, i + 3]);
    }
    indices
}

/// Four separate lines per quad, outlining its edges.
pub fn quad_line_indices(count: usize, start_vertex: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(count * 8);
    for quad in 0..count as u32 {
        let i = start_vertex + quad * QUAD_VERTICES as u32;
        indices.extend_from_slice(&[i, i + 1, i + 1, i + 2, i + 2, i + 3, i + 3, i]);
    }
    indices
}

/// Separate lines over consecutive vertex pairs.
pub fn line_indices(count: usize, start_vertex: u32) -> Vec<u32> {
    (0..count as u32 * 2).map(|i| start_vertex + i).collect()
}

/// Triangle list equivalent of a fan over `vertex_count` vertices.
pub fn fan_indices(vertex_count: usize) -> Vec<u32> {
    let n = vertex_count as u32;
    (1..n.saturating_sub(1))
        .flat_map(|i| [0, i, i + 1])
        .collect()
}

/// Triangle list equivalent of a strip, keeping winding consistent.
pub fn strip_indices(vertex_count: usize) -> Vec<u32> {
    let n = vertex_count as u32;
    (0..n.saturating_sub(2))
        .flat_map(|i| {
            if i % 2 == 0 {
                [i, i + 1, i + 2]
            } else {
                [i + 1, i, i + 2]
            }
        })
        .collect()
}

/// Unit cube centered at the origin as interleaved (position, normal, uv),
/// 8 floats per vertex, with its triangle indices.
pub fn cube(size: f32) -> (Vec<f32>, Vec<u32>) {
    let h = size * 0.5;
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (-Vec3::Z, -Vec3::X, Vec3::Y),
        (Vec3::X, -Vec3::Z, Vec3::Y),
        (-Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, -Vec3::Z),
        (-Vec3::Y, Vec3::X, Vec3::Z),
    ];

    let mut vertices = Vec::with_capacity(6 * 4 * 8);
    for (normal, right, up) in faces {
        let center = normal * h;
        let corners = [
            (center - right * h + up * h, Vec2::new(0.0, 0.0)),
            (center + right * h + up * h, Vec2::new(1.0, 0.0)),
            (center + right * h - up * h, Vec2::new(1.0, 1.0)),
            (center - right * h - up * h, Vec2::new(0.0, 1.0)),
        ];
        for (position, uv) in corners {
            vertices.extend_from_slice(&position.to_array());
            vertices.extend_from_slice(&normal.to_array());
            vertices.extend_from_slice(&uv.to_array());
        }
    }
    (vertices, quad_indices(6, 0))
}

/// Per-vertex tangent frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tangents {
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
}

/// Compute tangents from positions, uvs and normals of an indexed triangle list.
///
/// Contributions of every triangle sharing a vertex are accumulated and then
/// orthogonalized against the vertex normal. Vertices whose triangles have no
/// usable UV area get an arbitrary axis orthogonal to the normal.
pub fn compute_tangents(
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
    indices: &[u32],
) -> Tangents {
    let n = positions.len().min(uvs.len()).min(normals.len());
    let mut tan = vec![Vec3::ZERO; n];
    let mut bitan = vec![Vec3::ZERO; n];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= n || b >= n || c >= n {
            continue;
        }
        let e1 = positions[b] - positions[a];
        let e2 = positions[c] - positions[a];
        let d1 = uvs[b] - uvs[a];
        let d2 = uvs[c] - uvs[a];
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let bt = (e2 * d1.x - e1 * d2.x) * r;
        for v in [a, b, c] {
            tan[v] += t;
            bitan[v] += bt;
        }
    }

    let mut out = Tangents {
        tangents: Vec::with_capacity(n),
        bitangents: Vec::with_capacity(n),
    };
    for v in 0..n {
        let normal = normals[v].normalize_or_zero();
        // Gram-Schmidt
        let t = (tan[v] - normal * normal.dot(tan[v])).normalize_or_zero();
        let t = if t == Vec3::ZERO {
            normal.any_orthonormal_vector()
        } else {
            t
        };
        let mut b = normal.cross(t);
        if b.dot(bitan[v]) < 0.0 {
            b = -b;
        }
        out.tangents.push(t);
        out.bitangents.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_positions_uv() {
        let quad = quad_positions_uv(2.0, 1.0, -1.0, 0.5, 0.25);
        assert_eq!(&quad[0..5], &[-1.0, 0.5, 0.25, 0.0, 0.0]);
        assert_eq!(&quad[5..10], &[1.0, 0.5, 0.25, 1.0, 0.0]);
        assert_eq!(&quad[10..15], &[1.0, -0.5, 0.25, 1.0, 1.0]);
        assert_eq!(&quad[15..20], &[-1.0, -0.5, 0.25, 0.0, 1.0]);

        let flipped = quad_positions_with_uv(1.0, 1.0, 0.0, 0.0, 0.0, &QUAD_UV_FLIPPED);
        assert_eq!(&flipped[3..5], &[0.0, 1.0]);
    }

    #[test]
    fn test_quad_indices() {
        assert_eq!(quad_indices(2, 0), vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert_eq!(quad_indices(1, 8), vec![8, 9, 10, 8, 10, 11]);
        assert_eq!(quad_line_indices(1, 0), vec![0, 1, 1, 2, 2, 3, 3, 0]);
        assert_eq!(line_indices(2, 4), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_fan_and_strip() {
        assert_eq!(fan_indices(5), vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
        assert_eq!(strip_indices(5), vec![0, 1, 2, 2, 1, 3, 2, 3, 4]);
        assert!(fan_indices(2).is_empty());
        assert!(strip_indices(0).is_empty());
    }

    #[test]
    fn test_cube() {
        let (vertices, indices) = cube(1.0);
        assert_eq!(vertices.len(), 24 * 8);
        assert_eq!(indices.len(), 36);
        assert!(vertices
            .chunks_exact(8)
            .all(|v| v[0].abs() == 0.5 && v[1].abs() == 0.5 && v[2].abs() == 0.5));
    }

    #[test]
    fn test_compute_tangents_follow_u() {
        let quad = quad_positions_uv(1.0, 1.0, 0.0, 0.0, 0.0);
        let positions: Vec<Vec3> = quad
            .chunks_exact(QUAD_STRIDE)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
            .collect();
        let uvs: Vec<Vec2> = quad
            .chunks_exact(QUAD_STRIDE)
            .map(|v| Vec2::new(v[3], v[4]))
            .collect();
        let normals = vec![Vec3::Z; 4];

        let frame = compute_tangents(&positions, &uvs, &normals, &quad_indices(1, 0));
        for (t, b) in frame.tangents.iter().zip(&frame.bitangents) {
            assert!(t.abs_diff_eq(Vec3::X, 1e-5));
            // V grows downward along -Y
            assert!(b.abs_diff_eq(-Vec3::Y, 1e-5));
        }
    }

    #[test]
    fn test_compute_tangents_degenerate_uv() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let uvs = [Vec2::ZERO; 3];
        let normals = [Vec3::Z; 3];
        let frame = compute_tangents(&positions, &uvs, &normals, &[0, 1, 2]);
        for t in &frame.tangents {
            assert!(t.dot(Vec3::Z).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }
}
