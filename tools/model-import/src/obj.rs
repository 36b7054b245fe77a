//! OBJ mesh import
//!
//! Supports `v`, `vt`, `vn` and `f` directives with `v`, `v/t`, `v//n` and
//! `v/t/n` face tokens, 1-based and negative (relative) indices, and N-gon
//! faces. Vertices are deduplicated on their (position, uv, normal) triple.
//! OBJ meshes are never skinned.

use std::path::Path;

use glam::{Vec2, Vec3};
use hashbrown::HashMap;
use model_common::{MeshData, Vertex};

use crate::convert::fan_triangulate;
use crate::error::ImportError;

/// Normal used when a synthesized normal is degenerate
const FALLBACK_NORMAL: Vec3 = Vec3::Z;

/// Load and parse an OBJ file
pub fn load_obj(path: &Path) -> Result<MeshData, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
    let mesh = parse_obj(&text)?;
    tracing::info!(
        "Loaded OBJ mesh: {} vertices, {} indices",
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

/// (position, uv, normal) indices, 0-based; uv/normal absent when `None`
type Corner = (usize, Option<usize>, Option<usize>);

pub fn parse_obj(text: &str) -> Result<MeshData, ImportError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut tex_coords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut has_normal: Vec<bool> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut dedupe: HashMap<Corner, u32> = HashMap::new();
    let mut polygon: Vec<u32> = Vec::with_capacity(8);

    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => positions.push(Vec3::from_array(parse_floats(parts))),
            "vn" => normals.push(Vec3::from_array(parse_floats(parts))),
            "vt" => {
                let [u, v, _] = parse_floats(parts);
                tex_coords.push(Vec2::new(u, v));
            }
            "f" => {
                let tokens: Vec<&str> = parts.collect();
                if tokens.len() < 3 {
                    return Err(ImportError::obj(line_no, "face has fewer than 3 vertices"));
                }

                polygon.clear();
                for token in tokens {
                    let corner = parse_corner(token, &positions, &tex_coords, &normals)
                        .map_err(|message| ImportError::obj(line_no, message))?;

                    let index = *dedupe.entry(corner).or_insert_with(|| {
                        let (p, t, n) = corner;
                        has_normal.push(n.is_some());
                        vertices.push(Vertex::new(
                            positions[p],
                            n.map_or(Vec3::ZERO, |n| normals[n]),
                            t.map_or(Vec2::ZERO, |t| tex_coords[t]),
                        ));
                        (vertices.len() - 1) as u32
                    });
                    polygon.push(index);
                }
                fan_triangulate(&polygon, 0, &mut indices);
            }
            _ => {}
        }
    }

    if indices.is_empty() {
        return Err(ImportError::NoTriangles("no faces parsed".into()));
    }

    synthesize_normals(&mut vertices, &has_normal, &indices);

    Ok(MeshData {
        vertices,
        indices,
        ..Default::default()
    })
}

/// Up to three floats; missing or malformed components read as 0
fn parse_floats<'a>(parts: impl Iterator<Item = &'a str>) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().unwrap_or(0.0);
    }
    out
}

fn parse_corner(
    token: &str,
    positions: &[Vec3],
    tex_coords: &[Vec2],
    normals: &[Vec3],
) -> Result<Corner, String> {
    let mut fields = token.split('/');
    let position = fields.next().unwrap_or_default();
    let uv = fields.next().unwrap_or_default();
    let normal = fields.next().unwrap_or_default();

    let position = resolve(position, positions.len())?
        .ok_or_else(|| format!("position index out of range: {token}"))?;
    let uv = resolve(uv, tex_coords.len()).map_err(|e| format!("texcoord {e}"))?;
    let normal = resolve(normal, normals.len()).map_err(|e| format!("normal {e}"))?;
    Ok((position, uv, normal))
}

/// Resolve a 1-based or negative OBJ index against a list of `len` items.
///
/// Empty fields are absent (`Ok(None)`); zero and out-of-range values are errors.
fn resolve(field: &str, len: usize) -> Result<Option<usize>, String> {
    if field.is_empty() {
        return Ok(None);
    }
    let raw: i64 = field
        .parse()
        .map_err(|_| format!("invalid face index token: {field}"))?;
    let resolved = if raw < 0 { len as i64 + raw } else { raw - 1 };
    if raw == 0 || resolved < 0 || resolved >= len as i64 {
        return Err(format!("index out of range: {field}"));
    }
    Ok(Some(resolved as usize))
}

/// Area-weighted smooth normals for vertices the file gave no normal
fn synthesize_normals(vertices: &mut [Vertex], has_normal: &[bool], indices: &[u32]) {
    if has_normal.iter().all(|&h| h) {
        return;
    }

    let mut accum = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (p0, p1, p2) = (
            vertices[a].position(),
            vertices[b].position(),
            vertices[c].position(),
        );
        // Unnormalized cross product weights each face by its area
        let face = (p1 - p0).cross(p2 - p0);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        if !has_normal[i] {
            let n = accum[i].try_normalize().unwrap_or(FALLBACK_NORMAL);
            vertex.normal = n.to_array();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triangle() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(!mesh.skinned);
        for v in &mesh.vertices {
            assert_eq!(v.normal(), Vec3::Z);
            assert_eq!(v.bone_weights, [0.0; 4]);
        }
    }

    #[test]
    fn test_quad_fan_and_dedupe() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices_and_token_forms() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0.5 0.5
vn 0 0 -1
f -3/1/1 -2//1 -1/-1
";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[0].uv, [0.5, 0.5]);
        assert_eq!(mesh.vertices[0].normal(), Vec3::NEG_Z);
        assert_eq!(mesh.vertices[1].normal(), Vec3::NEG_Z);
        // Third corner had no normal: synthesized from the face winding
        assert_eq!(mesh.vertices[2].normal(), Vec3::Z);
    }

    #[test]
    fn test_shared_corner_is_reused() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn test_out_of_range_is_fatal() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 2 9\n").unwrap_err();
        assert!(matches!(err, ImportError::Obj { line: 5, .. }));

        let err = parse_obj("v 0 0 0\nf 1 1 0\n").unwrap_err();
        assert!(matches!(err, ImportError::Obj { line: 2, .. }));
    }

    #[test]
    fn test_short_face_is_fatal() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert!(err.to_string().contains("fewer than 3"));
    }

    #[test]
    fn test_degenerate_normal_falls_back() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 2 0 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.vertices[0].normal(), FALLBACK_NORMAL);
    }

    #[test]
    fn test_no_faces() {
        let err = parse_obj("# nothing\nv 0 0 0\n").unwrap_err();
        assert!(matches!(err, ImportError::NoTriangles(_)));
    }
}
