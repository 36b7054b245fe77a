//! Minimal ASCII FBX geometry reader
//!
//! Last rung of the fallback ladder. It only understands the two arrays that
//! define static geometry:
//!
//! ```text
//! Vertices: *9 {
//!     a: 0,0,0,1,0,0,0,1,0
//! }
//! PolygonVertexIndex: *3 {
//!     a: 0,1,-3
//! }
//! ```
//!
//! A negative polygon index `-v-1` closes the polygon at vertex `v`.

use glam::{Vec2, Vec3};
use model_common::{MeshData, Vertex};

use crate::convert::{DEFAULT_NORMAL, fan_triangulate};
use crate::error::ImportError;

const VERTICES_KEY: &str = "Vertices:";
const POLYGONS_KEY: &str = "PolygonVertexIndex:";

pub fn parse_fbx_ascii(text: &str) -> Result<MeshData, ImportError> {
    let vertex_body = find_section(text, VERTICES_KEY).ok_or(ImportError::MissingSection("Vertices"))?;
    let polygon_body =
        find_section(text, POLYGONS_KEY).ok_or(ImportError::MissingSection("PolygonVertexIndex"))?;

    let coords: Vec<f64> = scan_numbers(vertex_body, is_float_byte);
    if coords.len() < 9 || coords.len() % 3 != 0 {
        return Err(ImportError::DegenerateVertices(coords.len()));
    }
    let raw_indices: Vec<i64> = scan_numbers(polygon_body, is_int_byte);
    if raw_indices.len() < 3 {
        return Err(ImportError::DegeneratePolygons(raw_indices.len()));
    }

    let positions: Vec<Vec3> = coords
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32))
        .collect();
    let indices = triangulate_polygons(&raw_indices, positions.len());
    if indices.is_empty() {
        return Err(ImportError::NoTriangles("no polygons after triangulation".into()));
    }

    let normals = accumulate_normals(&positions, &indices);
    let vertices = positions
        .iter()
        .zip(normals)
        .map(|(&p, n)| Vertex::new(p, n, Vec2::ZERO))
        .collect();

    Ok(MeshData {
        vertices,
        indices,
        ..Default::default()
    })
}

/// Body of `key: ... { a: <body> }`
fn find_section<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let key_at = text.find(key)?;
    let open = key_at + text[key_at..].find('{')?;
    let body = open + text[open..].find("a:")? + 2;
    let close = body + text[body..].find('}')?;
    Some(&text[body..close])
}

fn is_float_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')
}

fn is_int_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'+' | b'-')
}

/// Tolerant number scan: runs of numeric bytes that fail to parse are skipped
fn scan_numbers<T: std::str::FromStr>(body: &str, numeric: fn(u8) -> bool) -> Vec<T> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !numeric(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && numeric(bytes[i]) {
            i += 1;
        }
        if let Ok(value) = body[start..i].parse() {
            out.push(value);
        }
    }
    out
}

/// Split sign-terminated polygon runs and fan-triangulate them.
///
/// An out-of-range index discards the polygon being collected.
fn triangulate_polygons(raw: &[i64], vertex_count: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(raw.len() * 3 / 2);
    let mut polygon: Vec<u32> = Vec::with_capacity(8);

    for &value in raw {
        let last = value < 0;
        let index = if last { -value - 1 } else { value };
        if (0..vertex_count as i64).contains(&index) {
            polygon.push(index as u32);
        } else {
            polygon.clear();
        }
        if last {
            fan_triangulate(&polygon, 0, &mut indices);
            polygon.clear();
        }
    }
    indices
}

/// Area-weighted vertex normals
fn accumulate_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(DEFAULT_NORMAL))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
; FBX 7.4.0 project file
Objects:  {
    Geometry: 1, \"Geometry::\", \"Mesh\" {
        Vertices: *12 {
            a: 0,0,0,1,0,0,1,1,0,0,1,0
        }
        PolygonVertexIndex: *4 {
            a: 0,1,2,-4
        }
    }
}
";

    #[test]
    fn test_parse_quad() {
        let mesh = parse_fbx_ascii(QUAD).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(!mesh.skinned);
        assert!(mesh.bones.is_empty());
        for v in &mesh.vertices {
            assert_eq!(v.normal(), Vec3::Z);
        }
    }

    #[test]
    fn test_unused_vertex_gets_up_normal() {
        let text = "Vertices: *12 { a: 0,0,0, 1,0,0, 0,1,0, 5,5,5 }\n\
                    PolygonVertexIndex: *3 { a: 0,1,-3 }";
        let mesh = parse_fbx_ascii(text).unwrap();
        assert_eq!(mesh.vertices[3].normal(), DEFAULT_NORMAL);
    }

    #[test]
    fn test_invalid_index_drops_polygon() {
        let text = "Vertices: *9 { a: 0,0,0,1,0,0,0,1,0 }\n\
                    PolygonVertexIndex: *7 { a: 0,7,-3, 0,1,-3, 0 }";
        let mesh = parse_fbx_ascii(text).unwrap();
        // Open trailing run never closes, first polygon is discarded
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_sections() {
        let err = parse_fbx_ascii("PolygonVertexIndex: { a: 0,1,-3 }").unwrap_err();
        assert!(matches!(err, ImportError::MissingSection("Vertices")));
        let err = parse_fbx_ascii("Vertices: { a: 0,0,0,1,0,0,0,1,0 }").unwrap_err();
        assert!(matches!(err, ImportError::MissingSection("PolygonVertexIndex")));
    }

    #[test]
    fn test_degenerate_arrays() {
        let err = parse_fbx_ascii("Vertices: { a: 0,0,0,1 }\nPolygonVertexIndex: { a: 0,1,-3 }")
            .unwrap_err();
        assert!(matches!(err, ImportError::DegenerateVertices(4)));

        let err =
            parse_fbx_ascii("Vertices: { a: 0,0,0,1,0,0,0,1,0 }\nPolygonVertexIndex: { a: 0,-2 }")
                .unwrap_err();
        assert!(matches!(err, ImportError::DegeneratePolygons(2)));
    }

    #[test]
    fn test_scan_tolerates_noise() {
        let values: Vec<f64> = scan_numbers(" 1.5, x, -2e1,\n 3 ", is_float_byte);
        assert_eq!(values, vec![1.5, -20.0, 3.0]);
    }
}
