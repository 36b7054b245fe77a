//! Static pre-bake
//!
//! Bakes every node's world transform into the vertices of the meshes it
//! references. The result has no bones, no skinning and no animation, but it
//! is a plain triangle mesh that renders correctly in bind pose.

use glam::{Mat3, Mat4};
use model_common::MeshData;

use crate::convert::append_geometry;
use crate::error::ImportError;
use crate::scene::Scene;

pub fn bake_static(scene: &Scene) -> Result<MeshData, ImportError> {
    let mut out = MeshData::default();
    let mut referenced = false;

    for (index, node) in scene.nodes.iter().enumerate() {
        if node.meshes.is_empty() {
            continue;
        }
        referenced = true;
        let world = scene.world_transform(index);
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

        for mesh in node.meshes.iter().filter_map(|&m| scene.meshes.get(m)) {
            if mesh.is_renderable() {
                append_geometry(&mut out, mesh, Some((world, normal_matrix)));
            }
        }
    }

    // Scenes without a node tree still carry geometry in mesh space
    if !referenced {
        for mesh in scene.meshes.iter().filter(|m| m.is_renderable()) {
            append_geometry(&mut out, mesh, Some((Mat4::IDENTITY, Mat3::IDENTITY)));
        }
    }

    if out.indices.is_empty() {
        return Err(ImportError::NoTriangles(format!(
            "static bake: {}",
            scene.stats()
        )));
    }

    tracing::debug!(
        "Baked static mesh: {} vertices, {} indices",
        out.vertices.len(),
        out.indices.len()
    );
    Ok(out)
}
