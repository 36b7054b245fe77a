//! Scene -> MeshData conversion
//!
//! Merges every renderable sub-mesh into one vertex/index buffer, binds bone
//! weights through a single name -> index table, extracts the bone hierarchy
//! from the node tree and copies the first animation clip.

use glam::{Mat3, Mat4, Vec2, Vec3};
use hashbrown::HashMap;
use model_common::{Bone, Channel, DEFAULT_TICKS_PER_SECOND, MeshData, Vertex, normalize_bone_name};

use crate::error::ImportError;
use crate::scene::{Face, Scene, SceneAnimation, SceneMesh};

/// Normal used when a sub-mesh carries none
pub const DEFAULT_NORMAL: Vec3 = Vec3::Y;

/// Normalized bone name -> bone index, built once per import
#[derive(Debug, Default)]
pub struct BoneTable {
    by_name: HashMap<String, usize>,
}

impl BoneTable {
    /// Look up `name`, appending an identity bone on first sight
    pub fn get_or_insert(&mut self, name: &str, bones: &mut Vec<Bone>) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = bones.len();
        bones.push(Bone::new(name));
        self.by_name.insert(name.to_string(), index);
        index
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

/// Build a skinned, animated mesh from a skeletal-mode scene
pub fn scene_to_mesh(scene: &Scene) -> Result<MeshData, ImportError> {
    let mut out = MeshData::default();
    let mut table = BoneTable::default();

    for mesh in scene.meshes.iter().filter(|m| m.is_renderable()) {
        let base = append_geometry(&mut out, mesh, None);
        if !mesh.bones.is_empty() {
            out.skinned = true;
            bind_bones(&mut out, &mut table, mesh, base);
        }
    }

    if out.indices.is_empty() {
        return Err(ImportError::NoTriangles(scene.stats().to_string()));
    }

    apply_hierarchy(scene, &table, &mut out.bones);

    if let Some(animation) = scene.animations.first() {
        extract_animation(animation, &table, &mut out);
    }

    tracing::debug!(
        "Converted scene: {} vertices, {} indices, {} bones, {} channels",
        out.vertices.len(),
        out.indices.len(),
        out.bones.len(),
        out.channels.len()
    );

    Ok(out)
}

/// Fan-triangulate one polygon around its first vertex.
///
/// Faces with fewer than 3 vertices produce nothing.
pub fn fan_triangulate(face: &[u32], base: u32, indices: &mut Vec<u32>) {
    if face.len() < 3 {
        return;
    }
    let pivot = base + face[0];
    for pair in face[1..].windows(2) {
        indices.extend_from_slice(&[pivot, base + pair[0], base + pair[1]]);
    }
}

/// Append one sub-mesh to the merged buffers, returning its base vertex.
///
/// With a transform, positions go through the matrix and normals through its
/// normal matrix.
pub(crate) fn append_geometry(
    out: &mut MeshData,
    mesh: &SceneMesh,
    transform: Option<(Mat4, Mat3)>,
) -> usize {
    let base = out.vertices.len();
    out.vertices.reserve(mesh.positions.len());

    for (i, &position) in mesh.positions.iter().enumerate() {
        let mut normal = mesh
            .normals
            .as_ref()
            .and_then(|n| n.get(i).copied())
            .unwrap_or(DEFAULT_NORMAL);
        let uv = mesh
            .uvs
            .as_ref()
            .and_then(|t| t.get(i).copied())
            .unwrap_or(Vec2::ZERO);

        let position = match transform {
            Some((matrix, normal_matrix)) => {
                normal = (normal_matrix * normal).try_normalize().unwrap_or(DEFAULT_NORMAL);
                matrix.transform_point3(position)
            }
            None => position,
        };
        out.vertices.push(Vertex::new(position, normal, uv));
    }

    let vertex_count = mesh.positions.len() as u32;
    for face in &mesh.faces {
        let valid: Face = face.iter().copied().filter(|&i| i < vertex_count).collect();
        fan_triangulate(&valid, base as u32, &mut out.indices);
    }

    base
}

fn bind_bones(out: &mut MeshData, table: &mut BoneTable, mesh: &SceneMesh, base: usize) {
    let vertex_count = mesh.positions.len();

    for bone in &mesh.bones {
        let index = table.get_or_insert(normalize_bone_name(&bone.name), &mut out.bones);
        out.bones[index].offset = bone.offset;

        for &(vertex, weight) in &bone.weights {
            let vertex = vertex as usize;
            if vertex < vertex_count {
                out.vertices[base + vertex].add_influence(index, weight);
            }
        }
    }

    for vertex in &mut out.vertices[base..base + vertex_count] {
        vertex.normalize_weights();
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

struct NodeInfo<'a> {
    parent: Option<&'a str>,
    local: Mat4,
}

/// Walk the node tree once and fill each known bone's parent and bind pose.
///
/// Consecutive nodes sharing a normalized name (a pivot chain) are composed
/// into a single local transform under the chain's first parent.
fn apply_hierarchy(scene: &Scene, table: &BoneTable, bones: &mut [Bone]) {
    let mut info: HashMap<&str, NodeInfo<'_>> = HashMap::new();
    let mut visited = vec![false; scene.nodes.len()];
    let mut stack: Vec<(usize, Option<&str>)> = vec![(scene.root, None)];

    while let Some((index, parent_name)) = stack.pop() {
        let Some(node) = scene.nodes.get(index) else {
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            continue;
        }
        let name = normalize_bone_name(&node.name);

        if parent_name == Some(name) {
            if let Some(entry) = info.get_mut(name) {
                entry.local *= node.transform;
            }
        } else {
            info.insert(
                name,
                NodeInfo {
                    parent: parent_name,
                    local: node.transform,
                },
            );
        }

        for &child in node.children.iter().rev() {
            stack.push((child, Some(name)));
        }
    }

    for (index, bone) in bones.iter_mut().enumerate() {
        let Some(node) = info.get(bone.name.as_str()) else {
            bone.parent = None;
            continue;
        };
        bone.bind_local = node.local;
        bone.parent = node
            .parent
            .and_then(|p| table.get(p))
            .filter(|&p| p != index);
    }
}

// ============================================================================
// Animation
// ============================================================================

fn extract_animation(animation: &SceneAnimation, table: &BoneTable, out: &mut MeshData) {
    out.anim_duration = animation.duration;
    out.anim_ticks_per_second = if animation.ticks_per_second > 0.0 {
        animation.ticks_per_second
    } else {
        DEFAULT_TICKS_PER_SECOND
    };

    let mut by_bone: HashMap<usize, usize> = HashMap::new();
    let mut dropped = 0usize;

    for source in &animation.channels {
        let Some(bone) = table.get(normalize_bone_name(&source.node_name)) else {
            dropped += 1;
            continue;
        };
        let slot = *by_bone.entry(bone).or_insert_with(|| {
            out.channels.push(Channel::new(bone));
            out.channels.len() - 1
        });

        // Pivot chains can split one joint's motion across several tracks
        let channel = &mut out.channels[slot];
        if channel.position_keys.is_empty() {
            channel.position_keys = source.position_keys.clone();
        }
        if channel.rotation_keys.is_empty() {
            channel.rotation_keys = source.rotation_keys.clone();
        }
        if channel.scaling_keys.is_empty() {
            channel.scaling_keys = source.scaling_keys.clone();
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} channels targeting non-bone nodes", dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeChannel, PrimitiveKind, SceneBone, SceneNode};
    use glam::Quat;
    use model_common::{QuatKey, VectorKey};
    use smallvec::smallvec;

    fn quad_mesh(bones: Vec<SceneBone>) -> SceneMesh {
        SceneMesh {
            name: "quad".into(),
            kind: PrimitiveKind::Polygons,
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: None,
            uvs: None,
            faces: vec![smallvec![0, 1, 2, 3], smallvec![0, 1]],
            bones,
        }
    }

    fn node(name: &str, parent: Option<usize>, children: &[usize], t: Vec3) -> SceneNode {
        let mut n = SceneNode::new(name, Mat4::from_translation(t));
        n.parent = parent;
        n.children = children.to_vec();
        n
    }

    #[test]
    fn test_fan_triangulate() {
        let mut indices = Vec::new();
        fan_triangulate(&[0, 1, 2, 3, 4], 10, &mut indices);
        assert_eq!(indices, vec![10, 11, 12, 10, 12, 13, 10, 13, 14]);
        assert_eq!(indices.len() / 3, 3);

        let mut none = Vec::new();
        fan_triangulate(&[0, 1], 0, &mut none);
        assert!(none.is_empty());
    }

    #[test]
    fn test_merge_offsets_and_drops_points() {
        let mut points = quad_mesh(Vec::new());
        points.kind = PrimitiveKind::Points;
        let scene = Scene {
            nodes: vec![node("RootNode", None, &[], Vec3::ZERO)],
            root: 0,
            meshes: vec![quad_mesh(Vec::new()), points, quad_mesh(Vec::new())],
            animations: Vec::new(),
        };
        let mesh = scene_to_mesh(&scene).unwrap();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 12);
        assert_eq!(&mesh.indices[6..9], &[4, 5, 6]);
        assert!(!mesh.skinned);
        assert_eq!(mesh.vertices[0].normal(), DEFAULT_NORMAL);
    }

    #[test]
    fn test_no_triangles_reports_stats() {
        let mut lines = quad_mesh(Vec::new());
        lines.kind = PrimitiveKind::Lines;
        let scene = Scene {
            nodes: vec![node("RootNode", None, &[], Vec3::ZERO)],
            root: 0,
            meshes: vec![lines],
            animations: Vec::new(),
        };
        let err = scene_to_mesh(&scene).unwrap_err();
        assert!(matches!(err, ImportError::NoTriangles(ref s) if s.contains("meshes=1")));
    }

    #[test]
    fn test_bone_binding_hierarchy_and_channels() {
        let bones = vec![
            SceneBone {
                name: "Hips".into(),
                offset: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
                weights: vec![(0, 0.5), (1, 1.0), (2, 3.0)],
            },
            SceneBone {
                name: "Spine".into(),
                offset: Mat4::IDENTITY,
                weights: vec![(0, 0.5), (2, 1.0), (99, 1.0)],
            },
        ];
        // RootNode -> Hips pivot -> Hips -> Spine ; Camera beside them
        let scene = Scene {
            nodes: vec![
                node("RootNode", None, &[1, 4], Vec3::ZERO),
                node("Hips_$AssimpFbx$_Translation", Some(0), &[2], Vec3::new(0.0, 1.0, 0.0)),
                node("Hips", Some(1), &[3], Vec3::new(0.0, 0.0, 2.0)),
                node("Spine", Some(2), &[], Vec3::new(0.0, 0.5, 0.0)),
                node("Camera", Some(0), &[], Vec3::ZERO),
            ],
            root: 0,
            meshes: vec![quad_mesh(bones)],
            animations: vec![SceneAnimation {
                name: "walk".into(),
                duration: 10.0,
                ticks_per_second: 0.0,
                channels: vec![
                    NodeChannel {
                        node_name: "Hips_$AssimpFbx$_Translation".into(),
                        position_keys: vec![VectorKey { time: 0.0, value: Vec3::X }],
                        ..Default::default()
                    },
                    NodeChannel {
                        node_name: "Hips".into(),
                        position_keys: vec![VectorKey { time: 0.0, value: Vec3::Z }],
                        rotation_keys: vec![QuatKey { time: 0.0, value: Quat::IDENTITY }],
                        ..Default::default()
                    },
                    NodeChannel {
                        node_name: "Camera".into(),
                        ..Default::default()
                    },
                ],
            }],
        };

        let mesh = scene_to_mesh(&scene).unwrap();
        assert!(mesh.skinned);
        assert_eq!(mesh.bones.len(), 2);
        assert_eq!(mesh.bones[0].name, "Hips");
        assert_eq!(mesh.bones[0].parent, None);
        assert_eq!(mesh.bones[1].parent, Some(0));
        assert_eq!(
            mesh.bones[0].offset,
            Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
        );

        // Pivot chain composes into one bind transform
        let hips_origin = mesh.bones[0].bind_local.transform_point3(Vec3::ZERO);
        assert_eq!(hips_origin, Vec3::new(0.0, 1.0, 2.0));

        // Weights normalized, unweighted vertex stays zero
        assert_eq!(mesh.vertices[0].bone_weights[..2], [0.5, 0.5]);
        assert_eq!(mesh.vertices[2].bone_weights[..2], [0.75, 0.25]);
        assert_eq!(mesh.vertices[3].bone_weights, [0.0; 4]);
        assert_eq!(mesh.weighted_vertex_count(), 3);

        // One merged channel for Hips; camera track discarded; tps defaulted
        assert_eq!(mesh.channels.len(), 1);
        assert_eq!(mesh.channels[0].bone_index, 0);
        assert_eq!(mesh.channels[0].position_keys[0].value, Vec3::X);
        assert_eq!(mesh.channels[0].rotation_keys.len(), 1);
        assert_eq!(mesh.anim_ticks_per_second, DEFAULT_TICKS_PER_SECOND);
        assert_eq!(mesh.anim_duration, 10.0);
    }
}
