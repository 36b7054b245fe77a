//! glTF/GLB scene importer backend
//!
//! Reads the document with the `gltf` crate and maps it onto [`Scene`]:
//! - a synthetic `RootNode` parents the scene's root nodes
//! - every primitive becomes its own [`SceneMesh`]
//! - skin joints become [`SceneBone`]s named after their nodes
//! - animation times are expressed in ticks at [`TICKS_PER_SECOND`]

use std::path::Path;

use glam::{Mat4, Quat, Vec2, Vec3};
use gltf::Document;
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use gltf::mesh::Mode;
use hashbrown::HashMap;
use model_common::{QuatKey, VectorKey};

use super::{
    Face, NodeChannel, PrimitiveKind, ReadMode, Scene, SceneAnimation, SceneBone, SceneImporter,
    SceneMesh, SceneNode,
};
use crate::error::ImportError;

/// Key times are seconds in glTF; scenes carry them as milliseconds
pub const TICKS_PER_SECOND: f64 = 1000.0;

const ROOT_NAME: &str = "RootNode";

#[derive(Debug, Clone, Copy, Default)]
pub struct GltfImporter;

impl SceneImporter for GltfImporter {
    fn name(&self) -> &'static str {
        "gltf"
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext, "gltf" | "glb")
    }

    fn read_file(&self, path: &Path, mode: ReadMode) -> Result<Scene, ImportError> {
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| ImportError::Scene(e.to_string()))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| ImportError::Scene(format!("buffers: {e}")))?;
        build_scene(&document, &buffers, mode)
    }

    fn read_memory(
        &self,
        bytes: &[u8],
        hint: &str,
        mode: ReadMode,
    ) -> Result<Scene, ImportError> {
        if !self.supports_extension(hint) {
            return Err(ImportError::UnsupportedFormat(format!(
                "gltf backend cannot decode .{hint}"
            )));
        }
        let gltf::Gltf { document, blob } =
            gltf::Gltf::from_slice(bytes).map_err(|e| ImportError::Scene(e.to_string()))?;
        let buffers = gltf::import_buffers(&document, None, blob)
            .map_err(|e| ImportError::Scene(format!("buffers: {e}")))?;
        build_scene(&document, &buffers, mode)
    }
}

fn build_scene(
    document: &Document,
    buffers: &[gltf::buffer::Data],
    mode: ReadMode,
) -> Result<Scene, ImportError> {
    let mut nodes: Vec<SceneNode> = document
        .nodes()
        .map(|node| {
            let name = match node.name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => format!("node_{}", node.index()),
            };
            SceneNode::new(name, Mat4::from_cols_array_2d(&node.transform().matrix()))
        })
        .collect();

    for node in document.nodes() {
        for child in node.children() {
            nodes[node.index()].children.push(child.index());
            nodes[child.index()].parent = Some(node.index());
        }
    }

    let root = nodes.len();
    let mut root_node = SceneNode::new(ROOT_NAME, Mat4::IDENTITY);
    let scene_roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next())
    {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => (0..root).filter(|&i| nodes[i].parent.is_none()).collect(),
    };
    for index in scene_roots {
        if nodes[index].parent.is_none() {
            nodes[index].parent = Some(root);
            root_node.children.push(index);
        }
    }
    nodes.push(root_node);

    let meshes = read_meshes(document, buffers, mode, &mut nodes);

    let animations = match mode {
        ReadMode::Skeletal => read_animations(document, buffers, &nodes),
        ReadMode::Static => Vec::new(),
    };

    tracing::debug!(
        "glTF scene: {} nodes, {} sub-meshes, {} animations",
        nodes.len(),
        meshes.len(),
        animations.len()
    );

    Ok(Scene {
        nodes,
        root,
        meshes,
        animations,
    })
}

// ============================================================================
// Geometry and skins
// ============================================================================

fn read_meshes(
    document: &Document,
    buffers: &[gltf::buffer::Data],
    mode: ReadMode,
    nodes: &mut [SceneNode],
) -> Vec<SceneMesh> {
    let mut meshes = Vec::new();
    let mut slots: Vec<Vec<usize>> = vec![Vec::new(); document.meshes().count()];

    for mesh in document.meshes() {
        // The skin lives on the node instancing the mesh; the first skinned instance wins
        let skin = match mode {
            ReadMode::Skeletal => document
                .nodes()
                .filter(|n| n.mesh().is_some_and(|m| m.index() == mesh.index()))
                .find_map(|n| n.skin()),
            ReadMode::Static => None,
        };
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .map(|iter| iter.map(Vec3::from_array).collect())
                .unwrap_or_default();
            let vertex_count = positions.len();

            let normals: Option<Vec<Vec3>> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from_array).collect::<Vec<_>>())
                .filter(|n| n.len() == vertex_count);
            let uvs: Option<Vec<Vec2>> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().map(Vec2::from_array).collect::<Vec<_>>())
                .filter(|t| t.len() == vertex_count);

            let indices: Vec<u32> = match reader.read_indices() {
                Some(iter) => iter.into_u32().collect(),
                None => (0..vertex_count as u32).collect(),
            };

            let (kind, faces) = match primitive.mode() {
                Mode::Points => (PrimitiveKind::Points, Vec::new()),
                Mode::Lines | Mode::LineLoop | Mode::LineStrip => {
                    (PrimitiveKind::Lines, Vec::new())
                }
                Mode::Triangles => (
                    PrimitiveKind::Polygons,
                    indices.chunks_exact(3).map(Face::from_slice).collect(),
                ),
                Mode::TriangleStrip => (PrimitiveKind::Polygons, strip_faces(&indices)),
                // A fan is exactly one polygon under fan triangulation
                Mode::TriangleFan => (
                    PrimitiveKind::Polygons,
                    if indices.len() >= 3 {
                        vec![Face::from_slice(&indices)]
                    } else {
                        Vec::new()
                    },
                ),
            };

            let mut bones = Vec::new();
            if let (Some(skin), Some(joints), Some(weights)) =
                (skin.as_ref(), reader.read_joints(0), reader.read_weights(0))
            {
                let inverse_binds: Vec<Mat4> = skin
                    .reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()))
                    .read_inverse_bind_matrices()
                    .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                    .unwrap_or_default();

                bones = skin
                    .joints()
                    .enumerate()
                    .map(|(j, joint)| SceneBone {
                        name: nodes[joint.index()].name.clone(),
                        offset: inverse_binds.get(j).copied().unwrap_or(Mat4::IDENTITY),
                        weights: Vec::new(),
                    })
                    .collect();

                for (vertex, (js, ws)) in joints.into_u16().zip(weights.into_f32()).enumerate() {
                    for k in 0..4 {
                        if ws[k] <= 0.0 {
                            continue;
                        }
                        if let Some(bone) = bones.get_mut(js[k] as usize) {
                            bone.weights.push((vertex as u32, ws[k]));
                        }
                    }
                }
            }

            slots[mesh.index()].push(meshes.len());
            meshes.push(SceneMesh {
                name: format!("{mesh_name}#{}", primitive.index()),
                kind,
                positions,
                normals,
                uvs,
                faces,
                bones,
            });
        }
    }

    for node in document.nodes() {
        if let Some(mesh) = node.mesh() {
            nodes[node.index()]
                .meshes
                .extend(slots[mesh.index()].iter().copied());
        }
    }

    meshes
}

/// Triangle strip to faces, flipping every other triangle to keep winding
fn strip_faces(indices: &[u32]) -> Vec<Face> {
    indices
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                Face::from_slice(&[w[0], w[1], w[2]])
            } else {
                Face::from_slice(&[w[1], w[0], w[2]])
            }
        })
        .collect()
}

// ============================================================================
// Animation
// ============================================================================

fn read_animations(
    document: &Document,
    buffers: &[gltf::buffer::Data],
    nodes: &[SceneNode],
) -> Vec<SceneAnimation> {
    document
        .animations()
        .map(|animation| {
            let mut channels: Vec<NodeChannel> = Vec::new();
            let mut by_node: HashMap<usize, usize> = HashMap::new();
            let mut end = 0.0f64;

            for channel in animation.channels() {
                let target = channel.target().node().index();
                let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
                let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs())
                else {
                    continue;
                };
                let times: Vec<f64> = inputs.map(|t| f64::from(t) * TICKS_PER_SECOND).collect();
                let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;

                let slot = *by_node.entry(target).or_insert_with(|| {
                    channels.push(NodeChannel {
                        node_name: nodes[target].name.clone(),
                        ..Default::default()
                    });
                    channels.len() - 1
                });
                let track = &mut channels[slot];

                match outputs {
                    ReadOutputs::Translations(values) => {
                        track.position_keys = vector_keys(&times, keyed(values.collect(), cubic));
                    }
                    ReadOutputs::Scales(values) => {
                        track.scaling_keys = vector_keys(&times, keyed(values.collect(), cubic));
                    }
                    ReadOutputs::Rotations(values) => {
                        let values = keyed(values.into_f32().collect(), cubic);
                        track.rotation_keys = times
                            .iter()
                            .zip(values)
                            .map(|(&time, q)| QuatKey {
                                time,
                                value: unit_quat(q),
                            })
                            .collect();
                    }
                    ReadOutputs::MorphTargetWeights(_) => {}
                }

                if let Some(&last) = times.last() {
                    end = end.max(last);
                }
            }

            SceneAnimation {
                name: animation.name().unwrap_or_default().to_string(),
                duration: end,
                ticks_per_second: TICKS_PER_SECOND,
                channels,
            }
        })
        .collect()
}

/// Cubic spline samplers store (in-tangent, value, out-tangent) per key
fn keyed<T: Copy>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        values
    }
}

fn vector_keys(times: &[f64], values: Vec<[f32; 3]>) -> Vec<VectorKey> {
    times
        .iter()
        .zip(values)
        .map(|(&time, v)| VectorKey {
            time,
            value: Vec3::from_array(v),
        })
        .collect()
}

fn unit_quat(q: [f32; 4]) -> Quat {
    let q = Quat::from_array(q);
    if q.length_squared() > 0.0 {
        q.normalize()
    } else {
        Quat::IDENTITY
    }
}
