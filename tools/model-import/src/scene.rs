//! Scene graph produced by a scene importer backend
//!
//! A [`Scene`] is the format-neutral view of a model file: a node tree with
//! local transforms, the sub-meshes those nodes reference, the bones that skin
//! each sub-mesh, and node-keyed animation clips. [`convert`](crate::convert)
//! turns it into [`MeshData`](model_common::MeshData).

pub mod gltf;

use std::fmt;
use std::path::Path;

use glam::{Mat4, Vec2, Vec3};
use model_common::{QuatKey, VectorKey};
use smallvec::SmallVec;

use crate::error::ImportError;

pub use self::gltf::GltfImporter;

/// Polygon index list; most faces are triangles or quads
pub type Face = SmallVec<[u32; 4]>;

/// How much of the scene a backend should read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Geometry, skins and animation
    Skeletal,
    /// Geometry and node transforms only; skins and animation are skipped
    Static,
}

/// External scene importer seam.
///
/// Backends either return a complete scene or fail with a reason. They never
/// return partially converted scenes.
pub trait SceneImporter: Send + Sync {
    /// Short backend name for diagnostics
    fn name(&self) -> &'static str;

    /// True if this backend understands files with the given lowercase extension
    fn supports_extension(&self, ext: &str) -> bool;

    fn read_file(&self, path: &Path, mode: ReadMode) -> Result<Scene, ImportError>;

    /// Decode an in-memory copy of a file. `hint` is the lowercase extension.
    fn read_memory(&self, bytes: &[u8], hint: &str, mode: ReadMode)
    -> Result<Scene, ImportError>;
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    /// Index of the root node in `nodes`
    pub root: usize,
    pub meshes: Vec<SceneMesh>,
    pub animations: Vec<SceneAnimation>,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Transform relative to the parent node
    pub transform: Mat4,
    /// Indices into `Scene::meshes`
    pub meshes: Vec<usize>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform,
            meshes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    /// Triangles or larger polygons
    Polygons,
}

#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub name: String,
    pub kind: PrimitiveKind,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub faces: Vec<Face>,
    pub bones: Vec<SceneBone>,
}

impl SceneMesh {
    /// Point and line primitives are never merged into the triangle buffer
    pub fn is_renderable(&self) -> bool {
        self.kind == PrimitiveKind::Polygons
    }
}

/// A bone influencing one sub-mesh
#[derive(Debug, Clone)]
pub struct SceneBone {
    /// Raw node name (pivot suffixes not yet stripped)
    pub name: String,
    /// Inverse bind matrix
    pub offset: Mat4,
    /// (vertex index within the sub-mesh, weight)
    pub weights: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneAnimation {
    pub name: String,
    /// Clip length in ticks
    pub duration: f64,
    pub ticks_per_second: f64,
    pub channels: Vec<NodeChannel>,
}

/// Animation track addressed by node name
#[derive(Debug, Clone, Default)]
pub struct NodeChannel {
    pub node_name: String,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuatKey>,
    pub scaling_keys: Vec<VectorKey>,
}

impl Scene {
    /// Composed transform of `node` relative to the scene root
    pub fn world_transform(&self, node: usize) -> Mat4 {
        let mut world = Mat4::IDENTITY;
        let mut current = Some(node);
        // Bounded so a malformed parent cycle cannot hang the import
        for _ in 0..self.nodes.len() {
            let Some(index) = current else { break };
            let Some(n) = self.nodes.get(index) else { break };
            world = n.transform * world;
            current = n.parent;
        }
        world
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            meshes: self.meshes.len(),
            polygon_faces: self
                .meshes
                .iter()
                .filter(|m| m.is_renderable())
                .map(|m| m.faces.iter().filter(|f| f.len() >= 3).count())
                .sum(),
            vertices: self.meshes.iter().map(|m| m.positions.len()).sum(),
            bone_meshes: self.meshes.iter().filter(|m| !m.bones.is_empty()).count(),
            nodes: self.nodes.len(),
        }
    }
}

/// Scene summary used in "no triangles" diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStats {
    pub meshes: usize,
    pub polygon_faces: usize,
    pub vertices: usize,
    pub bone_meshes: usize,
    pub nodes: usize,
}

impl fmt::Display for SceneStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "meshes={}, polyFaces={}, totalVerts={}, boneMeshes={}, nodes={}",
            self.meshes, self.polygon_faces, self.vertices, self.bone_meshes, self.nodes
        )
    }
}
