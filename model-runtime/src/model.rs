//! Render-side model
//!
//! [`Model`] owns the active mesh and its pose evaluator. A new mesh replaces
//! the old one only if it has geometry. Meshes from the background loader
//! arrive already compressed; any other mesh is compressed on install, so the
//! evaluator never sees more bones than the palette holds.

use glam::Mat4;
use model_common::{Aabb, MAX_BONES, MeshData};

use crate::compress::{SkeletonCounts, compress_skeleton};
use crate::pose::PoseEvaluator;

#[derive(Debug, Clone)]
pub struct Model {
    mesh: MeshData,
    max_bones: usize,
    evaluator: PoseEvaluator,
    /// Counts before compression, for diagnostics
    before: SkeletonCounts,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(MAX_BONES)
    }
}

impl Model {
    /// Empty model with the given bone palette budget
    pub fn new(max_bones: usize) -> Self {
        Self {
            mesh: MeshData::default(),
            max_bones,
            evaluator: PoseEvaluator::default(),
            before: SkeletonCounts::default(),
        }
    }

    /// Install `mesh` as the active mesh.
    ///
    /// Returns `false` and keeps the current mesh when `mesh` has no vertices
    /// or no indices.
    pub fn set_mesh(&mut self, mesh: MeshData) -> bool {
        let before = SkeletonCounts::of(&mesh);
        self.install(mesh, before)
    }

    /// Install a mesh that may already have been compressed, with the
    /// skeleton counts it had before compression.
    pub fn install(&mut self, mut mesh: MeshData, before: SkeletonCounts) -> bool {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            tracing::warn!(
                "Rejected empty mesh ({} vertices, {} indices)",
                mesh.vertices.len(),
                mesh.indices.len()
            );
            return false;
        }

        // No-op when the loader already compressed it
        compress_skeleton(&mut mesh, self.max_bones);

        self.evaluator = PoseEvaluator::new(&mesh, self.max_bones);
        self.mesh = mesh;
        self.before = before;
        tracing::debug!("Installed mesh: {}", self.summary());
        true
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn max_bones(&self) -> usize {
        self.max_bones
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.has_geometry()
    }

    /// Skinning palette at `seconds` into the clip
    pub fn evaluate_pose(&mut self, seconds: f64) -> &[Mat4] {
        self.evaluator.evaluate(&self.mesh, seconds)
    }

    /// Clip length in seconds, 0 without animation
    pub fn clip_seconds(&self) -> f64 {
        self.mesh.clip_seconds()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.mesh.bounds()
    }

    /// One-line diagnostic of the active mesh
    pub fn summary(&self) -> String {
        format!(
            "verts={}, indices={}, skinned={}, bones={}->{}, channels={}->{}, weightedVerts={}, anim=({}, {})",
            self.mesh.vertices.len(),
            self.mesh.indices.len(),
            self.mesh.skinned,
            self.before.bones,
            self.mesh.bones.len(),
            self.before.channels,
            self.mesh.channels.len(),
            self.mesh.weighted_vertex_count(),
            self.mesh.anim_duration,
            self.mesh.anim_ticks_per_second
        )
    }
}
