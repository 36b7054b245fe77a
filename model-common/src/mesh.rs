//! Mesh Data Model
//!
//! [`MeshData`] is built once per import and replaced wholesale by the next
//! import. The skeleton compressor may rewrite it once before it is handed to
//! the renderer; after that it is read-only.

use glam::Vec3;

use crate::animation::Channel;
use crate::skeleton::Bone;
use crate::vertex::Vertex;

/// Tick rate used when a clip reports zero or a negative rate
pub const DEFAULT_TICKS_PER_SECOND: f64 = 25.0;

/// Root artifact of an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Triangle list, always a multiple of 3
    pub indices: Vec<u32>,
    /// True iff any source sub-mesh carried bone weights
    pub skinned: bool,
    pub bones: Vec<Bone>,
    /// At most one channel per bone
    pub channels: Vec<Channel>,
    /// Clip length in ticks
    pub anim_duration: f64,
    pub anim_ticks_per_second: f64,
}

impl MeshData {
    /// True when there is at least one triangle to draw
    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty() && self.indices.len() >= 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat view of the vertex buffer (16 floats per vertex)
    pub fn vertex_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Vertices with at least one positive weight
    pub fn weighted_vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_weighted()).count()
    }

    /// Clip tick rate with the default applied
    pub fn ticks_per_second(&self) -> f64 {
        if self.anim_ticks_per_second > 0.0 {
            self.anim_ticks_per_second
        } else {
            DEFAULT_TICKS_PER_SECOND
        }
    }

    /// Clip length in seconds (0 when there is no clip)
    pub fn clip_seconds(&self) -> f64 {
        if self.anim_duration > 0.0 {
            self.anim_duration / self.ticks_per_second()
        } else {
            0.0
        }
    }

    /// Bone index -> channel index lookup
    pub fn channel_lookup(&self) -> Vec<Option<usize>> {
        let mut lookup = vec![None; self.bones.len()];
        for (i, channel) in self.channels.iter().enumerate() {
            if let Some(slot) = lookup.get_mut(channel.bone_index) {
                slot.get_or_insert(i);
            }
        }
        lookup
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(Vertex::position))
    }
}

/// Axis-aligned bounding box of the bind-pose vertex positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Uniform scale that fits the largest axis into a unit length
    pub fn normalize_factor(&self) -> f32 {
        let largest = self.extent().max_element();
        if largest > 1e-6 { 1.0 / largest } else { 1.0 }
    }
}
