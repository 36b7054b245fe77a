//! Interleaved vertex record
//!
//! Every vertex is 16 `f32` values laid out as:
//!
//! ```text
//! [0..3)   position
//! [3..6)   normal
//! [6..8)   uv
//! [8..12)  bone indices (integral values stored as f32)
//! [12..16) bone weights
//! ```
//!
//! Weights either sum to ~1.0 or are all zero. All-zero weights mean the
//! vertex is rigid and the renderer must not skin it.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Number of scalars per vertex
pub const VERTEX_FLOATS: usize = 16;

/// Weight sums at or below this are treated as "no weights"
pub const WEIGHT_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone_indices: [f32; 4],
    pub bone_weights: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == VERTEX_FLOATS * 4);

impl Vertex {
    /// Unskinned vertex (all weight slots zero)
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            bone_indices: [0.0; 4],
            bone_weights: [0.0; 4],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    /// Bone index stored in `slot`
    #[inline]
    pub fn bone(&self, slot: usize) -> usize {
        self.bone_indices[slot] as usize
    }

    pub fn weight_sum(&self) -> f32 {
        self.bone_weights.iter().sum()
    }

    /// True if any slot carries a positive weight
    pub fn is_weighted(&self) -> bool {
        self.bone_weights.iter().any(|&w| w > 0.0)
    }

    /// Deposit a (bone, weight) pair using the import slot policy.
    ///
    /// The first slot with a non-positive weight is used; when all four are
    /// occupied the slot holding the smallest weight is overwritten, even if
    /// the incoming weight is smaller.
    pub fn add_influence(&mut self, bone: usize, weight: f32) {
        let slot = match self.bone_weights.iter().position(|&w| w <= 0.0) {
            Some(free) => free,
            None => smallest_slot(&self.bone_weights),
        };
        self.bone_indices[slot] = bone as f32;
        self.bone_weights[slot] = weight;
    }

    /// Scale the weights to sum to 1.0, or zero them when the sum is negligible.
    pub fn normalize_weights(&mut self) {
        let sum = self.weight_sum();
        if sum > WEIGHT_EPSILON {
            for w in &mut self.bone_weights {
                *w /= sum;
            }
        } else {
            self.bone_weights = [0.0; 4];
        }
    }
}

/// Index of the smallest weight (first one wins on ties)
pub fn smallest_slot(weights: &[f32; 4]) -> usize {
    let mut slot = 0;
    for i in 1..4 {
        if weights[i] < weights[slot] {
            slot = i;
        }
    }
    slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        let v = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, Vec2::new(0.5, 0.25));
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats.len(), VERTEX_FLOATS);
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[3..6], &[0.0, 0.0, 1.0]);
        assert_eq!(&floats[6..8], &[0.5, 0.25]);
        assert_eq!(&floats[12..16], &[0.0; 4]);
    }

    #[test]
    fn test_add_influence_fills_free_slots_first() {
        let mut v = Vertex::default();
        v.add_influence(3, 0.5);
        v.add_influence(7, 0.25);
        assert_eq!(v.bone_indices, [3.0, 7.0, 0.0, 0.0]);
        assert_eq!(v.bone_weights, [0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_add_influence_replaces_smallest_even_if_smaller() {
        let mut v = Vertex::default();
        v.add_influence(0, 0.4);
        v.add_influence(1, 0.1);
        v.add_influence(2, 0.3);
        v.add_influence(3, 0.2);
        // Full: the 0.1 slot gets overwritten by a smaller weight
        v.add_influence(9, 0.05);
        assert_eq!(v.bone(1), 9);
        assert_eq!(v.bone_weights[1], 0.05);
    }

    #[test]
    fn test_normalize_weights() {
        let mut v = Vertex::default();
        v.add_influence(0, 2.0);
        v.add_influence(1, 2.0);
        v.normalize_weights();
        assert!((v.weight_sum() - 1.0).abs() < 1e-6);
        assert_eq!(v.bone_weights[0], 0.5);

        let mut tiny = Vertex::default();
        tiny.bone_weights = [1e-8, 0.0, 0.0, 0.0];
        tiny.normalize_weights();
        assert_eq!(tiny.bone_weights, [0.0; 4]);
        assert!(!tiny.is_weighted());
    }
}
