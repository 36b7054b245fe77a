//! Keyframe tracks
//!
//! Key times are in ticks, not seconds. Each sub-track is assumed sorted by
//! time and is never re-sorted.

use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorKey {
    pub time: f64,
    pub value: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f64,
    pub value: Quat,
}

/// Animation track for exactly one bone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub bone_index: usize,
    pub position_keys: Vec<VectorKey>,
    pub rotation_keys: Vec<QuatKey>,
    pub scaling_keys: Vec<VectorKey>,
}

impl Channel {
    pub fn new(bone_index: usize) -> Self {
        Self {
            bone_index,
            ..Default::default()
        }
    }
}
