//! Skeleton types
//!
//! Bones are identified by their index in [`MeshData::bones`](crate::MeshData).
//! Vertex bone-index slots and animation channels refer to bones by that index.

use glam::Mat4;

/// Bone palette budget of the skinning shader
pub const MAX_BONES: usize = 60;

/// Suffix marker injected by FBX pivot decomposition (`Hips_$AssimpFbx$_Rotation`)
const PIVOT_MARKER: &str = "_$AssimpFbx$_";

/// One skeletal joint
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Normalized joint name
    pub name: String,
    /// Parent bone index, `None` for a root
    pub parent: Option<usize>,
    /// Inverse bind matrix (mesh space -> bone space at bind time)
    pub offset: Mat4,
    /// Rest-pose local transform relative to the parent
    pub bind_local: Mat4,
}

impl Bone {
    /// Root bone with identity offset and bind transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            offset: Mat4::IDENTITY,
            bind_local: Mat4::IDENTITY,
        }
    }
}

/// Recover the logical joint name from an importer-generated pivot node name.
pub fn normalize_bone_name(name: &str) -> &str {
    match name.find(PIVOT_MARKER) {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Walk up from `bone` (inclusive) to the first bone with `kept[i] == true`.
///
/// The walk is bounded by the bone count, so a malformed cyclic parent
/// graph terminates with `None` instead of spinning.
pub fn nearest_kept_ancestor(bones: &[Bone], kept: &[bool], bone: usize) -> Option<usize> {
    let mut current = Some(bone);
    for _ in 0..=bones.len() {
        let index = current?;
        if index >= bones.len() {
            return None;
        }
        if kept[index] {
            return Some(index);
        }
        current = bones[index].parent;
    }
    None
}
