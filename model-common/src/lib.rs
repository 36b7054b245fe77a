//! Shared mesh, skeleton and animation types
//!
//! This crate holds the in-memory model representation shared between:
//! - `model-import` (file and scene conversion)
//! - `model-runtime` (skeleton compression and pose evaluation)
//! - `model-cli` (inspection tools)
//!
//! # Modules
//!
//! - [`vertex`] - Interleaved 16-float vertex record and weight slot helpers
//! - [`skeleton`] - Bones, hierarchy helpers and bone name normalization
//! - [`animation`] - Keyframe and channel types for the single animation clip
//! - [`mesh`] - The [`MeshData`] root artifact and its bounds

pub mod animation;
pub mod mesh;
pub mod skeleton;
pub mod vertex;

pub use animation::{Channel, QuatKey, VectorKey};
pub use mesh::{Aabb, DEFAULT_TICKS_PER_SECOND, MeshData};
pub use skeleton::{Bone, MAX_BONES, nearest_kept_ancestor, normalize_bone_name};
pub use vertex::{VERTEX_FLOATS, Vertex, WEIGHT_EPSILON};
