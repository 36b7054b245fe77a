//! Animation evaluation
//!
//! [`PoseEvaluator`] turns a clip time into a skinning palette:
//!
//! ```text
//! palette[i] = world[i] * offset[i]
//! world[i]   = world[parent] * local[i]        (root: local[i])
//! local[i]   = T * R * S                        (bind pose, overridden per sub-track)
//! ```
//!
//! Every call recomputes the pose from scratch because playback time may jump
//! (manual scrub). The evaluator keeps its scratch buffers between calls, so
//! steady-state evaluation does not allocate.

use glam::{Mat4, Quat, Vec3, Vec4};
use model_common::{Channel, MeshData, QuatKey, VectorKey};

use crate::compress::palette_budget;

/// Below this, two unit quaternions are treated as parallel
const SLERP_PARALLEL_EPSILON: f32 = 1e-5;

/// Column lengths below this read as unit scale
const SCALE_EPSILON: f32 = 1e-6;

/// Translation, rotation and scale split of a bind-local matrix.
///
/// The rotation is kept as the normalized 3x3 columns rather than a quaternion
/// so an untracked bone recomposes to its bind matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindTransform {
    pub translation: Vec3,
    pub rotation: Mat4,
    pub scale: Vec3,
}

impl BindTransform {
    pub fn from_matrix(m: &Mat4) -> Self {
        let column_scale = |c: Vec4| {
            let len = c.truncate().length();
            if len < SCALE_EPSILON { 1.0 } else { len }
        };
        let scale = Vec3::new(
            column_scale(m.x_axis),
            column_scale(m.y_axis),
            column_scale(m.z_axis),
        );
        let rotation = Mat4::from_cols(
            (m.x_axis.truncate() / scale.x).extend(0.0),
            (m.y_axis.truncate() / scale.y).extend(0.0),
            (m.z_axis.truncate() / scale.z).extend(0.0),
            Vec4::W,
        );
        Self {
            translation: m.w_axis.truncate(),
            rotation,
            scale,
        }
    }
}

/// Reusable pose evaluator for one mesh.
///
/// Build it with [`PoseEvaluator::new`] whenever the mesh changes; it caches
/// the bind decomposition, the channel lookup and a parent-first evaluation
/// order.
#[derive(Debug, Clone)]
pub struct PoseEvaluator {
    /// Bones written to the palette
    palette_len: usize,
    bind: Vec<BindTransform>,
    channel_of: Vec<Option<usize>>,
    /// Parent-first order over the palette bones and their ancestors
    order: Vec<usize>,
    /// Parent used for composition; cycles and invalid links read as roots
    parents: Vec<Option<usize>>,
    world: Vec<Mat4>,
    palette: Vec<Mat4>,
}

impl Default for PoseEvaluator {
    fn default() -> Self {
        Self::new(&MeshData::default(), 0)
    }
}

impl PoseEvaluator {
    pub fn new(mesh: &MeshData, max_bones: usize) -> Self {
        let skinned = mesh.skinned && !mesh.bones.is_empty();
        let palette_len = if skinned {
            palette_budget(max_bones).min(mesh.bones.len())
        } else {
            0
        };
        let (order, parents) = evaluation_order(mesh, palette_len);

        Self {
            palette_len,
            bind: mesh
                .bones
                .iter()
                .map(|b| BindTransform::from_matrix(&b.bind_local))
                .collect(),
            channel_of: mesh.channel_lookup(),
            order,
            parents,
            world: vec![Mat4::IDENTITY; mesh.bones.len()],
            palette: vec![Mat4::IDENTITY; palette_len.max(1)],
        }
    }

    /// Number of matrices [`evaluate`](Self::evaluate) returns
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Evaluate the pose at `seconds` into the skinning palette.
    ///
    /// `mesh` must be the mesh this evaluator was built for. An unskinned or
    /// boneless mesh yields a single identity matrix.
    pub fn evaluate(&mut self, mesh: &MeshData, seconds: f64) -> &[Mat4] {
        if self.palette_len == 0 {
            self.palette[0] = Mat4::IDENTITY;
            return &self.palette;
        }

        let ticks = clip_ticks(mesh, seconds);

        for &bone in &self.order {
            let channel = self.channel_of[bone].and_then(|c| mesh.channels.get(c));
            let local = local_transform(&self.bind[bone], channel, ticks);
            self.world[bone] = match self.parents[bone] {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
        }

        for (i, out) in self.palette.iter_mut().enumerate() {
            *out = self.world[i] * mesh.bones[i].offset;
        }
        &self.palette
    }
}

/// Seconds to ticks, wrapped into the clip when it has a positive length
pub fn clip_ticks(mesh: &MeshData, seconds: f64) -> f64 {
    let ticks = seconds * mesh.ticks_per_second();
    if mesh.anim_duration > 0.0 {
        ticks.rem_euclid(mesh.anim_duration)
    } else {
        ticks
    }
}

/// Parent-first order covering bones `0..palette_len` and their ancestors.
///
/// Storage order is not trusted: each bone's unvisited ancestor chain is
/// collected and emitted top-down. A parent link that is out of range or
/// closes a cycle is cut, so that bone composes as a root.
fn evaluation_order(mesh: &MeshData, palette_len: usize) -> (Vec<usize>, Vec<Option<usize>>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Visit {
        New,
        Pending,
        Done,
    }

    let bones = &mesh.bones;
    let mut state = vec![Visit::New; bones.len()];
    let mut parents = vec![None; bones.len()];
    let mut order = Vec::with_capacity(bones.len());
    let mut chain = Vec::new();

    for start in 0..palette_len {
        chain.clear();
        let mut current = Some(start);
        while let Some(bone) = current {
            if bone >= bones.len() || state[bone] != Visit::New {
                break;
            }
            state[bone] = Visit::Pending;
            chain.push(bone);
            current = bones[bone].parent;
        }

        for &bone in chain.iter().rev() {
            parents[bone] = bones[bone]
                .parent
                .filter(|&p| p < bones.len() && state[p] == Visit::Done);
            state[bone] = Visit::Done;
            order.push(bone);
        }
    }

    (order, parents)
}

/// Local transform of one bone: bind pose with each non-empty sub-track
/// overriding its component.
pub fn local_transform(bind: &BindTransform, channel: Option<&Channel>, ticks: f64) -> Mat4 {
    let Some(channel) = channel else {
        return compose(bind.translation, bind.rotation, bind.scale);
    };

    let translation = sample_vector(&channel.position_keys, ticks).unwrap_or(bind.translation);
    let rotation = sample_rotation(&channel.rotation_keys, ticks)
        .map(Mat4::from_quat)
        .unwrap_or(bind.rotation);
    let scale = sample_vector(&channel.scaling_keys, ticks).unwrap_or(bind.scale);
    compose(translation, rotation, scale)
}

fn compose(translation: Vec3, rotation: Mat4, scale: Vec3) -> Mat4 {
    Mat4::from_translation(translation) * rotation * Mat4::from_scale(scale)
}

/// Bracketing key pair and fraction for `ticks`.
///
/// Linear scan: advance while the next key's time is at or before `ticks`.
/// The fraction is not clamped: times before the first key extrapolate along
/// the first segment, times past the last key hold the last value.
fn bracket<K>(keys: &[K], time: impl Fn(&K) -> f64, ticks: f64) -> (usize, usize, f32) {
    let mut k1 = 0;
    while k1 + 1 < keys.len() && time(&keys[k1 + 1]) <= ticks {
        k1 += 1;
    }
    let k2 = (k1 + 1).min(keys.len() - 1);

    let (t0, t1) = (time(&keys[k1]), time(&keys[k2]));
    let a = if t1 > t0 {
        ((ticks - t0) / (t1 - t0)) as f32
    } else {
        0.0
    };
    (k1, k2, a)
}

fn sample_vector(keys: &[VectorKey], ticks: f64) -> Option<Vec3> {
    match keys {
        [] => None,
        [only] => Some(only.value),
        _ => {
            let (k1, k2, a) = bracket(keys, |k| k.time, ticks);
            Some(keys[k1].value.lerp(keys[k2].value, a))
        }
    }
}

fn sample_rotation(keys: &[QuatKey], ticks: f64) -> Option<Quat> {
    match keys {
        [] => None,
        [only] => Some(only.value),
        _ => {
            let (k1, k2, a) = bracket(keys, |k| k.time, ticks);
            Some(slerp(keys[k1].value, keys[k2].value, a))
        }
    }
}

/// Shortest-path spherical interpolation between unit quaternions.
///
/// Nearly parallel inputs fall back to a normalized linear blend.
pub fn slerp(q0: Quat, q1: Quat, t: f32) -> Quat {
    let mut q1 = q1;
    let mut dot = q0.dot(q1);
    if dot < 0.0 {
        dot = -dot;
        q1 = -q1;
    }

    if 1.0 - dot < SLERP_PARALLEL_EPSILON {
        let blended = Vec4::from(q0).lerp(Vec4::from(q1), t);
        return Quat::from_vec4(blended).normalize();
    }

    let theta = dot.min(1.0).acos();
    let sin_theta = theta.sin();
    let w0 = ((1.0 - t) * theta).sin() / sin_theta;
    let w1 = (t * theta).sin() / sin_theta;
    Quat::from_vec4(Vec4::from(q0) * w0 + Vec4::from(q1) * w1)
}
