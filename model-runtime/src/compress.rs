//! Skeleton compression
//!
//! Imported skeletons can carry far more joints than the skinning shader's
//! bone palette holds. [`compress_skeleton`] keeps a budgeted subset:
//!
//! 1. Rank bones: animated bones first, then by total vertex weight.
//! 2. Greedily keep bones in rank order, each together with its whole
//!    ancestor chain. Candidates whose chain does not fit are skipped.
//! 3. Re-parent kept bones onto their nearest kept ancestor.
//! 4. Move every vertex weight onto the nearest kept ancestor of its bone
//!    and renormalize.
//! 5. Drop channels of removed bones.
//!
//! Meshes already within budget are left untouched, so compression is
//! idempotent.

use model_common::{MeshData, nearest_kept_ancestor};
use smallvec::SmallVec;

/// Output weight slots of one vertex while it is being remapped
type Slots = SmallVec<[(usize, f32); 4]>;

/// Effective palette budget: a zero budget still keeps one root so skinned
/// vertices have a target
pub fn palette_budget(max_bones: usize) -> usize {
    max_bones.max(1)
}

/// Skeleton size of a mesh, recorded before compression for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonCounts {
    pub bones: usize,
    pub channels: usize,
}

impl SkeletonCounts {
    pub fn of(mesh: &MeshData) -> Self {
        Self {
            bones: mesh.bones.len(),
            channels: mesh.channels.len(),
        }
    }
}

/// Rewrite `mesh` in place so it has at most `max_bones` bones.
///
/// Returns `false` when the mesh is unskinned or already within budget; in
/// that case nothing is modified.
pub fn compress_skeleton(mesh: &mut MeshData, max_bones: usize) -> bool {
    let bone_count = mesh.bones.len();
    let budget = palette_budget(max_bones);
    if !mesh.skinned || bone_count <= budget {
        return false;
    }

    let channels_before = mesh.channels.len();
    let kept = select_bones(mesh, budget);

    let mut remap = vec![None; bone_count];
    let mut next = 0;
    for (old, slot) in remap.iter_mut().enumerate() {
        if kept[old] {
            *slot = Some(next);
            next += 1;
        }
    }

    remap_vertices(mesh, &kept, &remap);

    let bones = std::mem::take(&mut mesh.bones);
    mesh.bones = bones
        .iter()
        .enumerate()
        .filter(|(old, _)| kept[*old])
        .map(|(old, bone)| {
            let mut bone = bone.clone();
            bone.parent = bone
                .parent
                .and_then(|p| nearest_kept_ancestor(&bones, &kept, p))
                // A cyclic parent graph can lead back to the bone itself
                .filter(|&ancestor| ancestor != old)
                .and_then(|ancestor| remap[ancestor]);
            bone
        })
        .collect();

    mesh.channels.retain_mut(|channel| match remap.get(channel.bone_index) {
        Some(Some(new)) => {
            channel.bone_index = *new;
            true
        }
        _ => false,
    });

    tracing::info!(
        "Compressed skeleton: bones {} -> {}, channels {} -> {}",
        bone_count,
        mesh.bones.len(),
        channels_before,
        mesh.channels.len()
    );
    true
}

/// Total positive weight each bone receives across all vertices
fn weight_totals(mesh: &MeshData) -> Vec<f32> {
    let mut totals = vec![0.0f32; mesh.bones.len()];
    for vertex in &mesh.vertices {
        for slot in 0..4 {
            let weight = vertex.bone_weights[slot];
            if weight <= 0.0 {
                continue;
            }
            if let Some(total) = totals.get_mut(vertex.bone(slot)) {
                *total += weight;
            }
        }
    }
    totals
}

/// Choose which bones survive; the result always has at least one bone kept.
fn select_bones(mesh: &MeshData, budget: usize) -> Vec<bool> {
    let bones = &mesh.bones;
    let count = bones.len();
    let weights = weight_totals(mesh);

    let mut animated = vec![false; count];
    for channel in &mesh.channels {
        if let Some(flag) = animated.get_mut(channel.bone_index) {
            *flag = true;
        }
    }

    // Stable: equal-ranked bones keep declaration order
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| {
        animated[b]
            .cmp(&animated[a])
            .then(weights[b].total_cmp(&weights[a]))
    });

    let mut kept = vec![false; count];
    let mut kept_count = 0;
    let mut path: Vec<usize> = Vec::new();

    for &candidate in &order {
        if kept_count >= budget {
            break;
        }
        if weights[candidate] <= 0.0 && kept_count > 0 {
            continue;
        }

        // Candidate plus every ancestor not yet kept
        path.clear();
        let mut current = Some(candidate);
        while let Some(bone) = current {
            if bone >= count || kept[bone] || path.contains(&bone) {
                break;
            }
            path.push(bone);
            current = bones[bone].parent;
        }

        if kept_count + path.len() <= budget {
            for &bone in &path {
                kept[bone] = true;
            }
            kept_count += path.len();
        }
    }

    if kept_count == 0 {
        let root = bones.iter().position(|b| b.parent.is_none()).unwrap_or(0);
        kept[root] = true;
    }

    kept
}

fn remap_vertices(mesh: &mut MeshData, kept: &[bool], remap: &[Option<usize>]) {
    let bones = &mesh.bones;
    for vertex in &mut mesh.vertices {
        let mut slots = Slots::new();
        for slot in 0..4 {
            let weight = vertex.bone_weights[slot];
            if weight <= 0.0 {
                continue;
            }
            let old = vertex.bone(slot);
            if old >= bones.len() {
                continue;
            }
            // Orphaned branches lose their weight entirely
            let Some(target) = nearest_kept_ancestor(bones, kept, old).and_then(|a| remap[a])
            else {
                continue;
            };
            deposit(&mut slots, target, weight);
        }

        vertex.bone_indices = [0.0; 4];
        vertex.bone_weights = [0.0; 4];
        for (slot, (bone, weight)) in slots.into_iter().enumerate() {
            vertex.bone_indices[slot] = bone as f32;
            vertex.bone_weights[slot] = weight;
        }
        vertex.normalize_weights();
    }
}

/// Add `weight` for `bone`, merging with an existing slot for the same bone.
///
/// With four distinct bones already present, the smallest slot is evicted
/// only if `weight` is strictly larger; otherwise the weight is dropped.
fn deposit(slots: &mut Slots, bone: usize, weight: f32) {
    if let Some(entry) = slots.iter_mut().find(|(b, _)| *b == bone) {
        entry.1 += weight;
        return;
    }
    if slots.len() < 4 {
        slots.push((bone, weight));
        return;
    }

    let mut smallest = 0;
    for i in 1..slots.len() {
        if slots[i].1 < slots[smallest].1 {
            smallest = i;
        }
    }
    if slots[smallest].1 < weight {
        slots[smallest] = (bone, weight);
    }
}
