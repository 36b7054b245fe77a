//! Skeleton compression on a large synthetic skeleton.

use glam::{Vec2, Vec3};
use model_common::{Bone, Channel, MeshData, Vertex};
use model_runtime::{Model, compress_skeleton};

const BONES: usize = 70;
const BUDGET: usize = 60;

fn parent_of(i: usize) -> Option<usize> {
    if i == 0 { None } else { Some((i - 1) / 2) }
}

/// Binary-tree skeleton, one vertex per bone, channels on every tenth bone
fn oversized_mesh() -> MeshData {
    let bones = (0..BONES)
        .map(|i| {
            let mut bone = Bone::new(format!("bone{i}"));
            bone.parent = parent_of(i);
            bone
        })
        .collect();

    let vertices = (0..BONES)
        .map(|i| {
            let mut v = Vertex::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::Y, Vec2::ZERO);
            v.add_influence(i, 0.6);
            v.add_influence((i + 7) % BONES, 0.4);
            v
        })
        .collect();

    MeshData {
        vertices,
        indices: (0..BONES as u32 - 2).flat_map(|i| [i, i + 1, i + 2]).collect(),
        skinned: true,
        bones,
        channels: (0..BONES).step_by(10).map(Channel::new).collect(),
        anim_duration: 10.0,
        anim_ticks_per_second: 25.0,
    }
}

fn original_index(name: &str) -> usize {
    name.trim_start_matches("bone").parse().expect("bone name")
}

#[test]
fn test_compresses_to_budget_with_ancestor_chains() {
    let mut mesh = oversized_mesh();
    assert!(compress_skeleton(&mut mesh, BUDGET));
    assert!(mesh.bones.len() <= BUDGET);

    for bone in &mesh.bones {
        let original = original_index(&bone.name);
        match parent_of(original) {
            None => assert_eq!(bone.parent, None),
            Some(original_parent) => {
                // Parent chains are kept whole, so the direct parent survives
                let parent = bone.parent.expect("kept bone lost its parent");
                assert_eq!(mesh.bones[parent].name, format!("bone{original_parent}"));
            }
        }
    }
}

#[test]
fn test_weights_stay_normalized() {
    let mut mesh = oversized_mesh();
    compress_skeleton(&mut mesh, BUDGET);
    for v in &mesh.vertices {
        assert!((v.weight_sum() - 1.0).abs() < 1e-5, "sum {}", v.weight_sum());
        for slot in 0..4 {
            if v.bone_weights[slot] > 0.0 {
                assert!(v.bone(slot) < mesh.bones.len());
            }
        }
    }
}

#[test]
fn test_animated_bones_survive() {
    let mut mesh = oversized_mesh();
    compress_skeleton(&mut mesh, BUDGET);
    assert_eq!(mesh.channels.len(), 7);
    for channel in &mesh.channels {
        let name = &mesh.bones[channel.bone_index].name;
        assert_eq!(original_index(name) % 10, 0);
    }
}

#[test]
fn test_compression_is_idempotent() {
    let mut mesh = oversized_mesh();
    compress_skeleton(&mut mesh, BUDGET);
    let once = mesh.clone();
    assert!(!compress_skeleton(&mut mesh, BUDGET));
    assert_eq!(mesh, once);
}

#[test]
fn test_model_reports_before_and_after() {
    let mut model = Model::new(BUDGET);
    assert!(model.set_mesh(oversized_mesh()));
    let summary = model.summary();
    assert!(
        summary.contains(&format!("bones=70->{}", model.mesh().bones.len())),
        "{summary}"
    );
    assert!(summary.contains("channels=7->7"), "{summary}");
    assert_eq!(model.evaluate_pose(0.0).len(), model.mesh().bones.len());
}
