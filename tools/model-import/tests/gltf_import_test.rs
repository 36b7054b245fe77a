//! Integration tests for the glTF/GLB import pipeline.
//!
//! Tests the complete flow:
//! 1. Generate GLB programmatically
//! 2. Import through the ladder (primary, memory and static tiers)
//! 3. Validate merged geometry, skeleton and animation


use glam::{Mat4, Quat, Vec3};
use tempfile::tempdir;

use model_import::convert::scene_to_mesh;
use model_import::{
    CancelToken, GltfImporter, ImportMethod, ImportOptions, Importer, ReadMode, SceneImporter,
    sniff_format,
};

fn write_glb(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("skinned.glb");
    std::fs::write(&path, glb_builder::generate_skinned_glb()).expect("Failed to write GLB");
    path
}

#[test]
fn test_primary_import_builds_skeleton_and_clip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_glb(&dir);

    let imported = Importer::new()
        .import(&path, &ImportOptions::default(), &CancelToken::new())
        .expect("Import failed");
    assert_eq!(imported.method, ImportMethod::Primary);

    let mesh = imported.mesh;
    assert_eq!(mesh.vertices.len(), glb_builder::VERTEX_COUNT);
    assert_eq!(mesh.indices.len(), glb_builder::INDEX_COUNT);
    assert!(mesh.skinned);

    // Bones in skin joint order, hierarchy from the node tree
    assert_eq!(mesh.bones.len(), 2);
    assert_eq!(mesh.bones[0].name, "Root");
    assert_eq!(mesh.bones[1].name, "Arm");
    assert_eq!(mesh.bones[0].parent, None);
    assert_eq!(mesh.bones[1].parent, Some(0));
    assert_eq!(
        mesh.bones[1].bind_local,
        Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))
    );
    assert_eq!(
        mesh.bones[1].offset,
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))
    );

    // Every vertex is weighted and normalized
    for v in &mesh.vertices {
        assert!((v.weight_sum() - 1.0).abs() < 1e-5);
    }
    let split = &mesh.vertices[2];
    assert_eq!(split.bone_weights[..2], [0.5, 0.5]);

    // Camera track is not a bone and is dropped
    assert_eq!(mesh.channels.len(), 1);
    let channel = &mesh.channels[0];
    assert_eq!(channel.bone_index, 1);
    assert_eq!(channel.rotation_keys.len(), 2);
    assert!(channel.position_keys.is_empty());
    assert_eq!(channel.rotation_keys[1].time, 1000.0);
    let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    assert!(channel.rotation_keys[1].value.dot(expected).abs() > 0.9999);

    assert_eq!(mesh.anim_ticks_per_second, 1000.0);
    assert_eq!(mesh.anim_duration, 1000.0);
    assert!((mesh.clip_seconds() - 1.0).abs() < 1e-9);
}

#[test]
fn test_force_static_bake_drops_skinning() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write_glb(&dir);

    let options = ImportOptions {
        force_static_bake: true,
        ..Default::default()
    };
    let imported = Importer::new()
        .import(&path, &options, &CancelToken::new())
        .expect("Import failed");

    assert_eq!(imported.method, ImportMethod::StaticBake);
    let mesh = imported.mesh;
    assert!(!mesh.skinned);
    assert!(mesh.bones.is_empty());
    assert!(mesh.channels.is_empty());
    assert_eq!(mesh.anim_duration, 0.0);
    assert_eq!(mesh.indices.len(), glb_builder::INDEX_COUNT);
    assert_eq!(mesh.weighted_vertex_count(), 0);
}

#[test]
fn test_memory_decode_matches_file_decode() {
    let bytes = glb_builder::generate_skinned_glb();
    let scene = GltfImporter
        .read_memory(&bytes, "glb", ReadMode::Skeletal)
        .expect("Memory decode failed");

    // Synthetic root plus the four file nodes
    assert_eq!(scene.nodes.len(), 5);
    assert_eq!(scene.nodes[scene.root].name, "RootNode");
    assert_eq!(scene.animations.len(), 1);
    assert_eq!(scene.animations[0].channels.len(), 2);

    let mesh = scene_to_mesh(&scene).expect("Conversion failed");
    assert_eq!(mesh.bones.len(), 2);
    assert_eq!(mesh.channels.len(), 1);
}

#[test]
fn test_static_read_skips_skins_and_animation() {
    let bytes = glb_builder::generate_skinned_glb();
    let scene = GltfImporter
        .read_memory(&bytes, "glb", ReadMode::Static)
        .expect("Memory decode failed");
    assert!(scene.animations.is_empty());
    assert!(scene.meshes.iter().all(|m| m.bones.is_empty()));
}

#[test]
fn test_sniff_reports_glb() {
    let bytes = glb_builder::generate_skinned_glb();
    assert_eq!(sniff_format(&bytes).to_string(), "glTF binary v2");
}

#[test]
fn test_corrupt_glb_exhausts_ladder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut bytes = glb_builder::generate_skinned_glb();
    bytes.truncate(40);
    let path = dir.path().join("broken.glb");
    std::fs::write(&path, &bytes).expect("Failed to write GLB");

    let err = Importer::new()
        .import(&path, &ImportOptions::default(), &CancelToken::new())
        .expect_err("Truncated GLB must not import");
    let message = err.to_string();
    assert!(message.contains("primary:"), "{message}");
    assert!(message.contains("static bake:"), "{message}");
    // No text tier for glb
    assert!(!message.contains("ascii text:"), "{message}");
    assert!(message.contains("format=glTF binary v2"), "{message}");
}
