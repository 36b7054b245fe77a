//! Inspect command - import a file and report what came out

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use model_runtime::RuntimeConfig;

use crate::{ImportArgs, load_model};

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// Model file (.obj, .gltf, .glb, .fbx)
    pub file: PathBuf,

    #[command(flatten)]
    pub import: ImportArgs,
}

pub fn execute(args: InspectArgs, config: &RuntimeConfig) -> Result<()> {
    let (method, model) = load_model(&args.file, &args.import, config)?;
    let mesh = model.mesh();

    println!("=== {} ===", args.file.display());
    println!("  Method:    {}", method.label());
    println!("  Summary:   {}", model.summary());
    println!("  Triangles: {}", mesh.triangle_count());
    println!(
        "  Vertex buffer: {} floats ({} bytes)",
        mesh.vertex_floats().len(),
        std::mem::size_of_val(mesh.vertex_floats())
    );
    if let Some(bounds) = model.bounds() {
        println!(
            "  Bounds:    min {:?} max {:?} center {:?} (normalize x{:.4})",
            bounds.min.to_array(),
            bounds.max.to_array(),
            bounds.center().to_array(),
            bounds.normalize_factor()
        );
    }
    if mesh.anim_duration > 0.0 {
        println!("  Clip:      {:.3}s", model.clip_seconds());
    }

    if !mesh.bones.is_empty() {
        println!("  Bones:");
        for (i, bone) in mesh.bones.iter().enumerate() {
            let parent = bone
                .parent
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            println!("    [{i:>3}] {} (parent {parent})", bone.name);
        }
    }
    Ok(())
}
