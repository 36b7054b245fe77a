//! Pose command - evaluate the skinning palette at one clip time

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use model_runtime::RuntimeConfig;
use serde::Serialize;

use crate::{ImportArgs, load_model};

/// Arguments for the pose command
#[derive(Args)]
pub struct PoseArgs {
    /// Model file (.obj, .gltf, .glb, .fbx)
    pub file: PathBuf,

    /// Clip time in seconds (wraps around the clip length)
    #[arg(long, default_value_t = 0.0)]
    pub time: f64,

    /// Print the palette as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub import: ImportArgs,
}

/// JSON shape of `model pose --json`
#[derive(Debug, Serialize)]
struct PoseReport {
    time: f64,
    clip_seconds: f64,
    bone_names: Vec<String>,
    /// Column-major 4x4 matrices
    palette: Vec<[f32; 16]>,
}

pub fn execute(args: PoseArgs, config: &RuntimeConfig) -> Result<()> {
    let (_, mut model) = load_model(&args.file, &args.import, config)?;
    let report = build_report(&mut model, args.time);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "=== {} @ {:.3}s (clip {:.3}s) ===",
        args.file.display(),
        report.time,
        report.clip_seconds
    );
    for (i, m) in report.palette.iter().enumerate() {
        let name = report.bone_names.get(i).map_or("<identity>", String::as_str);
        println!("  [{i:>3}] {name}");
        for row in 0..4 {
            println!(
                "        {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                m[row],
                m[4 + row],
                m[8 + row],
                m[12 + row]
            );
        }
    }
    Ok(())
}

fn build_report(model: &mut model_runtime::Model, time: f64) -> PoseReport {
    let clip_seconds = model.clip_seconds();
    let palette: Vec<[f32; 16]> = model
        .evaluate_pose(time)
        .iter()
        .map(|m| m.to_cols_array())
        .collect();
    let mesh = model.mesh();
    let bone_names = if mesh.skinned {
        mesh.bones
            .iter()
            .take(palette.len())
            .map(|b| b.name.clone())
            .collect()
    } else {
        Vec::new()
    };
    PoseReport {
        time,
        clip_seconds,
        bone_names,
        palette,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_runtime::Model;

    #[test]
    fn test_static_model_report() {
        let mesh = model_import::parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let mut model = Model::default();
        model.set_mesh(mesh);

        let report = build_report(&mut model, 0.25);
        assert_eq!(report.palette.len(), 1);
        assert!(report.bone_names.is_empty());
        assert_eq!(report.clip_seconds, 0.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["palette"][0][0], 1.0);
        assert_eq!(json["palette"][0][15], 1.0);
    }
}
