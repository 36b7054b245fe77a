//! Model CLI - inspect model imports without a renderer
//!
//! # Commands
//!
//! - `model inspect <file>` - Import a file and print the method and model summary
//! - `model sniff <file>` - Print the detected container format and text encoding
//! - `model pose <file> --time <s>` - Evaluate the skinning palette at a clip time
//!
//! # Usage
//!
//! ```bash
//! # Import through the full fallback ladder
//! model inspect character.glb
//!
//! # Fast-fail diagnostics, or static geometry only
//! model inspect character.fbx --no-fallbacks
//! model inspect character.fbx --static-bake
//!
//! # Palette half a second into the clip, as JSON
//! model pose character.glb --time 0.5 --json
//! ```
//!
//! Settings not given on the command line come from `--config` (a
//! `model.toml`) when present. Set `RUST_LOG=debug` for import details.

mod inspect;
mod pose;
mod sniff;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use model_import::{CancelToken, ImportMethod, ImportOptions, Importer};
use model_runtime::{Model, RuntimeConfig};

/// Model CLI - inspect model imports without a renderer
#[derive(Parser)]
#[command(name = "model")]
#[command(about = "Inspect model imports, skeletons and poses")]
#[command(version)]
struct Cli {
    /// Runtime config file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "model.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file and print the method and model summary
    Inspect(inspect::InspectArgs),

    /// Print the detected container format and text encoding
    Sniff(sniff::SniffArgs),

    /// Evaluate the skinning palette at a clip time
    Pose(pose::PoseArgs),
}

/// Import switches shared by commands that load a model
#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// Skip skinning and animation, bake node transforms into the vertices
    #[arg(long)]
    pub static_bake: bool,

    /// Make the first import failure terminal
    #[arg(long)]
    pub no_fallbacks: bool,

    /// Bone palette budget (overrides the config file)
    #[arg(long)]
    pub max_bones: Option<usize>,
}

impl ImportArgs {
    fn options(&self, config: &RuntimeConfig) -> ImportOptions {
        let mut options = config.import_mode.options();
        options.force_static_bake |= self.static_bake;
        options.disable_fallbacks |= self.no_fallbacks;
        options
    }
}

/// Import `path` and install it into a [`Model`]
pub fn load_model(
    path: &Path,
    args: &ImportArgs,
    config: &RuntimeConfig,
) -> Result<(ImportMethod, Model)> {
    let options = args.options(config);
    let imported = Importer::new()
        .import(path, &options, &CancelToken::new())
        .with_context(|| format!("Failed to import {}", path.display()))?;

    let mut model = Model::new(args.max_bones.unwrap_or(config.max_bones));
    if !model.set_mesh(imported.mesh) {
        anyhow::bail!("{} produced no geometry", path.display());
    }
    Ok((imported.method, model))
}

fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("Loading config from {:?}", cli.config);
    let config = RuntimeConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Inspect(args) => inspect::execute(args, &config),
        Commands::Sniff(args) => sniff::execute(args),
        Commands::Pose(args) => pose::execute(args, &config),
    }
}
