//! Sniff command - report container format and text encoding

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use model_import::{TextEncoding, sniff_format};

/// Arguments for the sniff command
#[derive(Args)]
pub struct SniffArgs {
    /// File to examine
    pub file: PathBuf,
}

pub fn execute(args: SniffArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let (encoding, bom_len) = TextEncoding::detect(&bytes);

    println!("{}: {}", args.file.display(), sniff_format(&bytes));
    println!("  Size:     {} bytes", bytes.len());
    println!("  Encoding: {:?} (BOM {} bytes)", encoding, bom_len);
    Ok(())
}
