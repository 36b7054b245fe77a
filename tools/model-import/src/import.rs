//! Import request and fallback ladder
//!
//! ```text
//! primary        read_file(Skeletal) -> convert
//!   (a) memory   transcode UTF-16 if needed, read_memory(Skeletal) -> convert
//!   (b) static   read_file(Static) -> bake
//!   (c) text     ASCII FBX geometry reader (.fbx only)
//! ```
//!
//! Each tier runs only if the previous one failed. With fallbacks disabled the
//! first failure is terminal. OBJ files bypass the ladder entirely.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use model_common::MeshData;

use crate::bake::bake_static;
use crate::convert::scene_to_mesh;
use crate::encoding::{TextEncoding, decode_text, sniff_format};
use crate::error::ImportError;
use crate::fbx_ascii::parse_fbx_ascii;
use crate::obj::load_obj;
use crate::scene::{GltfImporter, ReadMode, SceneImporter};

/// Caller switches for one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Skip skinning and animation, go straight to the static tier
    pub force_static_bake: bool,
    /// Make the first failure terminal
    pub disable_fallbacks: bool,
}

/// Which path produced the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMethod {
    Obj,
    Primary,
    MemoryRedecode,
    StaticBake,
    TextFallback,
}

impl ImportMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Primary => "primary",
            Self::MemoryRedecode => "memory re-decode",
            Self::StaticBake => "static bake",
            Self::TextFallback => "ascii text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportedMesh {
    pub mesh: MeshData,
    pub method: ImportMethod,
}

/// Cooperative stop flag shared with a background import.
///
/// Checked between ladder tiers; a tier already running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), ImportError> {
        if self.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Lowercase file extension, empty when absent
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

pub struct Importer {
    backend: Box<dyn SceneImporter>,
}

impl Default for Importer {
    fn default() -> Self {
        Self::with_backend(Box::new(GltfImporter))
    }
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: Box<dyn SceneImporter>) -> Self {
        Self { backend }
    }

    pub fn import(
        &self,
        path: &Path,
        options: &ImportOptions,
        cancel: &CancelToken,
    ) -> Result<ImportedMesh, ImportError> {
        cancel.check()?;
        let ext = extension_of(path);

        if ext == "obj" {
            return Ok(ImportedMesh {
                mesh: load_obj(path)?,
                method: ImportMethod::Obj,
            });
        }

        let bytes = std::fs::read(path).map_err(|e| ImportError::io(path, e))?;
        if bytes.is_empty() {
            return Err(ImportError::EmptyFile);
        }

        let mut attempts: Vec<String> = Vec::new();
        let mut fail = |tier: &str, err: ImportError| {
            tracing::warn!("{} import of {:?} failed: {}", tier, path, err);
            attempts.push(format!("{tier}: {err}"));
        };

        if options.force_static_bake {
            match self.static_tier(path) {
                Ok(mesh) => return Ok(self.done(path, mesh, ImportMethod::StaticBake)),
                Err(err) => fail("static bake", err),
            }
        } else {
            match self.primary_tier(path) {
                Ok(mesh) => return Ok(self.done(path, mesh, ImportMethod::Primary)),
                Err(err) => fail("primary", err),
            }

            if !options.disable_fallbacks {
                cancel.check()?;
                match self.memory_tier(&bytes, &ext) {
                    Ok(mesh) => return Ok(self.done(path, mesh, ImportMethod::MemoryRedecode)),
                    Err(err) => fail("memory re-decode", err),
                }

                cancel.check()?;
                match self.static_tier(path) {
                    Ok(mesh) => return Ok(self.done(path, mesh, ImportMethod::StaticBake)),
                    Err(err) => fail("static bake", err),
                }
            }
        }

        if !options.disable_fallbacks && ext == "fbx" {
            cancel.check()?;
            match parse_fbx_ascii(&decode_text(&bytes)) {
                Ok(mesh) => return Ok(self.done(path, mesh, ImportMethod::TextFallback)),
                Err(err) => fail("ascii text", err),
            }
        }

        Err(ImportError::Exhausted {
            attempts,
            sniff: sniff_format(&bytes).to_string(),
        })
    }

    fn ensure_supported(&self, ext: &str) -> Result<(), ImportError> {
        if self.backend.supports_extension(ext) {
            Ok(())
        } else {
            Err(ImportError::UnsupportedFormat(format!(
                "no {} backend for .{ext}",
                self.backend.name()
            )))
        }
    }

    fn primary_tier(&self, path: &Path) -> Result<MeshData, ImportError> {
        self.ensure_supported(&extension_of(path))?;
        let scene = self.backend.read_file(path, ReadMode::Skeletal)?;
        scene_to_mesh(&scene)
    }

    fn memory_tier(&self, bytes: &[u8], ext: &str) -> Result<MeshData, ImportError> {
        self.ensure_supported(ext)?;
        let (encoding, _) = TextEncoding::detect(bytes);
        let scene = if encoding.is_utf16() {
            let text = decode_text(bytes);
            self.backend
                .read_memory(text.as_bytes(), ext, ReadMode::Skeletal)?
        } else {
            self.backend.read_memory(bytes, ext, ReadMode::Skeletal)?
        };
        scene_to_mesh(&scene)
    }

    fn static_tier(&self, path: &Path) -> Result<MeshData, ImportError> {
        self.ensure_supported(&extension_of(path))?;
        let scene = self.backend.read_file(path, ReadMode::Static)?;
        bake_static(&scene)
    }

    fn done(&self, path: &Path, mesh: MeshData, method: ImportMethod) -> ImportedMesh {
        tracing::info!(
            "Imported {:?} via {}: {} vertices, {} indices, {} bones",
            path,
            method.label(),
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.bones.len()
        );
        ImportedMesh { mesh, method }
    }
}
