//! model-import library
//!
//! Converts model files into [`MeshData`](model_common::MeshData):
//! - OBJ through a direct parser
//! - glTF/GLB through the [`scene`] importer seam and [`convert`]
//! - anything the primary importer rejects through the fallback ladder in [`import`]

pub mod bake;
pub mod convert;
pub mod encoding;
pub mod error;
pub mod fbx_ascii;
pub mod import;
pub mod obj;
pub mod scene;

pub use encoding::{FormatSniff, TextEncoding, decode_text, sniff_format};
pub use error::ImportError;
pub use import::{CancelToken, ImportMethod, ImportOptions, ImportedMesh, Importer};
pub use obj::{load_obj, parse_obj};
pub use scene::{GltfImporter, ReadMode, Scene, SceneImporter};
