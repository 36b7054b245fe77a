//! model-runtime library
//!
//! Render-side half of the model pipeline:
//!
//! - [`compress`] - shrink oversized skeletons to the bone palette budget
//! - [`pose`] - evaluate keyframe tracks into a skinning palette
//! - [`model`] - the active mesh with its evaluator and diagnostics
//! - [`loader`] - background imports with a single-slot [`mailbox`] and watchdog
//! - [`host`] - loader, model and [`playback`] clock wired together
//! - [`config`] - `model.toml` runtime settings

pub mod compress;
pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod mailbox;
pub mod model;
pub mod playback;
pub mod pose;

pub use compress::{SkeletonCounts, compress_skeleton, palette_budget};
pub use config::{ImportMode, RuntimeConfig};
pub use error::{ConfigError, LoadError};
pub use host::ModelHost;
pub use loader::{LoadedMesh, LoaderEvent, ModelLoader, SLOW_IMPORT_HINT};
pub use mailbox::Mailbox;
pub use model::Model;
pub use playback::Playback;
pub use pose::{PoseEvaluator, slerp};
