//! Host glue: loader, model and playback clock driven from the render thread.
//!
//! The host calls [`ModelHost::poll`] at a point it controls (typically once
//! per frame, before drawing) and [`ModelHost::frame`] to get the palette.
//! A mesh is only ever installed from `poll`, so GPU-visible state changes
//! happen on the render thread.

use std::path::Path;

use glam::Mat4;

use crate::config::RuntimeConfig;
use crate::error::LoadError;
use crate::loader::{LoaderEvent, ModelLoader, SLOW_IMPORT_HINT};
use crate::model::Model;
use crate::playback::Playback;

pub struct ModelHost {
    loader: ModelLoader,
    model: Model,
    config: RuntimeConfig,
    status: String,
    last_error: Option<String>,
}

impl ModelHost {
    pub fn new(config: RuntimeConfig) -> Self {
        let loader = ModelLoader::new(config.watchdog()).with_max_bones(config.max_bones);
        Self::with_loader(config, loader)
    }

    /// Use a prebuilt loader; its bone budget should match `config.max_bones`
    pub fn with_loader(config: RuntimeConfig, loader: ModelLoader) -> Self {
        Self {
            loader,
            model: Model::new(config.max_bones),
            config,
            status: String::from("no model"),
            last_error: None,
        }
    }

    /// Queue an import of `path` using the configured import mode
    pub fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        self.loader.request(path, self.config.import_mode.options())?;
        self.status = format!("loading {}", path.display());
        Ok(())
    }

    /// Install a finished import, if any.
    ///
    /// Returns `true` when a new mesh became active. A failed import leaves
    /// the current mesh in place and records the reason.
    pub fn poll(&mut self) -> bool {
        match self.loader.poll() {
            LoaderEvent::Idle => false,
            LoaderEvent::Running { slow } => {
                if slow {
                    self.status = SLOW_IMPORT_HINT.to_string();
                }
                false
            }
            LoaderEvent::Loaded(loaded) => {
                let method = loaded.imported.method.label();
                if self.model.install(loaded.imported.mesh, loaded.before) {
                    self.status = format!("loaded via {}: {}", method, self.model.summary());
                    true
                } else {
                    self.fail(format!("{method} import produced no geometry"));
                    false
                }
            }
            LoaderEvent::Failed(reason) => {
                self.fail(reason);
                false
            }
        }
    }

    fn fail(&mut self, reason: String) {
        self.status = format!("import failed: {reason}");
        self.last_error = Some(reason);
    }

    /// Skinning palette for `elapsed` host seconds
    pub fn frame(&mut self, elapsed: f64) -> &[Mat4] {
        let seconds = self
            .config
            .playback
            .seconds(elapsed, self.model.clip_seconds());
        self.model.evaluate_pose(seconds)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_busy()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Most recent failure reason; kept across later successful loads
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn playback(&self) -> &Playback {
        &self.config.playback
    }

    pub fn set_playback(&mut self, playback: Playback) {
        self.config.playback = playback;
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
