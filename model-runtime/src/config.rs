//! Runtime configuration (`model.toml`)
//!
//! Every field has a default, so a partial file (or no file at all) loads.
//!
//! ```toml
//! import_mode = "skip_fallbacks"
//! watchdog_ms = 8000
//! max_bones = 60
//!
//! [playback]
//! enabled = false
//! position = 0.5
//! ```

use std::path::Path;
use std::time::Duration;

use model_common::MAX_BONES;
use model_import::ImportOptions;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::playback::Playback;

/// How hard the importer tries before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Primary import, then the fallback ladder
    #[default]
    Auto,
    /// First failure is terminal
    SkipFallbacks,
    /// Static geometry only: no skinning or animation
    StaticBake,
}

impl ImportMode {
    pub fn options(self) -> ImportOptions {
        ImportOptions {
            force_static_bake: self == Self::StaticBake,
            disable_fallbacks: self == Self::SkipFallbacks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub import_mode: ImportMode,
    /// Import duration after which a slow-import hint is shown (default: 8000)
    #[serde(default = "default_watchdog_ms")]
    pub watchdog_ms: u64,
    /// Bone palette budget (default: 60)
    #[serde(default = "default_max_bones")]
    pub max_bones: usize,
    #[serde(default)]
    pub playback: Playback,
}

fn default_watchdog_ms() -> u64 {
    8000
}
fn default_max_bones() -> usize {
    MAX_BONES
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            import_mode: ImportMode::default(),
            watchdog_ms: default_watchdog_ms(),
            max_bones: default_max_bones(),
            playback: Playback::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.import_mode, ImportMode::Auto);
        assert_eq!(config.watchdog_ms, 8000);
        assert_eq!(config.max_bones, 60);
        assert!(config.playback.enabled);
        assert_eq!(config.playback.speed, 1.0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            import_mode = "static_bake"

            [playback]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.import_mode, ImportMode::StaticBake);
        assert_eq!(config.watchdog_ms, 8000);
        assert!(!config.playback.enabled);
        assert_eq!(config.playback.speed, 1.0);
    }

    #[test]
    fn test_import_mode_options() {
        assert_eq!(ImportMode::Auto.options(), ImportOptions::default());
        assert!(ImportMode::SkipFallbacks.options().disable_fallbacks);
        assert!(ImportMode::StaticBake.options().force_static_bake);
        assert!(!ImportMode::StaticBake.options().disable_fallbacks);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        assert_eq!(RuntimeConfig::load(&path).unwrap(), RuntimeConfig::default());

        let config = RuntimeConfig {
            import_mode: ImportMode::SkipFallbacks,
            max_bones: 32,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RuntimeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        std::fs::write(&path, "max_bones = \"many\"").unwrap();
        assert!(matches!(RuntimeConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
