//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Engine configuration, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path of the durable store file. Ignored in memory mode.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Keep all state in memory; nothing survives the process.
    #[serde(default)]
    pub memory_mode: bool,

    /// Rows shown by previews when the caller gives no count.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Hard cap on rows in a full materialization.
    #[serde(default = "default_max_preview_rows")]
    pub max_preview_rows: usize,

    /// Allow the script escape hatch. Only meaningful when the
    /// `unsafe-exec` feature is compiled in.
    #[serde(default)]
    pub allow_scripts: bool,
}

fn default_preview_rows() -> usize {
    5
}

fn default_max_preview_rows() -> usize {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            memory_mode: true,
            preview_rows: default_preview_rows(),
            max_preview_rows: default_max_preview_rows(),
            allow_scripts: false,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(handledb_store::StoreError::from)?;
        toml::from_str(&text)
            .map_err(|e| EngineError::InvalidParameter(format!("config parse error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.memory_mode);
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.max_preview_rows, 1000);
        assert!(!config.allow_scripts);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig =
            toml::from_str("store_path = \"/tmp/handles.db\"\npreview_rows = 10").unwrap();
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/handles.db")));
        assert_eq!(config.preview_rows, 10);
        assert_eq!(config.max_preview_rows, 1000);
        assert!(!config.memory_mode);
    }
}
