//! Storage configuration.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How an existing container file is treated on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// Create a fresh container, discarding any existing file.
    #[default]
    Truncate,
    /// Open an existing container and continue its log.
    Append,
}

/// Configuration for opening a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Container file path.
    pub path: PathBuf,

    /// Open mode.
    pub mode: FileMode,

    /// Target chunk size in bytes for extensible datasets.
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Write buffer size for the record log.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Whether `flush()` also syncs file data to disk.
    #[serde(default = "default_sync_on_flush")]
    pub sync_on_flush: bool,

    /// Tool version recorded as a root attribute on create.
    pub tool_version: String,

    /// Tool source revision recorded as a root attribute on create.
    pub tool_revision: String,
}

fn default_chunk_bytes() -> usize {
    40_000
}
fn default_buffer_size() -> usize {
    64 * 1024
}
fn default_sync_on_flush() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("results.edb"),
            mode: FileMode::Truncate,
            chunk_bytes: default_chunk_bytes(),
            buffer_size: default_buffer_size(),
            sync_on_flush: default_sync_on_flush(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            tool_revision: String::new(),
        }
    }
}

impl StorageConfig {
    /// Configuration for a container at `path` with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the container path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the open mode.
    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the chunk size hint in bytes.
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes;
        self
    }

    /// Set the log write buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set sync on flush.
    pub fn with_sync_on_flush(mut self, sync: bool) -> Self {
        self.sync_on_flush = sync;
        self
    }

    /// Set the tool version and revision recorded on create.
    pub fn with_tool_version(mut self, version: impl Into<String>, revision: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self.tool_revision = revision.into();
        self
    }

    /// Check the configuration for values the container cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StorageError::ConfigValue {
                field: "path".to_string(),
                cause: "must not be empty".to_string(),
            });
        }
        if self.chunk_bytes == 0 {
            return Err(StorageError::ConfigValue {
                field: "chunk_bytes".to_string(),
                cause: "must be greater than zero".to_string(),
            });
        }
        if self.buffer_size == 0 {
            return Err(StorageError::ConfigValue {
                field: "buffer_size".to_string(),
                cause: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| StorageError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.mode, FileMode::Truncate);
        assert_eq!(config.chunk_bytes, 40_000);
        assert!(config.sync_on_flush);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_config() {
        let yaml = r#"
path: /tmp/run.edb
mode: append
chunk_bytes: 8192
tool_version: "6.19"
"#;
        let config = StorageConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/run.edb"));
        assert_eq!(config.mode, FileMode::Append);
        assert_eq!(config.chunk_bytes, 8192);
        assert_eq!(config.buffer_size, 64 * 1024);
        assert_eq!(config.tool_version, "6.19");
    }

    #[test]
    fn zero_chunk_bytes_is_rejected() {
        let err = StorageConfig::from_yaml("chunk_bytes: 0").unwrap_err();
        assert_eq!(err.code(), "E802");
    }

    #[test]
    fn builder_methods() {
        let config = StorageConfig::new("a.edb")
            .with_mode(FileMode::Append)
            .with_chunk_bytes(1024)
            .with_sync_on_flush(false)
            .with_tool_version("1.2.3", "abc123");
        assert_eq!(config.mode, FileMode::Append);
        assert_eq!(config.chunk_bytes, 1024);
        assert!(!config.sync_on_flush);
        assert_eq!(config.tool_revision, "abc123");
    }
}
