//! Results configuration.

use crate::error::{Result, ResultsError};
use evaldb_core::{StorageConfig, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which models have their evaluations stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSelection {
    /// Only the model driven by the top-level method.
    #[default]
    TopMethod,
    /// Every model driven directly by some method.
    AllMethods,
    /// Every model.
    All,
    /// No models.
    None,
}

/// Which interfaces have their evaluations stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceSelection {
    /// Only interfaces of simulation models.
    #[default]
    Simulation,
    /// Every interface.
    All,
    /// No interfaces.
    None,
}

/// Configuration of a results run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Container settings.
    pub storage: StorageConfig,

    /// Model evaluation selection.
    pub model_selection: ModelSelection,

    /// Interface evaluation selection.
    pub interface_selection: InterfaceSelection,

    /// Register the container backend.
    #[serde(default = "default_container_backend")]
    pub container_backend: bool,

    /// Register the in-memory backend used for text reports.
    pub memory_backend: bool,
}

fn default_container_backend() -> bool {
    true
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            model_selection: ModelSelection::default(),
            interface_selection: InterfaceSelection::default(),
            container_backend: default_container_backend(),
            memory_backend: false,
        }
    }
}

impl ResultsConfig {
    /// Configuration writing a container at `path`.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            storage: StorageConfig::new(path),
            ..Self::default()
        }
    }

    /// Set the storage configuration.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set the model selection.
    pub fn with_model_selection(mut self, selection: ModelSelection) -> Self {
        self.model_selection = selection;
        self
    }

    /// Set the interface selection.
    pub fn with_interface_selection(mut self, selection: InterfaceSelection) -> Self {
        self.interface_selection = selection;
        self
    }

    /// Enable or disable the container backend.
    pub fn with_container_backend(mut self, enabled: bool) -> Self {
        self.container_backend = enabled;
        self
    }

    /// Enable or disable the in-memory backend.
    pub fn with_memory_backend(mut self, enabled: bool) -> Self {
        self.memory_backend = enabled;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.container_backend {
            self.storage.validate()?;
        }
        Ok(())
    }

    /// Parse and validate a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ResultsError::Storage(StorageError::Serialization(e.to_string())))?;
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
        let config = ResultsConfig::default();
        assert_eq!(config.model_selection, ModelSelection::TopMethod);
        assert_eq!(config.interface_selection, InterfaceSelection::Simulation);
        assert!(config.container_backend);
        assert!(!config.memory_backend);
    }

    #[test]
    fn deserialize_config() {
        let yaml = r#"
storage:
  path: /tmp/study.edb
  chunk_bytes: 4096
model_selection: all_methods
interface_selection: none
memory_backend: true
"#;
        let config = ResultsConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.storage.chunk_bytes, 4096);
        assert_eq!(config.model_selection, ModelSelection::AllMethods);
        assert_eq!(config.interface_selection, InterfaceSelection::None);
        assert!(config.container_backend);
        assert!(config.memory_backend);
    }

    #[test]
    fn invalid_selection_is_rejected() {
        let err = ResultsConfig::from_yaml("model_selection: some").unwrap_err();
        assert_eq!(err.code(), "E804");
    }
}
