//! Error types for evaldb storage.
//!
//! Every error carries the object path (or file path) it concerns and, for
//! dataset-level failures, the operation that was attempted. Codes are
//! stable so that log scrapers can match on them.

use crate::types::ObjectPath;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for container storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    // =========================================================================
    // Container Errors (E001-E099)
    // =========================================================================
    /// Failed to open an existing container file.
    #[error("E001: Failed to open container at {path}: {cause}")]
    OpenFailure {
        /// The container file path.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to create a container file.
    #[error("E002: Failed to create container at {path}: {cause}")]
    CreateFailure {
        /// The container file path.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// Failed to flush or close a container file.
    #[error("E003: Failed to close container at {path}: {cause}")]
    CloseFailure {
        /// The container file path.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },

    /// The record log is damaged beyond the recoverable tail.
    #[error("E004: Container corruption detected at byte {position}: {cause}")]
    Corruption {
        /// Byte offset in the container file.
        position: u64,
        /// Description of the corruption.
        cause: String,
    },

    /// Low-level I/O error while writing the record log.
    #[error("E005: I/O error at {path}: {cause}")]
    Io {
        /// The container file path.
        path: PathBuf,
        /// Description of the I/O error.
        cause: String,
    },

    // =========================================================================
    // Object Errors (E100-E199)
    // =========================================================================
    /// A group could not be created because a path segment is not a group.
    #[error("E101: Failed to create group {path}: {cause}")]
    GroupCreateFailure {
        /// The group path.
        path: ObjectPath,
        /// Reason for the failure.
        cause: String,
    },

    /// The addressed object does not exist.
    #[error("E102: {operation}: no object at {path}")]
    NotFound {
        /// The missing path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
    },

    /// An object already exists at the path.
    #[error("E103: {operation}: object already exists at {path}")]
    AlreadyExists {
        /// The occupied path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
    },

    // =========================================================================
    // Dataset Errors (E200-E299)
    // =========================================================================
    /// Caller-supplied data does not match the on-disk shape.
    #[error("E201: {operation} on {path}: shape mismatch, expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The dataset path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
        /// The shape the dataset requires.
        expected: String,
        /// The shape that was supplied.
        actual: String,
    },

    /// Index beyond the current extent of the dataset.
    #[error("E202: {operation} on {path}: index {index} out of range for extent {extent}")]
    InvalidIndex {
        /// The dataset path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
        /// The offending index.
        index: usize,
        /// The current extent of the addressed dimension.
        extent: usize,
    },

    /// Append attempted on a fixed-size dataset.
    #[error("E203: {operation} on {path}: dataset is not extensible")]
    NotExtensible {
        /// The dataset path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
    },

    /// No codec exists for the requested element type.
    #[error("E204: {operation} on {path}: unsupported type {type_name}")]
    UnsupportedType {
        /// The dataset path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
        /// Name of the unsupported type.
        type_name: String,
    },

    /// Element type of the supplied data differs from the dataset type.
    #[error("E205: {operation} on {path}: type mismatch, expected {expected}, got {actual}")]
    TypeMismatch {
        /// The dataset path.
        path: ObjectPath,
        /// The attempted operation.
        operation: &'static str,
        /// The dataset element type.
        expected: String,
        /// The supplied element type.
        actual: String,
    },

    // =========================================================================
    // Configuration Errors (E800-E899)
    // =========================================================================
    /// Invalid configuration value.
    #[error("E802: Invalid configuration '{field}': {cause}")]
    ConfigValue {
        /// The configuration field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        cause: String,
    },

    /// Serialization/deserialization error.
    #[error("E804: Serialization error: {0}")]
    Serialization(
        /// The serialization error message.
        String,
    ),
}

impl StorageError {
    /// Get the error code (e.g., "E001").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OpenFailure { .. } => "E001",
            Self::CreateFailure { .. } => "E002",
            Self::CloseFailure { .. } => "E003",
            Self::Corruption { .. } => "E004",
            Self::Io { .. } => "E005",
            Self::GroupCreateFailure { .. } => "E101",
            Self::NotFound { .. } => "E102",
            Self::AlreadyExists { .. } => "E103",
            Self::ShapeMismatch { .. } => "E201",
            Self::InvalidIndex { .. } => "E202",
            Self::NotExtensible { .. } => "E203",
            Self::UnsupportedType { .. } => "E204",
            Self::TypeMismatch { .. } => "E205",
            Self::ConfigValue { .. } => "E802",
            Self::Serialization(_) => "E804",
        }
    }

    /// Check if this error concerns the container file as a whole.
    ///
    /// Container-level failures leave no usable store behind and must be
    /// propagated to the caller immediately.
    #[must_use]
    pub fn is_container_error(&self) -> bool {
        matches!(
            self,
            Self::OpenFailure { .. }
                | Self::CreateFailure { .. }
                | Self::CloseFailure { .. }
                | Self::Corruption { .. }
                | Self::Io { .. }
        )
    }

    /// Check if this error is a shape or indexing error on a dataset.
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::InvalidIndex { .. } | Self::NotExtensible { .. }
        )
    }
}

/// Result type alias using `StorageError`.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_correct() {
        let err = StorageError::OpenFailure {
            path: PathBuf::from("/tmp/results.edb"),
            cause: "missing".to_string(),
        };
        assert_eq!(err.code(), "E001");
        assert!(err.is_container_error());

        let err = StorageError::InvalidIndex {
            path: ObjectPath::new("/models/simulation/m1/responses/functions"),
            operation: "set_vector",
            index: 7,
            extent: 3,
        };
        assert_eq!(err.code(), "E202");
        assert!(err.is_shape_error());
        assert!(!err.is_container_error());
    }

    #[test]
    fn error_display_names_path_and_operation() {
        let err = StorageError::NotExtensible {
            path: ObjectPath::new("/methods/m/results/execution:1/x"),
            operation: "append_scalar",
        };
        let msg = err.to_string();
        assert!(msg.contains("E203"));
        assert!(msg.contains("append_scalar"));
        assert!(msg.contains("/methods/m/results/execution:1/x"));
    }
}
