//! Error types for the results layer.

use evaldb_core::StorageError;
use thiserror::Error;

/// Errors raised by the evaluation store, results backends and manager.
#[derive(Error, Debug)]
pub enum ResultsError {
    /// Failure in the underlying container.
    #[error(transparent)]
    Storage(#[from] StorageError),

    // =========================================================================
    // Lookup Errors (E300-E309)
    // =========================================================================
    /// No entry is stored under the key.
    #[error("E301: No results entry for key {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// Index beyond the allocated size of an array entry.
    #[error("E302: Index {index} out of range for {key} (size {size})")]
    IndexOutOfRange {
        /// The array key.
        key: String,
        /// The offending index.
        index: usize,
        /// The allocated size.
        size: usize,
    },

    // =========================================================================
    // Evaluation Errors (E310-E319)
    // =========================================================================
    /// A derivative variables vector is not strictly ascending.
    #[error("E310: Derivative variables for {producer} must be strictly ascending, got {dvv:?}")]
    InvalidDerivativeOrder {
        /// The producer whose evaluation carried the vector.
        producer: String,
        /// The offending vector.
        dvv: Vec<usize>,
    },

    /// Unrecognized variable kind name.
    #[error("E311: Unknown variable kind '{0}'")]
    UnknownVariableKind(
        /// The unrecognized name.
        String,
    ),

    // =========================================================================
    // Backend Errors (E320-E329)
    // =========================================================================
    /// Backend-specific failure.
    #[error("E320: Backend error: {0}")]
    Backend(
        /// Description of the failure.
        String,
    ),
}

impl ResultsError {
    /// Get the error code (e.g., "E301").
    ///
    /// Storage failures report the code of the wrapped [`StorageError`].
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.code(),
            Self::KeyNotFound { .. } => "E301",
            Self::IndexOutOfRange { .. } => "E302",
            Self::InvalidDerivativeOrder { .. } => "E310",
            Self::UnknownVariableKind(_) => "E311",
            Self::Backend(_) => "E320",
        }
    }

    /// Check if this error came from the storage layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type alias using `ResultsError`.
pub type Result<T> = std::result::Result<T, ResultsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use evaldb_core::ObjectPath;

    #[test]
    fn storage_errors_keep_their_code() {
        let err: ResultsError = StorageError::NotFound {
            path: ObjectPath::new("/methods/opt"),
            operation: "attribute",
        }
        .into();
        assert_eq!(err.code(), "E102");
        assert!(err.is_storage_error());
    }

    #[test]
    fn index_error_display() {
        let err = ResultsError::IndexOutOfRange {
            key: "opt/1/1/best_parameters".to_string(),
            index: 4,
            size: 3,
        };
        assert_eq!(err.code(), "E302");
        assert!(err.to_string().contains("best_parameters"));
    }
}
