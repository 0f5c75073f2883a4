//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use evaldb_results::prelude::*;
//! ```

// Storage types used at the results boundary
pub use evaldb_core::prelude::{AttrValue, Attribute, Matrix, ObjectPath, ScalarType, StorageConfig};

// Domain types
pub use crate::types::{
    ActiveSet, DimScale, InterfaceKind, MethodId, ProducerId, Response, ResultValue, ScaleData, ScaleScope,
    SourceRef, VariableKind, Variables,
};

// Error handling
pub use crate::error::{Result, ResultsError};

// Configuration
pub use crate::config::{InterfaceSelection, ModelSelection, ResultsConfig};

// Evaluation storage
pub use crate::evaluation_store::EvaluationStore;
pub use crate::parameters::{ParamRecord, VariableParameters};

// Backends and manager
pub use crate::backends::{ArrayBackend, ContainerBackend, InMemoryBackend, PreallocatingBackend, ResultsBackend};
pub use crate::manager::{ResultsManager, ResultsRun};
