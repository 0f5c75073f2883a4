//! Prelude for convenient imports.
//!
//! # Example
//!
//! ```ignore
//! use evaldb_core::prelude::*;
//! ```

// Core types
pub use crate::types::{
    AttrValue, Attribute, CompoundType, DataType, Datum, FieldSpec, Matrix, ObjectPath, ScalarType,
};

// Error handling
pub use crate::error::{Result, StorageError};

// Configuration
pub use crate::config::{FileMode, StorageConfig};

// Container
pub use crate::container::{Container, DatasetId, NodeKind, ScaleRef};

// Adapter
pub use crate::adapter::{ContainerAdapter, Element, SharedAdapter};
