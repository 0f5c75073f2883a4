//! evaldb Core Library
//!
//! Storage layer of the evaldb evaluation-results store: a self-describing,
//! crash-tolerant binary container and the typed adapter the results layer
//! writes through.
//!
//! # Key Components
//!
//! - **Types**: object paths, element types, the `Datum` codec, matrices
//! - **Log**: append-only, CRC-framed record log behind every container
//! - **Container**: groups, chunked datasets, dimension scales, soft links
//! - **Adapter**: typed scalar/vector/matrix create, append, set and read
//!
//! # Example
//!
//! ```ignore
//! use evaldb_core::prelude::*;
//!
//! let mut adapter = ContainerAdapter::open(&StorageConfig::new("run.edb"))?;
//! let path = ObjectPath::new("/models/simulation/m1/responses/functions");
//! adapter.create_empty_dataset::<f64>(&path, &[0, 2], Some(f64::NAN))?;
//! adapter.append_vector(&path, &[1.0, 2.0])?;
//! adapter.close()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod config;
pub mod container;
pub mod error;
pub mod log;
pub mod prelude;
pub mod types;

// Re-export key types at crate root for convenience
pub use adapter::{ContainerAdapter, Element, SharedAdapter};
pub use config::{FileMode, StorageConfig};
pub use error::{Result, StorageError};
pub use types::{AttrValue, Attribute, DataType, Datum, FieldSpec, Matrix, ObjectPath, ScalarType};
