//! evaldb Results Library
//!
//! Results layer of the evaldb store, built on the container adapter from
//! `evaldb-core`.
//!
//! # Key Components
//!
//! - **Evaluation store**: two-phase, row-aligned storage of every model
//!   and interface evaluation (variables, responses, derivatives, metadata)
//! - **Backends**: method results written to the container, or kept in
//!   memory for plain-text reports
//! - **Manager**: fans results calls out to every registered backend
//! - **Parameters**: per-kind distribution parameter tables
//!
//! # Example
//!
//! ```ignore
//! use evaldb_results::prelude::*;
//!
//! let mut run = ResultsRun::open(&ResultsConfig::new("study.edb"))?;
//! let owner = MethodId::new("sampling", "mc", 1);
//! run.manager.insert(&owner, &["mean"], &ResultValue::Real(2.5), &[], &[], false)?;
//! run.close()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backends;
pub mod config;
pub mod error;
pub mod evaluation_store;
pub mod manager;
pub mod parameters;
pub mod prelude;
pub mod types;

// Re-export key types at crate root for convenience
pub use backends::{ArrayBackend, ContainerBackend, InMemoryBackend, PreallocatingBackend, ResultsBackend};
pub use config::{InterfaceSelection, ModelSelection, ResultsConfig};
pub use error::{Result, ResultsError};
pub use evaluation_store::EvaluationStore;
pub use manager::{ResultsManager, ResultsRun};
