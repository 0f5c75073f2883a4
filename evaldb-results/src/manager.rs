//! Fan-out over the registered results backends.

use crate::backends::{ContainerBackend, InMemoryBackend, ResultsBackend};
use crate::config::ResultsConfig;
use crate::error::Result;
use crate::evaluation_store::EvaluationStore;
use crate::types::{DimScale, MethodId, ResultValue};
use evaldb_core::{Attribute, ContainerAdapter, ScalarType};
use tracing::{debug, info};

/// Forwards every results call to each registered backend in order.
///
/// The first backend error aborts the call.
#[derive(Default)]
pub struct ResultsManager {
    backends: Vec<Box<dyn ResultsBackend>>,
}

impl ResultsManager {
    /// Manager without backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend.
    pub fn add_backend(&mut self, backend: Box<dyn ResultsBackend>) {
        debug!(backend = backend.name(), "Registered results backend");
        self.backends.push(backend);
    }

    /// Whether any backend is registered.
    pub fn active(&self) -> bool {
        !self.backends.is_empty()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether no backend is registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Store a result in every backend.
    pub fn insert(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        scales: &[DimScale],
        attributes: &[Attribute],
        transpose: bool,
    ) -> Result<()> {
        for backend in &mut self.backends {
            backend.insert(owner, location, data, scales, attributes, transpose)?;
        }
        Ok(())
    }

    /// Reserve a vector in every preallocating backend.
    pub fn allocate_vector(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        len: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()> {
        for backend in &mut self.backends {
            if let Some(b) = backend.as_preallocating() {
                b.allocate_vector(owner, location, scalar, len, scales, attributes)?;
            }
        }
        Ok(())
    }

    /// Reserve a matrix in every preallocating backend.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate_matrix(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        rows: usize,
        cols: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()> {
        for backend in &mut self.backends {
            if let Some(b) = backend.as_preallocating() {
                b.allocate_matrix(owner, location, scalar, rows, cols, scales, attributes)?;
            }
        }
        Ok(())
    }

    /// Fill part of a preallocated result in every preallocating backend.
    pub fn insert_into(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        index: usize,
        row: bool,
    ) -> Result<()> {
        for backend in &mut self.backends {
            if let Some(b) = backend.as_preallocating() {
                b.insert_into(owner, location, data, index, row)?;
            }
        }
        Ok(())
    }

    /// Reserve an array in every array backend.
    pub fn array_allocate(&mut self, owner: &MethodId, data_name: &str, size: usize) -> Result<()> {
        for backend in &mut self.backends {
            if let Some(b) = backend.as_array_store() {
                b.array_allocate(owner, data_name, size)?;
            }
        }
        Ok(())
    }

    /// Fill an array slot in every array backend.
    pub fn array_insert(&mut self, owner: &MethodId, data_name: &str, index: usize, value: &ResultValue) -> Result<()> {
        for backend in &mut self.backends {
            if let Some(b) = backend.as_array_store() {
                b.array_insert(owner, data_name, index, value.clone())?;
            }
        }
        Ok(())
    }

    /// Attach attributes to a method in every backend.
    pub fn add_metadata_to_method(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        for backend in &mut self.backends {
            backend.add_metadata_to_method(owner, attributes)?;
        }
        Ok(())
    }

    /// Attach attributes to a method execution in every backend.
    pub fn add_metadata_to_execution(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        for backend in &mut self.backends {
            backend.add_metadata_to_execution(owner, attributes)?;
        }
        Ok(())
    }

    /// Attach attributes to a stored object in every backend.
    pub fn add_metadata_to_object(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        attributes: &[Attribute],
    ) -> Result<()> {
        for backend in &mut self.backends {
            backend.add_metadata_to_object(owner, location, attributes)?;
        }
        Ok(())
    }

    /// Attach attributes to the study in every backend.
    pub fn add_metadata_to_study(&mut self, attributes: &[Attribute]) -> Result<()> {
        for backend in &mut self.backends {
            backend.add_metadata_to_study(attributes)?;
        }
        Ok(())
    }

    /// Flush every backend.
    pub fn flush(&mut self) -> Result<()> {
        for backend in &mut self.backends {
            backend.flush()?;
        }
        Ok(())
    }

    /// Flush and drop every backend.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.backends.clear();
        info!("Closed results backends");
        Ok(())
    }
}

/// Everything a run writes results through, built from a [`ResultsConfig`].
pub struct ResultsRun {
    /// Method results fan-out.
    pub manager: ResultsManager,
    /// Model and interface evaluations, present when the container backend
    /// is enabled.
    pub evaluations: Option<EvaluationStore>,
    /// Handle on the in-memory backend, present when it is enabled.
    pub memory: Option<InMemoryBackend>,
}

impl ResultsRun {
    /// Open the container (if enabled) and register the configured
    /// backends.
    ///
    /// The container backend and the evaluation store share one adapter.
    pub fn open(config: &ResultsConfig) -> Result<Self> {
        config.validate()?;
        let mut manager = ResultsManager::new();
        let mut evaluations = None;
        let mut memory = None;

        if config.container_backend {
            let adapter = ContainerAdapter::open(&config.storage)?.into_shared();
            evaluations = Some(
                EvaluationStore::new(adapter.clone())
                    .with_selection(config.model_selection, config.interface_selection),
            );
            manager.add_backend(Box::new(ContainerBackend::new(adapter)));
        }
        if config.memory_backend {
            let backend = InMemoryBackend::new();
            memory = Some(backend.clone());
            manager.add_backend(Box::new(backend));
        }

        info!(
            backends = manager.len(),
            evaluations = evaluations.is_some(),
            "Opened results run"
        );
        Ok(Self {
            manager,
            evaluations,
            memory,
        })
    }

    /// Flush and close every backend, then the container.
    pub fn close(mut self) -> Result<()> {
        self.manager.close()?;
        if let Some(store) = self.evaluations.take() {
            store.adapter().lock().close()?;
        }
        Ok(())
    }
}
