//! Typed access to a container.
//!
//! [`ContainerAdapter`] is the only way the results layer touches storage.
//! It creates datasets from Rust shapes (scalars, vectors, column-major
//! matrices and vectors of matrices), appends to extensible datasets,
//! writes into existing rows, and reads everything back with the same
//! typing.
//!
//! Matrices live column-major in memory and row-major on disk. A matrix
//! written with `transpose = false` keeps its `rows x cols` shape on disk;
//! with `transpose = true` the disk shape is `cols x rows`, which lets a
//! gradient matrix (one column per function) land one function per row.

mod cache;
mod element;
mod read;
mod write;

pub use cache::HandleCache;
pub use element::Element;

use crate::config::StorageConfig;
use crate::container::{Container, DatasetId, NodeKind, ScaleRef};
use crate::error::{Result, StorageError};
use crate::types::{AttrValue, Attribute, DataType, Datum, FieldSpec, CompoundType, ObjectPath};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Adapter shared between the results backend and the evaluation store.
pub type SharedAdapter = Arc<Mutex<ContainerAdapter>>;

/// Typed create/read/write access to one container.
pub struct ContainerAdapter {
    container: Container,
    cache: HandleCache,
    chunk_bytes: usize,
}

impl ContainerAdapter {
    /// Open the container described by `config`.
    ///
    /// A freshly created container gets its identity attributes on the root
    /// group: `format_version`, `tool_version`, `tool_revision`, `run_id`
    /// and `created`.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let container = Container::open(config)?;
        let mut adapter = Self {
            container,
            cache: HandleCache::new(),
            chunk_bytes: config.chunk_bytes,
        };

        if adapter.container.is_new() {
            let root = ObjectPath::root();
            let header = *adapter.container.header();
            adapter.set_attribute(&root, "format_version", header.schema_version_string())?;
            adapter.set_attribute(&root, "tool_version", config.tool_version.as_str())?;
            adapter.set_attribute(&root, "tool_revision", config.tool_revision.as_str())?;
            adapter.set_attribute(&root, "run_id", header.run_id.to_string())?;
            adapter.set_attribute(&root, "created", chrono::Utc::now().to_rfc3339())?;
        }

        Ok(adapter)
    }

    /// Wrap the adapter for sharing.
    pub fn into_shared(self) -> SharedAdapter {
        Arc::new(Mutex::new(self))
    }

    /// The underlying container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Number of cached extensible-dataset handles.
    pub fn cached_handles(&self) -> usize {
        self.cache.len()
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create an empty dataset of element type `T`.
    ///
    /// `dims[0] == 0` makes the dataset extensible along its first
    /// dimension; otherwise it is fixed-size. Cells read back as `fill`
    /// (or zero / empty string) until written.
    pub fn create_empty_dataset<T: Element>(
        &mut self,
        path: &ObjectPath,
        dims: &[usize],
        fill: Option<T>,
    ) -> Result<()> {
        self.create_empty_dataset_of(
            path,
            DataType::Scalar(T::SCALAR),
            dims,
            None,
            fill.map(Element::into_datum),
        )
    }

    /// Create an empty dataset of any element type.
    ///
    /// `chunk_hint` is the target chunk size in bytes for extensible
    /// datasets; `None` uses the configured default.
    pub fn create_empty_dataset_of(
        &mut self,
        path: &ObjectPath,
        dtype: DataType,
        dims: &[usize],
        chunk_hint: Option<usize>,
        fill: Option<Datum>,
    ) -> Result<()> {
        if let DataType::Compound(c) = &dtype {
            if c.fields().is_empty() {
                return Err(StorageError::UnsupportedType {
                    path: path.clone(),
                    operation: "create_empty_dataset",
                    type_name: "compound without fields".to_string(),
                });
            }
        }
        if dims.iter().skip(1).any(|&d| d == 0) {
            return Err(StorageError::ShapeMismatch {
                path: path.clone(),
                operation: "create_empty_dataset",
                expected: "non-zero trailing dimensions".to_string(),
                actual: format!("{:?}", dims),
            });
        }

        let extensible = dims.first() == Some(&0);
        self.create_dataset(path, dtype, dims, extensible, chunk_hint, fill)
    }

    /// Create a fixed-size dataset of element type `T` with exactly `dims`.
    ///
    /// Unlike [`create_empty_dataset`](Self::create_empty_dataset), zero
    /// extents are taken literally: `[0]` is an empty vector and `[3, 0]`
    /// a matrix without columns. The dataset never grows.
    pub fn create_fixed_dataset<T: Element>(
        &mut self,
        path: &ObjectPath,
        dims: &[usize],
        fill: Option<T>,
    ) -> Result<()> {
        self.create_dataset(
            path,
            DataType::Scalar(T::SCALAR),
            dims,
            false,
            None,
            fill.map(Element::into_datum),
        )
    }

    fn create_dataset(
        &mut self,
        path: &ObjectPath,
        dtype: DataType,
        dims: &[usize],
        extensible: bool,
        chunk_hint: Option<usize>,
        fill: Option<Datum>,
    ) -> Result<()> {
        let row_bytes = dtype.size_bytes() * dims.iter().skip(1).product::<usize>();
        let chunk_rows = if extensible {
            (chunk_hint.unwrap_or(self.chunk_bytes) / row_bytes.max(1)).max(1)
        } else {
            dims.first().copied().unwrap_or(1).max(1)
        };
        let fill = fill.unwrap_or_else(|| Datum::zero(&dtype));

        let id = self
            .container
            .create_dataset(path, dtype, dims.to_vec(), extensible, chunk_rows, fill)?;
        if extensible {
            self.cache.insert(path.clone(), id);
        }

        debug!(path = %path, dims = ?dims, extensible, chunk_rows, "Created dataset");
        Ok(())
    }

    /// Create a fixed-size dataset of compound records assembled from
    /// `fields`.
    pub fn create_empty_compound_dataset(
        &mut self,
        path: &ObjectPath,
        dims: &[usize],
        fields: &[FieldSpec],
    ) -> Result<()> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(StorageError::ShapeMismatch {
                path: path.clone(),
                operation: "create_empty_compound_dataset",
                expected: "non-zero fixed dimensions".to_string(),
                actual: format!("{:?}", dims),
            });
        }
        let dtype = DataType::Compound(CompoundType::from_specs(fields));
        self.create_empty_dataset_of(path, dtype, dims, None, None)
    }

    /// Create a group and any missing parents.
    pub fn create_group(&mut self, path: &ObjectPath) -> Result<()> {
        self.container.create_group(path)
    }

    /// Create a soft link at `link` pointing to `target`.
    pub fn create_soft_link(&mut self, link: &ObjectPath, target: &ObjectPath) -> Result<()> {
        self.container.create_soft_link(link, target)?;
        debug!(link = %link, target = %target, "Created soft link");
        Ok(())
    }

    // =========================================================================
    // Scales and attributes
    // =========================================================================

    /// Attach `scale` to `axis` of `dataset` under `label`.
    ///
    /// The scale dataset is marked as a scale on first use. Attaching the
    /// same scale to the same axis again is a no-op.
    pub fn attach_scale(
        &mut self,
        dataset: &ObjectPath,
        scale: &ObjectPath,
        label: &str,
        axis: usize,
    ) -> Result<()> {
        let dataset_id = self.lookup(dataset, "attach_scale")?;
        let scale_id = self.lookup(scale, "attach_scale")?;
        if self.container.dataset(scale_id).scale_name().is_none() {
            self.container.mark_scale(scale_id, label)?;
        }
        if self.container.attach_scale(dataset_id, scale_id, label, axis)? {
            debug!(dataset = %dataset, scale = %scale, label, axis, "Attached scale");
        }
        Ok(())
    }

    /// Set an attribute on a group or dataset.
    pub fn set_attribute(
        &mut self,
        path: &ObjectPath,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        self.container.set_attribute(path, name, value.into())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Check whether any object exists at `path`.
    pub fn exists(&self, path: &ObjectPath) -> bool {
        self.container.exists(path)
    }

    /// Current dimensions of a dataset.
    pub fn dims(&self, path: &ObjectPath) -> Result<Vec<usize>> {
        let id = self.lookup(path, "dims")?;
        Ok(self.container.dataset(id).dims().to_vec())
    }

    /// Element type of a dataset.
    pub fn dtype(&self, path: &ObjectPath) -> Result<DataType> {
        let id = self.lookup(path, "dtype")?;
        Ok(self.container.dataset(id).dtype().clone())
    }

    /// Whether a dataset has been marked as a dimension scale.
    pub fn is_scale(&self, path: &ObjectPath) -> Result<bool> {
        let id = self.lookup(path, "is_scale")?;
        Ok(self.container.dataset(id).scale_name().is_some())
    }

    /// Scales attached to `axis` of a dataset.
    pub fn scales(&self, path: &ObjectPath, axis: usize) -> Result<Vec<ScaleRef>> {
        let id = self.lookup(path, "scales")?;
        let ds = self.container.dataset(id);
        if axis >= ds.rank() {
            return Err(StorageError::InvalidIndex {
                path: path.clone(),
                operation: "scales",
                index: axis,
                extent: ds.rank(),
            });
        }
        Ok(ds.scales(axis).to_vec())
    }

    /// Path of the scale attached to `axis` of a dataset under `label`.
    pub fn scale_by_label(&self, path: &ObjectPath, axis: usize, label: &str) -> Result<ObjectPath> {
        self.scales(path, axis)?
            .into_iter()
            .find(|s| s.label == label)
            .map(|s| s.scale)
            .ok_or_else(|| StorageError::NotFound {
                path: path.join(label),
                operation: "scale_by_label",
            })
    }

    /// A single attribute of a group or dataset.
    pub fn attribute(&self, path: &ObjectPath, name: &str) -> Result<AttrValue> {
        self.container
            .attributes(path)?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.join(format!("@{}", name)),
                operation: "attribute",
            })
    }

    /// Every attribute of a group or dataset, sorted by name.
    pub fn attributes(&self, path: &ObjectPath) -> Result<Vec<Attribute>> {
        Ok(self
            .container
            .attributes(path)?
            .iter()
            .map(|(label, value)| Attribute::new(label.as_str(), value.clone()))
            .collect())
    }

    /// Immediate children of a group.
    pub fn list(&self, group: &ObjectPath) -> Result<Vec<(String, NodeKind)>> {
        self.container.list(group)
    }

    /// Target of a soft link.
    pub fn resolve_link(&self, path: &ObjectPath) -> Result<ObjectPath> {
        self.container.resolve_link(path)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush buffered writes.
    pub fn flush(&mut self) -> Result<()> {
        self.container.flush()
    }

    /// Release every cached handle and close the container.
    pub fn close(&mut self) -> Result<()> {
        self.cache.clear();
        self.container.close()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolve a dataset through the handle cache, falling back to the
    /// namespace.
    fn lookup(&self, path: &ObjectPath, operation: &'static str) -> Result<DatasetId> {
        match self.cache.get(path) {
            Some(id) => Ok(id),
            None => self.container.open_dataset(path, operation),
        }
    }

    fn expect_rank(&self, id: DatasetId, operation: &'static str, rank: usize) -> Result<()> {
        let ds = self.container.dataset(id);
        if ds.rank() != rank {
            return Err(StorageError::ShapeMismatch {
                path: ds.path().clone(),
                operation,
                expected: format!("rank {}", rank),
                actual: format!("rank {} {:?}", ds.rank(), ds.dims()),
            });
        }
        Ok(())
    }

    fn expect_type<T: Element>(&self, id: DatasetId, operation: &'static str) -> Result<()> {
        let ds = self.container.dataset(id);
        if ds.dtype().as_scalar() != Some(T::SCALAR) {
            return Err(StorageError::TypeMismatch {
                path: ds.path().clone(),
                operation,
                expected: ds.dtype().name(),
                actual: T::SCALAR.name().to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for ContainerAdapter {
    fn drop(&mut self) {
        if self.container.is_closed() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(path = %self.container.path().display(), "Failed to close container on drop: {}", e);
        }
    }
}
