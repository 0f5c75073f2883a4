//! Hierarchical binary container.
//!
//! A [`Container`] is a namespace of groups, datasets and soft links held in
//! memory and persisted as an append-only record log. Every mutation is
//! validated and applied in memory first, then appended to the log, so the
//! file never holds a record that would fail on replay.

mod dataset;
mod node;

pub use dataset::{Dataset, DatasetId, ScaleRef};
pub use node::NodeKind;

use crate::config::{FileMode, StorageConfig};
use crate::error::{Result, StorageError};
use crate::log::{ContainerHeader, LogReader, LogRecord, LogWriter};
use crate::types::{AttrValue, DataType, Datum, ObjectPath};
use node::Node;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum number of soft links followed while resolving a path.
const MAX_LINK_DEPTH: usize = 16;

/// An open container file.
pub struct Container {
    path: PathBuf,
    header: ContainerHeader,
    nodes: BTreeMap<ObjectPath, Node>,
    datasets: Vec<Dataset>,
    writer: Option<LogWriter>,
    created: bool,
}

impl Container {
    /// Open a container according to `config.mode`.
    ///
    /// `Truncate` creates a fresh file. `Append` replays the existing log,
    /// cutting off a torn tail left by a crash.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let container = match config.mode {
            FileMode::Truncate => Self::create(config)?,
            FileMode::Append => Self::reopen(config)?,
        };
        info!(
            path = %container.path.display(),
            mode = ?config.mode,
            datasets = container.datasets.len(),
            "Opened container"
        );
        Ok(container)
    }

    fn empty(path: &Path, header: ContainerHeader, created: bool) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ObjectPath::root(), Node::group());
        Self {
            path: path.to_path_buf(),
            header,
            nodes,
            datasets: Vec::new(),
            writer: None,
            created,
        }
    }

    fn create(config: &StorageConfig) -> Result<Self> {
        let header = ContainerHeader::new(Uuid::new_v4());
        let writer = LogWriter::create(&config.path, &header, config.buffer_size, config.sync_on_flush)?;
        let mut container = Self::empty(&config.path, header, true);
        container.writer = Some(writer);
        Ok(container)
    }

    fn reopen(config: &StorageConfig) -> Result<Self> {
        let replay = LogReader::read(&config.path)?;
        let mut container = Self::empty(&config.path, replay.header, false);

        for (position, record) in &replay.records {
            container
                .apply(record)
                .map_err(|e| StorageError::Corruption {
                    position: *position,
                    cause: e.to_string(),
                })?;
        }

        container.writer = Some(LogWriter::open_append(
            &config.path,
            replay.valid_end,
            config.buffer_size,
            config.sync_on_flush,
        )?);
        debug!(
            path = %config.path.display(),
            records = replay.records.len(),
            "Replayed container log"
        );
        Ok(container)
    }

    /// Path to the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The container header.
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Whether this container was created by this open (as opposed to
    /// reopened).
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Whether the container has been closed.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a group and any missing parents. Existing groups are left as is.
    pub fn create_group(&mut self, path: &ObjectPath) -> Result<()> {
        if matches!(self.nodes.get(path), Some(Node::Group { .. })) {
            return Ok(());
        }
        self.commit(LogRecord::CreateGroup { path: path.clone() })
    }

    /// Create a dataset, creating parent groups as needed.
    pub fn create_dataset(
        &mut self,
        path: &ObjectPath,
        dtype: DataType,
        dims: Vec<usize>,
        extensible: bool,
        chunk_rows: usize,
        fill: Datum,
    ) -> Result<DatasetId> {
        if !fill.conforms_to(&dtype) {
            return Err(StorageError::TypeMismatch {
                path: path.clone(),
                operation: "create_dataset",
                expected: dtype.name(),
                actual: fill.kind_name().to_string(),
            });
        }
        self.commit(LogRecord::CreateDataset {
            path: path.clone(),
            dtype,
            dims,
            extensible,
            chunk_rows,
            fill,
        })?;
        Ok(DatasetId(self.datasets.len() - 1))
    }

    /// Grow the first dimension of an extensible dataset.
    pub fn extend(&mut self, id: DatasetId, extent: usize) -> Result<()> {
        let ds = self.dataset(id);
        if !ds.is_extensible() {
            return Err(StorageError::NotExtensible {
                path: ds.path().clone(),
                operation: "extend",
            });
        }
        let path = ds.path().clone();
        self.commit(LogRecord::Extend { path, extent })
    }

    /// Write `values` (row-major) into the hyperslab `start`/`count`.
    pub fn write(
        &mut self,
        id: DatasetId,
        operation: &'static str,
        start: &[usize],
        count: &[usize],
        values: Vec<Datum>,
    ) -> Result<()> {
        let ds = self.dataset(id);
        ds.check_selection(operation, start, count)?;

        let mut payload = Vec::new();
        for value in &values {
            if !value.conforms_to(ds.dtype()) {
                return Err(StorageError::TypeMismatch {
                    path: ds.path().clone(),
                    operation,
                    expected: ds.dtype().name(),
                    actual: value.kind_name().to_string(),
                });
            }
            value
                .encode(ds.dtype(), &mut payload)
                .map_err(|e| self.io_error(e))?;
        }

        let record = LogRecord::Write {
            path: ds.path().clone(),
            start: start.to_vec(),
            count: count.to_vec(),
            payload,
        };

        // Apply the already-decoded values instead of decoding the payload again
        self.datasets[id.0].write(operation, start, count, values)?;
        self.writer_mut()?.append(&record)
    }

    /// Set an attribute on a group or dataset.
    pub fn set_attribute(&mut self, path: &ObjectPath, name: &str, value: AttrValue) -> Result<()> {
        let target = self
            .resolve_path(path)
            .ok_or_else(|| StorageError::NotFound {
                path: path.clone(),
                operation: "set_attribute",
            })?;
        self.commit(LogRecord::SetAttribute {
            path: target,
            name: name.to_string(),
            value,
        })
    }

    /// Mark a dataset as a dimension scale named `name`.
    pub fn mark_scale(&mut self, id: DatasetId, name: &str) -> Result<()> {
        let ds = self.dataset(id);
        if ds.scale_name() == Some(name) {
            return Ok(());
        }
        let path = ds.path().clone();
        self.commit(LogRecord::MarkScale {
            path,
            name: name.to_string(),
        })
    }

    /// Attach scale `scale` to `axis` of `dataset`.
    ///
    /// Returns `false` when the scale was already attached to that axis.
    pub fn attach_scale(
        &mut self,
        dataset: DatasetId,
        scale: DatasetId,
        label: &str,
        axis: usize,
    ) -> Result<bool> {
        let ds = self.dataset(dataset);
        let scale_path = self.dataset(scale).path().clone();
        if axis >= ds.rank() {
            return Err(StorageError::InvalidIndex {
                path: ds.path().clone(),
                operation: "attach_scale",
                index: axis,
                extent: ds.rank(),
            });
        }
        if ds.scales(axis).iter().any(|s| s.scale == scale_path) {
            return Ok(false);
        }
        let dataset_path = ds.path().clone();
        self.commit(LogRecord::AttachScale {
            dataset: dataset_path,
            scale: scale_path,
            label: label.to_string(),
            axis,
        })?;
        Ok(true)
    }

    /// Create a soft link at `link` resolving to `target`.
    ///
    /// Recreating an identical link is a no-op; the target need not exist.
    pub fn create_soft_link(&mut self, link: &ObjectPath, target: &ObjectPath) -> Result<()> {
        match self.nodes.get(link) {
            Some(Node::Link(existing)) if existing == target => return Ok(()),
            Some(_) => {
                return Err(StorageError::AlreadyExists {
                    path: link.clone(),
                    operation: "create_soft_link",
                });
            }
            None => {}
        }
        self.commit(LogRecord::SoftLink {
            link: link.clone(),
            target: target.clone(),
        })
    }

    /// Flush buffered records to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.writer_mut()?.flush()
    }

    /// Flush and release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| StorageError::CloseFailure {
                path: self.path.clone(),
                cause: e.to_string(),
            })?;
            info!(
                path = %self.path.display(),
                records = writer.record_count(),
                bytes = writer.position(),
                "Closed container"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Resolve a dataset path (following soft links) to its handle.
    pub fn open_dataset(&self, path: &ObjectPath, operation: &'static str) -> Result<DatasetId> {
        match self.resolve_node(path) {
            Some(Node::Dataset(id)) => Ok(*id),
            _ => Err(StorageError::NotFound {
                path: path.clone(),
                operation,
            }),
        }
    }

    /// The dataset behind a handle obtained from this container.
    pub fn dataset(&self, id: DatasetId) -> &Dataset {
        &self.datasets[id.0]
    }

    /// Read the hyperslab `start`/`count`, row-major.
    pub fn read(
        &self,
        id: DatasetId,
        operation: &'static str,
        start: &[usize],
        count: &[usize],
    ) -> Result<Vec<Datum>> {
        self.dataset(id).read(operation, start, count)
    }

    /// Check whether any object (including a link) exists at `path`.
    pub fn exists(&self, path: &ObjectPath) -> bool {
        self.nodes.contains_key(path)
    }

    /// The kind of object at `path`, without following links.
    pub fn kind(&self, path: &ObjectPath) -> Option<NodeKind> {
        self.nodes.get(path).map(Node::kind)
    }

    /// Target of the soft link at `path`.
    pub fn resolve_link(&self, path: &ObjectPath) -> Result<ObjectPath> {
        match self.nodes.get(path) {
            Some(Node::Link(target)) => Ok(target.clone()),
            _ => Err(StorageError::NotFound {
                path: path.clone(),
                operation: "resolve_link",
            }),
        }
    }

    /// Attributes of a group or dataset, sorted by name.
    pub fn attributes(&self, path: &ObjectPath) -> Result<&BTreeMap<String, AttrValue>> {
        match self.resolve_node(path) {
            Some(Node::Group { attributes }) => Ok(attributes),
            Some(Node::Dataset(id)) => Ok(&self.dataset(*id).attributes),
            _ => Err(StorageError::NotFound {
                path: path.clone(),
                operation: "attributes",
            }),
        }
    }

    /// Immediate children of a group, sorted by name.
    pub fn list(&self, group: &ObjectPath) -> Result<Vec<(String, NodeKind)>> {
        let resolved = match self.resolve_node(group) {
            Some(Node::Group { .. }) => self.resolve_path(group).unwrap_or_else(|| group.clone()),
            _ => {
                return Err(StorageError::NotFound {
                    path: group.clone(),
                    operation: "list",
                });
            }
        };

        Ok(self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent().as_ref() == Some(&resolved))
            .filter_map(|(path, node)| path.name().map(|n| (n.to_string(), node.kind())))
            .collect())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn resolve_path(&self, path: &ObjectPath) -> Option<ObjectPath> {
        let mut current = path;
        for _ in 0..MAX_LINK_DEPTH {
            match self.nodes.get(current)? {
                Node::Link(target) => current = target,
                _ => return Some(current.clone()),
            }
        }
        None
    }

    fn resolve_node(&self, path: &ObjectPath) -> Option<&Node> {
        let mut current = path;
        for _ in 0..MAX_LINK_DEPTH {
            match self.nodes.get(current)? {
                Node::Link(target) => current = target,
                node => return Some(node),
            }
        }
        None
    }

    fn writer_mut(&mut self) -> Result<&mut LogWriter> {
        let path = &self.path;
        self.writer.as_mut().ok_or_else(|| StorageError::Io {
            path: path.clone(),
            cause: "container is closed".to_string(),
        })
    }

    fn io_error(&self, e: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            cause: e.to_string(),
        }
    }

    /// Apply a record in memory, then append it to the log.
    fn commit(&mut self, record: LogRecord) -> Result<()> {
        if self.writer.is_none() {
            return Err(StorageError::Io {
                path: self.path.clone(),
                cause: "container is closed".to_string(),
            });
        }
        self.apply(&record)?;
        self.writer_mut()?.append(&record)
    }

    fn ensure_group(&mut self, path: &ObjectPath) -> Result<()> {
        let mut prefix = ObjectPath::root();
        for segment in path.segments() {
            prefix = prefix.join(segment);
            match self.nodes.get(&prefix) {
                Some(Node::Group { .. }) => {}
                Some(other) => {
                    return Err(StorageError::GroupCreateFailure {
                        path: path.clone(),
                        cause: format!("{} is a {:?}, not a group", prefix, other.kind()),
                    });
                }
                None => {
                    self.nodes.insert(prefix.clone(), Node::group());
                }
            }
        }
        Ok(())
    }

    fn ensure_parent(&mut self, path: &ObjectPath) -> Result<()> {
        match path.parent() {
            Some(parent) => self.ensure_group(&parent),
            None => Ok(()),
        }
    }

    fn apply(&mut self, record: &LogRecord) -> Result<()> {
        match record {
            LogRecord::CreateGroup { path } => self.ensure_group(path),

            LogRecord::CreateDataset {
                path,
                dtype,
                dims,
                extensible,
                chunk_rows,
                fill,
            } => {
                if self.nodes.contains_key(path) {
                    return Err(StorageError::AlreadyExists {
                        path: path.clone(),
                        operation: "create_dataset",
                    });
                }
                if *extensible && dims.is_empty() {
                    return Err(StorageError::ShapeMismatch {
                        path: path.clone(),
                        operation: "create_dataset",
                        expected: "rank >= 1 for an extensible dataset".to_string(),
                        actual: "rank 0".to_string(),
                    });
                }
                self.ensure_parent(path)?;
                let id = DatasetId(self.datasets.len());
                self.datasets.push(Dataset::new(
                    path.clone(),
                    dtype.clone(),
                    dims.clone(),
                    *extensible,
                    *chunk_rows,
                    fill.clone(),
                ));
                self.nodes.insert(path.clone(), Node::Dataset(id));
                Ok(())
            }

            LogRecord::Extend { path, extent } => {
                let id = self.open_dataset(path, "extend")?;
                self.datasets[id.0].extend(*extent)
            }

            LogRecord::Write {
                path,
                start,
                count,
                payload,
            } => {
                let id = self.open_dataset(path, "write")?;
                let ds = &self.datasets[id.0];
                let total: usize = count.iter().product();
                let mut cursor = io::Cursor::new(payload.as_slice());
                let mut values = Vec::with_capacity(total);
                for _ in 0..total {
                    values.push(Datum::decode(ds.dtype(), &mut cursor).map_err(|e| self.io_error(e))?);
                }
                self.datasets[id.0].write("write", start, count, values)
            }

            LogRecord::SetAttribute { path, name, value } => match self.nodes.get_mut(path) {
                Some(Node::Group { attributes }) => {
                    attributes.insert(name.clone(), value.clone());
                    Ok(())
                }
                Some(Node::Dataset(id)) => {
                    let id = *id;
                    self.datasets[id.0]
                        .attributes
                        .insert(name.clone(), value.clone());
                    Ok(())
                }
                _ => Err(StorageError::NotFound {
                    path: path.clone(),
                    operation: "set_attribute",
                }),
            },

            LogRecord::MarkScale { path, name } => {
                let id = self.open_dataset(path, "mark_scale")?;
                self.datasets[id.0].mark_scale(name);
                Ok(())
            }

            LogRecord::AttachScale {
                dataset,
                scale,
                label,
                axis,
            } => {
                let scale_id = self.open_dataset(scale, "attach_scale")?;
                let dataset_id = self.open_dataset(dataset, "attach_scale")?;
                let scale = ScaleRef {
                    scale: self.datasets[scale_id.0].path().clone(),
                    label: label.clone(),
                };
                self.datasets[dataset_id.0].attach_scale(*axis, scale)?;
                Ok(())
            }

            LogRecord::SoftLink { link, target } => {
                if self.nodes.contains_key(link) {
                    return Err(StorageError::AlreadyExists {
                        path: link.clone(),
                        operation: "create_soft_link",
                    });
                }
                self.ensure_parent(link)?;
                self.nodes.insert(link.clone(), Node::Link(target.clone()));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarType;
    use tempfile::tempdir;

    fn open_fresh(dir: &Path) -> Container {
        Container::open(&StorageConfig::new(dir.join("c.edb"))).unwrap()
    }

    #[test]
    fn groups_are_created_lazily_and_idempotently() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());

        c.create_group(&ObjectPath::new("/models/simulation/m1")).unwrap();
        c.create_group(&ObjectPath::new("/models/simulation/m1")).unwrap();
        assert_eq!(c.kind(&ObjectPath::new("/models")), Some(NodeKind::Group));
        assert_eq!(
            c.list(&ObjectPath::new("/models")).unwrap(),
            vec![("simulation".to_string(), NodeKind::Group)]
        );
    }

    #[test]
    fn group_cannot_pass_through_dataset() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());
        c.create_dataset(
            &ObjectPath::new("/a/b"),
            DataType::Scalar(ScalarType::I32),
            vec![2],
            false,
            2,
            Datum::Int(0),
        )
        .unwrap();

        let err = c.create_group(&ObjectPath::new("/a/b/c")).unwrap_err();
        assert_eq!(err.code(), "E101");
    }

    #[test]
    fn duplicate_dataset_is_rejected() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());
        let path = ObjectPath::new("/x");
        c.create_dataset(&path, ScalarType::F64.into(), vec![1], false, 1, Datum::Real(0.0))
            .unwrap();
        let err = c
            .create_dataset(&path, ScalarType::F64.into(), vec![1], false, 1, Datum::Real(0.0))
            .unwrap_err();
        assert_eq!(err.code(), "E103");
    }

    #[test]
    fn write_type_is_checked() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());
        let id = c
            .create_dataset(&ObjectPath::new("/x"), ScalarType::I32.into(), vec![1], false, 1, Datum::Int(0))
            .unwrap();
        let err = c.write(id, "set_scalar", &[0], &[1], vec![Datum::Real(1.0)]).unwrap_err();
        assert_eq!(err.code(), "E205");
    }

    #[test]
    fn soft_links_resolve_for_reads() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());
        let target = ObjectPath::new("/data/values");
        let id = c
            .create_dataset(&target, ScalarType::I64.into(), vec![1], false, 1, Datum::Int(0))
            .unwrap();
        c.write(id, "set_scalar", &[0], &[1], vec![Datum::Int(42)]).unwrap();

        let link = ObjectPath::new("/methods/opt/sources/values");
        c.create_soft_link(&link, &target).unwrap();
        c.create_soft_link(&link, &target).unwrap();

        assert_eq!(c.resolve_link(&link).unwrap(), target);
        let via_link = c.open_dataset(&link, "read_scalar").unwrap();
        assert_eq!(via_link, id);
        assert_eq!(c.kind(&link), Some(NodeKind::Link));

        let err = c.create_soft_link(&link, &ObjectPath::new("/elsewhere")).unwrap_err();
        assert_eq!(err.code(), "E103");
    }

    #[test]
    fn reopen_replays_everything() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replay.edb");
        let ds_path = ObjectPath::new("/g/values");

        {
            let mut c = Container::open(&StorageConfig::new(&path)).unwrap();
            let id = c
                .create_dataset(&ds_path, ScalarType::F64.into(), vec![0], true, 4, Datum::Real(f64::NAN))
                .unwrap();
            for i in 0..6 {
                c.extend(id, i + 1).unwrap();
                c.write(id, "append_scalar", &[i], &[1], vec![Datum::Real(i as f64)]).unwrap();
            }
            c.set_attribute(&ObjectPath::new("/g"), "units", AttrValue::from("m")).unwrap();
            c.close().unwrap();
            assert!(c.is_closed());
        }

        let c = Container::open(&StorageConfig::new(&path).with_mode(FileMode::Append)).unwrap();
        assert!(!c.is_new());
        let id = c.open_dataset(&ds_path, "read_vector").unwrap();
        assert_eq!(c.dataset(id).dims(), &[6]);
        let values = c.read(id, "read_vector", &[0], &[6]).unwrap();
        assert_eq!(values[5], Datum::Real(5.0));
        assert_eq!(
            c.attributes(&ObjectPath::new("/g")).unwrap().get("units"),
            Some(&AttrValue::from("m"))
        );
    }

    #[test]
    fn closed_container_rejects_mutations() {
        let dir = tempdir().unwrap();
        let mut c = open_fresh(dir.path());
        c.close().unwrap();
        c.close().unwrap();
        assert!(c.create_group(&ObjectPath::new("/late")).is_err());
    }
}
