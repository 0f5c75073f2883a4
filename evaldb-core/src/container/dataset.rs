//! In-memory dataset: shape, chunked element storage, scales and attributes.

use crate::error::{Result, StorageError};
use crate::types::{AttrValue, DataType, Datum, ObjectPath};
use std::collections::BTreeMap;

/// Handle to an open dataset inside a [`Container`](super::Container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(pub(crate) usize);

/// A dimension scale attached to one axis of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleRef {
    /// Path of the scale dataset.
    pub scale: ObjectPath,
    /// Label the scale was attached under.
    pub label: String,
}

/// A typed rectangular array.
///
/// Elements are stored row-major in chunks of `chunk_rows` rows along the
/// first dimension. Chunks are only materialized when written; every cell
/// that was never written reads back as the fill value.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: ObjectPath,
    dtype: DataType,
    dims: Vec<usize>,
    extensible: bool,
    chunk_rows: usize,
    fill: Datum,
    chunks: BTreeMap<usize, Vec<Datum>>,
    pub(crate) attributes: BTreeMap<String, AttrValue>,
    scale_name: Option<String>,
    scales: Vec<Vec<ScaleRef>>,
}

impl Dataset {
    pub(crate) fn new(
        path: ObjectPath,
        dtype: DataType,
        dims: Vec<usize>,
        extensible: bool,
        chunk_rows: usize,
        fill: Datum,
    ) -> Self {
        let rank = dims.len();
        Self {
            path,
            dtype,
            dims,
            extensible,
            chunk_rows: chunk_rows.max(1),
            fill,
            chunks: BTreeMap::new(),
            attributes: BTreeMap::new(),
            scale_name: None,
            scales: vec![Vec::new(); rank],
        }
    }

    /// Dataset path.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Element type.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    /// Current dimensions.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Whether the first dimension is unbounded.
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// Rows per chunk along the first dimension.
    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    /// Creation fill value.
    pub fn fill(&self) -> &Datum {
        &self.fill
    }

    /// Scale name, if this dataset has been marked as a dimension scale.
    pub fn scale_name(&self) -> Option<&str> {
        self.scale_name.as_deref()
    }

    /// Scales attached to `axis`, in attachment order.
    pub fn scales(&self, axis: usize) -> &[ScaleRef] {
        self.scales.get(axis).map_or(&[], Vec::as_slice)
    }

    /// Attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Number of materialized chunks.
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of rows along the first dimension (1 for a rank-0 dataset).
    fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Number of elements in one row along the first dimension.
    fn row_len(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    pub(crate) fn mark_scale(&mut self, name: &str) {
        self.scale_name = Some(name.to_string());
    }

    /// Attach a scale to `axis`. Returns `false` if it was already attached.
    pub(crate) fn attach_scale(&mut self, axis: usize, scale: ScaleRef) -> Result<bool> {
        let rank = self.rank();
        let Some(attached) = self.scales.get_mut(axis) else {
            return Err(StorageError::InvalidIndex {
                path: self.path.clone(),
                operation: "attach_scale",
                index: axis,
                extent: rank,
            });
        };
        if attached.iter().any(|s| s.scale == scale.scale) {
            return Ok(false);
        }
        attached.push(scale);
        Ok(true)
    }

    /// Grow the first dimension to `extent`.
    pub(crate) fn extend(&mut self, extent: usize) -> Result<()> {
        if !self.extensible {
            return Err(StorageError::NotExtensible {
                path: self.path.clone(),
                operation: "extend",
            });
        }
        if extent < self.dims[0] {
            return Err(StorageError::ShapeMismatch {
                path: self.path.clone(),
                operation: "extend",
                expected: format!("extent >= {}", self.dims[0]),
                actual: extent.to_string(),
            });
        }
        self.dims[0] = extent;
        Ok(())
    }

    /// Validate a hyperslab selection against the current shape.
    ///
    /// Overrunning the first dimension is an index error; overrunning any
    /// other dimension is a shape error.
    pub fn check_selection(
        &self,
        operation: &'static str,
        start: &[usize],
        count: &[usize],
    ) -> Result<()> {
        if start.len() != self.rank() || count.len() != self.rank() {
            return Err(StorageError::ShapeMismatch {
                path: self.path.clone(),
                operation,
                expected: format!("rank {} selection", self.rank()),
                actual: format!("start {:?}, count {:?}", start, count),
            });
        }
        for (axis, ((&s, &c), &d)) in start.iter().zip(count).zip(&self.dims).enumerate() {
            if s + c <= d {
                continue;
            }
            if axis == 0 {
                return Err(StorageError::InvalidIndex {
                    path: self.path.clone(),
                    operation,
                    index: s + c.saturating_sub(1),
                    extent: d,
                });
            }
            return Err(StorageError::ShapeMismatch {
                path: self.path.clone(),
                operation,
                expected: format!("{:?}", self.dims),
                actual: format!("start {:?}, count {:?}", start, count),
            });
        }
        Ok(())
    }

    /// (row, offset within row) of every element of a selection, row-major.
    fn selection_positions(&self, start: &[usize], count: &[usize]) -> Vec<(usize, usize)> {
        let total: usize = count.iter().product();
        let mut positions = Vec::with_capacity(total);
        if total == 0 {
            return positions;
        }

        // Row-major strides of the dimensions below the first
        let mut strides = vec![1usize; self.rank()];
        for axis in (1..self.rank().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.dims[axis + 1];
        }

        let mut index = vec![0usize; self.rank()];
        for _ in 0..total {
            let row = start.first().map_or(0, |s| s + index[0]);
            let within: usize = (1..self.rank())
                .map(|axis| (start[axis] + index[axis]) * strides[axis])
                .sum();
            positions.push((row, within));

            // Advance the odometer, last axis fastest
            for axis in (0..self.rank()).rev() {
                index[axis] += 1;
                if index[axis] < count[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        positions
    }

    /// Write `values` into a validated selection.
    pub(crate) fn write(
        &mut self,
        operation: &'static str,
        start: &[usize],
        count: &[usize],
        values: Vec<Datum>,
    ) -> Result<()> {
        self.check_selection(operation, start, count)?;
        let positions = self.selection_positions(start, count);
        if positions.len() != values.len() {
            return Err(StorageError::ShapeMismatch {
                path: self.path.clone(),
                operation,
                expected: format!("{} elements", positions.len()),
                actual: format!("{} elements", values.len()),
            });
        }

        let chunk_rows = self.chunk_rows;
        let chunk_len = chunk_rows * self.row_len().max(1);
        let row_len = self.row_len();
        for ((row, within), value) in positions.into_iter().zip(values) {
            let fill = &self.fill;
            let chunk = self
                .chunks
                .entry(row / chunk_rows)
                .or_insert_with(|| vec![fill.clone(); chunk_len]);
            chunk[(row % chunk_rows) * row_len + within] = value;
        }
        Ok(())
    }

    /// Read a validated selection, row-major.
    pub fn read(&self, operation: &'static str, start: &[usize], count: &[usize]) -> Result<Vec<Datum>> {
        self.check_selection(operation, start, count)?;
        let row_len = self.row_len();
        Ok(self
            .selection_positions(start, count)
            .into_iter()
            .map(|(row, within)| {
                self.chunks
                    .get(&(row / self.chunk_rows))
                    .map_or_else(
                        || self.fill.clone(),
                        |chunk| chunk[(row % self.chunk_rows) * row_len + within].clone(),
                    )
            })
            .collect())
    }

    /// The full selection covering the dataset.
    pub fn full_selection(&self) -> (Vec<usize>, Vec<usize>) {
        (vec![0; self.rank()], self.dims.clone())
    }

    /// The selection covering row `row` along the first dimension.
    pub fn row_selection(&self, row: usize) -> (Vec<usize>, Vec<usize>) {
        let mut start = vec![0; self.rank()];
        let mut count = self.dims.clone();
        if let (Some(s), Some(c)) = (start.first_mut(), count.first_mut()) {
            *s = row;
            *c = 1;
        }
        (start, count)
    }

    /// Total element count implied by the current extent.
    pub fn len(&self) -> usize {
        self.rows() * self.row_len()
    }

    /// Check whether the dataset holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
