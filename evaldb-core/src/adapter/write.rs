//! Append and in-place write operations.

use super::{ContainerAdapter, Element};
use crate::container::DatasetId;
use crate::error::{Result, StorageError};
use crate::types::{Datum, Matrix, ObjectPath};
use tracing::debug;

impl ContainerAdapter {
    // =========================================================================
    // Append (extensible datasets)
    // =========================================================================

    /// Append one element to a 1-d extensible dataset.
    pub fn append_scalar<T: Element>(&mut self, path: &ObjectPath, value: T) -> Result<()> {
        const OP: &str = "append_scalar";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.expect_type::<T>(id, OP)?;
        let index = self.grow(path, id, OP)?;
        self.put_scalar(id, OP, vec![index], value)
    }

    /// Append one row to a 2-d extensible dataset.
    pub fn append_vector<T: Element>(&mut self, path: &ObjectPath, values: &[T]) -> Result<()> {
        const OP: &str = "append_vector";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 2)?;
        self.expect_type::<T>(id, OP)?;
        self.check_trailing(id, OP, &[values.len()])?;
        let index = self.grow(path, id, OP)?;
        self.put_vector(id, OP, vec![index], values)
    }

    /// Append one matrix to a 3-d extensible dataset.
    pub fn append_matrix<T: Element>(
        &mut self,
        path: &ObjectPath,
        matrix: &Matrix<T>,
        transpose: bool,
    ) -> Result<()> {
        const OP: &str = "append_matrix";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 3)?;
        self.expect_type::<T>(id, OP)?;
        self.check_trailing(id, OP, &disk_shape(matrix, transpose))?;
        let index = self.grow(path, id, OP)?;
        self.put_matrix(id, OP, vec![index], matrix, transpose)
    }

    /// Append one vector of matrices to a 4-d extensible dataset.
    pub fn append_vector_of_matrices<T: Element>(
        &mut self,
        path: &ObjectPath,
        matrices: &[Matrix<T>],
        transpose: bool,
    ) -> Result<()> {
        const OP: &str = "append_vector_of_matrices";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 4)?;
        self.expect_type::<T>(id, OP)?;
        if let Some(first) = matrices.first() {
            let [a, b] = disk_shape(first, transpose);
            self.check_trailing(id, OP, &[matrices.len(), a, b])?;
        } else {
            self.check_trailing(id, OP, &[0])?;
        }
        let index = self.grow(path, id, OP)?;
        self.put_matrices(id, OP, vec![index], matrices, transpose)
    }

    /// Grow an extensible dataset by one row of fill values.
    ///
    /// Returns the index of the new row.
    pub fn reserve_row(&mut self, path: &ObjectPath) -> Result<usize> {
        const OP: &str = "reserve_row";
        let id = self.lookup(path, OP)?;
        self.grow(path, id, OP)
    }

    // =========================================================================
    // Set (existing indices)
    // =========================================================================

    /// Write one element of a 1-d dataset.
    pub fn set_scalar<T: Element>(&mut self, path: &ObjectPath, value: T, index: usize) -> Result<()> {
        const OP: &str = "set_scalar";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.expect_type::<T>(id, OP)?;
        self.put_scalar(id, OP, vec![index], value)
    }

    /// Write a row (`row = true`) or column (`row = false`) of a 2-d dataset.
    pub fn set_vector<T: Element>(
        &mut self,
        path: &ObjectPath,
        values: &[T],
        index: usize,
        row: bool,
    ) -> Result<()> {
        const OP: &str = "set_vector";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 2)?;
        self.expect_type::<T>(id, OP)?;
        if row {
            self.check_trailing(id, OP, &[values.len()])?;
            return self.put_vector(id, OP, vec![index], values);
        }

        let dims = self.container.dataset(id).dims().to_vec();
        if index >= dims[1] {
            return Err(StorageError::InvalidIndex {
                path: path.clone(),
                operation: OP,
                index,
                extent: dims[1],
            });
        }
        if values.len() != dims[0] {
            return Err(StorageError::ShapeMismatch {
                path: path.clone(),
                operation: OP,
                expected: format!("column of {}", dims[0]),
                actual: format!("{} values", values.len()),
            });
        }
        let data = values.iter().cloned().map(Element::into_datum).collect();
        self.container.write(id, OP, &[0, index], &[dims[0], 1], data)
    }

    /// Write the matrix at `index` of a 3-d dataset.
    pub fn set_matrix<T: Element>(
        &mut self,
        path: &ObjectPath,
        matrix: &Matrix<T>,
        index: usize,
        transpose: bool,
    ) -> Result<()> {
        const OP: &str = "set_matrix";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 3)?;
        self.expect_type::<T>(id, OP)?;
        self.put_matrix(id, OP, vec![index], matrix, transpose)
    }

    /// Write the vector of matrices at `index` of a 4-d dataset.
    pub fn set_vector_of_matrices<T: Element>(
        &mut self,
        path: &ObjectPath,
        matrices: &[Matrix<T>],
        index: usize,
        transpose: bool,
    ) -> Result<()> {
        const OP: &str = "set_vector_of_matrices";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 4)?;
        self.expect_type::<T>(id, OP)?;
        self.put_matrices(id, OP, vec![index], matrices, transpose)
    }

    /// Write the only element of a rank-0 dataset.
    pub fn write_scalar<T: Element>(&mut self, path: &ObjectPath, value: T) -> Result<()> {
        const OP: &str = "write_scalar";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 0)?;
        self.expect_type::<T>(id, OP)?;
        self.put_scalar(id, OP, Vec::new(), value)
    }

    /// Overwrite the whole of a 1-d dataset.
    pub fn write_vector<T: Element>(&mut self, path: &ObjectPath, values: &[T]) -> Result<()> {
        const OP: &str = "write_vector";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.expect_type::<T>(id, OP)?;
        let extent = self.container.dataset(id).dims()[0];
        if values.len() != extent {
            return Err(StorageError::ShapeMismatch {
                path: path.clone(),
                operation: OP,
                expected: format!("{} values", extent),
                actual: format!("{} values", values.len()),
            });
        }
        self.put_vector(id, OP, Vec::new(), values)
    }

    /// Overwrite the whole of a 2-d dataset.
    pub fn write_matrix<T: Element>(
        &mut self,
        path: &ObjectPath,
        matrix: &Matrix<T>,
        transpose: bool,
    ) -> Result<()> {
        const OP: &str = "write_matrix";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 2)?;
        self.expect_type::<T>(id, OP)?;
        self.put_matrix(id, OP, Vec::new(), matrix, transpose)
    }

    /// Write one compound record of a 1-d compound dataset.
    pub fn set_record(&mut self, path: &ObjectPath, record: Datum, index: usize) -> Result<()> {
        const OP: &str = "set_record";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.container.write(id, OP, &[index], &[1], vec![record])
    }

    /// Write consecutive compound records starting at row 0.
    pub fn write_records(&mut self, path: &ObjectPath, records: Vec<Datum>) -> Result<()> {
        const OP: &str = "write_records";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        let count = records.len();
        self.container.write(id, OP, &[0], &[count], records)
    }

    /// Write an arbitrary hyperslab of dynamically-typed elements.
    pub fn write_slab(
        &mut self,
        path: &ObjectPath,
        start: &[usize],
        count: &[usize],
        values: Vec<Datum>,
    ) -> Result<()> {
        const OP: &str = "write_slab";
        let id = self.lookup(path, OP)?;
        self.container.write(id, OP, start, count, values)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Extend by one row, caching the handle. Returns the new row index.
    fn grow(&mut self, path: &ObjectPath, id: DatasetId, operation: &'static str) -> Result<usize> {
        let ds = self.container.dataset(id);
        if !ds.is_extensible() {
            return Err(StorageError::NotExtensible {
                path: path.clone(),
                operation,
            });
        }
        let index = ds.dims()[0];
        self.container.extend(id, index + 1)?;
        if self.cache.get(path).is_none() {
            self.cache.insert(path.clone(), id);
        }
        debug!(path = %path, index, "Appended row");
        Ok(index)
    }

    /// Check the dimensions after the first against `expected`.
    fn check_trailing(&self, id: DatasetId, operation: &'static str, expected: &[usize]) -> Result<()> {
        let ds = self.container.dataset(id);
        if &ds.dims()[1..] != expected {
            return Err(StorageError::ShapeMismatch {
                path: ds.path().clone(),
                operation,
                expected: format!("{:?}", &ds.dims()[1..]),
                actual: format!("{:?}", expected),
            });
        }
        Ok(())
    }

    fn put_scalar<T: Element>(
        &mut self,
        id: DatasetId,
        operation: &'static str,
        lead: Vec<usize>,
        value: T,
    ) -> Result<()> {
        let count = vec![1; lead.len()];
        self.container
            .write(id, operation, &lead, &count, vec![value.into_datum()])
    }

    fn put_vector<T: Element>(
        &mut self,
        id: DatasetId,
        operation: &'static str,
        lead: Vec<usize>,
        values: &[T],
    ) -> Result<()> {
        let mut start = lead;
        let mut count = vec![1; start.len()];
        start.push(0);
        count.push(values.len());
        let data = values.iter().cloned().map(Element::into_datum).collect();
        self.container.write(id, operation, &start, &count, data)
    }

    /// Write a matrix below the leading indices `lead`.
    ///
    /// Non-transposed matrices go out one row per selection; a transposed
    /// matrix is a single selection of its column-major buffer.
    fn put_matrix<T: Element>(
        &mut self,
        id: DatasetId,
        operation: &'static str,
        lead: Vec<usize>,
        matrix: &Matrix<T>,
        transpose: bool,
    ) -> Result<()> {
        let ds = self.container.dataset(id);
        let [a, b] = disk_shape(matrix, transpose);
        if ds.dims()[lead.len()..] != [a, b] {
            return Err(StorageError::ShapeMismatch {
                path: ds.path().clone(),
                operation,
                expected: format!("{:?}", &ds.dims()[lead.len()..]),
                actual: format!("[{}, {}]", a, b),
            });
        }

        let ones = vec![1; lead.len()];
        if transpose {
            let start: Vec<usize> = lead.iter().copied().chain([0, 0]).collect();
            let count: Vec<usize> = ones.iter().copied().chain([a, b]).collect();
            let data = matrix
                .as_column_major()
                .iter()
                .cloned()
                .map(Element::into_datum)
                .collect();
            return self.container.write(id, operation, &start, &count, data);
        }

        for r in 0..matrix.rows() {
            let start: Vec<usize> = lead.iter().copied().chain([r, 0]).collect();
            let count: Vec<usize> = ones.iter().copied().chain([1, b]).collect();
            let data = matrix.row(r).into_iter().map(Element::into_datum).collect();
            self.container.write(id, operation, &start, &count, data)?;
        }
        Ok(())
    }

    fn put_matrices<T: Element>(
        &mut self,
        id: DatasetId,
        operation: &'static str,
        lead: Vec<usize>,
        matrices: &[Matrix<T>],
        transpose: bool,
    ) -> Result<()> {
        let ds = self.container.dataset(id);
        let extent = ds.dims()[lead.len()];
        if matrices.len() != extent {
            return Err(StorageError::ShapeMismatch {
                path: ds.path().clone(),
                operation,
                expected: format!("{} matrices", extent),
                actual: format!("{} matrices", matrices.len()),
            });
        }
        for (k, matrix) in matrices.iter().enumerate() {
            let mut inner = lead.clone();
            inner.push(k);
            self.put_matrix(id, operation, inner, matrix, transpose)?;
        }
        Ok(())
    }
}

/// On-disk `[rows, cols]` of a matrix written with `transpose`.
pub(super) fn disk_shape<T: Clone>(matrix: &Matrix<T>, transpose: bool) -> [usize; 2] {
    if transpose {
        [matrix.cols(), matrix.rows()]
    } else {
        [matrix.rows(), matrix.cols()]
    }
}
