//! Typed read operations.

use super::{ContainerAdapter, Element};
use crate::container::DatasetId;
use crate::error::{Result, StorageError};
use crate::types::{DataType, Datum, Matrix, ObjectPath};

impl ContainerAdapter {
    /// Read the only element of a rank-0 dataset.
    pub fn read_scalar<T: Element>(&self, path: &ObjectPath) -> Result<T> {
        const OP: &str = "read_scalar";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 0)?;
        self.expect_type::<T>(id, OP)?;
        let data = self.container.read(id, OP, &[], &[])?;
        self.single(id, OP, data)
    }

    /// Read element `index` of a 1-d dataset.
    pub fn read_element<T: Element>(&self, path: &ObjectPath, index: usize) -> Result<T> {
        const OP: &str = "read_element";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.expect_type::<T>(id, OP)?;
        let data = self.container.read(id, OP, &[index], &[1])?;
        self.single(id, OP, data)
    }

    /// Read the whole of a 1-d dataset.
    pub fn read_vector<T: Element>(&self, path: &ObjectPath) -> Result<Vec<T>> {
        const OP: &str = "read_vector";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        self.expect_type::<T>(id, OP)?;
        let extent = self.container.dataset(id).dims()[0];
        let data = self.container.read(id, OP, &[0], &[extent])?;
        self.elements(id, OP, data)
    }

    /// Read row `index` of a 2-d dataset.
    pub fn read_row<T: Element>(&self, path: &ObjectPath, index: usize) -> Result<Vec<T>> {
        const OP: &str = "read_row";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 2)?;
        self.expect_type::<T>(id, OP)?;
        let (start, count) = self.container.dataset(id).row_selection(index);
        let data = self.container.read(id, OP, &start, &count)?;
        self.elements(id, OP, data)
    }

    /// Read the whole of a 2-d dataset as a matrix.
    ///
    /// `transpose` must match the flag the matrix was written with.
    pub fn read_matrix<T: Element>(&self, path: &ObjectPath, transpose: bool) -> Result<Matrix<T>> {
        const OP: &str = "read_matrix";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 2)?;
        self.expect_type::<T>(id, OP)?;
        self.get_matrix(id, OP, Vec::new(), transpose)
    }

    /// Read the matrix at `index` of a 3-d dataset.
    pub fn read_matrix_at<T: Element>(
        &self,
        path: &ObjectPath,
        index: usize,
        transpose: bool,
    ) -> Result<Matrix<T>> {
        const OP: &str = "read_matrix_at";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 3)?;
        self.expect_type::<T>(id, OP)?;
        self.get_matrix(id, OP, vec![index], transpose)
    }

    /// Read the vector of matrices at `index` of a 4-d dataset.
    pub fn read_vector_of_matrices_at<T: Element>(
        &self,
        path: &ObjectPath,
        index: usize,
        transpose: bool,
    ) -> Result<Vec<Matrix<T>>> {
        const OP: &str = "read_vector_of_matrices_at";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 4)?;
        self.expect_type::<T>(id, OP)?;
        let extent = self.container.dataset(id).dims()[1];
        (0..extent)
            .map(|k| self.get_matrix(id, OP, vec![index, k], transpose))
            .collect()
    }

    /// Read every record of a 1-d compound dataset.
    pub fn read_records(&self, path: &ObjectPath) -> Result<Vec<Datum>> {
        const OP: &str = "read_records";
        let id = self.lookup(path, OP)?;
        self.expect_rank(id, OP, 1)?;
        let ds = self.container.dataset(id);
        if !matches!(ds.dtype(), DataType::Compound(_)) {
            return Err(StorageError::TypeMismatch {
                path: path.clone(),
                operation: OP,
                expected: ds.dtype().name(),
                actual: "compound".to_string(),
            });
        }
        let (start, count) = ds.full_selection();
        self.container.read(id, OP, &start, &count)
    }

    /// Read an arbitrary hyperslab as dynamically-typed elements.
    pub fn read_slab(&self, path: &ObjectPath, start: &[usize], count: &[usize]) -> Result<Vec<Datum>> {
        const OP: &str = "read_slab";
        let id = self.lookup(path, OP)?;
        self.container.read(id, OP, start, count)
    }

    fn get_matrix<T: Element>(
        &self,
        id: DatasetId,
        operation: &'static str,
        lead: Vec<usize>,
        transpose: bool,
    ) -> Result<Matrix<T>> {
        let ds = self.container.dataset(id);
        let (a, b) = (ds.dims()[lead.len()], ds.dims()[lead.len() + 1]);
        let count: Vec<usize> = vec![1; lead.len()].into_iter().chain([a, b]).collect();
        let start: Vec<usize> = lead.into_iter().chain([0, 0]).collect();
        let data = self.container.read(id, operation, &start, &count)?;
        let data = self.elements(id, operation, data)?;

        // Row-major a x b on disk; a transposed write stored the column-major
        // buffer of a b x a matrix.
        let matrix = if transpose {
            Matrix::from_column_major(b, a, data)
        } else {
            Matrix::from_row_major(a, b, &data)
        };
        matrix.ok_or_else(|| StorageError::ShapeMismatch {
            path: ds.path().clone(),
            operation,
            expected: format!("[{}, {}]", a, b),
            actual: "short read".to_string(),
        })
    }

    fn elements<T: Element>(&self, id: DatasetId, operation: &'static str, data: Vec<Datum>) -> Result<Vec<T>> {
        data.into_iter()
            .map(|d| {
                let kind = d.kind_name();
                T::from_datum(d).ok_or_else(|| StorageError::TypeMismatch {
                    path: self.container.dataset(id).path().clone(),
                    operation,
                    expected: T::SCALAR.name().to_string(),
                    actual: kind.to_string(),
                })
            })
            .collect()
    }

    fn single<T: Element>(&self, id: DatasetId, operation: &'static str, data: Vec<Datum>) -> Result<T> {
        self.elements(id, operation, data)?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::ShapeMismatch {
                path: self.container.dataset(id).path().clone(),
                operation,
                expected: "1 element".to_string(),
                actual: "0 elements".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::ContainerAdapter;
    use crate::config::StorageConfig;
    use crate::types::{AttrValue, Matrix, ObjectPath};
    use tempfile::tempdir;

    #[test]
    fn root_attributes_written_on_create() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path().join("a.edb")).with_tool_version("6.19", "deadbeef");
        let adapter = ContainerAdapter::open(&config).unwrap();

        let root = ObjectPath::root();
        assert_eq!(
            adapter.attribute(&root, "format_version").unwrap(),
            AttrValue::from("1.0.0")
        );
        assert_eq!(
            adapter.attribute(&root, "tool_revision").unwrap(),
            AttrValue::from("deadbeef")
        );
        assert!(adapter.attribute(&root, "created").is_ok());
        assert_eq!(adapter.attribute(&root, "missing").unwrap_err().code(), "E102");
    }

    #[test]
    fn set_vector_writes_rows_and_columns() {
        let dir = tempdir().unwrap();
        let mut adapter = ContainerAdapter::open(&StorageConfig::new(dir.path().join("v.edb"))).unwrap();
        let path = ObjectPath::new("/grid");
        adapter.create_empty_dataset::<i32>(&path, &[2, 3], None).unwrap();

        adapter.set_vector(&path, &[1, 2, 3], 1, true).unwrap();
        adapter.set_vector(&path, &[7, 8], 0, false).unwrap();

        let m: Matrix<i32> = adapter.read_matrix(&path, false).unwrap();
        assert_eq!(m.to_row_major(), vec![7, 0, 0, 8, 2, 3]);

        let err = adapter.set_vector(&path, &[1, 2], 3, false).unwrap_err();
        assert_eq!(err.code(), "E202");
        let err = adapter.set_vector(&path, &[1, 2, 3], 2, true).unwrap_err();
        assert_eq!(err.code(), "E202");
    }

    #[test]
    fn reading_with_wrong_element_type_fails() {
        let dir = tempdir().unwrap();
        let mut adapter = ContainerAdapter::open(&StorageConfig::new(dir.path().join("t.edb"))).unwrap();
        let path = ObjectPath::new("/ids");
        adapter.create_empty_dataset::<u64>(&path, &[0], None).unwrap();
        adapter.append_scalar(&path, 3u64).unwrap();

        assert_eq!(adapter.read_vector::<u64>(&path).unwrap(), vec![3]);
        assert_eq!(adapter.read_vector::<f64>(&path).unwrap_err().code(), "E205");
    }
}
