//! Dense column-major matrix used at the adapter boundary.

/// A dense matrix stored column-major in memory.
///
/// Column `j` of a gradient matrix is the gradient of function `j`, which is
/// why the in-memory layout is column-major while the container stores rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Matrix<T> {
    /// A `rows x cols` matrix of default values.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::default())
    }
}

impl<T: Clone> Matrix<T> {
    /// A `rows x cols` matrix with every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap a column-major buffer. Returns `None` if the length is wrong.
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    /// Build from a row-major buffer. Returns `None` if the length is wrong.
    pub fn from_row_major(rows: usize, cols: usize, data: &[T]) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        let mut out = Vec::with_capacity(data.len());
        for c in 0..cols {
            for r in 0..rows {
                out.push(data[r * cols + c].clone());
            }
        }
        Some(Self {
            rows,
            cols,
            data: out,
        })
    }

    /// Build from a list of rows of equal length.
    pub fn from_rows(rows: &[Vec<T>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let flat: Vec<T> = rows.iter().flatten().cloned().collect();
        Self::from_row_major(rows.len(), cols, &flat)
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Check whether the matrix has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        (row < self.rows && col < self.cols).then(|| &self.data[col * self.rows + row])
    }

    /// Overwrite entry `(row, col)`. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if row < self.rows && col < self.cols {
            self.data[col * self.rows + row] = value;
        }
    }

    /// Column `col` as a contiguous slice.
    pub fn column(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    /// Row `row` gathered into a new vector.
    pub fn row(&self, row: usize) -> Vec<T> {
        (0..self.cols)
            .map(|c| self.data[c * self.rows + row].clone())
            .collect()
    }

    /// The column-major backing buffer.
    #[must_use]
    pub fn as_column_major(&self) -> &[T] {
        &self.data
    }

    /// The entries in row-major order.
    pub fn to_row_major(&self) -> Vec<T> {
        (0..self.rows).flat_map(|r| self.row(r)).collect()
    }

    /// The transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        // The column-major buffer of `self` is the row-major buffer of its transpose.
        Self::from_row_major(self.cols, self.rows, &self.data).unwrap_or_else(|| Self {
            rows: self.cols,
            cols: self.rows,
            data: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_and_column_access() {
        let m = Matrix::from_rows(&[vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.column(1), &[2, 5]);
        assert_eq!(m.row(1), vec![4, 5, 6]);
        assert_eq!(m.to_row_major(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(m.as_column_major(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let t = m.transpose();
        assert_eq!(t.rows(), 2);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.row(0), vec![1.0, 3.0, 5.0]);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(Matrix::from_rows(&[vec![1, 2], vec![3]]).is_none());
        assert!(Matrix::from_column_major(2, 2, vec![1, 2, 3]).is_none());
    }
}
