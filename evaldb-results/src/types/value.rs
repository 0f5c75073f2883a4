//! Method result values and the dimension scales labelling them.

use evaldb_core::{Matrix, ScalarType};

/// A method result handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Real scalar.
    Real(f64),
    /// Integer scalar.
    Int(i64),
    /// String scalar.
    Str(String),
    /// Real vector.
    RealVector(Vec<f64>),
    /// Integer vector.
    IntVector(Vec<i64>),
    /// String vector.
    StrVector(Vec<String>),
    /// Real matrix.
    RealMatrix(Matrix<f64>),
    /// Integer matrix.
    IntMatrix(Matrix<i64>),
    /// String matrix.
    StrMatrix(Matrix<String>),
}

impl ResultValue {
    /// Element type of the value.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Real(_) | Self::RealVector(_) | Self::RealMatrix(_) => ScalarType::F64,
            Self::Int(_) | Self::IntVector(_) | Self::IntMatrix(_) => ScalarType::I64,
            Self::Str(_) | Self::StrVector(_) | Self::StrMatrix(_) => ScalarType::Str,
        }
    }

    /// Short name of the variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Real(_) => "real",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::RealVector(_) => "real vector",
            Self::IntVector(_) => "int vector",
            Self::StrVector(_) => "string vector",
            Self::RealMatrix(_) => "real matrix",
            Self::IntMatrix(_) => "int matrix",
            Self::StrMatrix(_) => "string matrix",
        }
    }

    /// Number of dimensions (0, 1 or 2).
    pub fn rank(&self) -> usize {
        match self {
            Self::Real(_) | Self::Int(_) | Self::Str(_) => 0,
            Self::RealVector(_) | Self::IntVector(_) | Self::StrVector(_) => 1,
            Self::RealMatrix(_) | Self::IntMatrix(_) | Self::StrMatrix(_) => 2,
        }
    }

    /// Rendered for plain-text reports.
    pub fn render(&self) -> String {
        fn join<T: ToString>(items: &[T]) -> String {
            items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
        }
        fn rows<T: Clone + ToString>(m: &Matrix<T>) -> String {
            (0..m.rows())
                .map(|r| join(&m.row(r)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        match self {
            Self::Real(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Str(v) => v.clone(),
            Self::RealVector(v) => join(v),
            Self::IntVector(v) => join(v),
            Self::StrVector(v) => join(v),
            Self::RealMatrix(m) => rows(m),
            Self::IntMatrix(m) => rows(m),
            Self::StrMatrix(m) => rows(m),
        }
    }
}

impl From<f64> for ResultValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<i64> for ResultValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ResultValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<f64>> for ResultValue {
    fn from(v: Vec<f64>) -> Self {
        Self::RealVector(v)
    }
}

impl From<Vec<i64>> for ResultValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntVector(v)
    }
}

impl From<Vec<String>> for ResultValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrVector(v)
    }
}

impl From<Matrix<f64>> for ResultValue {
    fn from(m: Matrix<f64>) -> Self {
        Self::RealMatrix(m)
    }
}

/// Values of a dimension scale.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleData {
    /// Real labels.
    RealVector(Vec<f64>),
    /// Integer labels.
    IntVector(Vec<i64>),
    /// String labels.
    StrVector(Vec<String>),
    /// Real 2-d labels.
    RealMatrix(Matrix<f64>),
    /// Integer 2-d labels.
    IntMatrix(Matrix<i64>),
    /// String 2-d labels.
    StrMatrix(Matrix<String>),
}

/// Whether a scale belongs to one dataset or to a whole execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleScope {
    /// Shared by every dataset of the execution that attaches it.
    Shared,
    /// Owned by a single dataset.
    #[default]
    Unshared,
}

/// A scale to attach to one dimension of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct DimScale {
    /// Dimension the scale labels.
    pub dim: usize,
    /// Scale label.
    pub label: String,
    /// Scale values.
    pub data: ScaleData,
    /// Shared or unshared.
    pub scope: ScaleScope,
}

impl DimScale {
    /// Unshared scale on `dim`.
    pub fn new(dim: usize, label: impl Into<String>, data: ScaleData) -> Self {
        Self {
            dim,
            label: label.into(),
            data,
            scope: ScaleScope::Unshared,
        }
    }

    /// Unshared string scale on `dim`.
    pub fn strings<S: Into<String>>(dim: usize, label: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            dim,
            label,
            ScaleData::StrVector(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Unshared real scale on `dim`.
    pub fn reals(dim: usize, label: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(dim, label, ScaleData::RealVector(values))
    }

    /// Unshared integer scale on `dim`.
    pub fn ints(dim: usize, label: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(dim, label, ScaleData::IntVector(values))
    }

    /// Mark the scale as shared across the execution.
    pub fn shared(mut self) -> Self {
        self.scope = ScaleScope::Shared;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_rank_and_type() {
        let m = Matrix::<f64>::new(2, 3);
        let v = ResultValue::from(m);
        assert_eq!(v.rank(), 2);
        assert_eq!(v.scalar_type(), ScalarType::F64);
        assert_eq!(ResultValue::from("x").rank(), 0);
    }

    #[test]
    fn render_matrix_by_rows() {
        let m = Matrix::from_rows(&[vec![1i64, 2], vec![3, 4]]).unwrap();
        assert_eq!(ResultValue::IntMatrix(m).render(), "1 2\n3 4");
    }

    #[test]
    fn shared_scale_builder() {
        let scale = DimScale::strings(1, "responses", ["f1", "f2"]).shared();
        assert_eq!(scale.scope, ScaleScope::Shared);
        assert_eq!(scale.data, ScaleData::StrVector(vec!["f1".into(), "f2".into()]));
    }
}
