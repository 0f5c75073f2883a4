//! Active sets and responses.

use crate::error::{Result, ResultsError};
use evaldb_core::Matrix;
use serde::{Deserialize, Serialize};

/// Request bit for a function value.
pub const REQUEST_VALUE: u8 = 1;
/// Request bit for a gradient.
pub const REQUEST_GRADIENT: u8 = 2;
/// Request bit for a Hessian.
pub const REQUEST_HESSIAN: u8 = 4;

/// What was requested of an evaluation.
///
/// `request[i]` is a bit mask over [`REQUEST_VALUE`], [`REQUEST_GRADIENT`]
/// and [`REQUEST_HESSIAN`] for function `i`. `derivative_vars` lists the
/// ids of the variables derivatives are taken with respect to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveSet {
    /// Per-function request mask.
    pub request: Vec<u8>,
    /// Derivative variable ids.
    pub derivative_vars: Vec<usize>,
}

impl ActiveSet {
    /// Active set with an explicit request vector and derivative variables.
    pub fn new(request: Vec<u8>, derivative_vars: Vec<usize>) -> Self {
        Self {
            request,
            derivative_vars,
        }
    }

    /// Values only for `num_functions` functions.
    pub fn values_only(num_functions: usize) -> Self {
        Self::new(vec![REQUEST_VALUE; num_functions], Vec::new())
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.request.len()
    }

    /// Whether the set covers no functions.
    pub fn is_empty(&self) -> bool {
        self.request.is_empty()
    }

    /// Whether the value of function `i` was requested.
    pub fn wants_value(&self, i: usize) -> bool {
        self.bit(i, REQUEST_VALUE)
    }

    /// Whether the gradient of function `i` was requested.
    pub fn wants_gradient(&self, i: usize) -> bool {
        self.bit(i, REQUEST_GRADIENT)
    }

    /// Whether the Hessian of function `i` was requested.
    pub fn wants_hessian(&self, i: usize) -> bool {
        self.bit(i, REQUEST_HESSIAN)
    }

    /// Indices of functions with a gradient request.
    pub fn gradient_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.wants_gradient(i)).collect()
    }

    /// Indices of functions with a Hessian request.
    pub fn hessian_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.wants_hessian(i)).collect()
    }

    fn bit(&self, i: usize, mask: u8) -> bool {
        self.request.get(i).is_some_and(|r| r & mask != 0)
    }
}

/// Results of one evaluation.
///
/// `gradients` is `dvv x num_functions`, column `j` holding the gradient of
/// function `j` with respect to the evaluation's derivative variables.
/// `hessians[j]` is the `dvv x dvv` Hessian of function `j`, empty when not
/// requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// The active set the response answers.
    pub active_set: ActiveSet,
    /// Function descriptors.
    pub function_labels: Vec<String>,
    /// Function values.
    pub function_values: Vec<f64>,
    /// Gradient matrix, one column per function.
    pub gradients: Matrix<f64>,
    /// Hessians, one per function.
    pub hessians: Vec<Matrix<f64>>,
    /// Metadata field labels.
    pub metadata_labels: Vec<String>,
    /// Metadata values.
    pub metadata: Vec<f64>,
}

impl Response {
    /// Response shaped for `active_set`, with every value zeroed.
    pub fn new(active_set: ActiveSet, function_labels: Vec<String>) -> Self {
        let nfns = active_set.len();
        let dvv = active_set.derivative_vars.len();
        let gradient_cols = if active_set.gradient_indices().is_empty() { 0 } else { nfns };
        let hessians = (0..nfns)
            .map(|i| {
                if active_set.wants_hessian(i) {
                    Matrix::new(dvv, dvv)
                } else {
                    Matrix::new(0, 0)
                }
            })
            .collect();
        Self {
            function_labels,
            function_values: vec![0.0; nfns],
            gradients: Matrix::new(dvv, gradient_cols),
            hessians,
            metadata_labels: Vec::new(),
            metadata: Vec::new(),
            active_set,
        }
    }

    /// Set the metadata fields.
    pub fn with_metadata(mut self, labels: Vec<String>, values: Vec<f64>) -> Self {
        self.metadata_labels = labels;
        self.metadata = values;
        self
    }

    /// Number of functions.
    pub fn num_functions(&self) -> usize {
        self.function_values.len()
    }

    /// Set the value of function `i`.
    pub fn set_value(&mut self, i: usize, value: f64) -> Result<()> {
        let size = self.function_values.len();
        let slot = self
            .function_values
            .get_mut(i)
            .ok_or_else(|| out_of_range("function_values", i, size))?;
        *slot = value;
        Ok(())
    }

    /// Set the gradient of function `i`.
    ///
    /// Fails when no gradient column was allocated for `i`.
    pub fn set_gradient(&mut self, i: usize, gradient: &[f64]) -> Result<()> {
        if i >= self.gradients.cols() {
            return Err(out_of_range("gradients", i, self.gradients.cols()));
        }
        for (r, g) in gradient.iter().enumerate() {
            self.gradients.set(r, i, *g);
        }
        Ok(())
    }

    /// Set the Hessian of function `i`.
    pub fn set_hessian(&mut self, i: usize, hessian: Matrix<f64>) -> Result<()> {
        let size = self.hessians.len();
        let slot = self
            .hessians
            .get_mut(i)
            .ok_or_else(|| out_of_range("hessians", i, size))?;
        *slot = hessian;
        Ok(())
    }

    /// Gradient of function `i`, if one was allocated.
    pub fn gradient(&self, i: usize) -> Option<&[f64]> {
        (i < self.gradients.cols()).then(|| self.gradients.column(i))
    }
}

fn out_of_range(key: &str, index: usize, size: usize) -> ResultsError {
    ResultsError::IndexOutOfRange {
        key: key.to_string(),
        index,
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_bits() {
        let set = ActiveSet::new(vec![1, 3, 7, 0], vec![1, 2]);
        assert!(set.wants_value(0));
        assert!(!set.wants_gradient(0));
        assert_eq!(set.gradient_indices(), vec![1, 2]);
        assert_eq!(set.hessian_indices(), vec![2]);
        assert!(!set.wants_value(9));
    }

    #[test]
    fn response_shape_follows_active_set() {
        let set = ActiveSet::new(vec![3, 1, 7], vec![1, 2]);
        let mut response = Response::new(set, vec!["f1".into(), "f2".into(), "f3".into()]);
        assert_eq!(response.gradients.rows(), 2);
        assert_eq!(response.gradients.cols(), 3);
        assert_eq!(response.hessians[2].rows(), 2);
        assert!(response.hessians[0].is_empty());

        response.set_gradient(0, &[0.5, -0.5]).unwrap();
        assert_eq!(response.gradient(0), Some(&[0.5, -0.5][..]));
    }

    #[test]
    fn setters_reject_unknown_functions() {
        let set = ActiveSet::new(vec![3, 5], vec![4]);
        let mut response = Response::new(set, vec!["f1".into(), "f2".into()]);
        response.set_value(1, 2.0).unwrap();
        assert_eq!(response.function_values, vec![0.0, 2.0]);

        assert_eq!(response.set_value(2, 1.0).unwrap_err().code(), "E302");
        assert_eq!(response.set_gradient(2, &[1.0]).unwrap_err().code(), "E302");
        assert_eq!(
            response.set_hessian(5, Matrix::filled(1, 1, 1.0)).unwrap_err().code(),
            "E302"
        );
        response.set_hessian(1, Matrix::filled(1, 1, 9.0)).unwrap();
        assert_eq!(response.hessians[1].get(0, 0), Some(&9.0));
    }
}
