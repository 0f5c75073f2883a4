//! Default active set captured when a producer is allocated.

use crate::error::{Result, ResultsError};
use crate::types::{ActiveSet, ProducerId, Response, Variables};

/// Shape of a producer's evaluations, fixed at allocation.
///
/// Gradient and Hessian datasets only have rows for the functions listed
/// in `gradient_indices` and `hessian_indices`, and only columns for the
/// derivative variables in `dvv`. Later evaluations are remapped onto
/// these positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSet {
    num_functions: usize,
    gradient_indices: Vec<usize>,
    hessian_indices: Vec<usize>,
    dvv: Vec<usize>,
    num_metadata: usize,
    variable_shape: [usize; 4],
}

impl DefaultSet {
    /// Capture the schema from a representative evaluation.
    pub fn capture(
        producer: &ProducerId,
        variables: &Variables,
        response: &Response,
        active_set: &ActiveSet,
    ) -> Result<Self> {
        check_ascending(producer, &active_set.derivative_vars)?;
        Ok(Self {
            num_functions: active_set.len(),
            gradient_indices: active_set.gradient_indices(),
            hessian_indices: active_set.hessian_indices(),
            dvv: active_set.derivative_vars.clone(),
            num_metadata: response.metadata_labels.len(),
            variable_shape: variables.shape(),
        })
    }

    /// Total number of functions.
    pub fn num_functions(&self) -> usize {
        self.num_functions
    }

    /// Functions that have a row in the gradient dataset.
    pub fn gradient_indices(&self) -> &[usize] {
        &self.gradient_indices
    }

    /// Functions that have a row in the Hessian dataset.
    pub fn hessian_indices(&self) -> &[usize] {
        &self.hessian_indices
    }

    /// Default derivative variable ids.
    pub fn dvv(&self) -> &[usize] {
        &self.dvv
    }

    /// Number of metadata fields.
    pub fn num_metadata(&self) -> usize {
        self.num_metadata
    }

    /// Sizes of the four variable blocks.
    pub fn variable_shape(&self) -> [usize; 4] {
        self.variable_shape
    }

    /// Describe how an evaluation's inputs differ from the schema, if at all.
    pub fn input_drift(&self, active_set: &ActiveSet, variables: &Variables) -> Option<String> {
        if active_set.len() != self.num_functions {
            return Some(format!(
                "{} functions, expected {}",
                active_set.len(),
                self.num_functions
            ));
        }
        if variables.shape() != self.variable_shape {
            return Some(format!(
                "variable counts {:?}, expected {:?}",
                variables.shape(),
                self.variable_shape
            ));
        }
        None
    }

    /// Describe how a response differs from the schema, if at all.
    pub fn response_drift(&self, response: &Response) -> Option<String> {
        if response.num_functions() != self.num_functions {
            return Some(format!(
                "{} function values, expected {}",
                response.num_functions(),
                self.num_functions
            ));
        }
        if !response.metadata.is_empty() && response.metadata.len() != self.num_metadata {
            return Some(format!(
                "{} metadata values, expected {}",
                response.metadata.len(),
                self.num_metadata
            ));
        }
        None
    }

    /// Flags row: 1 for each default derivative variable present in `dvv`.
    ///
    /// `dvv` must already be validated as strictly ascending.
    pub fn dvv_flags(&self, dvv: &[usize]) -> Vec<i32> {
        self.dvv
            .iter()
            .map(|id| i32::from(dvv.binary_search(id).is_ok()))
            .collect()
    }

    /// Position in the default DVV of each entry of `dvv`.
    ///
    /// Both vectors are strictly ascending, so one merge pass suffices.
    /// Derivative variables outside the default set map to `None`.
    pub fn remap(&self, dvv: &[usize]) -> Vec<Option<usize>> {
        let mut positions = Vec::with_capacity(dvv.len());
        let mut k = 0;
        for id in dvv {
            while k < self.dvv.len() && self.dvv[k] < *id {
                k += 1;
            }
            if k < self.dvv.len() && self.dvv[k] == *id {
                positions.push(Some(k));
                k += 1;
            } else {
                positions.push(None);
            }
        }
        positions
    }
}

/// Require a strictly ascending derivative variables vector.
pub fn check_ascending(producer: &ProducerId, dvv: &[usize]) -> Result<()> {
    if dvv.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ResultsError::InvalidDerivativeOrder {
            producer: producer.to_string(),
            dvv: dvv.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VariableKind;

    fn schema(dvv: Vec<usize>) -> DefaultSet {
        let set = ActiveSet::new(vec![7, 3, 1], dvv);
        let vars = Variables::new().with_continuous("x", 1, VariableKind::ContinuousDesign, 0.0);
        let response = Response::new(set.clone(), vec!["a".into(), "b".into(), "c".into()]);
        DefaultSet::capture(&ProducerId::model("simulation", "m"), &vars, &response, &set).unwrap()
    }

    #[test]
    fn capture_derivative_rows() {
        let s = schema(vec![1, 3, 5]);
        assert_eq!(s.num_functions(), 3);
        assert_eq!(s.gradient_indices(), &[0, 1]);
        assert_eq!(s.hessian_indices(), &[0]);
    }

    #[test]
    fn remap_onto_default_positions() {
        let s = schema(vec![1, 3, 5, 8]);
        assert_eq!(s.remap(&[3, 8]), vec![Some(1), Some(3)]);
        assert_eq!(s.remap(&[2, 5]), vec![None, Some(2)]);
        assert_eq!(s.dvv_flags(&[3, 8]), vec![0, 1, 0, 1]);
    }

    #[test]
    fn unsorted_dvv_is_rejected() {
        let producer = ProducerId::model("simulation", "m");
        let err = check_ascending(&producer, &[2, 1]).unwrap_err();
        assert_eq!(err.code(), "E310");
        assert!(check_ascending(&producer, &[1, 1]).is_err());
        assert!(check_ascending(&producer, &[1, 4, 9]).is_ok());
    }

    #[test]
    fn drift_on_function_count() {
        let s = schema(vec![1]);
        let vars = Variables::new().with_continuous("x", 1, VariableKind::ContinuousDesign, 2.0);
        assert!(s.input_drift(&ActiveSet::values_only(3), &vars).is_none());
        assert!(s.input_drift(&ActiveSet::values_only(2), &vars).is_some());
        assert!(s.input_drift(&ActiveSet::values_only(3), &Variables::new()).is_some());
    }
}
