//! Dataset and scale paths of a producer.

use super::DefaultSet;
use crate::types::ProducerId;
use evaldb_core::ObjectPath;

/// Variable block dataset names, in [`Variables::shape`](crate::types::Variables::shape) order.
pub const VARIABLE_BLOCKS: [&str; 4] = ["continuous", "discrete_integer", "discrete_string", "discrete_real"];

/// Scale label of the evaluation id axis.
pub const EVALUATION_IDS: &str = "evaluation_ids";

/// Paths of every dataset and scale a producer owns.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: ObjectPath,
    pub evaluation_ids: ObjectPath,
    pub variables: [ObjectPath; 4],
    pub functions: ObjectPath,
    pub gradients: Option<ObjectPath>,
    pub hessians: Option<ObjectPath>,
    pub active_set: ObjectPath,
    pub derivative_variables: Option<ObjectPath>,
    pub metadata: Option<ObjectPath>,
}

impl Layout {
    pub fn new(producer: &ProducerId, schema: &DefaultSet) -> Self {
        let root = producer.root_path();
        let has_dvv = !schema.dvv().is_empty();
        let responses = root.join("responses");
        let properties = root.join("properties");
        Self {
            evaluation_ids: root.scale_mirror().join(EVALUATION_IDS),
            variables: VARIABLE_BLOCKS.map(|b| root.join("variables").join(b)),
            functions: responses.join("functions"),
            gradients: (has_dvv && !schema.gradient_indices().is_empty()).then(|| responses.join("gradients")),
            hessians: (has_dvv && !schema.hessian_indices().is_empty()).then(|| responses.join("hessians")),
            active_set: properties.join("active_set_vector"),
            derivative_variables: has_dvv.then(|| properties.join("derivative_variables_vector")),
            metadata: (schema.num_metadata() > 0).then(|| root.join("metadata")),
            root,
        }
    }

    /// Every dataset the producer may own, with the per-evaluation shape
    /// `schema` gives it, or `None` when the dataset must not exist.
    pub fn row_shapes(&self, schema: &DefaultSet) -> Vec<(ObjectPath, Option<Vec<usize>>)> {
        let responses = self.root.join("responses");
        let properties = self.root.join("properties");
        let nfns = schema.num_functions();
        let dvv = schema.dvv().len();

        let mut shapes: Vec<_> = self
            .variables
            .iter()
            .zip(schema.variable_shape())
            .map(|(path, n)| (path.clone(), (n > 0).then(|| vec![n])))
            .collect();
        shapes.extend([
            (self.functions.clone(), (nfns > 0).then(|| vec![nfns])),
            (self.active_set.clone(), (nfns > 0).then(|| vec![nfns])),
            (
                responses.join("gradients"),
                self.gradients.as_ref().map(|_| vec![schema.gradient_indices().len(), dvv]),
            ),
            (
                responses.join("hessians"),
                self.hessians.as_ref().map(|_| vec![schema.hessian_indices().len(), dvv, dvv]),
            ),
            (
                properties.join("derivative_variables_vector"),
                self.derivative_variables.as_ref().map(|_| vec![dvv]),
            ),
            (
                self.root.join("metadata"),
                self.metadata.as_ref().map(|_| vec![schema.num_metadata()]),
            ),
        ]);
        shapes
    }

    /// Scale `name` under the mirror of `dataset`.
    pub fn scale(dataset: &ObjectPath, name: &str) -> ObjectPath {
        dataset.scale_mirror().join(name)
    }

    /// Scale of the default derivative variable ids.
    pub fn derivative_ids(&self) -> ObjectPath {
        self.root.join("responses").scale_mirror().join("derivative_variables")
    }

    /// Scale of the function descriptors.
    pub fn function_descriptors(&self) -> ObjectPath {
        self.root.join("responses").scale_mirror().join("function_descriptors")
    }
}
