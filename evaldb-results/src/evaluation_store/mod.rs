//! Per-evaluation storage of model and interface results.
//!
//! Every producer (a model or an interface) gets a fixed set of extensible
//! datasets whose first axis is the evaluation. Storage is two-phase:
//!
//! 1. [`EvaluationStore::store_variables`] runs when an evaluation is
//!    dispatched. It appends the evaluation id, the variables, the active
//!    set and the derivative flags, and reserves one fill-valued row in
//!    every response dataset.
//! 2. [`EvaluationStore::store_response`] runs when the result arrives,
//!    possibly out of order, and writes into the reserved row.
//!
//! Row `i` of every dataset of a producer therefore describes the same
//! evaluation, and a failed evaluation leaves its response rows at NaN.

mod default_set;
mod layout;

pub use default_set::{DefaultSet, check_ascending};
pub use layout::{EVALUATION_IDS, VARIABLE_BLOCKS};

use crate::config::{InterfaceSelection, ModelSelection};
use crate::error::{Result, ResultsError};
use crate::parameters::{self, VariableParameters};
use crate::types::{ActiveSet, InterfaceKind, ProducerId, Response, SourceRef, Variables};
use evaldb_core::{ContainerAdapter, Element, Matrix, ObjectPath, SharedAdapter, StorageError};
use layout::Layout;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

struct ProducerState {
    schema: DefaultSet,
    layout: Layout,
    disabled: bool,
}

/// Two-phase evaluation storage over a shared container adapter.
pub struct EvaluationStore {
    adapter: SharedAdapter,
    model_selection: ModelSelection,
    interface_selection: InterfaceSelection,
    top_method_model: Option<String>,
    method_models: BTreeSet<String>,
    producers: HashMap<ProducerId, ProducerState>,
    slots: HashMap<(ProducerId, u64), usize>,
}

impl EvaluationStore {
    /// Store that records every model and every interface.
    pub fn new(adapter: SharedAdapter) -> Self {
        Self {
            adapter,
            model_selection: ModelSelection::All,
            interface_selection: InterfaceSelection::All,
            top_method_model: None,
            method_models: BTreeSet::new(),
            producers: HashMap::new(),
            slots: HashMap::new(),
        }
    }

    /// Restrict which producers are stored.
    pub fn with_selection(mut self, models: ModelSelection, interfaces: InterfaceSelection) -> Self {
        self.model_selection = models;
        self.interface_selection = interfaces;
        self
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Record the model driven by the top-level method.
    pub fn set_top_method_model(&mut self, model_id: impl Into<String>) {
        let model_id = model_id.into();
        self.method_models.insert(model_id.clone());
        self.top_method_model = Some(model_id);
    }

    /// Record a model driven directly by some method.
    pub fn register_method_model(&mut self, model_id: impl Into<String>) {
        self.method_models.insert(model_id.into());
    }

    /// Whether evaluations of `producer` are stored at all.
    pub fn is_selected(&self, producer: &ProducerId) -> bool {
        match producer {
            ProducerId::Model { model_id, .. } => match self.model_selection {
                ModelSelection::All => true,
                ModelSelection::AllMethods => self.method_models.contains(model_id),
                ModelSelection::TopMethod => self.top_method_model.as_deref() == Some(model_id.as_str()),
                ModelSelection::None => false,
            },
            ProducerId::Interface { kind, .. } => match self.interface_selection {
                InterfaceSelection::All => true,
                InterfaceSelection::Simulation => *kind == InterfaceKind::Simulation,
                InterfaceSelection::None => false,
            },
        }
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Create the datasets and scales of `producer` from a representative
    /// evaluation and capture its default schema.
    ///
    /// Allocating an already allocated producer does nothing. Datasets left
    /// by an earlier run of an appended container are reused when their
    /// shapes match the schema; otherwise the producer starts disabled.
    pub fn allocate(
        &mut self,
        producer: &ProducerId,
        variables: &Variables,
        response: &Response,
        active_set: &ActiveSet,
    ) -> Result<()> {
        if !self.is_selected(producer) || self.producers.contains_key(producer) {
            return Ok(());
        }
        let schema = DefaultSet::capture(producer, variables, response, active_set)?;
        let layout = Layout::new(producer, &schema);

        let mismatch = {
            let mut adapter = self.adapter.lock();
            if adapter.exists(&layout.evaluation_ids) {
                debug!(producer = %producer, "Reusing existing evaluation storage");
                storage_drift(&adapter, &layout, &schema)?
            } else {
                create_datasets(&mut adapter, &layout, &schema, variables, response)?;
                None
            }
        };
        if let Some(reason) = &mismatch {
            warn!(
                producer = %producer,
                reason = %reason,
                "Existing evaluation storage does not match the allocated schema; evaluations of this producer are not stored"
            );
        }

        info!(
            producer = %producer,
            functions = schema.num_functions(),
            gradients = schema.gradient_indices().len(),
            hessians = schema.hessian_indices().len(),
            "Allocated evaluation storage"
        );
        self.producers.insert(
            producer.clone(),
            ProducerState {
                schema,
                layout,
                disabled: mismatch.is_some(),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Two-phase storage
    // =========================================================================

    /// Phase 1: record the inputs of evaluation `eval_id` and reserve its
    /// response rows.
    pub fn store_variables(
        &mut self,
        producer: &ProducerId,
        eval_id: u64,
        active_set: &ActiveSet,
        variables: &Variables,
    ) -> Result<()> {
        if !self.is_selected(producer) {
            return Ok(());
        }
        let state = self.producers.get_mut(producer).ok_or_else(|| ResultsError::KeyNotFound {
            key: producer.to_string(),
        })?;
        if state.disabled {
            return Ok(());
        }
        if let Some(reason) = state.schema.input_drift(active_set, variables) {
            disable(state, producer, eval_id, &reason);
            return Ok(());
        }
        check_ascending(producer, &active_set.derivative_vars)?;

        let mut adapter = self.adapter.lock();
        // Every append below must succeed, or rows stop lining up.
        if let Some(reason) = storage_drift(&adapter, &state.layout, &state.schema)? {
            disable(state, producer, eval_id, &reason);
            return Ok(());
        }
        let layout = &state.layout;
        let row = adapter.dims(&layout.evaluation_ids)?[0];
        adapter.append_scalar(&layout.evaluation_ids, eval_id)?;

        append_block(&mut adapter, &layout.variables[0], &variables.continuous.values)?;
        append_block(&mut adapter, &layout.variables[1], &variables.discrete_int.values)?;
        append_block(&mut adapter, &layout.variables[2], &variables.discrete_string.values)?;
        append_block(&mut adapter, &layout.variables[3], &variables.discrete_real.values)?;

        if state.schema.num_functions() > 0 {
            let asv: Vec<i32> = active_set.request.iter().map(|&r| i32::from(r)).collect();
            adapter.append_vector(&layout.active_set, &asv)?;
            adapter.reserve_row(&layout.functions)?;
        }
        if let Some(path) = &layout.derivative_variables {
            adapter.append_vector(path, &state.schema.dvv_flags(&active_set.derivative_vars))?;
        }
        for path in [&layout.gradients, &layout.hessians, &layout.metadata].into_iter().flatten() {
            adapter.reserve_row(path)?;
        }

        self.slots.insert((producer.clone(), eval_id), row);
        debug!(producer = %producer, eval_id, row, "Stored evaluation variables");
        Ok(())
    }

    /// Phase 2: write the response of evaluation `eval_id` into the rows
    /// reserved for it.
    ///
    /// A response without a reserved slot is ignored. Evaluations reserved
    /// before their producer was disabled are still answered. A gradient or
    /// Hessian whose shape does not match the response's derivative
    /// variables is an error and leaves the slot pending.
    pub fn store_response(&mut self, producer: &ProducerId, eval_id: u64, response: &Response) -> Result<()> {
        if !self.is_selected(producer) {
            return Ok(());
        }
        let key = (producer.clone(), eval_id);
        let Some(&row) = self.slots.get(&key) else {
            debug!(producer = %producer, eval_id, "No reserved row for response");
            return Ok(());
        };
        let state = self.producers.get_mut(producer).ok_or_else(|| ResultsError::KeyNotFound {
            key: producer.to_string(),
        })?;
        if let Some(reason) = state.schema.response_drift(response) {
            self.slots.remove(&key);
            disable(state, producer, eval_id, &reason);
            return Ok(());
        }
        let dvv = &response.active_set.derivative_vars;
        check_ascending(producer, dvv)?;
        check_derivative_shapes(state, response)?;
        self.slots.remove(&key);

        let schema = &state.schema;
        let layout = &state.layout;
        let set = &response.active_set;
        let mut adapter = self.adapter.lock();

        if schema.num_functions() > 0 {
            let values: Vec<f64> = response
                .function_values
                .iter()
                .enumerate()
                .map(|(i, v)| if set.wants_value(i) { *v } else { f64::NAN })
                .collect();
            adapter.set_vector(&layout.functions, &values, row, true)?;
        }

        let positions = schema.remap(dvv);
        if positions.iter().any(Option::is_none) {
            debug!(producer = %producer, eval_id, dvv = ?dvv, "Derivative variables outside the default set dropped");
        }
        let width = schema.dvv().len();

        if let Some(path) = &layout.gradients {
            let indices = schema.gradient_indices();
            if indices.iter().any(|&g| set.wants_gradient(g)) {
                // Column k holds the gradient of function indices[k].
                let mut grads = Matrix::filled(width, indices.len(), f64::NAN);
                for (k, &g) in indices.iter().enumerate() {
                    let Some(column) = response.gradient(g).filter(|_| set.wants_gradient(g)) else {
                        continue;
                    };
                    for (j, pos) in positions.iter().enumerate() {
                        if let (Some(p), Some(v)) = (pos, column.get(j)) {
                            grads.set(*p, k, *v);
                        }
                    }
                }
                adapter.set_matrix(path, &grads, row, true)?;
            }
        }

        if let Some(path) = &layout.hessians {
            let indices = schema.hessian_indices();
            if indices.iter().any(|&h| set.wants_hessian(h)) {
                let hessians: Vec<Matrix<f64>> = indices
                    .iter()
                    .map(|&h| {
                        let mut out = Matrix::filled(width, width, f64::NAN);
                        if let Some(src) = response.hessians.get(h).filter(|_| set.wants_hessian(h)) {
                            for (a, pa) in positions.iter().enumerate() {
                                for (b, pb) in positions.iter().enumerate() {
                                    if let (Some(pa), Some(pb), Some(v)) = (pa, pb, src.get(a, b)) {
                                        out.set(*pa, *pb, *v);
                                    }
                                }
                            }
                        }
                        out
                    })
                    .collect();
                adapter.set_vector_of_matrices(path, &hessians, row, false)?;
            }
        }

        if let Some(path) = &layout.metadata {
            if !response.metadata.is_empty() {
                adapter.set_vector(path, &response.metadata, row, true)?;
            }
        }

        debug!(producer = %producer, eval_id, row, "Stored evaluation response");
        Ok(())
    }

    // =========================================================================
    // Provenance and parameters
    // =========================================================================

    /// Link `source` under `<owner>/sources/<source name>`.
    pub fn declare_source(&mut self, owner: &SourceRef, source: &SourceRef) -> Result<()> {
        let link = owner.root_path().join("sources").join(source.link_name());
        let target = source.root_path();
        self.adapter.lock().create_soft_link(&link, &target)?;
        Ok(())
    }

    /// Store the distribution parameters of `producer`'s variables.
    pub fn store_variable_parameters(
        &mut self,
        producer: &ProducerId,
        parameters: &VariableParameters,
    ) -> Result<()> {
        if !self.is_selected(producer) || parameters.is_empty() {
            return Ok(());
        }
        let group = producer.root_path().join("properties").join("variable_parameters");
        let mut adapter = self.adapter.lock();
        parameters::write_tables(&mut adapter, &group, parameters)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Default schema of an allocated producer.
    pub fn schema(&self, producer: &ProducerId) -> Option<&DefaultSet> {
        self.producers.get(producer).map(|s| &s.schema)
    }

    /// Whether storage for `producer` was disabled by a schema mismatch.
    pub fn is_disabled(&self, producer: &ProducerId) -> bool {
        self.producers.get(producer).is_some_and(|s| s.disabled)
    }

    /// Give up on the response of evaluation `eval_id`.
    ///
    /// Its reserved rows keep their fill value. Returns whether a slot was
    /// pending.
    pub fn abandon(&mut self, producer: &ProducerId, eval_id: u64) -> bool {
        self.slots.remove(&(producer.clone(), eval_id)).is_some()
    }

    /// Number of evaluations whose response has not arrived yet.
    pub fn pending_responses(&self) -> usize {
        self.slots.len()
    }

    /// The shared adapter.
    pub fn adapter(&self) -> &SharedAdapter {
        &self.adapter
    }
}

fn disable(state: &mut ProducerState, producer: &ProducerId, eval_id: u64, reason: &str) {
    if state.disabled {
        return;
    }
    warn!(
        producer = %producer,
        eval_id,
        reason,
        "Evaluation does not match the allocated schema; no further evaluations of this producer are stored"
    );
    state.disabled = true;
}

/// Describe how the stored datasets of a producer differ from `schema`,
/// if at all. Every dataset must hold one row per stored evaluation.
fn storage_drift(adapter: &ContainerAdapter, layout: &Layout, schema: &DefaultSet) -> Result<Option<String>> {
    let rows = adapter.dims(&layout.evaluation_ids)?[0];
    for (path, shape) in layout.row_shapes(schema) {
        let expected: Option<Vec<usize>> = shape.map(|s| std::iter::once(rows).chain(s).collect());
        let found = if adapter.exists(&path) {
            Some(adapter.dims(&path)?)
        } else {
            None
        };
        if found != expected {
            return Ok(Some(format!(
                "{} is {}, expected {}",
                path,
                describe_dims(found.as_deref()),
                describe_dims(expected.as_deref())
            )));
        }
    }
    Ok(None)
}

fn describe_dims(dims: Option<&[usize]>) -> String {
    dims.map_or_else(|| "absent".to_string(), |d| format!("{:?}", d))
}

/// Requested gradients must be `dvv` long and requested Hessians `dvv x dvv`.
fn check_derivative_shapes(state: &ProducerState, response: &Response) -> Result<()> {
    let set = &response.active_set;
    let dvv = set.derivative_vars.len();
    let mismatch = |path: &Option<ObjectPath>, expected: String, actual: String| -> ResultsError {
        StorageError::ShapeMismatch {
            path: path.clone().unwrap_or_else(|| state.layout.root.clone()),
            operation: "store_response",
            expected,
            actual,
        }
        .into()
    };

    for &g in state.schema.gradient_indices() {
        if !set.wants_gradient(g) {
            continue;
        }
        let grads = &response.gradients;
        if grads.rows() != dvv || g >= grads.cols() {
            return Err(mismatch(
                &state.layout.gradients,
                format!("gradient of function {} over {} derivative variables", g, dvv),
                format!("{}x{} gradient matrix", grads.rows(), grads.cols()),
            ));
        }
    }
    for &h in state.schema.hessian_indices() {
        if !set.wants_hessian(h) {
            continue;
        }
        let found = response.hessians.get(h).map(|m| (m.rows(), m.cols()));
        if found != Some((dvv, dvv)) {
            return Err(mismatch(
                &state.layout.hessians,
                format!("{}x{} Hessian of function {}", dvv, dvv, h),
                found.map_or("no Hessian".to_string(), |(r, c)| format!("{}x{}", r, c)),
            ));
        }
    }
    Ok(())
}

fn append_block<T: Element>(adapter: &mut ContainerAdapter, path: &ObjectPath, values: &[T]) -> Result<()> {
    if !values.is_empty() {
        adapter.append_vector(path, values)?;
    }
    Ok(())
}

fn create_datasets(
    adapter: &mut ContainerAdapter,
    layout: &Layout,
    schema: &DefaultSet,
    variables: &Variables,
    response: &Response,
) -> Result<()> {
    let ids = &layout.evaluation_ids;
    adapter.create_empty_dataset::<u64>(ids, &[0], None)?;

    // Variables, one dataset per non-empty block, each with labels, ids and
    // types scales on the variable axis.
    let blocks = [
        (&variables.continuous.labels, &variables.continuous.ids, variables.continuous.kind_labels()),
        (&variables.discrete_int.labels, &variables.discrete_int.ids, variables.discrete_int.kind_labels()),
        (
            &variables.discrete_string.labels,
            &variables.discrete_string.ids,
            variables.discrete_string.kind_labels(),
        ),
        (&variables.discrete_real.labels, &variables.discrete_real.ids, variables.discrete_real.kind_labels()),
    ];
    for (b, (labels, var_ids, kinds)) in blocks.into_iter().enumerate() {
        if labels.is_empty() {
            continue;
        }
        let path = &layout.variables[b];
        let n = labels.len();
        match b {
            0 | 3 => adapter.create_empty_dataset::<f64>(path, &[0, n], Some(f64::NAN))?,
            1 => adapter.create_empty_dataset::<i64>(path, &[0, n], None)?,
            _ => adapter.create_empty_dataset::<String>(path, &[0, n], None)?,
        }
        attach_ids(adapter, path, ids)?;
        put_scale(adapter, path, "labels", 1, labels)?;
        put_scale(adapter, path, "ids", 1, var_ids)?;
        put_scale(adapter, path, "types", 1, &kinds)?;
    }

    let nfns = schema.num_functions();
    let descriptors = layout.function_descriptors();
    if nfns > 0 {
        adapter.create_empty_dataset::<f64>(&layout.functions, &[0, nfns], Some(f64::NAN))?;
        adapter.create_empty_dataset::<i32>(&layout.active_set, &[0, nfns], None)?;
        write_scale(adapter, &descriptors, &response.function_labels)?;
        for path in [&layout.functions, &layout.active_set] {
            attach_ids(adapter, path, ids)?;
            adapter.attach_scale(path, &descriptors, "responses", 1)?;
        }
    }

    let dvv = schema.dvv();
    let dvv_ids = layout.derivative_ids();
    if let Some(path) = &layout.derivative_variables {
        let values: Vec<u64> = dvv.iter().map(|&id| id as u64).collect();
        adapter.create_empty_dataset::<i32>(path, &[0, dvv.len()], None)?;
        write_scale(adapter, &dvv_ids, &values)?;
        attach_ids(adapter, path, ids)?;
        adapter.attach_scale(path, &dvv_ids, "variables", 1)?;
    }

    let labels_of = |indices: &[usize]| -> Vec<String> {
        indices
            .iter()
            .map(|&i| response.function_labels.get(i).cloned().unwrap_or_default())
            .collect()
    };

    if let Some(path) = &layout.gradients {
        let rows = schema.gradient_indices();
        adapter.create_empty_dataset::<f64>(path, &[0, rows.len(), dvv.len()], Some(f64::NAN))?;
        attach_ids(adapter, path, ids)?;
        put_scale(adapter, path, "resp_descriptors", 1, &labels_of(rows))?;
        adapter.attach_scale(path, &dvv_ids, "variables", 2)?;
    }

    if let Some(path) = &layout.hessians {
        let rows = schema.hessian_indices();
        adapter.create_empty_dataset::<f64>(path, &[0, rows.len(), dvv.len(), dvv.len()], Some(f64::NAN))?;
        attach_ids(adapter, path, ids)?;
        put_scale(adapter, path, "resp_descriptors", 1, &labels_of(rows))?;
        adapter.attach_scale(path, &dvv_ids, "variables", 2)?;
        adapter.attach_scale(path, &dvv_ids, "variables", 3)?;
    }

    if let Some(path) = &layout.metadata {
        adapter.create_empty_dataset::<f64>(path, &[0, schema.num_metadata()], Some(f64::NAN))?;
        attach_ids(adapter, path, ids)?;
        put_scale(adapter, path, "labels", 1, &response.metadata_labels)?;
    }

    Ok(())
}

fn attach_ids(adapter: &mut ContainerAdapter, path: &ObjectPath, ids: &ObjectPath) -> Result<()> {
    adapter.attach_scale(path, ids, EVALUATION_IDS, 0)?;
    Ok(())
}

/// Write a fixed 1-d scale once.
fn write_scale<T: Element>(adapter: &mut ContainerAdapter, scale: &ObjectPath, values: &[T]) -> Result<()> {
    if !adapter.exists(scale) {
        adapter.create_empty_dataset::<T>(scale, &[values.len()], None)?;
        adapter.write_vector(scale, values)?;
    }
    Ok(())
}

/// Write an unshared scale of `dataset` and attach it to `axis`.
fn put_scale<T: Element>(
    adapter: &mut ContainerAdapter,
    dataset: &ObjectPath,
    label: &str,
    axis: usize,
    values: &[T],
) -> Result<()> {
    let scale = Layout::scale(dataset, label);
    write_scale(adapter, &scale, values)?;
    adapter.attach_scale(dataset, &scale, label, axis)?;
    Ok(())
}
