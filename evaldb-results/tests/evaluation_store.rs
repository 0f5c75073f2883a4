//! Integration tests for two-phase evaluation storage.

use evaldb_core::{ContainerAdapter, Datum, FileMode, Matrix, ObjectPath, SharedAdapter, StorageConfig};
use evaldb_results::evaluation_store::EvaluationStore;
use evaldb_results::parameters::{ParamRecord, VariableParameters};
use evaldb_results::types::{ActiveSet, ProducerId, Response, SourceRef, VariableKind, Variables};
use evaldb_results::{InterfaceSelection, ModelSelection};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

fn shared(dir: &TempDir) -> SharedAdapter {
    ContainerAdapter::open(&StorageConfig::new(dir.path().join("evals.edb")))
        .unwrap()
        .into_shared()
}

fn reopened(dir: &TempDir) -> SharedAdapter {
    let config = StorageConfig::new(dir.path().join("evals.edb")).with_mode(FileMode::Append);
    ContainerAdapter::open(&config).unwrap().into_shared()
}

fn producer() -> ProducerId {
    ProducerId::model("simulation", "m1")
}

fn variables(x: f64) -> Variables {
    Variables::new()
        .with_continuous("x1", 1, VariableKind::ContinuousDesign, x)
        .with_continuous("x2", 2, VariableKind::NormalUncertain, -x)
        .with_discrete_int("n", 3, VariableKind::DiscreteDesignRange, 4)
}

fn labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("f{}", i)).collect()
}

fn values_response(values: &[f64]) -> Response {
    let mut response = Response::new(ActiveSet::values_only(values.len()), labels(values.len()));
    for (i, v) in values.iter().enumerate() {
        response.set_value(i, *v).unwrap();
    }
    response
}

fn path(s: &str) -> ObjectPath {
    ObjectPath::new(s)
}

#[test]
fn responses_land_in_their_own_rows() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let set = ActiveSet::values_only(2);

    store.allocate(&p, &variables(0.0), &values_response(&[0.0, 0.0]), &set).unwrap();
    for id in 1..=3u64 {
        store.store_variables(&p, id, &set, &variables(id as f64)).unwrap();
    }
    // Out of order, and evaluation 2 never answers.
    store.store_response(&p, 3, &values_response(&[30.0, 31.0])).unwrap();
    store.store_response(&p, 1, &values_response(&[10.0, 11.0])).unwrap();
    assert_eq!(store.pending_responses(), 1);

    let a = adapter.lock();
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(a.read_vector::<u64>(&ids).unwrap(), vec![1, 2, 3]);

    let functions = path("/models/simulation/m1/responses/functions");
    assert_eq!(a.dims(&functions).unwrap(), vec![3, 2]);
    assert_eq!(a.read_row::<f64>(&functions, 0).unwrap(), vec![10.0, 11.0]);
    assert!(a.read_row::<f64>(&functions, 1).unwrap().iter().all(|v| v.is_nan()));
    assert_eq!(a.read_row::<f64>(&functions, 2).unwrap(), vec![30.0, 31.0]);

    let continuous = path("/models/simulation/m1/variables/continuous");
    assert_eq!(a.read_row::<f64>(&continuous, 2).unwrap(), vec![3.0, -3.0]);
    let discrete = path("/models/simulation/m1/variables/discrete_integer");
    assert_eq!(a.dims(&discrete).unwrap(), vec![3, 1]);

    let asv = path("/models/simulation/m1/properties/active_set_vector");
    assert_eq!(a.read_row::<i32>(&asv, 1).unwrap(), vec![1, 1]);
}

#[test]
fn variable_scales_are_attached() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let set = ActiveSet::values_only(1);
    store.allocate(&producer(), &variables(0.0), &values_response(&[0.0]), &set).unwrap();

    let a = adapter.lock();
    let continuous = path("/models/simulation/m1/variables/continuous");
    let labels = a.scale_by_label(&continuous, 1, "labels").unwrap();
    assert_eq!(a.read_vector::<String>(&labels).unwrap(), vec!["x1", "x2"]);
    let types = a.scale_by_label(&continuous, 1, "types").unwrap();
    assert_eq!(
        a.read_vector::<String>(&types).unwrap(),
        vec!["CONTINUOUS_DESIGN", "NORMAL_UNCERTAIN"]
    );
    let ids = a.scale_by_label(&continuous, 1, "ids").unwrap();
    assert_eq!(a.read_vector::<u64>(&ids).unwrap(), vec![1, 2]);

    let functions = path("/models/simulation/m1/responses/functions");
    let axis0 = a.scales(&functions, 0).unwrap();
    assert_eq!(axis0.len(), 1);
    assert_eq!(axis0[0].label, "evaluation_ids");
    let descriptors = a.scale_by_label(&functions, 1, "responses").unwrap();
    assert_eq!(a.read_vector::<String>(&descriptors).unwrap(), vec!["f1"]);
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn schema_drift_warns_once_and_stops_storage() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let set = ActiveSet::values_only(2);
    store.allocate(&p, &variables(0.0), &values_response(&[0.0, 0.0]), &set).unwrap();

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let wide = ActiveSet::values_only(3);
        store.store_variables(&p, 1, &wide, &variables(1.0)).unwrap();
        store.store_variables(&p, 2, &wide, &variables(2.0)).unwrap();
        // Matching evaluations are skipped too once the producer is disabled.
        store.store_variables(&p, 3, &set, &variables(3.0)).unwrap();
        store.store_response(&p, 3, &values_response(&[1.0, 2.0])).unwrap();
    });

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    assert_eq!(output.lines().filter(|l| l.contains("WARN")).count(), 1);
    assert!(output.contains("model:simulation/m1"));
    assert!(store.is_disabled(&p));

    let a = adapter.lock();
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(a.dims(&ids).unwrap(), vec![0]);
}

#[test]
fn reserved_evaluations_are_answered_after_drift() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let set = ActiveSet::values_only(1);
    store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();

    store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
    store.store_variables(&p, 2, &ActiveSet::values_only(2), &variables(2.0)).unwrap();
    assert!(store.is_disabled(&p));

    store.store_response(&p, 1, &values_response(&[7.0])).unwrap();
    assert_eq!(store.pending_responses(), 0);

    let a = adapter.lock();
    let functions = path("/models/simulation/m1/responses/functions");
    assert_eq!(a.dims(&functions).unwrap(), vec![1, 1]);
    assert_eq!(a.read_row::<f64>(&functions, 0).unwrap(), vec![7.0]);
}

#[test]
fn abandoned_evaluations_release_their_slot() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let set = ActiveSet::values_only(1);
    store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();

    store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
    store.store_variables(&p, 2, &set, &variables(2.0)).unwrap();
    assert_eq!(store.pending_responses(), 2);

    assert!(store.abandon(&p, 1));
    assert!(!store.abandon(&p, 1));
    assert_eq!(store.pending_responses(), 1);

    // A late answer to an abandoned evaluation is ignored.
    store.store_response(&p, 1, &values_response(&[5.0])).unwrap();
    let functions = path("/models/simulation/m1/responses/functions");
    assert!(adapter.lock().read_row::<f64>(&functions, 0).unwrap()[0].is_nan());
}

#[test]
fn appended_container_with_matching_shape_keeps_rows_aligned() {
    let dir = tempdir().unwrap();
    let p = producer();
    let set = ActiveSet::values_only(1);
    {
        let adapter = shared(&dir);
        let mut store = EvaluationStore::new(adapter.clone());
        store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();
        store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
        store.store_response(&p, 1, &values_response(&[10.0])).unwrap();
        adapter.lock().close().unwrap();
    }

    let adapter = reopened(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();
    assert!(!store.is_disabled(&p));
    store.store_variables(&p, 2, &set, &variables(2.0)).unwrap();
    store.store_response(&p, 2, &values_response(&[20.0])).unwrap();

    let a = adapter.lock();
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(a.read_vector::<u64>(&ids).unwrap(), vec![1, 2]);
    let functions = path("/models/simulation/m1/responses/functions");
    assert_eq!(a.read_row::<f64>(&functions, 1).unwrap(), vec![20.0]);
    let continuous = path("/models/simulation/m1/variables/continuous");
    assert_eq!(a.read_row::<f64>(&continuous, 1).unwrap(), vec![2.0, -2.0]);
}

#[test]
fn appended_container_with_other_shape_disables_producer() {
    let dir = tempdir().unwrap();
    let p = producer();
    let set = ActiveSet::values_only(1);
    {
        let adapter = shared(&dir);
        let mut store = EvaluationStore::new(adapter.clone());
        store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();
        store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
        adapter.lock().close().unwrap();
    }

    // The new run has a third continuous variable.
    let wider = |x: f64| variables(x).with_continuous("x3", 4, VariableKind::ContinuousDesign, x);
    let adapter = reopened(&dir);
    let mut store = EvaluationStore::new(adapter.clone());

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        store.allocate(&p, &wider(0.0), &values_response(&[0.0]), &set).unwrap();
        store.store_variables(&p, 2, &set, &wider(2.0)).unwrap();
        store.store_variables(&p, 3, &set, &wider(3.0)).unwrap();
    });

    let output = String::from_utf8(captured.0.lock().clone()).unwrap();
    assert_eq!(output.lines().filter(|l| l.contains("WARN")).count(), 1);
    assert!(output.contains("variables/continuous"));
    assert!(store.is_disabled(&p));
    assert_eq!(store.pending_responses(), 0);

    let a = adapter.lock();
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(a.read_vector::<u64>(&ids).unwrap(), vec![1]);
    let continuous = path("/models/simulation/m1/variables/continuous");
    assert_eq!(a.dims(&continuous).unwrap(), vec![1, 2]);
}

#[test]
fn misaligned_storage_is_detected_before_appending() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let set = ActiveSet::values_only(1);
    store.allocate(&p, &variables(0.0), &values_response(&[0.0]), &set).unwrap();
    store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();

    // An interrupted evaluation left one extra function row behind.
    let functions = path("/models/simulation/m1/responses/functions");
    adapter.lock().reserve_row(&functions).unwrap();

    store.store_variables(&p, 2, &set, &variables(2.0)).unwrap();
    assert!(store.is_disabled(&p));

    let a = adapter.lock();
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(a.read_vector::<u64>(&ids).unwrap(), vec![1]);
    let continuous = path("/models/simulation/m1/variables/continuous");
    assert_eq!(a.dims(&continuous).unwrap(), vec![1, 2]);
}

#[test]
fn gradient_of_wrong_length_is_rejected() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let default = ActiveSet::new(vec![3], vec![1, 2]);
    store
        .allocate(&p, &variables(0.0), &Response::new(default.clone(), labels(1)), &default)
        .unwrap();
    store.store_variables(&p, 1, &default, &variables(1.0)).unwrap();

    // One gradient entry for two derivative variables.
    let mut short = Response::new(default.clone(), labels(1));
    short.gradients = Matrix::filled(1, 1, 5.0);
    let err = store.store_response(&p, 1, &short).unwrap_err();
    assert_eq!(err.code(), "E201");
    assert!(err.to_string().contains("responses/gradients"));
    assert_eq!(store.pending_responses(), 1);

    let gradients = path("/models/simulation/m1/responses/gradients");
    let g = adapter.lock().read_matrix_at::<f64>(&gradients, 0, true).unwrap();
    assert!(g.as_column_major().iter().all(|v| v.is_nan()));

    // The slot is still open for a well-formed answer.
    let mut response = Response::new(default, labels(1));
    response.set_gradient(0, &[5.0, 6.0]).unwrap();
    store.store_response(&p, 1, &response).unwrap();
    let g = adapter.lock().read_matrix_at::<f64>(&gradients, 0, true).unwrap();
    assert_eq!(g.column(0), &[5.0, 6.0]);
}

#[test]
fn hessian_of_wrong_shape_is_rejected() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();
    let default = ActiveSet::new(vec![5], vec![1, 2]);
    store
        .allocate(&p, &variables(0.0), &Response::new(default.clone(), labels(1)), &default)
        .unwrap();
    store.store_variables(&p, 1, &default, &variables(1.0)).unwrap();

    let mut response = Response::new(default, labels(1));
    response.set_hessian(0, Matrix::filled(2, 1, 1.0)).unwrap();
    let err = store.store_response(&p, 1, &response).unwrap_err();
    assert_eq!(err.code(), "E201");
    assert!(err.to_string().contains("responses/hessians"));

    response.hessians.clear();
    assert_eq!(store.store_response(&p, 1, &response).unwrap_err().code(), "E201");
    assert_eq!(store.pending_responses(), 1);
}

#[test]
fn mixed_gradients_are_remapped_onto_default_columns() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();

    // f1 and f2 may carry gradients, f3 never does; f1 may carry a Hessian.
    let default = ActiveSet::new(vec![7, 3, 1], vec![1, 2, 3]);
    let representative = Response::new(default.clone(), labels(3));
    store.allocate(&p, &variables(0.0), &representative, &default).unwrap();

    let schema = store.schema(&p).unwrap();
    assert_eq!(schema.gradient_indices(), &[0, 1]);
    assert_eq!(schema.hessian_indices(), &[0]);

    // This evaluation asks for the gradient of f1 only, w.r.t. x1 and x3.
    let set = ActiveSet::new(vec![3, 1, 1], vec![1, 3]);
    store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
    let mut response = Response::new(set, labels(3));
    response.set_value(0, 1.0).unwrap();
    response.set_gradient(0, &[10.0, 30.0]).unwrap();
    store.store_response(&p, 1, &response).unwrap();

    let a = adapter.lock();
    let gradients = path("/models/simulation/m1/responses/gradients");
    assert_eq!(a.dims(&gradients).unwrap(), vec![1, 2, 3]);

    // Stored one function per row; read back as dvv x functions.
    let g = a.read_matrix_at::<f64>(&gradients, 0, true).unwrap();
    assert_eq!(g.rows(), 3);
    assert_eq!(g.cols(), 2);
    assert_eq!(g.get(0, 0), Some(&10.0));
    assert!(g.get(1, 0).unwrap().is_nan());
    assert_eq!(g.get(2, 0), Some(&30.0));
    assert!(g.column(1).iter().all(|v| v.is_nan()));

    let flags = path("/models/simulation/m1/properties/derivative_variables_vector");
    assert_eq!(a.read_row::<i32>(&flags, 0).unwrap(), vec![1, 0, 1]);

    // No Hessian was requested, so its row keeps the fill value.
    let hessians = path("/models/simulation/m1/responses/hessians");
    let h = a.read_vector_of_matrices_at::<f64>(&hessians, 0, false).unwrap();
    assert_eq!(h.len(), 1);
    assert!(h[0].as_column_major().iter().all(|v| v.is_nan()));

    let dvv_scale = a.scale_by_label(&gradients, 2, "variables").unwrap();
    assert_eq!(a.read_vector::<u64>(&dvv_scale).unwrap(), vec![1, 2, 3]);
}

#[test]
fn hessians_are_remapped_onto_default_positions() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();

    let default = ActiveSet::new(vec![5], vec![1, 2]);
    store
        .allocate(&p, &variables(0.0), &Response::new(default.clone(), labels(1)), &default)
        .unwrap();

    let set = ActiveSet::new(vec![5], vec![2]);
    store.store_variables(&p, 1, &set, &variables(1.0)).unwrap();
    let mut response = Response::new(set, labels(1));
    response.set_hessian(0, Matrix::filled(1, 1, 4.0)).unwrap();
    store.store_response(&p, 1, &response).unwrap();

    let a = adapter.lock();
    let hessians = path("/models/simulation/m1/responses/hessians");
    let h = a.read_vector_of_matrices_at::<f64>(&hessians, 0, false).unwrap();
    assert_eq!(h[0].get(1, 1), Some(&4.0));
    assert!(h[0].get(0, 0).unwrap().is_nan());
    assert!(h[0].get(0, 1).unwrap().is_nan());
}

#[test]
fn unsorted_derivative_variables_are_rejected() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let p = producer();

    let bad_default = ActiveSet::new(vec![3], vec![2, 1]);
    let err = store
        .allocate(&p, &variables(0.0), &Response::new(bad_default.clone(), labels(1)), &bad_default)
        .unwrap_err();
    assert_eq!(err.code(), "E310");

    let default = ActiveSet::new(vec![3], vec![1, 2]);
    store
        .allocate(&p, &variables(0.0), &Response::new(default.clone(), labels(1)), &default)
        .unwrap();
    let err = store
        .store_variables(&p, 1, &ActiveSet::new(vec![3], vec![2, 1]), &variables(1.0))
        .unwrap_err();
    assert_eq!(err.code(), "E310");

    // Nothing was appended for the rejected evaluation.
    let ids = path("/_scales/models/simulation/m1/evaluation_ids");
    assert_eq!(adapter.lock().dims(&ids).unwrap(), vec![0]);
}

#[test]
fn unallocated_producer_is_an_error() {
    let dir = tempdir().unwrap();
    let mut store = EvaluationStore::new(shared(&dir));
    let err = store
        .store_variables(&producer(), 1, &ActiveSet::values_only(1), &variables(0.0))
        .unwrap_err();
    assert_eq!(err.code(), "E301");

    // A response without a reserved row is ignored.
    store.store_response(&producer(), 1, &values_response(&[1.0])).unwrap();
}

#[test]
fn selection_filters_producers() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone())
        .with_selection(ModelSelection::TopMethod, InterfaceSelection::Simulation);
    store.set_top_method_model("m1");

    let top = producer();
    let inner = ProducerId::model("surrogate", "gp");
    let sim = ProducerId::interface("sim_if", "m1");
    let approx = ProducerId::approximation_interface("gp_if", "gp");
    assert!(store.is_selected(&top));
    assert!(!store.is_selected(&inner));
    assert!(store.is_selected(&sim));
    assert!(!store.is_selected(&approx));

    let set = ActiveSet::values_only(1);
    store.allocate(&inner, &variables(0.0), &values_response(&[0.0]), &set).unwrap();
    store.store_variables(&inner, 1, &set, &variables(1.0)).unwrap();
    assert!(!adapter.lock().exists(&path("/models/surrogate/gp")));

    store.register_method_model("gp");
    let store = store.with_selection(ModelSelection::AllMethods, InterfaceSelection::None);
    assert!(store.is_selected(&inner));
    assert!(!store.is_selected(&sim));
}

#[test]
fn sources_are_soft_links() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());
    let set = ActiveSet::values_only(1);
    store.allocate(&producer(), &variables(0.0), &values_response(&[0.0]), &set).unwrap();

    store
        .declare_source(&SourceRef::Method("opt".into()), &SourceRef::from(producer()))
        .unwrap();
    store
        .declare_source(
            &SourceRef::from(producer()),
            &SourceRef::from(ProducerId::interface("sim_if", "m1")),
        )
        .unwrap();

    let a = adapter.lock();
    assert_eq!(
        a.resolve_link(&path("/methods/opt/sources/m1")).unwrap(),
        path("/models/simulation/m1")
    );
    assert_eq!(
        a.resolve_link(&path("/models/simulation/m1/sources/sim_if")).unwrap(),
        path("/interfaces/sim_if/m1")
    );
}

#[test]
fn variable_parameters_are_stored_per_kind() {
    let dir = tempdir().unwrap();
    let adapter = shared(&dir);
    let mut store = EvaluationStore::new(adapter.clone());

    let params = VariableParameters::new()
        .with(
            VariableKind::NormalUncertain,
            ParamRecord::new().real("mean", 0.0).real("std_deviation", 1.0),
        )
        .with(
            VariableKind::HistogramBinUncertain,
            ParamRecord::new()
                .reals("abscissas", vec![0.0, 1.0, 2.0])
                .reals("counts", vec![0.5, 0.5, 0.0]),
        )
        .with(
            VariableKind::HistogramBinUncertain,
            ParamRecord::new().reals("abscissas", vec![5.0, 6.0]).reals("counts", vec![1.0, 0.0]),
        );
    store.store_variable_parameters(&producer(), &params).unwrap();

    let a = adapter.lock();
    let normal = path("/models/simulation/m1/properties/variable_parameters/normal_uncertain");
    let records = a.read_records(&normal).unwrap();
    assert_eq!(records.len(), 1);

    let bins = path("/models/simulation/m1/properties/variable_parameters/histogram_bin_uncertain");
    let records = a.read_records(&bins).unwrap();
    assert_eq!(records.len(), 2);
    let Datum::Record(second) = &records[1] else {
        panic!("expected a record");
    };
    assert_eq!(second[0], Datum::Int(2));
    let Datum::Array(abscissas) = &second[1] else {
        panic!("expected an array");
    };
    assert_eq!(abscissas.len(), 3);
    assert!(matches!(abscissas[2], Datum::Real(v) if v.is_nan()));
}
