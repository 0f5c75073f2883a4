//! Backend writing method results into the container.

use super::{PreallocatingBackend, ResultsBackend};
use crate::error::Result;
use crate::types::{DimScale, MethodId, ResultValue, ScaleData, ScaleScope};
use evaldb_core::{
    Attribute, ContainerAdapter, DataType, Datum, Element, Matrix, ObjectPath, ScalarType, SharedAdapter, StorageError,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Stores results under `/methods/<method_id>/results/execution:<n>/`.
pub struct ContainerBackend {
    adapter: SharedAdapter,
    methods: HashSet<String>,
}

impl ContainerBackend {
    /// Backend writing through `adapter`.
    pub fn new(adapter: SharedAdapter) -> Self {
        Self {
            adapter,
            methods: HashSet::new(),
        }
    }

    /// The shared adapter.
    pub fn adapter(&self) -> &SharedAdapter {
        &self.adapter
    }

    /// Path of `location` within `owner`'s execution.
    pub fn object_path(owner: &MethodId, location: &[&str]) -> ObjectPath {
        location
            .iter()
            .fold(owner.execution_path(), |path, segment| path.join(segment))
    }

    /// Path of the dataset backing a scale of `dataset`.
    pub fn scale_path(owner: &MethodId, dataset: &ObjectPath, scale: &DimScale) -> ObjectPath {
        match scale.scope {
            ScaleScope::Unshared => dataset.scale_mirror().join(&scale.label),
            ScaleScope::Shared => owner.execution_path().scale_mirror().join(&scale.label),
        }
    }

    /// Write the `method_name` attribute the first time a method is seen.
    fn ensure_method(&mut self, adapter: &mut ContainerAdapter, owner: &MethodId) -> Result<()> {
        if self.methods.insert(owner.method_id.clone()) {
            let path = owner.method_path();
            adapter.create_group(&path)?;
            adapter.set_attribute(&path, "method_name", owner.method_name.as_str())?;
        }
        Ok(())
    }

    fn write_scales(
        adapter: &mut ContainerAdapter,
        owner: &MethodId,
        dataset: &ObjectPath,
        scales: &[DimScale],
    ) -> Result<()> {
        for scale in scales {
            let path = Self::scale_path(owner, dataset, scale);
            if !adapter.exists(&path) {
                match &scale.data {
                    ScaleData::RealVector(v) => put_vector(adapter, &path, v)?,
                    ScaleData::IntVector(v) => put_vector(adapter, &path, v)?,
                    ScaleData::StrVector(v) => put_vector(adapter, &path, v)?,
                    ScaleData::RealMatrix(m) => put_matrix(adapter, &path, m, false)?,
                    ScaleData::IntMatrix(m) => put_matrix(adapter, &path, m, false)?,
                    ScaleData::StrMatrix(m) => put_matrix(adapter, &path, m, false)?,
                }
            }
            adapter.attach_scale(dataset, &path, &scale.label, scale.dim)?;
        }
        Ok(())
    }

    fn write_attributes(adapter: &mut ContainerAdapter, path: &ObjectPath, attributes: &[Attribute]) -> Result<()> {
        for attr in attributes {
            adapter.set_attribute(path, &attr.label, attr.value.clone())?;
        }
        Ok(())
    }
}

impl ResultsBackend for ContainerBackend {
    fn name(&self) -> &'static str {
        "container"
    }

    fn insert(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        scales: &[DimScale],
        attributes: &[Attribute],
        transpose: bool,
    ) -> Result<()> {
        let shared = Arc::clone(&self.adapter);
        let mut adapter = shared.lock();
        self.ensure_method(&mut adapter, owner)?;

        let path = Self::object_path(owner, location);
        match data {
            ResultValue::Real(v) => put_scalar(&mut adapter, &path, *v)?,
            ResultValue::Int(v) => put_scalar(&mut adapter, &path, *v)?,
            ResultValue::Str(v) => put_scalar(&mut adapter, &path, v.clone())?,
            ResultValue::RealVector(v) => put_vector(&mut adapter, &path, v)?,
            ResultValue::IntVector(v) => put_vector(&mut adapter, &path, v)?,
            ResultValue::StrVector(v) => put_vector(&mut adapter, &path, v)?,
            ResultValue::RealMatrix(m) => put_matrix(&mut adapter, &path, m, transpose)?,
            ResultValue::IntMatrix(m) => put_matrix(&mut adapter, &path, m, transpose)?,
            ResultValue::StrMatrix(m) => put_matrix(&mut adapter, &path, m, transpose)?,
        }
        Self::write_scales(&mut adapter, owner, &path, scales)?;
        Self::write_attributes(&mut adapter, &path, attributes)?;

        debug!(path = %path, kind = data.kind_name(), "Inserted result");
        Ok(())
    }

    fn add_metadata_to_method(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        let shared = Arc::clone(&self.adapter);
        let mut adapter = shared.lock();
        self.ensure_method(&mut adapter, owner)?;
        Self::write_attributes(&mut adapter, &owner.method_path(), attributes)
    }

    fn add_metadata_to_execution(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        let shared = Arc::clone(&self.adapter);
        let mut adapter = shared.lock();
        self.ensure_method(&mut adapter, owner)?;
        let path = owner.execution_path();
        adapter.create_group(&path)?;
        Self::write_attributes(&mut adapter, &path, attributes)
    }

    fn add_metadata_to_object(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        attributes: &[Attribute],
    ) -> Result<()> {
        let mut adapter = self.adapter.lock();
        Self::write_attributes(&mut adapter, &Self::object_path(owner, location), attributes)
    }

    fn add_metadata_to_study(&mut self, attributes: &[Attribute]) -> Result<()> {
        let mut adapter = self.adapter.lock();
        Self::write_attributes(&mut adapter, &ObjectPath::root(), attributes)
    }

    fn flush(&mut self) -> Result<()> {
        self.adapter.lock().flush()?;
        Ok(())
    }

    fn as_preallocating(&mut self) -> Option<&mut dyn PreallocatingBackend> {
        Some(self)
    }
}

impl PreallocatingBackend for ContainerBackend {
    fn allocate_vector(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        len: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()> {
        self.allocate(owner, location, scalar, &[len], scales, attributes)
    }

    fn allocate_matrix(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        rows: usize,
        cols: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()> {
        self.allocate(owner, location, scalar, &[rows, cols], scales, attributes)
    }

    fn insert_into(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        index: usize,
        row: bool,
    ) -> Result<()> {
        let path = Self::object_path(owner, location);
        let mut adapter = self.adapter.lock();
        match data {
            ResultValue::Real(v) => adapter.set_scalar(&path, *v, index)?,
            ResultValue::Int(v) => adapter.set_scalar(&path, *v, index)?,
            ResultValue::Str(v) => adapter.set_scalar(&path, v.clone(), index)?,
            ResultValue::RealVector(v) => adapter.set_vector(&path, v, index, row)?,
            ResultValue::IntVector(v) => adapter.set_vector(&path, v, index, row)?,
            ResultValue::StrVector(v) => adapter.set_vector(&path, v, index, row)?,
            ResultValue::RealMatrix(_) | ResultValue::IntMatrix(_) | ResultValue::StrMatrix(_) => {
                return Err(StorageError::UnsupportedType {
                    path,
                    operation: "insert_into",
                    type_name: data.kind_name().to_string(),
                }
                .into());
            }
        }
        debug!(path = %path, index, row, "Inserted into preallocated result");
        Ok(())
    }
}

impl ContainerBackend {
    fn allocate(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        dims: &[usize],
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()> {
        let shared = Arc::clone(&self.adapter);
        let mut adapter = shared.lock();
        self.ensure_method(&mut adapter, owner)?;

        let path = Self::object_path(owner, location);
        let fill = (scalar == ScalarType::F64).then_some(Datum::Real(f64::NAN));
        adapter.create_empty_dataset_of(&path, DataType::Scalar(scalar), dims, None, fill)?;
        Self::write_scales(&mut adapter, owner, &path, scales)?;
        Self::write_attributes(&mut adapter, &path, attributes)
    }
}

fn put_scalar<T: Element>(adapter: &mut ContainerAdapter, path: &ObjectPath, value: T) -> Result<()> {
    adapter.create_fixed_dataset::<T>(path, &[], None)?;
    adapter.write_scalar(path, value)?;
    Ok(())
}

// One-shot results are fixed-size, so an empty result is a zero-length
// dataset rather than an extensible one.
fn put_vector<T: Element>(adapter: &mut ContainerAdapter, path: &ObjectPath, values: &[T]) -> Result<()> {
    adapter.create_fixed_dataset::<T>(path, &[values.len()], None)?;
    if !values.is_empty() {
        adapter.write_vector(path, values)?;
    }
    Ok(())
}

fn put_matrix<T: Element>(
    adapter: &mut ContainerAdapter,
    path: &ObjectPath,
    matrix: &Matrix<T>,
    transpose: bool,
) -> Result<()> {
    let dims = if transpose {
        [matrix.cols(), matrix.rows()]
    } else {
        [matrix.rows(), matrix.cols()]
    };
    adapter.create_fixed_dataset::<T>(path, &dims, None)?;
    if !matrix.is_empty() {
        adapter.write_matrix(path, matrix, transpose)?;
    }
    Ok(())
}
