//! Results database backends.
//!
//! Every backend implements [`ResultsBackend`]. Backends that can reserve
//! space and fill it piecewise also implement [`PreallocatingBackend`];
//! backends holding growable arrays implement [`ArrayBackend`]. Callers
//! reach the extensions through [`ResultsBackend::as_preallocating`] and
//! [`ResultsBackend::as_array_store`] instead of relying on no-op
//! defaults.

mod container;
mod memory;

pub use container::ContainerBackend;
pub use memory::{InMemoryBackend, ResultKey};

use crate::error::Result;
use crate::types::{DimScale, MethodId, ResultValue};
use evaldb_core::{Attribute, ScalarType};

/// A destination for method results.
pub trait ResultsBackend: Send {
    /// Short backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Store `data` at `location` under `owner`'s current execution.
    ///
    /// `scales` label the dimensions of `data`; `attributes` are attached to
    /// the stored object. `transpose` stores a matrix `cols x rows`.
    fn insert(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        scales: &[DimScale],
        attributes: &[Attribute],
        transpose: bool,
    ) -> Result<()>;

    /// Attach attributes to the method.
    fn add_metadata_to_method(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()>;

    /// Attach attributes to the method's current execution.
    fn add_metadata_to_execution(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()>;

    /// Attach attributes to an object previously stored at `location`.
    fn add_metadata_to_object(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        attributes: &[Attribute],
    ) -> Result<()>;

    /// Attach attributes to the whole study.
    fn add_metadata_to_study(&mut self, attributes: &[Attribute]) -> Result<()>;

    /// Push buffered results to their destination.
    fn flush(&mut self) -> Result<()>;

    /// Preallocation support, if any.
    fn as_preallocating(&mut self) -> Option<&mut dyn PreallocatingBackend> {
        None
    }

    /// Array storage support, if any.
    fn as_array_store(&mut self) -> Option<&mut dyn ArrayBackend> {
        None
    }
}

/// Backends that reserve space for a result and fill it piecewise.
pub trait PreallocatingBackend {
    /// Reserve a vector of `len` elements at `location`.
    fn allocate_vector(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        len: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()>;

    /// Reserve a `rows x cols` matrix at `location`.
    #[allow(clippy::too_many_arguments)]
    fn allocate_matrix(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        scalar: ScalarType,
        rows: usize,
        cols: usize,
        scales: &[DimScale],
        attributes: &[Attribute],
    ) -> Result<()>;

    /// Write `data` at `index` of a preallocated result.
    ///
    /// Scalars fill one element of a vector. Vectors fill row `index`
    /// (`row = true`) or column `index` (`row = false`) of a matrix.
    fn insert_into(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        index: usize,
        row: bool,
    ) -> Result<()>;
}

/// Backends holding fixed-size arrays of results filled by index.
pub trait ArrayBackend {
    /// Reserve an array of `size` empty slots under `data_name`.
    fn array_allocate(&mut self, owner: &MethodId, data_name: &str, size: usize) -> Result<()>;

    /// Fill slot `index` of the array under `data_name`.
    fn array_insert(&mut self, owner: &MethodId, data_name: &str, index: usize, value: ResultValue) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}

    #[test]
    fn backends_are_send() {
        _assert_send::<ContainerBackend>();
        _assert_send::<InMemoryBackend>();
        _assert_send::<Box<dyn ResultsBackend>>();
    }
}
