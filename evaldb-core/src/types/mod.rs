//! Core types for evaldb.
//!
//! - `ObjectPath`: slash-delimited address of a group, dataset or link
//! - `DataType` / `ScalarType` / `CompoundType`: dataset element types
//! - `Datum`: a dynamically-typed element and its binary codec
//! - `Matrix`: column-major dense matrix used at the adapter boundary
//! - `AttrValue` / `Attribute`: scalar key/value metadata

mod attr;
mod datum;
mod dtype;
mod matrix;
mod path;

pub use attr::{AttrValue, Attribute};
pub use datum::Datum;
pub use dtype::{
    CompoundField, CompoundType, DataType, FieldSpec, ScalarType, VLEN_DESCRIPTOR_SIZE,
};
pub use matrix::Matrix;
pub use path::{ObjectPath, SCALES_ROOT};
