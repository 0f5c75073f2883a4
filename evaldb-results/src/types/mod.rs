//! Domain types of the results layer.

mod ids;
mod response;
mod value;
mod variables;

pub use ids::{InterfaceKind, MethodId, ProducerId, SourceRef};
pub use response::{ActiveSet, REQUEST_GRADIENT, REQUEST_HESSIAN, REQUEST_VALUE, Response};
pub use value::{DimScale, ResultValue, ScaleData, ScaleScope};
pub use variables::{VariableBlock, VariableDomain, VariableKind, Variables};
