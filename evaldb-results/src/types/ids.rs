//! Identities of result owners and evaluation producers.

use evaldb_core::ObjectPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One execution of a method, the owner of method results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId {
    /// Name of the method (e.g. `"sampling"`).
    pub method_name: String,
    /// Unique id of the method block.
    pub method_id: String,
    /// Execution number, starting at 1.
    pub execution: usize,
}

impl MethodId {
    /// Create a method identity.
    pub fn new(method_name: impl Into<String>, method_id: impl Into<String>, execution: usize) -> Self {
        Self {
            method_name: method_name.into(),
            method_id: method_id.into(),
            execution,
        }
    }

    /// `/methods/<method_id>`.
    pub fn method_path(&self) -> ObjectPath {
        ObjectPath::from_segments(["methods", self.method_id.as_str()])
    }

    /// `/methods/<method_id>/results/execution:<n>`.
    pub fn execution_path(&self) -> ObjectPath {
        self.method_path()
            .join("results")
            .join(format!("execution:{}", self.execution))
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.method_name, self.method_id, self.execution)
    }
}

/// Whether an interface belongs to a simulation or an approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    /// Interface of a simulation model.
    Simulation,
    /// Interface of a surrogate.
    Approximation,
}

/// A model or interface whose evaluations are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "producer", rename_all = "snake_case")]
pub enum ProducerId {
    /// A model of the given type.
    Model {
        /// Model type (e.g. `"simulation"`, `"surrogate"`).
        model_type: String,
        /// Model id.
        model_id: String,
    },
    /// An interface used by a model.
    Interface {
        /// Interface id.
        interface_id: String,
        /// Id of the model the interface belongs to.
        model_id: String,
        /// Simulation or approximation interface.
        kind: InterfaceKind,
    },
}

impl ProducerId {
    /// A model producer.
    pub fn model(model_type: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self::Model {
            model_type: model_type.into(),
            model_id: model_id.into(),
        }
    }

    /// A simulation interface producer.
    pub fn interface(interface_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self::Interface {
            interface_id: interface_id.into(),
            model_id: model_id.into(),
            kind: InterfaceKind::Simulation,
        }
    }

    /// An approximation interface producer.
    pub fn approximation_interface(interface_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self::Interface {
            interface_id: interface_id.into(),
            model_id: model_id.into(),
            kind: InterfaceKind::Approximation,
        }
    }

    /// Id of the model, for both variants.
    pub fn model_id(&self) -> &str {
        match self {
            Self::Model { model_id, .. } | Self::Interface { model_id, .. } => model_id,
        }
    }

    /// Root group of the producer's datasets.
    pub fn root_path(&self) -> ObjectPath {
        match self {
            Self::Model { model_type, model_id } => {
                ObjectPath::from_segments(["models", model_type.as_str(), model_id.as_str()])
            }
            Self::Interface {
                interface_id,
                model_id,
                ..
            } => ObjectPath::from_segments(["interfaces", interface_id.as_str(), model_id.as_str()]),
        }
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model { model_type, model_id } => write!(f, "model:{}/{}", model_type, model_id),
            Self::Interface {
                interface_id,
                model_id,
                ..
            } => write!(f, "interface:{}/{}", interface_id, model_id),
        }
    }
}

/// Owner or target of a provenance link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRef {
    /// A method, by method id.
    Method(String),
    /// A model or interface.
    Producer(ProducerId),
}

impl SourceRef {
    /// Root path of the referenced object.
    pub fn root_path(&self) -> ObjectPath {
        match self {
            Self::Method(id) => ObjectPath::from_segments(["methods", id.as_str()]),
            Self::Producer(p) => p.root_path(),
        }
    }

    /// Name of the link created under an owner's `sources` group.
    pub fn link_name(&self) -> &str {
        match self {
            Self::Method(id) => id,
            Self::Producer(ProducerId::Model { model_id, .. }) => model_id,
            Self::Producer(ProducerId::Interface { interface_id, .. }) => interface_id,
        }
    }
}

impl From<ProducerId> for SourceRef {
    fn from(producer: ProducerId) -> Self {
        Self::Producer(producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_paths() {
        let model = ProducerId::model("simulation", "m1");
        assert_eq!(model.root_path().as_str(), "/models/simulation/m1");
        assert_eq!(model.to_string(), "model:simulation/m1");

        let iface = ProducerId::interface("i1", "m1");
        assert_eq!(iface.root_path().as_str(), "/interfaces/i1/m1");
        assert_eq!(iface.model_id(), "m1");
    }

    #[test]
    fn execution_path() {
        let owner = MethodId::new("sampling", "mc", 2);
        assert_eq!(owner.execution_path().as_str(), "/methods/mc/results/execution:2");
    }

    #[test]
    fn source_link_names() {
        let source = SourceRef::from(ProducerId::model("surrogate", "gp"));
        assert_eq!(source.link_name(), "gp");
        assert_eq!(SourceRef::Method("opt".into()).root_path().as_str(), "/methods/opt");
    }
}
