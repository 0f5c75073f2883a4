//! Nodes of the container namespace.

use super::dataset::DatasetId;
use crate::types::{AttrValue, ObjectPath};
use std::collections::BTreeMap;

/// What kind of object lives at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A group.
    Group,
    /// A dataset.
    Dataset,
    /// A soft link.
    Link,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Group { attributes: BTreeMap<String, AttrValue> },
    Dataset(DatasetId),
    Link(ObjectPath),
}

impl Node {
    pub(crate) fn group() -> Self {
        Self::Group {
            attributes: BTreeMap::new(),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Group { .. } => NodeKind::Group,
            Self::Dataset(_) => NodeKind::Dataset,
            Self::Link(_) => NodeKind::Link,
        }
    }
}
