//! In-memory results backend.
//!
//! Keeps every result in a map keyed by method, execution and data name.
//! Used for end-of-run text reports and by callers that look results up
//! again while the run is in progress. Nothing is persisted.

use super::{ArrayBackend, ResultsBackend};
use crate::error::{Result, ResultsError};
use crate::types::{DimScale, MethodId, ResultValue};
use evaldb_core::Attribute;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Key of one in-memory result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultKey {
    /// Method name.
    pub method_name: String,
    /// Method id.
    pub method_id: String,
    /// Execution number.
    pub execution: usize,
    /// Name of the result.
    pub data_name: String,
}

impl ResultKey {
    /// Key of `data_name` under `owner`.
    pub fn new(owner: &MethodId, data_name: impl Into<String>) -> Self {
        Self {
            method_name: owner.method_name.clone(),
            method_id: owner.method_id.clone(),
            execution: owner.execution,
            data_name: data_name.into(),
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.method_name, self.method_id, self.execution, self.data_name
        )
    }
}

enum Stored {
    Single(ResultValue),
    Array(Vec<Option<ResultValue>>),
}

struct Entry {
    value: Stored,
    metadata: Vec<Attribute>,
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<ResultKey, Entry>,
    method_metadata: BTreeMap<String, Vec<Attribute>>,
    execution_metadata: BTreeMap<(String, usize), Vec<Attribute>>,
    study_metadata: Vec<Attribute>,
}

/// In-memory results backend.
///
/// Clones share the same storage, so one clone can be handed to the
/// results manager while another is kept for lookups and reports.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The single result stored under `data_name`.
    pub fn lookup(&self, owner: &MethodId, data_name: &str) -> Result<ResultValue> {
        let key = ResultKey::new(owner, data_name);
        let state = self.state.lock();
        match state.entries.get(&key).map(|e| &e.value) {
            Some(Stored::Single(value)) => Ok(value.clone()),
            Some(Stored::Array(_)) => Err(ResultsError::Backend(format!("{} is an array", key))),
            None => Err(ResultsError::KeyNotFound { key: key.to_string() }),
        }
    }

    /// Slot `index` of the array stored under `data_name`.
    pub fn lookup_at(&self, owner: &MethodId, data_name: &str, index: usize) -> Result<ResultValue> {
        let key = ResultKey::new(owner, data_name);
        let state = self.state.lock();
        let slots = match state.entries.get(&key).map(|e| &e.value) {
            Some(Stored::Array(slots)) => slots,
            Some(Stored::Single(_)) => return Err(ResultsError::Backend(format!("{} is not an array", key))),
            None => return Err(ResultsError::KeyNotFound { key: key.to_string() }),
        };
        match slots.get(index) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(ResultsError::KeyNotFound {
                key: format!("{}[{}]", key, index),
            }),
            None => Err(ResultsError::IndexOutOfRange {
                key: key.to_string(),
                index,
                size: slots.len(),
            }),
        }
    }

    /// Metadata attached to the entry under `data_name`.
    pub fn metadata(&self, owner: &MethodId, data_name: &str) -> Result<Vec<Attribute>> {
        let key = ResultKey::new(owner, data_name);
        self.state
            .lock()
            .entries
            .get(&key)
            .map(|e| e.metadata.clone())
            .ok_or_else(|| ResultsError::KeyNotFound { key: key.to_string() })
    }

    /// Render every entry and its metadata as plain text.
    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let state = self.state.lock();

        if !state.study_metadata.is_empty() {
            writeln!(out, "Study")?;
            write_attributes(out, &state.study_metadata, "  ")?;
        }

        let mut current: Option<(&str, usize)> = None;
        for (key, entry) in &state.entries {
            if current != Some((key.method_id.as_str(), key.execution)) {
                current = Some((key.method_id.as_str(), key.execution));
                writeln!(
                    out,
                    "Method {} ({}), execution {}",
                    key.method_id, key.method_name, key.execution
                )?;
                if let Some(attrs) = state.method_metadata.get(&key.method_id) {
                    write_attributes(out, attrs, "  ")?;
                }
                if let Some(attrs) = state
                    .execution_metadata
                    .get(&(key.method_id.clone(), key.execution))
                {
                    write_attributes(out, attrs, "  ")?;
                }
            }

            match &entry.value {
                Stored::Single(value) => {
                    writeln!(out, "  {}:", key.data_name)?;
                    write_indented(out, &value.render(), "    ")?;
                }
                Stored::Array(slots) => {
                    writeln!(out, "  {} [{}]:", key.data_name, slots.len())?;
                    for (i, slot) in slots.iter().enumerate() {
                        match slot {
                            Some(value) => {
                                writeln!(out, "    [{}]", i)?;
                                write_indented(out, &value.render(), "      ")?;
                            }
                            None => writeln!(out, "    [{}] <empty>", i)?,
                        }
                    }
                }
            }
            write_attributes(out, &entry.metadata, "    ")?;
        }
        Ok(())
    }
}

fn write_attributes<W: Write>(out: &mut W, attributes: &[Attribute], indent: &str) -> io::Result<()> {
    for attr in attributes {
        writeln!(out, "{}@{} = {}", indent, attr.label, attr.value)?;
    }
    Ok(())
}

fn write_indented<W: Write>(out: &mut W, text: &str, indent: &str) -> io::Result<()> {
    for line in text.lines() {
        writeln!(out, "{}{}", indent, line)?;
    }
    Ok(())
}

impl ResultsBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn insert(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        data: &ResultValue,
        scales: &[DimScale],
        attributes: &[Attribute],
        _transpose: bool,
    ) -> Result<()> {
        let key = ResultKey::new(owner, location.join("/"));
        if !scales.is_empty() {
            debug!(key = %key, scales = scales.len(), "Dimension scales not kept in memory");
        }
        self.state.lock().entries.insert(
            key,
            Entry {
                value: Stored::Single(data.clone()),
                metadata: attributes.to_vec(),
            },
        );
        Ok(())
    }

    fn add_metadata_to_method(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        self.state
            .lock()
            .method_metadata
            .entry(owner.method_id.clone())
            .or_default()
            .extend_from_slice(attributes);
        Ok(())
    }

    fn add_metadata_to_execution(&mut self, owner: &MethodId, attributes: &[Attribute]) -> Result<()> {
        self.state
            .lock()
            .execution_metadata
            .entry((owner.method_id.clone(), owner.execution))
            .or_default()
            .extend_from_slice(attributes);
        Ok(())
    }

    fn add_metadata_to_object(
        &mut self,
        owner: &MethodId,
        location: &[&str],
        attributes: &[Attribute],
    ) -> Result<()> {
        let key = ResultKey::new(owner, location.join("/"));
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(&key)
            .ok_or_else(|| ResultsError::KeyNotFound { key: key.to_string() })?;
        entry.metadata.extend_from_slice(attributes);
        Ok(())
    }

    fn add_metadata_to_study(&mut self, attributes: &[Attribute]) -> Result<()> {
        self.state.lock().study_metadata.extend_from_slice(attributes);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_array_store(&mut self) -> Option<&mut dyn ArrayBackend> {
        Some(self)
    }
}

impl ArrayBackend for InMemoryBackend {
    fn array_allocate(&mut self, owner: &MethodId, data_name: &str, size: usize) -> Result<()> {
        let key = ResultKey::new(owner, data_name);
        self.state.lock().entries.insert(
            key,
            Entry {
                value: Stored::Array(vec![None; size]),
                metadata: Vec::new(),
            },
        );
        Ok(())
    }

    fn array_insert(&mut self, owner: &MethodId, data_name: &str, index: usize, value: ResultValue) -> Result<()> {
        let key = ResultKey::new(owner, data_name);
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(&key)
            .ok_or_else(|| ResultsError::KeyNotFound { key: key.to_string() })?;
        let Stored::Array(slots) = &mut entry.value else {
            return Err(ResultsError::Backend(format!("{} is not an array", key)));
        };
        let size = slots.len();
        let slot = slots.get_mut(index).ok_or_else(|| ResultsError::IndexOutOfRange {
            key: key.to_string(),
            index,
            size,
        })?;
        *slot = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> MethodId {
        MethodId::new("sampling", "mc", 1)
    }

    #[test]
    fn insert_and_lookup() {
        let mut backend = InMemoryBackend::new();
        backend
            .insert(
                &owner(),
                &["moments", "f1"],
                &ResultValue::from(vec![1.0, 0.5]),
                &[],
                &[Attribute::new("units", "m")],
                false,
            )
            .unwrap();

        assert_eq!(
            backend.lookup(&owner(), "moments/f1").unwrap(),
            ResultValue::RealVector(vec![1.0, 0.5])
        );
        assert_eq!(backend.metadata(&owner(), "moments/f1").unwrap().len(), 1);
        assert_eq!(backend.lookup(&owner(), "moments/f2").unwrap_err().code(), "E301");
    }

    #[test]
    fn arrays_fail_loudly() {
        let mut backend = InMemoryBackend::new();
        backend.array_allocate(&owner(), "best", 2).unwrap();
        backend.array_insert(&owner(), "best", 1, ResultValue::Real(3.0)).unwrap();

        assert_eq!(backend.lookup_at(&owner(), "best", 1).unwrap(), ResultValue::Real(3.0));
        assert_eq!(backend.lookup_at(&owner(), "best", 0).unwrap_err().code(), "E301");
        assert_eq!(backend.lookup_at(&owner(), "best", 2).unwrap_err().code(), "E302");

        let err = backend
            .array_insert(&owner(), "best", 5, ResultValue::Real(1.0))
            .unwrap_err();
        assert_eq!(err.code(), "E302");
        let err = backend
            .array_insert(&owner(), "missing", 0, ResultValue::Real(1.0))
            .unwrap_err();
        assert_eq!(err.code(), "E301");
    }

    #[test]
    fn clones_share_storage() {
        let kept = InMemoryBackend::new();
        let mut registered = kept.clone();
        registered
            .insert(&owner(), &["n"], &ResultValue::Int(4), &[], &[], false)
            .unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn report_lists_entries_and_metadata() {
        let mut backend = InMemoryBackend::new();
        backend
            .add_metadata_to_study(&[Attribute::new("title", "beam")])
            .unwrap();
        backend
            .add_metadata_to_method(&owner(), &[Attribute::new("samples", 10i64)])
            .unwrap();
        backend
            .insert(&owner(), &["mean"], &ResultValue::Real(2.5), &[], &[], false)
            .unwrap();
        backend.array_allocate(&owner(), "best", 2).unwrap();

        let mut out = Vec::new();
        backend.write_report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("@title = beam"));
        assert!(text.contains("Method mc (sampling), execution 1"));
        assert!(text.contains("@samples = 10"));
        assert!(text.contains("  mean:\n    2.5"));
        assert!(text.contains("[1] <empty>"));
    }
}
