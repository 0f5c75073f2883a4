//! Distribution parameters of variables.
//!
//! Parameters are stored as one compound table per variable kind, one
//! record per variable. The layout of each record comes from
//! [`schema_for`]; a single routine turns any kind's records into a table.
//! Ragged arrays share a leading `num_elements` field and are padded up to
//! the longest array of the kind with a sentinel: NaN for reals,
//! `i32::MAX` for integers and the empty string for strings.

mod schema;

pub use schema::{ParamField, ParamType, schema_for};

use crate::error::Result;
use crate::types::VariableKind;
use evaldb_core::{ContainerAdapter, Datum, FieldSpec, ObjectPath, ScalarType, StorageError};
use std::collections::BTreeMap;
use tracing::debug;

/// Integer padding for ragged integer arrays.
pub const INT_SENTINEL: i32 = i32::MAX;

/// Name of the element count field prepended to array-bearing records.
pub const NUM_ELEMENTS: &str = "num_elements";

/// Value of one parameter field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Real scalar.
    Real(f64),
    /// Integer scalar.
    Int(i32),
    /// String scalar.
    Str(String),
    /// Real array.
    RealArray(Vec<f64>),
    /// Integer array.
    IntArray(Vec<i32>),
    /// String array.
    StrArray(Vec<String>),
}

impl ParamValue {
    fn ty(&self) -> ParamType {
        match self {
            Self::Real(_) => ParamType::Real,
            Self::Int(_) => ParamType::Int,
            Self::Str(_) => ParamType::Str,
            Self::RealArray(_) => ParamType::RealArray,
            Self::IntArray(_) => ParamType::IntArray,
            Self::StrArray(_) => ParamType::StrArray,
        }
    }

    fn array_len(&self) -> usize {
        match self {
            Self::RealArray(v) => v.len(),
            Self::IntArray(v) => v.len(),
            Self::StrArray(v) => v.len(),
            _ => 0,
        }
    }

    fn into_datum(self, width: usize) -> Datum {
        fn pad(mut items: Vec<Datum>, width: usize, fill: Datum) -> Datum {
            items.resize(width, fill);
            Datum::Array(items)
        }
        match self {
            Self::Real(v) => Datum::Real(v),
            Self::Int(v) => Datum::Int(v.into()),
            Self::Str(v) => Datum::Str(v),
            Self::RealArray(v) => pad(v.into_iter().map(Datum::Real).collect(), width, sentinel(ScalarType::F64)),
            Self::IntArray(v) => pad(
                v.into_iter().map(|i| Datum::Int(i.into())).collect(),
                width,
                sentinel(ScalarType::I32),
            ),
            Self::StrArray(v) => pad(v.into_iter().map(Datum::Str).collect(), width, sentinel(ScalarType::Str)),
        }
    }
}

fn sentinel(scalar: ScalarType) -> Datum {
    match scalar {
        ScalarType::F64 => Datum::Real(f64::NAN),
        ScalarType::Str => Datum::Str(String::new()),
        _ => Datum::Int(INT_SENTINEL.into()),
    }
}

/// Parameters of a single variable, by field name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamRecord {
    fields: BTreeMap<String, ParamValue>,
}

impl ParamRecord {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Set a real field.
    pub fn real(self, name: impl Into<String>, value: f64) -> Self {
        self.with(name, ParamValue::Real(value))
    }

    /// Set an integer field.
    pub fn int(self, name: impl Into<String>, value: i32) -> Self {
        self.with(name, ParamValue::Int(value))
    }

    /// Set a real array field.
    pub fn reals(self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.with(name, ParamValue::RealArray(values))
    }

    /// Set an integer array field.
    pub fn ints(self, name: impl Into<String>, values: Vec<i32>) -> Self {
        self.with(name, ParamValue::IntArray(values))
    }

    /// Set a string array field.
    pub fn strs<S: Into<String>>(self, name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        self.with(
            name,
            ParamValue::StrArray(values.into_iter().map(Into::into).collect()),
        )
    }

    /// A field by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.fields.get(name)
    }

    fn num_elements(&self) -> usize {
        self.fields.values().map(ParamValue::array_len).max().unwrap_or(0)
    }
}

/// Parameter records of a producer's variables, grouped by kind.
///
/// Records of a kind follow the order of the variables of that kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableParameters {
    tables: BTreeMap<VariableKind, Vec<ParamRecord>>,
}

impl VariableParameters {
    /// No parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the record of the next variable of `kind`.
    pub fn push(&mut self, kind: VariableKind, record: ParamRecord) {
        self.tables.entry(kind).or_default().push(record);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, kind: VariableKind, record: ParamRecord) -> Self {
        self.push(kind, record);
        self
    }

    /// Kinds with at least one record.
    pub fn kinds(&self) -> impl Iterator<Item = VariableKind> + '_ {
        self.tables.keys().copied()
    }

    /// Records of one kind.
    pub fn records(&self, kind: VariableKind) -> &[ParamRecord] {
        self.tables.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Whether no records were added.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A kind's records laid out as a compound table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    /// Compound fields.
    pub fields: Vec<FieldSpec>,
    /// One record per variable.
    pub records: Vec<Datum>,
}

/// Lay out the records of `kind` for storage at `path`.
///
/// Fields absent from a record are stored as the sentinel; fields unknown
/// to the kind or of the wrong type are errors.
pub fn build_table(path: &ObjectPath, kind: VariableKind, records: &[ParamRecord]) -> Result<ParameterTable> {
    const OP: &str = "store_variable_parameters";
    let schema = schema_for(kind);
    let has_arrays = schema.iter().any(|f| f.ty.is_array());
    let width = records.iter().map(ParamRecord::num_elements).max().unwrap_or(0).max(1);

    let mut fields = Vec::with_capacity(schema.len() + 1);
    if has_arrays {
        fields.push(FieldSpec::scalar(NUM_ELEMENTS, ScalarType::I32));
    }
    for field in schema {
        fields.push(if field.ty.is_array() {
            FieldSpec::array(field.name, field.ty.scalar(), width)
        } else {
            FieldSpec::scalar(field.name, field.ty.scalar())
        });
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        if let Some(unknown) = record.fields.keys().find(|k| !schema.iter().any(|f| f.name == k.as_str())) {
            return Err(StorageError::NotFound {
                path: path.join(unknown),
                operation: OP,
            }
            .into());
        }

        let mut values = Vec::with_capacity(fields.len());
        if has_arrays {
            values.push(Datum::Int(record.num_elements() as i64));
        }
        for field in schema {
            let datum = match record.get(field.name) {
                Some(value) if value.ty() == field.ty => value.clone().into_datum(width),
                Some(value) => {
                    return Err(StorageError::TypeMismatch {
                        path: path.join(field.name),
                        operation: OP,
                        expected: format!("{:?}", field.ty),
                        actual: format!("{:?}", value.ty()),
                    }
                    .into());
                }
                None if field.ty.is_array() => Datum::Array(vec![sentinel(field.ty.scalar()); width]),
                None => sentinel(field.ty.scalar()),
            };
            values.push(datum);
        }
        rows.push(Datum::Record(values));
    }

    Ok(ParameterTable { fields, records: rows })
}

/// Store every kind's table under `group`, one dataset per kind.
pub fn write_tables(adapter: &mut ContainerAdapter, group: &ObjectPath, parameters: &VariableParameters) -> Result<()> {
    for kind in parameters.kinds() {
        let records = parameters.records(kind);
        if records.is_empty() {
            continue;
        }
        let path = group.join(kind.name());
        let table = build_table(&path, kind, records)?;
        if !adapter.exists(&path) {
            adapter.create_empty_compound_dataset(&path, &[table.records.len()], &table.fields)?;
        }
        adapter.write_records(&path, table.records)?;
        debug!(path = %path, variables = records.len(), "Stored variable parameters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> ObjectPath {
        ObjectPath::new("/models/simulation/m1/properties/variable_parameters/x")
    }

    #[test]
    fn scalar_kind_table() {
        let records = vec![
            ParamRecord::new().real("mean", 1.0).real("std_deviation", 0.1),
            ParamRecord::new().real("mean", 2.0).real("std_deviation", 0.2),
        ];
        let table = build_table(&path(), VariableKind::NormalUncertain, &records).unwrap();
        assert_eq!(table.fields.len(), 4);
        assert!(table.fields.iter().all(|f| f.array_len.is_none()));

        let Datum::Record(first) = &table.records[0] else { panic!("not a record") };
        assert_eq!(first[0], Datum::Real(1.0));
        assert!(matches!(first[2], Datum::Real(v) if v.is_nan()));
    }

    #[test]
    fn ragged_arrays_are_padded() {
        let records = vec![
            ParamRecord::new().ints("elements", vec![1, 2, 3]).reals("probabilities", vec![0.2, 0.3, 0.5]),
            ParamRecord::new().ints("elements", vec![7]).reals("probabilities", vec![1.0]),
        ];
        let table = build_table(&path(), VariableKind::DiscreteUncertainSetInt, &records).unwrap();
        assert_eq!(table.fields[0], FieldSpec::scalar(NUM_ELEMENTS, ScalarType::I32));
        assert_eq!(table.fields[1], FieldSpec::array("elements", ScalarType::I32, 3));

        let Datum::Record(second) = &table.records[1] else { panic!("not a record") };
        assert_eq!(second[0], Datum::Int(1));
        assert_eq!(
            second[1],
            Datum::Array(vec![Datum::Int(7), Datum::Int(INT_SENTINEL.into()), Datum::Int(INT_SENTINEL.into())])
        );
        let padded = Datum::Array(vec![Datum::Real(1.0), Datum::Real(f64::NAN), Datum::Real(f64::NAN)]);
        assert!(padded.same_bits(&second[2]));
    }

    #[test]
    fn unknown_and_mistyped_fields() {
        let bad = [ParamRecord::new().real("median", 1.0)];
        let err = build_table(&path(), VariableKind::NormalUncertain, &bad).unwrap_err();
        assert_eq!(err.code(), "E102");

        let bad = [ParamRecord::new().int("mean", 1)];
        let err = build_table(&path(), VariableKind::NormalUncertain, &bad).unwrap_err();
        assert_eq!(err.code(), "E205");
    }
}
