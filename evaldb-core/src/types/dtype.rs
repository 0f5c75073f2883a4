//! Element types for datasets.

use std::fmt;

/// Size in bytes of a variable-length string descriptor (pointer + length).
pub const VLEN_DESCRIPTOR_SIZE: usize = 16;

/// A primitive element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarType {
    /// 32-bit signed integer.
    I32 = 0,
    /// 64-bit signed integer.
    I64 = 1,
    /// 64-bit unsigned integer.
    U64 = 2,
    /// IEEE-754 double.
    F64 = 3,
    /// Variable-length UTF-8 string.
    Str = 4,
}

impl ScalarType {
    /// Byte size of one element as laid out in a record.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::I32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::Str => VLEN_DESCRIPTOR_SIZE,
        }
    }

    /// Stable name used in error messages and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::Str => "string",
        }
    }
}

impl TryFrom<u8> for ScalarType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::I32),
            1 => Ok(Self::I64),
            2 => Ok(Self::U64),
            3 => Ok(Self::F64),
            4 => Ok(Self::Str),
            _ => Err("Unknown scalar type tag"),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of one field when assembling a compound type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Element type of the field.
    pub scalar: ScalarType,
    /// Fixed array length, or `None` for a scalar field.
    pub array_len: Option<usize>,
}

impl FieldSpec {
    /// A scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            array_len: None,
        }
    }

    /// A fixed-length array field.
    pub fn array(name: impl Into<String>, scalar: ScalarType, len: usize) -> Self {
        Self {
            name: name.into(),
            scalar,
            array_len: Some(len),
        }
    }
}

/// A laid-out field of a compound type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundField {
    /// Field name.
    pub name: String,
    /// Element type.
    pub scalar: ScalarType,
    /// Fixed array length, `None` for scalar fields.
    pub array_len: Option<usize>,
    /// Byte offset of the field within the record.
    pub offset: usize,
}

impl CompoundField {
    /// Byte size of the whole field.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.scalar.size_bytes() * self.array_len.unwrap_or(1)
    }
}

/// A record type made of named, typed fields (like a C struct).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundType {
    fields: Vec<CompoundField>,
    size: usize,
}

impl CompoundType {
    /// Create an empty compound type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a compound type from field specs, computing byte offsets.
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a FieldSpec>) -> Self {
        let mut ty = Self::new();
        for spec in specs {
            ty.push_field(spec.name.clone(), spec.scalar, spec.array_len);
        }
        ty
    }

    /// Append a field at the current end of the record.
    pub fn push_field(&mut self, name: impl Into<String>, scalar: ScalarType, array_len: Option<usize>) {
        let field = CompoundField {
            name: name.into(),
            scalar,
            array_len,
            offset: self.size,
        };
        self.size += field.size_bytes();
        self.fields.push(field);
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[CompoundField] {
        &self.fields
    }

    /// Position of a field by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Total record size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size
    }
}

/// Element type of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// A primitive element.
    Scalar(ScalarType),
    /// A compound record.
    Compound(CompoundType),
}

impl DataType {
    /// Byte size of one element.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Scalar(s) => s.size_bytes(),
            Self::Compound(c) => c.size_bytes(),
        }
    }

    /// Human-readable type name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(s) => s.name().to_string(),
            Self::Compound(c) => {
                let fields: Vec<String> = c
                    .fields()
                    .iter()
                    .map(|f| match f.array_len {
                        Some(n) => format!("{}: [{}; {}]", f.name, f.scalar, n),
                        None => format!("{}: {}", f.name, f.scalar),
                    })
                    .collect();
                format!("{{{}}}", fields.join(", "))
            }
        }
    }

    /// The scalar type, if this is not a compound.
    #[must_use]
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Compound(_) => None,
        }
    }
}

impl From<ScalarType> for DataType {
    fn from(scalar: ScalarType) -> Self {
        Self::Scalar(scalar)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_offsets_accumulate() {
        let specs = [
            FieldSpec::scalar("num_elements", ScalarType::I32),
            FieldSpec::array("elements", ScalarType::F64, 3),
            FieldSpec::scalar("label", ScalarType::Str),
        ];
        let ty = CompoundType::from_specs(&specs);
        let offsets: Vec<usize> = ty.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 28]);
        assert_eq!(ty.size_bytes(), 28 + VLEN_DESCRIPTOR_SIZE);
        assert_eq!(ty.field_index("elements"), Some(1));
    }

    #[test]
    fn scalar_tags_roundtrip() {
        for ty in [ScalarType::I32, ScalarType::I64, ScalarType::U64, ScalarType::F64, ScalarType::Str] {
            assert_eq!(ScalarType::try_from(ty as u8), Ok(ty));
        }
        assert!(ScalarType::try_from(9).is_err());
    }
}
