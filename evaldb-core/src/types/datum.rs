//! Dynamically-typed dataset elements and their binary codec.

use super::dtype::{CompoundType, DataType, ScalarType};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// A single dataset element.
///
/// Compound records are `Record`s whose entries follow the field order of
/// the compound type; array fields are nested `Array`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Signed integer (i32 or i64 datasets).
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Double-precision real.
    Real(f64),
    /// UTF-8 string.
    Str(String),
    /// Fixed-length array field of a compound record.
    Array(Vec<Datum>),
    /// Compound record.
    Record(Vec<Datum>),
}

impl Datum {
    /// The zero value of a data type: 0, 0.0, empty string, or a record of
    /// zero values.
    pub fn zero(dtype: &DataType) -> Self {
        match dtype {
            DataType::Scalar(s) => Self::scalar_zero(*s),
            DataType::Compound(c) => Self::Record(
                c.fields()
                    .iter()
                    .map(|f| match f.array_len {
                        Some(n) => Self::Array(vec![Self::scalar_zero(f.scalar); n]),
                        None => Self::scalar_zero(f.scalar),
                    })
                    .collect(),
            ),
        }
    }

    fn scalar_zero(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::I32 | ScalarType::I64 => Self::Int(0),
            ScalarType::U64 => Self::UInt(0),
            ScalarType::F64 => Self::Real(0.0),
            ScalarType::Str => Self::Str(String::new()),
        }
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Real(_) => "real",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
        }
    }

    /// Check whether this element can be stored in a dataset of `dtype`.
    #[must_use]
    pub fn conforms_to(&self, dtype: &DataType) -> bool {
        match dtype {
            DataType::Scalar(s) => self.conforms_to_scalar(*s),
            DataType::Compound(c) => self.conforms_to_compound(c),
        }
    }

    fn conforms_to_scalar(&self, scalar: ScalarType) -> bool {
        match (self, scalar) {
            (Self::Int(v), ScalarType::I32) => i32::try_from(*v).is_ok(),
            (Self::Int(_), ScalarType::I64) => true,
            (Self::UInt(_), ScalarType::U64) => true,
            (Self::Real(_), ScalarType::F64) => true,
            (Self::Str(_), ScalarType::Str) => true,
            _ => false,
        }
    }

    fn conforms_to_compound(&self, compound: &CompoundType) -> bool {
        let Self::Record(values) = self else {
            return false;
        };
        if values.len() != compound.fields().len() {
            return false;
        }
        values.iter().zip(compound.fields()).all(|(value, field)| match field.array_len {
            Some(n) => match value {
                Self::Array(items) => {
                    items.len() == n && items.iter().all(|i| i.conforms_to_scalar(field.scalar))
                }
                _ => false,
            },
            None => value.conforms_to_scalar(field.scalar),
        })
    }

    /// Encode this element for the record log.
    ///
    /// The caller must have checked [`Datum::conforms_to`] first.
    pub fn encode<W: Write>(&self, dtype: &DataType, out: &mut W) -> io::Result<()> {
        match dtype {
            DataType::Scalar(s) => self.encode_scalar(*s, out),
            DataType::Compound(c) => {
                let Self::Record(values) = self else {
                    return Err(invalid("record expected"));
                };
                for (value, field) in values.iter().zip(c.fields()) {
                    match (field.array_len, value) {
                        (Some(_), Self::Array(items)) => {
                            for item in items {
                                item.encode_scalar(field.scalar, out)?;
                            }
                        }
                        (Some(_), _) => return Err(invalid("array field expected")),
                        (None, v) => v.encode_scalar(field.scalar, out)?,
                    }
                }
                Ok(())
            }
        }
    }

    fn encode_scalar<W: Write>(&self, scalar: ScalarType, out: &mut W) -> io::Result<()> {
        match (self, scalar) {
            (Self::Int(v), ScalarType::I32) => {
                let v = i32::try_from(*v).map_err(|_| invalid("i32 overflow"))?;
                out.write_i32::<LittleEndian>(v)
            }
            (Self::Int(v), ScalarType::I64) => out.write_i64::<LittleEndian>(*v),
            (Self::UInt(v), ScalarType::U64) => out.write_u64::<LittleEndian>(*v),
            (Self::Real(v), ScalarType::F64) => out.write_u64::<LittleEndian>(v.to_bits()),
            (Self::Str(s), ScalarType::Str) => {
                out.write_u32::<LittleEndian>(s.len() as u32)?;
                out.write_all(s.as_bytes())
            }
            (other, _) => Err(invalid(&format!(
                "cannot encode {} as {}",
                other.kind_name(),
                scalar
            ))),
        }
    }

    /// Decode one element of `dtype` from the record log.
    pub fn decode<R: Read>(dtype: &DataType, input: &mut R) -> io::Result<Self> {
        match dtype {
            DataType::Scalar(s) => Self::decode_scalar(*s, input),
            DataType::Compound(c) => {
                let mut values = Vec::with_capacity(c.fields().len());
                for field in c.fields() {
                    match field.array_len {
                        Some(n) => {
                            let mut items = Vec::with_capacity(n);
                            for _ in 0..n {
                                items.push(Self::decode_scalar(field.scalar, input)?);
                            }
                            values.push(Self::Array(items));
                        }
                        None => values.push(Self::decode_scalar(field.scalar, input)?),
                    }
                }
                Ok(Self::Record(values))
            }
        }
    }

    fn decode_scalar<R: Read>(scalar: ScalarType, input: &mut R) -> io::Result<Self> {
        Ok(match scalar {
            ScalarType::I32 => Self::Int(i64::from(input.read_i32::<LittleEndian>()?)),
            ScalarType::I64 => Self::Int(input.read_i64::<LittleEndian>()?),
            ScalarType::U64 => Self::UInt(input.read_u64::<LittleEndian>()?),
            ScalarType::F64 => Self::Real(f64::from_bits(input.read_u64::<LittleEndian>()?)),
            ScalarType::Str => {
                let len = input.read_u32::<LittleEndian>()? as usize;
                let mut buf = vec![0u8; len];
                input.read_exact(&mut buf)?;
                Self::Str(String::from_utf8(buf).map_err(|e| invalid(&e.to_string()))?)
            }
        })
    }

    /// Bitwise equality: like `==` but NaN payloads compare by bits.
    #[must_use]
    pub fn same_bits(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Array(a), Self::Array(b)) | (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_bits(y))
            }
            (a, b) => a == b,
        }
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Datum {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dtype::FieldSpec;

    fn record_type() -> DataType {
        DataType::Compound(CompoundType::from_specs(&[
            FieldSpec::scalar("num_elements", ScalarType::I32),
            FieldSpec::array("elements", ScalarType::F64, 2),
            FieldSpec::scalar("label", ScalarType::Str),
        ]))
    }

    #[test]
    fn i32_range_is_enforced() {
        let dtype = DataType::Scalar(ScalarType::I32);
        assert!(Datum::Int(i64::from(i32::MAX)).conforms_to(&dtype));
        assert!(!Datum::Int(i64::from(i32::MAX) + 1).conforms_to(&dtype));
        assert!(!Datum::Real(1.0).conforms_to(&dtype));
    }

    #[test]
    fn record_codec_preserves_nan_bits() {
        let dtype = record_type();
        let value = Datum::Record(vec![
            Datum::Int(1),
            Datum::Array(vec![Datum::Real(2.5), Datum::Real(f64::NAN)]),
            Datum::from("x1"),
        ]);
        assert!(value.conforms_to(&dtype));

        let mut buf = Vec::new();
        value.encode(&dtype, &mut buf).unwrap();
        let decoded = Datum::decode(&dtype, &mut io::Cursor::new(&buf)).unwrap();
        assert!(decoded.same_bits(&value));
    }

    #[test]
    fn record_with_wrong_array_length_does_not_conform() {
        let dtype = record_type();
        let value = Datum::Record(vec![
            Datum::Int(1),
            Datum::Array(vec![Datum::Real(2.5)]),
            Datum::from("x1"),
        ]);
        assert!(!value.conforms_to(&dtype));
    }

    #[test]
    fn zero_record_matches_layout() {
        let dtype = record_type();
        let zero = Datum::zero(&dtype);
        assert!(zero.conforms_to(&dtype));
    }
}
