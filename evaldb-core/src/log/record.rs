//! Container log record types and serialization.

use crate::types::{AttrValue, CompoundType, DataType, Datum, ObjectPath, ScalarType};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Minimum record size (frame without payload): length + CRC32 + type.
pub const MIN_RECORD_SIZE: usize = 4 + 4 + 1;

/// Type tag for compound data types in the record encoding.
const COMPOUND_TAG: u8 = 0xFF;

/// Type of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Group created.
    CreateGroup = 0,
    /// Dataset created.
    CreateDataset = 1,
    /// Extensible dataset grown along its first dimension.
    Extend = 2,
    /// Hyperslab of elements written.
    Write = 3,
    /// Attribute set on a group or dataset.
    SetAttribute = 4,
    /// Dataset marked as a dimension scale.
    MarkScale = 5,
    /// Dimension scale attached to a dataset axis.
    AttachScale = 6,
    /// Soft link created.
    SoftLink = 7,
}

impl TryFrom<u8> for RecordType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CreateGroup),
            1 => Ok(Self::CreateDataset),
            2 => Ok(Self::Extend),
            3 => Ok(Self::Write),
            4 => Ok(Self::SetAttribute),
            5 => Ok(Self::MarkScale),
            6 => Ok(Self::AttachScale),
            7 => Ok(Self::SoftLink),
            _ => Err("Unknown log record type"),
        }
    }
}

/// A single mutation of the container tree.
///
/// Replaying every record of a log in order rebuilds the container exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// Create a group (and any missing parents).
    CreateGroup {
        /// Group path.
        path: ObjectPath,
    },
    /// Create a dataset.
    CreateDataset {
        /// Dataset path.
        path: ObjectPath,
        /// Element type.
        dtype: DataType,
        /// Current dimensions.
        dims: Vec<usize>,
        /// Whether the first dimension is unbounded.
        extensible: bool,
        /// Rows per chunk.
        chunk_rows: usize,
        /// Creation fill value.
        fill: Datum,
    },
    /// Grow the first dimension of a dataset.
    Extend {
        /// Dataset path.
        path: ObjectPath,
        /// New extent of the first dimension.
        extent: usize,
    },
    /// Write a hyperslab of encoded elements.
    Write {
        /// Dataset path.
        path: ObjectPath,
        /// Selection start per axis.
        start: Vec<usize>,
        /// Selection count per axis.
        count: Vec<usize>,
        /// Elements encoded with the dataset's type, row-major.
        payload: Vec<u8>,
    },
    /// Set an attribute.
    SetAttribute {
        /// Group or dataset path.
        path: ObjectPath,
        /// Attribute name.
        name: String,
        /// Attribute value.
        value: AttrValue,
    },
    /// Mark a dataset as a dimension scale.
    MarkScale {
        /// Scale dataset path.
        path: ObjectPath,
        /// Scale name.
        name: String,
    },
    /// Attach a scale to an axis of a dataset.
    AttachScale {
        /// Primary dataset path.
        dataset: ObjectPath,
        /// Scale dataset path.
        scale: ObjectPath,
        /// Label under which the scale is attached.
        label: String,
        /// Axis of the primary dataset.
        axis: usize,
    },
    /// Create a soft link.
    SoftLink {
        /// Path of the link itself.
        link: ObjectPath,
        /// Path the link resolves to.
        target: ObjectPath,
    },
}

impl LogRecord {
    /// The type tag of this record.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::CreateGroup { .. } => RecordType::CreateGroup,
            Self::CreateDataset { .. } => RecordType::CreateDataset,
            Self::Extend { .. } => RecordType::Extend,
            Self::Write { .. } => RecordType::Write,
            Self::SetAttribute { .. } => RecordType::SetAttribute,
            Self::MarkScale { .. } => RecordType::MarkScale,
            Self::AttachScale { .. } => RecordType::AttachScale,
            Self::SoftLink { .. } => RecordType::SoftLink,
        }
    }

    /// The primary object path this record concerns.
    #[must_use]
    pub fn path(&self) -> &ObjectPath {
        match self {
            Self::CreateGroup { path }
            | Self::CreateDataset { path, .. }
            | Self::Extend { path, .. }
            | Self::Write { path, .. }
            | Self::SetAttribute { path, .. }
            | Self::MarkScale { path, .. } => path,
            Self::AttachScale { dataset, .. } => dataset,
            Self::SoftLink { link, .. } => link,
        }
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut payload = Vec::new();

        match self {
            Self::CreateGroup { path } => write_path(&mut payload, path)?,
            Self::CreateDataset {
                path,
                dtype,
                dims,
                extensible,
                chunk_rows,
                fill,
            } => {
                write_path(&mut payload, path)?;
                write_dtype(&mut payload, dtype)?;
                write_dims(&mut payload, dims)?;
                payload.write_u8(u8::from(*extensible))?;
                payload.write_u64::<LittleEndian>(*chunk_rows as u64)?;
                fill.encode(dtype, &mut payload)?;
            }
            Self::Extend { path, extent } => {
                write_path(&mut payload, path)?;
                payload.write_u64::<LittleEndian>(*extent as u64)?;
            }
            Self::Write {
                path,
                start,
                count,
                payload: data,
            } => {
                write_path(&mut payload, path)?;
                write_dims(&mut payload, start)?;
                write_dims(&mut payload, count)?;
                write_len(&mut payload, data.len())?;
                payload.write_all(data)?;
            }
            Self::SetAttribute { path, name, value } => {
                write_path(&mut payload, path)?;
                write_str(&mut payload, name)?;
                write_attr(&mut payload, value)?;
            }
            Self::MarkScale { path, name } => {
                write_path(&mut payload, path)?;
                write_str(&mut payload, name)?;
            }
            Self::AttachScale {
                dataset,
                scale,
                label,
                axis,
            } => {
                write_path(&mut payload, dataset)?;
                write_path(&mut payload, scale)?;
                write_str(&mut payload, label)?;
                write_len(&mut payload, *axis)?;
            }
            Self::SoftLink { link, target } => {
                write_path(&mut payload, link)?;
                write_path(&mut payload, target)?;
            }
        }

        // Calculate CRC32 of the payload
        let crc = crc32fast::hash(&payload);

        let total_len = MIN_RECORD_SIZE + payload.len();
        let mut record = Vec::with_capacity(total_len);

        write_len(&mut record, total_len)?;
        record.write_u32::<LittleEndian>(crc)?;
        record.write_u8(self.record_type() as u8)?;
        record.write_all(&payload)?;

        Ok(record)
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < MIN_RECORD_SIZE {
            return Err(invalid("Record too small".to_string()));
        }

        let mut cursor = io::Cursor::new(bytes);

        let total_len = cursor.read_u32::<LittleEndian>()? as usize;
        let stored_crc = cursor.read_u32::<LittleEndian>()?;
        let record_type = RecordType::try_from(cursor.read_u8()?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if total_len < MIN_RECORD_SIZE || bytes.len() < total_len {
            return Err(invalid(format!(
                "Record truncated: expected {} bytes, got {}",
                total_len,
                bytes.len()
            )));
        }

        let payload = &bytes[MIN_RECORD_SIZE..total_len];

        // Verify CRC
        let computed_crc = crc32fast::hash(payload);
        if computed_crc != stored_crc {
            return Err(invalid(format!(
                "CRC mismatch: expected {}, got {}",
                stored_crc, computed_crc
            )));
        }

        let mut cursor = io::Cursor::new(payload);
        let record = match record_type {
            RecordType::CreateGroup => Self::CreateGroup {
                path: read_path(&mut cursor)?,
            },
            RecordType::CreateDataset => {
                let path = read_path(&mut cursor)?;
                let dtype = read_dtype(&mut cursor)?;
                let dims = read_dims(&mut cursor)?;
                let extensible = cursor.read_u8()? != 0;
                let chunk_rows = cursor.read_u64::<LittleEndian>()? as usize;
                let fill = Datum::decode(&dtype, &mut cursor)?;
                Self::CreateDataset {
                    path,
                    dtype,
                    dims,
                    extensible,
                    chunk_rows,
                    fill,
                }
            }
            RecordType::Extend => Self::Extend {
                path: read_path(&mut cursor)?,
                extent: cursor.read_u64::<LittleEndian>()? as usize,
            },
            RecordType::Write => {
                let path = read_path(&mut cursor)?;
                let start = read_dims(&mut cursor)?;
                let count = read_dims(&mut cursor)?;
                let len = cursor.read_u32::<LittleEndian>()? as usize;
                let mut data = vec![0u8; len];
                cursor.read_exact(&mut data)?;
                Self::Write {
                    path,
                    start,
                    count,
                    payload: data,
                }
            }
            RecordType::SetAttribute => Self::SetAttribute {
                path: read_path(&mut cursor)?,
                name: read_str(&mut cursor)?,
                value: read_attr(&mut cursor)?,
            },
            RecordType::MarkScale => Self::MarkScale {
                path: read_path(&mut cursor)?,
                name: read_str(&mut cursor)?,
            },
            RecordType::AttachScale => Self::AttachScale {
                dataset: read_path(&mut cursor)?,
                scale: read_path(&mut cursor)?,
                label: read_str(&mut cursor)?,
                axis: cursor.read_u32::<LittleEndian>()? as usize,
            },
            RecordType::SoftLink => Self::SoftLink {
                link: read_path(&mut cursor)?,
                target: read_path(&mut cursor)?,
            },
        };

        Ok(record)
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Write a length field, refusing values that do not fit in 32 bits.
fn write_len<W: Write>(out: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Length {} exceeds the 32-bit record limit", len),
        )
    })?;
    out.write_u32::<LittleEndian>(len)
}

fn write_str<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    write_len(out, s.len())?;
    out.write_all(s.as_bytes())
}

fn read_str<R: Read>(input: &mut R) -> io::Result<String> {
    let len = input.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| invalid(e.to_string()))
}

fn write_path<W: Write>(out: &mut W, path: &ObjectPath) -> io::Result<()> {
    write_str(out, path.as_str())
}

fn read_path<R: Read>(input: &mut R) -> io::Result<ObjectPath> {
    read_str(input).map(ObjectPath::new)
}

fn write_dims<W: Write>(out: &mut W, dims: &[usize]) -> io::Result<()> {
    write_len(out, dims.len())?;
    for d in dims {
        out.write_u64::<LittleEndian>(*d as u64)?;
    }
    Ok(())
}

fn read_dims<R: Read>(input: &mut R) -> io::Result<Vec<usize>> {
    let rank = input.read_u32::<LittleEndian>()? as usize;
    (0..rank)
        .map(|_| input.read_u64::<LittleEndian>().map(|d| d as usize))
        .collect()
}

fn write_dtype<W: Write>(out: &mut W, dtype: &DataType) -> io::Result<()> {
    match dtype {
        DataType::Scalar(s) => out.write_u8(*s as u8),
        DataType::Compound(c) => {
            out.write_u8(COMPOUND_TAG)?;
            write_len(out, c.fields().len())?;
            for field in c.fields() {
                write_str(out, &field.name)?;
                out.write_u8(field.scalar as u8)?;
                write_len(out, field.array_len.unwrap_or(0))?;
            }
            Ok(())
        }
    }
}

fn read_dtype<R: Read>(input: &mut R) -> io::Result<DataType> {
    let tag = input.read_u8()?;
    if tag != COMPOUND_TAG {
        let scalar = ScalarType::try_from(tag).map_err(|e| invalid(e.to_string()))?;
        return Ok(DataType::Scalar(scalar));
    }

    let nfields = input.read_u32::<LittleEndian>()? as usize;
    let mut compound = CompoundType::new();
    for _ in 0..nfields {
        let name = read_str(input)?;
        let scalar = ScalarType::try_from(input.read_u8()?).map_err(|e| invalid(e.to_string()))?;
        let array_len = match input.read_u32::<LittleEndian>()? {
            0 => None,
            n => Some(n as usize),
        };
        compound.push_field(name, scalar, array_len);
    }
    Ok(DataType::Compound(compound))
}

fn write_attr<W: Write>(out: &mut W, value: &AttrValue) -> io::Result<()> {
    match value {
        AttrValue::Int(v) => {
            out.write_u8(0)?;
            out.write_i64::<LittleEndian>(*v)
        }
        AttrValue::Real(v) => {
            out.write_u8(1)?;
            out.write_u64::<LittleEndian>(v.to_bits())
        }
        AttrValue::Str(v) => {
            out.write_u8(2)?;
            write_str(out, v)
        }
    }
}

fn read_attr<R: Read>(input: &mut R) -> io::Result<AttrValue> {
    match input.read_u8()? {
        0 => Ok(AttrValue::Int(input.read_i64::<LittleEndian>()?)),
        1 => Ok(AttrValue::Real(f64::from_bits(input.read_u64::<LittleEndian>()?))),
        2 => Ok(AttrValue::Str(read_str(input)?)),
        other => Err(invalid(format!("Unknown attribute tag {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldSpec;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_length_is_refused() {
        let mut out = Vec::new();
        let err = write_len(&mut out, u32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());

        write_len(&mut out, u32::MAX as usize).unwrap();
        assert_eq!(out, vec![0xff; 4]);
    }

    #[test]
    fn compound_dataset_record_roundtrip() {
        let dtype = DataType::Compound(CompoundType::from_specs(&[
            FieldSpec::scalar("num_elements", ScalarType::I32),
            FieldSpec::array("elements", ScalarType::Str, 2),
        ]));
        let record = LogRecord::CreateDataset {
            path: ObjectPath::new("/models/simulation/m1/properties/variable_parameters/x"),
            fill: Datum::zero(&dtype),
            dtype,
            dims: vec![3],
            extensible: false,
            chunk_rows: 3,
        };

        let bytes = record.to_bytes().unwrap();
        let restored = LogRecord::from_bytes(&bytes).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.record_type(), RecordType::CreateDataset);
    }

    #[test]
    fn attribute_record_keeps_real_bits() {
        let record = LogRecord::SetAttribute {
            path: ObjectPath::root(),
            name: "tolerance".to_string(),
            value: AttrValue::Real(1.0e-8),
        };
        let restored = LogRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn crc_verification() {
        let record = LogRecord::CreateGroup {
            path: ObjectPath::new("/methods"),
        };
        let mut bytes = record.to_bytes().unwrap();

        // Corrupt a byte in the payload
        bytes[MIN_RECORD_SIZE] ^= 0xFF;

        assert!(LogRecord::from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let record = LogRecord::SoftLink {
            link: ObjectPath::new("/methods/a/sources/b"),
            target: ObjectPath::new("/methods/b"),
        };
        let bytes = record.to_bytes().unwrap();
        assert!(LogRecord::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
