//! Container file header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Magic number for evaldb container files.
pub const CONTAINER_MAGIC: u64 = 0x4556_414C_4442_4346; // "EVALDBCF" in hex

/// Current on-disk log format version. Bumped on layout-breaking changes.
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Fixed size of the container header in bytes.
pub const HEADER_SIZE: usize = 128;

/// Schema version of the stored result layout (major, minor, patch).
///
/// Patch: non-breaking fixes. Minor: additive content. Major: layout breaks.
pub const SCHEMA_VERSION: (u16, u16, u16) = (1, 0, 0);

/// Container file header.
///
/// Stored at the beginning of every container file, followed by the
/// append-only record log.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ContainerHeader {
    /// Magic number for file identification.
    pub magic: u64,
    /// Log format version.
    pub version: u32,
    /// Flags (reserved for future use).
    pub flags: u32,
    /// Identifier of the run that created the container.
    pub run_id: Uuid,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Result-layout schema version.
    pub schema_version: (u16, u16, u16),
    /// Reserved for alignment and future use.
    pub _reserved: [u8; 82],
}

impl ContainerHeader {
    /// Create a header for a fresh container.
    pub fn new(run_id: Uuid) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            magic: CONTAINER_MAGIC,
            version: LOG_FORMAT_VERSION,
            flags: 0,
            run_id,
            created_at: now,
            schema_version: SCHEMA_VERSION,
            _reserved: [0u8; 82],
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.magic != CONTAINER_MAGIC {
            return Err("Invalid magic number");
        }
        if self.version != LOG_FORMAT_VERSION {
            return Err("Unsupported log format version");
        }
        if self.schema_version.0 != SCHEMA_VERSION.0 {
            return Err("Incompatible schema major version");
        }
        Ok(())
    }

    /// The schema version formatted as `major.minor.patch`.
    #[must_use]
    pub fn schema_version_string(&self) -> String {
        let (major, minor, patch) = self.schema_version;
        format!("{major}.{minor}.{patch}")
    }

    /// Read header from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Buffer too small for header",
            ));
        }

        let mut cursor = io::Cursor::new(bytes);

        let magic = cursor.read_u64::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;

        let mut uuid_bytes = [0u8; 16];
        cursor.read_exact(&mut uuid_bytes)?;
        let run_id = Uuid::from_bytes(uuid_bytes);

        let created_at = cursor.read_u64::<LittleEndian>()?;
        let major = cursor.read_u16::<LittleEndian>()?;
        let minor = cursor.read_u16::<LittleEndian>()?;
        let patch = cursor.read_u16::<LittleEndian>()?;

        let mut reserved = [0u8; 82];
        cursor.read_exact(&mut reserved)?;

        Ok(Self {
            magic,
            version,
            flags,
            run_id,
            created_at,
            schema_version: (major, minor, patch),
            _reserved: reserved,
        })
    }

    /// Write header to a byte buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        buf.write_u64::<LittleEndian>(self.magic)?;
        buf.write_u32::<LittleEndian>(self.version)?;
        buf.write_u32::<LittleEndian>(self.flags)?;
        buf.write_all(self.run_id.as_bytes())?;
        buf.write_u64::<LittleEndian>(self.created_at)?;
        buf.write_u16::<LittleEndian>(self.schema_version.0)?;
        buf.write_u16::<LittleEndian>(self.schema_version.1)?;
        buf.write_u16::<LittleEndian>(self.schema_version.2)?;
        buf.write_all(&self._reserved)?;

        debug_assert_eq!(buf.len(), HEADER_SIZE);

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let run_id = Uuid::new_v4();
        let header = ContainerHeader::new(run_id);

        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);

        let restored = ContainerHeader::from_bytes(&bytes).unwrap();
        assert_eq!(restored.magic, CONTAINER_MAGIC);
        assert_eq!(restored.version, LOG_FORMAT_VERSION);
        assert_eq!(restored.run_id, run_id);
        assert_eq!(restored.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn header_validation() {
        let header = ContainerHeader::new(Uuid::new_v4());
        assert!(header.validate().is_ok());

        let mut bad_magic = header;
        bad_magic.magic = 0xDEADBEEF;
        assert!(bad_magic.validate().is_err());

        let mut bad_major = header;
        bad_major.schema_version = (SCHEMA_VERSION.0 + 1, 0, 0);
        assert!(bad_major.validate().is_err());

        let mut newer_minor = header;
        newer_minor.schema_version = (SCHEMA_VERSION.0, SCHEMA_VERSION.1 + 1, 0);
        assert!(newer_minor.validate().is_ok());
    }

    #[test]
    fn schema_version_formats_as_semver() {
        let header = ContainerHeader::new(Uuid::new_v4());
        assert_eq!(header.schema_version_string(), "1.0.0");
    }
}
