//! Record log reader for replay on open.

use super::header::{ContainerHeader, HEADER_SIZE};
use super::record::{LogRecord, MIN_RECORD_SIZE};
use crate::error::{Result, StorageError};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Everything recovered from an existing container file.
#[derive(Debug)]
pub struct Replay {
    /// The container header.
    pub header: ContainerHeader,
    /// Complete records in log order, with the byte offset of each.
    pub records: Vec<(u64, LogRecord)>,
    /// Byte offset just past the last complete record.
    pub valid_end: u64,
    /// Why reading stopped early, if the log has a torn or corrupt tail.
    pub torn_tail: Option<String>,
}

/// Reads a container's record log.
pub struct LogReader;

impl LogReader {
    /// Read the header and every complete record of a container file.
    ///
    /// Reading stops at the first truncated or CRC-mismatched record; the
    /// offset of that record is reported as `valid_end`.
    pub fn read(path: &Path) -> Result<Replay> {
        let open_err = |cause: String| StorageError::OpenFailure {
            path: path.to_path_buf(),
            cause,
        };

        let file = File::open(path).map_err(|e| open_err(format!("Failed to open file: {}", e)))?;
        let mut reader = BufReader::new(file);

        let mut header_bytes = vec![0u8; HEADER_SIZE];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| open_err(format!("Failed to read header: {}", e)))?;
        let header = ContainerHeader::from_bytes(&header_bytes)
            .map_err(|e| open_err(format!("Failed to parse header: {}", e)))?;
        header
            .validate()
            .map_err(|e| open_err(format!("Invalid header: {}", e)))?;

        let mut rest = Vec::new();
        reader
            .read_to_end(&mut rest)
            .map_err(|e| open_err(format!("Failed to read record log: {}", e)))?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut torn_tail = None;

        while offset < rest.len() {
            let position = (HEADER_SIZE + offset) as u64;
            let remaining = &rest[offset..];

            if remaining.len() < MIN_RECORD_SIZE {
                torn_tail = Some(format!(
                    "{} trailing bytes at {} are shorter than a record frame",
                    remaining.len(),
                    position
                ));
                break;
            }

            let length = LittleEndian::read_u32(remaining) as usize;
            if length < MIN_RECORD_SIZE || length > remaining.len() {
                torn_tail = Some(format!(
                    "Record at {} declares {} bytes, {} available",
                    position,
                    length,
                    remaining.len()
                ));
                break;
            }

            match LogRecord::from_bytes(&remaining[..length]) {
                Ok(record) => records.push((position, record)),
                Err(e) => {
                    torn_tail = Some(format!("Corrupted record at {}: {}", position, e));
                    break;
                }
            }

            offset += length;
        }

        if let Some(reason) = &torn_tail {
            tracing::warn!(
                path = %path.display(),
                valid_records = records.len(),
                "Discarding torn container tail: {}",
                reason
            );
        }

        Ok(Replay {
            header,
            records,
            valid_end: (HEADER_SIZE + offset) as u64,
            torn_tail,
        })
    }
}
