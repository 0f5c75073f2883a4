//! Append-only record log backing a container file.
//!
//! A container file is a fixed-size [`ContainerHeader`] followed by a
//! sequence of CRC-framed [`LogRecord`]s. Every mutation of the container
//! tree is one record; replaying the records rebuilds the tree.
//!
//! ```text
//! [header: 128 bytes][len u32][crc32 u32][type u8][payload]...
//! ```

mod header;
mod reader;
mod record;
mod writer;

pub use header::{CONTAINER_MAGIC, ContainerHeader, HEADER_SIZE, LOG_FORMAT_VERSION, SCHEMA_VERSION};
pub use reader::{LogReader, Replay};
pub use record::{LogRecord, MIN_RECORD_SIZE, RecordType};
pub use writer::LogWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, Datum, ObjectPath, ScalarType};
    use std::io::Write;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn sample_records() -> Vec<LogRecord> {
        vec![
            LogRecord::CreateGroup {
                path: ObjectPath::new("/models"),
            },
            LogRecord::CreateDataset {
                path: ObjectPath::new("/models/x"),
                dtype: DataType::Scalar(ScalarType::F64),
                dims: vec![0],
                extensible: true,
                chunk_rows: 5000,
                fill: Datum::Real(f64::NAN),
            },
            LogRecord::Extend {
                path: ObjectPath::new("/models/x"),
                extent: 1,
            },
        ]
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.edb");
        let header = ContainerHeader::new(Uuid::new_v4());

        {
            let mut writer = LogWriter::create(&path, &header, 4096, true).unwrap();
            for record in sample_records() {
                writer.append(&record).unwrap();
            }
            writer.flush().unwrap();
            assert_eq!(writer.record_count(), 3);
        }

        let replay = LogReader::read(&path).unwrap();
        assert_eq!(replay.header.run_id, header.run_id);
        assert_eq!(replay.records.len(), 3);
        assert!(replay.torn_tail.is_none());
        assert_eq!(replay.records[0].0, HEADER_SIZE as u64);
        assert_eq!(replay.records[2].1.record_type(), RecordType::Extend);
    }

    #[test]
    fn torn_tail_is_reported_and_cut_on_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("torn.edb");
        let header = ContainerHeader::new(Uuid::new_v4());

        {
            let mut writer = LogWriter::create(&path, &header, 4096, false).unwrap();
            for record in sample_records() {
                writer.append(&record).unwrap();
            }
            writer.flush().unwrap();
        }

        // Simulate a crash in the middle of writing a record
        let clean_len = std::fs::metadata(&path).unwrap().len();
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[64, 0, 0, 0, 1, 2]).unwrap();
        }

        let replay = LogReader::read(&path).unwrap();
        assert_eq!(replay.records.len(), 3);
        assert!(replay.torn_tail.is_some());
        assert_eq!(replay.valid_end, clean_len);

        {
            let mut writer = LogWriter::open_append(&path, replay.valid_end, 4096, false).unwrap();
            writer
                .append(&LogRecord::CreateGroup {
                    path: ObjectPath::new("/methods"),
                })
                .unwrap();
            writer.flush().unwrap();
        }

        let replay = LogReader::read(&path).unwrap();
        assert_eq!(replay.records.len(), 4);
        assert!(replay.torn_tail.is_none());
    }

    #[test]
    fn bad_magic_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.edb");
        std::fs::write(&path, vec![0u8; HEADER_SIZE + 4]).unwrap();

        let err = LogReader::read(&path).unwrap_err();
        assert_eq!(err.code(), "E001");
    }
}
