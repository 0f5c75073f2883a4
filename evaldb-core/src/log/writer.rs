//! Record log writer.

use super::header::{ContainerHeader, HEADER_SIZE};
use super::record::LogRecord;
use crate::error::{Result, StorageError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only writer for a container's record log.
///
/// Holds an exclusive lock on the file for its whole lifetime.
pub struct LogWriter {
    /// Buffered container file.
    file: BufWriter<File>,
    /// Path to the container file.
    path: PathBuf,
    /// Byte offset of the end of the log.
    position: u64,
    /// Whether `flush()` also syncs file data.
    sync_on_flush: bool,
    /// Records appended through this writer.
    record_count: u64,
}

impl LogWriter {
    /// Create a fresh container file, discarding any existing content.
    pub fn create(
        path: &Path,
        header: &ContainerHeader,
        buffer_size: usize,
        sync_on_flush: bool,
    ) -> Result<Self> {
        let create_err = |cause: String| StorageError::CreateFailure {
            path: path.to_path_buf(),
            cause,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| create_err(format!("Failed to create directory: {}", e)))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| create_err(format!("Failed to open file: {}", e)))?;

        // Lock before truncating so a container in use by another run survives
        file.try_lock_exclusive()
            .map_err(|e| create_err(format!("Failed to lock file: {}", e)))?;

        file.set_len(0)
            .map_err(|e| create_err(format!("Failed to truncate file: {}", e)))?;

        let mut writer = Self {
            file: BufWriter::with_capacity(buffer_size, file),
            path: path.to_path_buf(),
            position: 0,
            sync_on_flush,
            record_count: 0,
        };

        let bytes = header.to_bytes().map_err(|e| create_err(e.to_string()))?;
        writer
            .file
            .write_all(&bytes)
            .map_err(|e| create_err(format!("Failed to write header: {}", e)))?;
        writer.position = HEADER_SIZE as u64;

        Ok(writer)
    }

    /// Open an existing container to continue its log at `valid_end`.
    ///
    /// Any bytes past `valid_end` (a torn tail) are cut off.
    pub fn open_append(
        path: &Path,
        valid_end: u64,
        buffer_size: usize,
        sync_on_flush: bool,
    ) -> Result<Self> {
        let open_err = |cause: String| StorageError::OpenFailure {
            path: path.to_path_buf(),
            cause,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| open_err(format!("Failed to open file: {}", e)))?;

        file.try_lock_exclusive()
            .map_err(|e| open_err(format!("Failed to lock file: {}", e)))?;

        let len = file.metadata().map(|m| m.len()).unwrap_or(valid_end);
        if len > valid_end {
            file.set_len(valid_end)
                .map_err(|e| open_err(format!("Failed to truncate torn tail: {}", e)))?;
        }

        file.seek(SeekFrom::Start(valid_end))
            .map_err(|e| open_err(format!("Failed to seek to {}: {}", valid_end, e)))?;

        Ok(Self {
            file: BufWriter::with_capacity(buffer_size, file),
            path: path.to_path_buf(),
            position: valid_end,
            sync_on_flush,
            record_count: 0,
        })
    }

    /// Append a record to the log.
    ///
    /// Records are buffered; call [`LogWriter::flush`] to make them durable.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let bytes = record.to_bytes().map_err(|e| StorageError::Io {
            path: self.path.clone(),
            cause: format!("Failed to encode record for {}: {}", record.path(), e),
        })?;

        self.file.write_all(&bytes).map_err(|e| StorageError::Io {
            path: self.path.clone(),
            cause: e.to_string(),
        })?;

        self.position += bytes.len() as u64;
        self.record_count += 1;
        Ok(())
    }

    /// Flush buffered records, syncing to disk if configured.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush().map_err(|e| StorageError::Io {
            path: self.path.clone(),
            cause: e.to_string(),
        })?;
        if self.sync_on_flush {
            self.file
                .get_ref()
                .sync_data()
                .map_err(|e| StorageError::Io {
                    path: self.path.clone(),
                    cause: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Path to the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the end of the log.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of records appended through this writer.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
        let _ = fs2::FileExt::unlock(self.file.get_ref());
    }
}
