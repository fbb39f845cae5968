//! A chunk manager with scripted responses.
//!
//! Fill routines read single rows out of binlogs, and most of their error
//! handling is about what the store hands back. [`MockChunkManager`] plays
//! one [`MockMode`] for every read so each outcome can be reached without
//! crafting files.

use std::sync::atomic::{AtomicUsize, Ordering};
use vecseg_codec::{encode_strings, Endian};
use vecseg_storage::{ChunkManager, StorageError, StorageResult};

/// What a [`MockChunkManager`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// `read_at` returns `len` bytes of a repeating pattern; `read` fails.
    ReadAt,
    /// `read_at` fails.
    ReadAtErr,
    /// `read_at` succeeds with no bytes.
    ReadAtEmptyContent,
    /// Reads see a bool column whose row `offset` is `true` and every
    /// other row `false`.
    ReadBool(i64),
    /// Every read fails.
    ReadErr,
    /// Reads see bytes that are not legal bools.
    ReadIllegalBool,
    /// `read` returns a string column whose row `offset` is
    /// [`mock_string`]`(offset)`.
    ReadString(i64),
    /// `read` returns a string frame with invalid UTF-8.
    ReadIllegalString,
}

/// Byte pattern served by [`MockMode::ReadAt`].
pub const MOCK_BYTE: u8 = 0x01;

/// The string [`MockMode::ReadString`] places at `row`.
pub fn mock_string(row: i64) -> String {
    format!("row-{row}")
}

/// A read-only chunk manager that answers per its [`MockMode`].
#[derive(Debug)]
pub struct MockChunkManager {
    mode: MockMode,
    endian: Endian,
    reads: AtomicUsize,
}

impl MockChunkManager {
    /// Creates a little-endian mock.
    pub fn new(mode: MockMode) -> Self {
        Self::with_endian(mode, Endian::Little)
    }

    /// Creates a mock encoding strings in `endian`.
    pub fn with_endian(mode: MockMode, endian: Endian) -> Self {
        Self {
            mode,
            endian,
            reads: AtomicUsize::new(0),
        }
    }

    /// The scripted mode.
    pub fn mode(&self) -> MockMode {
        self.mode
    }

    /// Number of `read` and `read_at` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn scripted_failure(path: &str) -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("mock read failure for {path}"),
        ))
    }

    fn bool_column(offset: i64) -> Vec<u8> {
        let rows = usize::try_from(offset).map_or(1, |o| o + 1);
        let mut column = vec![0u8; rows];
        if let Some(last) = column.last_mut() {
            *last = 1;
        }
        column
    }

    fn string_column(&self, offset: i64) -> Vec<u8> {
        let values: Vec<String> = (0..=offset.max(0)).map(mock_string).collect();
        encode_strings(&values, self.endian)
    }

    fn illegal_string(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.endian.put_u32(&mut bytes, 2);
        bytes.extend_from_slice(&[0xC3, 0x28]);
        bytes
    }

    fn whole(&self, path: &str) -> StorageResult<Vec<u8>> {
        match self.mode {
            MockMode::ReadBool(offset) => Ok(Self::bool_column(offset)),
            MockMode::ReadIllegalBool => Ok(vec![2; 64]),
            MockMode::ReadString(offset) => Ok(self.string_column(offset)),
            MockMode::ReadIllegalString => Ok(self.illegal_string()),
            MockMode::ReadAt
            | MockMode::ReadAtErr
            | MockMode::ReadAtEmptyContent
            | MockMode::ReadErr => Err(Self::scripted_failure(path)),
        }
    }
}

impl ChunkManager for MockChunkManager {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.whole(path)
    }

    fn read_at(&self, path: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.mode {
            MockMode::ReadAt => Ok(vec![MOCK_BYTE; len]),
            MockMode::ReadAtEmptyContent => Ok(Vec::new()),
            MockMode::ReadAtErr | MockMode::ReadErr => Err(Self::scripted_failure(path)),
            MockMode::ReadBool(_)
            | MockMode::ReadIllegalBool
            | MockMode::ReadString(_)
            | MockMode::ReadIllegalString => {
                let data = self.whole(path)?;
                let start = usize::try_from(offset).unwrap_or(usize::MAX);
                data.get(start..start.saturating_add(len))
                    .map(<[u8]>::to_vec)
                    .ok_or(StorageError::ReadPastEnd {
                        path: path.to_string(),
                        offset,
                        len,
                        size: data.len() as u64,
                    })
            }
        }
    }

    fn write(&self, path: &str, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::invalid_path(path))
    }

    fn exists(&self, _path: &str) -> StorageResult<bool> {
        Ok(true)
    }

    fn size(&self, path: &str) -> StorageResult<u64> {
        self.whole(path).map(|d| d.len() as u64)
    }

    fn remove(&self, path: &str) -> StorageResult<()> {
        Err(StorageError::invalid_path(path))
    }
}
