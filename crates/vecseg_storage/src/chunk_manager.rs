//! Chunk manager trait definition.

use crate::error::StorageResult;

/// Path-addressed access to immutable objects in (remote) storage.
///
/// Chunk managers are **opaque byte stores**. Segments use them to read
/// binlog files and index blobs; the chunk manager never interprets what it
/// returns. Any backend satisfying this contract is interchangeable.
///
/// # Invariants
///
/// - `read` returns the full object previously written at `path`
/// - `read_at` returns exactly `len` bytes starting at `offset`, or fails
/// - reads never observe a partially written object
/// - implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryChunkManager`] - For testing
/// - [`super::LocalChunkManager`] - For objects under a local directory
pub trait ChunkManager: Send + Sync {
    /// Reads the whole object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or an I/O error occurs.
    fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Reads `len` bytes of the object at `path` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The object does not exist
    /// - The read would extend beyond the object size
    /// - An I/O error occurs
    fn read_at(&self, path: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` as the object at `path`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be stored.
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Returns whether an object exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Returns the size in bytes of the object at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist.
    fn size(&self, path: &str) -> StorageResult<u64>;

    /// Removes the object at `path`. Removing a missing object is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove(&self, path: &str) -> StorageResult<()>;
}
