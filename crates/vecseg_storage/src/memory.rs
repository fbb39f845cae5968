//! In-memory chunk manager for testing.

use crate::chunk_manager::ChunkManager;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory chunk manager.
///
/// Objects live in a path-keyed map and are suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral segments that never touch real object storage
///
/// # Thread Safety
///
/// This chunk manager is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use vecseg_storage::{ChunkManager, InMemoryChunkManager};
///
/// let cm = InMemoryChunkManager::new();
/// cm.write("a", b"test data").unwrap();
/// assert_eq!(cm.size("a").unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryChunkManager {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryChunkManager {
    /// Creates a new empty in-memory chunk manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chunk manager pre-populated with objects.
    #[must_use]
    pub fn with_objects<I, P>(objects: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: Into<String>,
    {
        let objects = objects
            .into_iter()
            .map(|(path, data)| (path.into(), data))
            .collect();
        Self {
            objects: RwLock::new(objects),
        }
    }

    /// Returns all stored paths in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Removes every object.
    pub fn clear(&self) {
        self.objects.write().clear();
    }
}

impl ChunkManager for InMemoryChunkManager {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn read_at(&self, path: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let objects = self.objects.read();
        let data = objects.get(path).ok_or_else(|| StorageError::not_found(path))?;
        let size = data.len() as u64;
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd {
                path: path.to_string(),
                offset,
                len,
                size,
            });
        }

        Ok(data[offset as usize..end as usize].to_vec())
    }

    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        self.objects.write().insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.objects.read().contains_key(path))
    }

    fn size(&self, path: &str) -> StorageResult<u64> {
        self.objects
            .read()
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn remove(&self, path: &str) -> StorageResult<()> {
        self.objects.write().remove(path);
        Ok(())
    }
}
