//! Chunk manager over a local directory.

use crate::chunk_manager::ChunkManager;
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A chunk manager storing each object as a file under a root directory.
///
/// Object paths are interpreted relative to the root. Absolute paths and
/// paths containing `..` are rejected so an object can never escape the root.
///
/// # Durability
///
/// `write` stages the object in a sibling temporary file, syncs it and then
/// renames it into place, so readers never observe a partially written
/// object.
///
/// # Example
///
/// ```no_run
/// use vecseg_storage::{ChunkManager, LocalChunkManager};
/// use std::path::Path;
///
/// let cm = LocalChunkManager::open(Path::new("/var/lib/vecseg")).unwrap();
/// cm.write("insert_log/1/100/0", b"binlog bytes").unwrap();
/// ```
#[derive(Debug)]
pub struct LocalChunkManager {
    root: PathBuf,
}

impl LocalChunkManager {
    /// Opens a chunk manager rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path);
        let acceptable = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !acceptable {
            return Err(StorageError::invalid_path(path));
        }
        Ok(self.root.join(relative))
    }

    fn open_existing(&self, path: &str) -> StorageResult<File> {
        let full = self.resolve(path)?;
        File::open(&full).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::not_found(path),
            _ => StorageError::Io(e),
        })
    }
}

impl ChunkManager for LocalChunkManager {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let mut file = self.open_existing(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn read_at(&self, path: &str, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut file = self.open_existing(path)?;
        let size = file.metadata()?.len();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd {
                path: path.to_string(),
                offset,
                len,
                size,
            });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut staging = full.clone().into_os_string();
        staging.push(".partial");
        let staging = PathBuf::from(staging);
        {
            let mut file = File::create(&staging)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &full)?;
        debug!(path, bytes = data.len(), "wrote object");
        Ok(())
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }

    fn size(&self, path: &str) -> StorageResult<u64> {
        let file = self.open_existing(path)?;
        Ok(file.metadata()?.len())
    }

    fn remove(&self, path: &str) -> StorageResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
