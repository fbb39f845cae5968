//! # vecseg Storage
//!
//! Object-storage access for vecseg segments.
//!
//! This crate provides the lowest-level storage abstraction used when a sealed
//! segment materializes field data from remote binlog files. Chunk managers
//! are **opaque byte stores** keyed by path - they do not interpret binlogs,
//! index blobs, or any other vecseg format.
//!
//! ## Design Principles
//!
//! - Chunk managers expose whole-object reads and ranged reads
//! - No knowledge of field types, row layouts, or index formats
//! - Must be `Send + Sync` for concurrent access
//! - Retry and timeout policy belongs to the implementation, never the caller
//!
//! ## Available Chunk Managers
//!
//! - [`InMemoryChunkManager`] - For testing and ephemeral storage
//! - [`LocalChunkManager`] - For objects stored under a local root directory
//!
//! ## Example
//!
//! ```rust
//! use vecseg_storage::{ChunkManager, InMemoryChunkManager};
//!
//! let cm = InMemoryChunkManager::new();
//! cm.write("binlog/100/0", b"hello world").unwrap();
//! let data = cm.read_at("binlog/100/0", 6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chunk_manager;
mod error;
mod local;
mod memory;

pub use chunk_manager::ChunkManager;
pub use error::{StorageError, StorageResult};
pub use local::LocalChunkManager;
pub use memory::InMemoryChunkManager;
