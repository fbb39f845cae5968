//! CLI command implementations.

pub mod inspect_binlog;
pub mod inspect_trie;

use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use vecseg_storage::{ChunkManager, LocalChunkManager};

/// Prints a report as pretty JSON or through its `Display` impl.
pub fn print<T: Serialize + Display>(report: &T, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => println!("{report}"),
    }
    Ok(())
}

/// Opens a chunk manager over the file's directory and returns it with the
/// file's object path.
pub fn open_file(path: &Path) -> Result<(LocalChunkManager, String), Box<dyn std::error::Error>> {
    let full = fs::canonicalize(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let dir = full
        .parent()
        .ok_or_else(|| format!("{} has no parent directory", full.display()))?;
    let name = full
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{} is not a valid object name", full.display()))?
        .to_string();
    Ok((LocalChunkManager::open(dir)?, name))
}

/// Reads a whole file through a local chunk manager.
pub fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (chunk_manager, name) = open_file(path)?;
    Ok(chunk_manager.read(&name)?)
}
