//! Snapshot of a file at the moment the monitor accepted it.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::constants::BYTES_PER_MB;

/// Immutable record of a discovered file. Created once per path per run.
#[derive(Debug, Clone, PartialEq)]
pub struct FileArrival {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    pub discovered: DateTime<Utc>,
    pub is_interchange: bool,
}

impl FileArrival {
    /// Stat `path` and build an arrival stamped with the current time.
    pub fn capture(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let path = std::path::absolute(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            is_interchange: is_interchange_file(&path),
            name,
            path,
            size_bytes: metadata.len(),
            modified,
            discovered: Utc::now(),
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }
}

/// X12 interchange sniff by name: `.x12`/`.edi`, or a `.txt` whose name
/// mentions X12. Case-insensitive.
pub fn is_interchange_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_default();

    match ext.as_str() {
        "x12" | "edi" => true,
        "txt" => name.contains("X12"),
        _ => false,
    }
}
