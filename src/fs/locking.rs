//! Advisory-lock helpers for monitored files and report output.
//!
//! Writers that hand files to the monitor are expected to hold an exclusive
//! `fs2` lock while writing; a file is only treated as readable once a shared
//! lock can be taken. Report files are written under an exclusive lock so a
//! concurrent reader never sees a truncated report.
//!
//! Methods are called through `FileExt::` explicitly because newer std
//! versions ship inherent `File` lock methods with different signatures.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// True when `path` can be opened and share-locked for reading right now.
///
/// Any failure (missing, permission denied, exclusively locked) is `false`.
pub fn can_open_for_shared_read(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open {}: {e}", path.display());
            return false;
        }
    };
    match FileExt::try_lock_shared(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            true
        }
        Err(e) => {
            debug!("Shared lock unavailable for {}: {e}", path.display());
            false
        }
    }
}

/// Write file contents with an exclusive (write) lock.
///
/// The sequence is: open → lock → truncate → write → flush.
pub fn locked_write(path: &Path, content: &str) -> io::Result<()> {
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new().write(true).create(true).open(path)?;
    FileExt::lock_exclusive(&file)?;
    // Truncate only once the lock is held
    file.set_len(0)?;
    let mut writer = BufWriter::new(&file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    drop(writer);
    FileExt::unlock(&file)
}
