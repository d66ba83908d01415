//! Folder listing for the window pollers.

use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file seen during a scan. Cheap to produce; not yet an arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// List regular files directly inside `folder` whose names match `pattern`,
/// newest modification first.
///
/// A missing folder yields an empty list. Entries that vanish mid-listing
/// are skipped.
pub fn list_matching(folder: &Path, pattern: &str) -> io::Result<Vec<ScannedFile>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }

    let pattern =
        Pattern::new(pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.matches_with(&name, MATCH_OPTIONS) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                debug!("Skipping {name}: {e}");
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(t) => DateTime::<Utc>::from(t),
            Err(e) => {
                debug!("Skipping {name}: no modification time ({e})");
                continue;
            }
        };

        files.push(ScannedFile {
            path: entry.path(),
            name,
            size_bytes: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn touch(path: &Path, age: Duration) {
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_missing_folder_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let files = list_matching(&temp.path().join("absent"), "*.txt").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_filters_and_sorts_newest_first() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("old.txt"), Duration::from_secs(600));
        touch(&temp.path().join("NEW.TXT"), Duration::from_secs(5));
        touch(&temp.path().join("mid.txt"), Duration::from_secs(60));
        touch(&temp.path().join("skip.csv"), Duration::from_secs(1));
        std::fs::create_dir(temp.path().join("dir.txt")).unwrap();

        let names: Vec<_> = list_matching(temp.path(), "*.txt")
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        assert_eq!(names, vec!["NEW.TXT", "mid.txt", "old.txt"]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(list_matching(temp.path(), "[").is_err());
    }
}
