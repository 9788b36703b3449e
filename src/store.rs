// src/store.rs

//! Durable-update primitives for the flat record files
//!
//! The files have no transactional support, so every change is either a
//! single appended line or a whole-file rewrite:
//! 1. Copy the lines to keep into a temporary file in the same directory
//! 2. Flush and fsync the temporary file
//! 3. Rename it over the original (atomic on POSIX)
//!
//! Any failure before the rename leaves the original untouched and the
//! temporary file is discarded.

use crate::error::{Error, Result};
use crate::events::EventLog;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Appends and filtered rewrites against the depot's record files
#[derive(Debug, Clone)]
pub struct RecordStore {
    events: Arc<EventLog>,
}

impl RecordStore {
    pub fn new(events: Arc<EventLog>) -> Self {
        Self { events }
    }

    /// Append one line plus terminator, creating the file if needed
    pub fn append(&self, path: &Path, line: &str) -> Result<()> {
        debug!("Appending to {}: {}", path.display(), line);

        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", line)?;
            file.flush()
        };

        write().map_err(|e| self.report_failure(path, e))
    }

    /// Rewrite `path` without the lines for which `exclude` returns true.
    ///
    /// Returns whether at least one line was excluded. When nothing matches
    /// the original file is left as it was.
    pub fn rewrite_excluding<F>(&self, path: &Path, exclude: F) -> Result<bool>
    where
        F: FnMut(&str) -> bool,
    {
        self.rewrite(path, 0, exclude)
    }

    /// Like [`rewrite_excluding`](Self::rewrite_excluding), but the header
    /// line is always kept and never offered to `exclude`.
    pub fn rewrite_records_excluding<F>(&self, path: &Path, exclude: F) -> Result<bool>
    where
        F: FnMut(&str) -> bool,
    {
        self.rewrite(path, 1, exclude)
    }

    fn rewrite<F>(&self, path: &Path, keep_leading: usize, mut exclude: F) -> Result<bool>
    where
        F: FnMut(&str) -> bool,
    {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut rewrite = || -> std::io::Result<bool> {
            let original = File::open(path)?;
            let permissions = original.metadata()?.permissions();
            let reader = BufReader::new(original);
            let temp = NamedTempFile::new_in(dir)?;
            let mut writer = BufWriter::new(temp);
            let mut excluded = 0usize;

            for (idx, line) in reader.lines().enumerate() {
                let line = line?;
                if idx >= keep_leading && exclude(&line) {
                    excluded += 1;
                    continue;
                }
                writeln!(writer, "{}", line)?;
            }

            if excluded == 0 {
                // Dropping the temp file deletes it
                return Ok(false);
            }

            let temp = writer.into_inner().map_err(|e| e.into_error())?;
            // Temp files are created owner-only; keep the original's mode
            temp.as_file().set_permissions(permissions)?;
            temp.as_file().sync_all()?;
            temp.persist(path).map_err(|e| e.error)?;

            debug!("Rewrote {} excluding {} line(s)", path.display(), excluded);
            Ok(true)
        };

        rewrite().map_err(|e| self.report_failure(path, e))
    }

    /// Every line of a file; a missing file reads as empty
    pub fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(path, e)),
        };

        BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| Error::io(path, e))
    }

    fn report_failure(&self, path: &Path, e: std::io::Error) -> Error {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        warn!("Failed to update {}: {}", path.display(), e);
        // Already reported through tracing if the event log is unwritable too
        let _ = self
            .events
            .record(&format!("Failed to update {}: {}", name, e));

        Error::io(path, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn setup() -> (TempDir, RecordStore) {
        let dir = tempdir().unwrap();
        let events = Arc::new(EventLog::new(dir.path().join("events.log")));
        (dir, RecordStore::new(events))
    }

    #[test]
    fn test_append_creates_and_extends() {
        let (dir, store) = setup();
        let path = dir.path().join("released.csv");

        store.append(&path, "a,1").unwrap();
        store.append(&path, "b,2").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a,1\nb,2\n");
    }

    #[test]
    fn test_rewrite_excludes_matching_lines() {
        let (dir, store) = setup();
        let path = dir.path().join("Recipients.csv");
        fs::write(&path, "surname,packageIdentifier\nSmith,P1\nJones,P2\n").unwrap();

        let removed = store
            .rewrite_excluding(&path, |line| line == "Smith,P1")
            .unwrap();

        assert!(removed);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "surname,packageIdentifier\nJones,P2\n"
        );
    }

    #[test]
    fn test_rewrite_without_match_leaves_file() {
        let (dir, store) = setup();
        let path = dir.path().join("Inventory.csv");
        // No trailing newline: an untouched file keeps it that way
        fs::write(&path, "identifier,mass\nP1,2.0").unwrap();

        let removed = store.rewrite_excluding(&path, |_| false).unwrap();

        assert!(!removed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "identifier,mass\nP1,2.0");
    }

    #[test]
    fn test_rewrite_leaves_no_temp_files() {
        let (dir, store) = setup();
        let path = dir.path().join("Inventory.csv");
        fs::write(&path, "h\nP1\nP2\n").unwrap();

        store.rewrite_excluding(&path, |l| l == "P1").unwrap();
        store.rewrite_excluding(&path, |l| l == "nothing").unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Inventory.csv"]);
    }

    #[test]
    fn test_rewrite_missing_file_is_reported() {
        let (dir, store) = setup();
        let path = dir.path().join("Recipients.csv");

        let err = store.rewrite_excluding(&path, |_| true).unwrap_err();
        assert!(err.is_io());

        let log = fs::read_to_string(dir.path().join("events.log")).unwrap();
        assert!(log.contains("Failed to update Recipients.csv"));
    }

    #[test]
    fn test_record_rewrite_keeps_header() {
        let (dir, store) = setup();
        let path = dir.path().join("Inventory.csv");
        fs::write(&path, "identifier,mass\nidentifier,1\nP2,1\n").unwrap();

        let removed = store
            .rewrite_records_excluding(&path, |line| line.starts_with("identifier,"))
            .unwrap();

        assert!(removed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "identifier,mass\nP2,1\n");
    }

    #[test]
    fn test_record_rewrite_header_only_is_untouched() {
        let (dir, store) = setup();
        let path = dir.path().join("Recipients.csv");
        fs::write(&path, "surname,packageIdentifier\n").unwrap();

        assert!(!store.rewrite_records_excluding(&path, |_| true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "surname,packageIdentifier\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = setup();
        let path = dir.path().join("Recipients.csv");
        fs::write(&path, "surname,packageIdentifier\nSmith,P1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store
            .rewrite_records_excluding(&path, |line| line == "Smith,P1")
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_read_lines() {
        let (dir, store) = setup();
        let path = dir.path().join("released.csv");
        assert!(store.read_lines(&path).unwrap().is_empty());

        fs::write(&path, "x\r\ny\n").unwrap();
        assert_eq!(store.read_lines(&path).unwrap(), vec!["x", "y"]);
    }
}
