// src/events.rs

//! Operator audit trail
//!
//! Every depot operation writes one line to `depot_events.log` in the form
//! `yyyy/MM/dd HH:mm:ss | message`. The log is never cached in memory:
//! [`EventLog::history`] always re-reads the file.

use crate::error::{Error, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Timestamp layout for log lines
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Separator between timestamp and message
pub const SEPARATOR: &str = " | ";

/// Append-only event log backed by a single file
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a timestamped line and flush it before returning
    pub fn record(&self, message: &str) -> Result<()> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let line = format!("{}{}{}\n", timestamp, SEPARATOR, message);

        info!(target: "depot::events", "{}", message);

        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            file.write_all(line.as_bytes())?;
            file.flush()
        };

        write().map_err(|e| {
            error!("Failed to write event to {}: {}", self.path.display(), e);
            Error::io(&self.path, e)
        })
    }

    /// Full log contents. Read failures yield an empty string.
    pub fn history(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No event log at {} yet", self.path.display());
                String::new()
            }
            Err(e) => {
                error!("Failed to retrieve event log {}: {}", self.path.display(), e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::tempdir;

    #[test]
    fn test_record_appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.log"));

        log.record("first").unwrap();
        log.record("second").unwrap();

        let history = log.history();
        let lines: Vec<&str> = history.lines().collect();
        assert_eq!(lines.len(), 2);

        for (line, expected) in lines.iter().zip(["first", "second"]) {
            let (stamp, message) = line.split_once(SEPARATOR).unwrap();
            assert!(NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
            assert_eq!(message, expected);
        }
    }

    #[test]
    fn test_history_rereads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let log = EventLog::new(&path);

        log.record("one").unwrap();
        fs::write(&path, "edited externally\n").unwrap();

        assert_eq!(log.history(), "edited externally\n");
    }

    #[test]
    fn test_history_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("absent.log"));
        assert_eq!(log.history(), "");
    }

    #[test]
    fn test_unreadable_log_does_not_fail() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file
        let log = EventLog::new(dir.path());
        assert_eq!(log.history(), "");
    }

    #[test]
    fn test_record_failure_is_io_error() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("missing-dir").join("events.log"));
        let err = log.record("lost").unwrap_err();
        assert!(err.is_io());
    }
}
