// src/config.rs

//! Backing file locations
//!
//! A depot is a directory holding four flat files. There is no separate
//! configuration file; callers point the depot at a directory and may
//! override individual paths.

use std::path::{Path, PathBuf};

/// Parcel inventory, one parcel per line after the header
pub const INVENTORY_FILE: &str = "Inventory.csv";

/// Recipient queue, one recipient per line after the header
pub const RECIPIENTS_FILE: &str = "Recipients.csv";

/// Append-only ledger of completed collections
pub const LEDGER_FILE: &str = "released.csv";

/// Append-only operator audit trail
pub const EVENT_LOG_FILE: &str = "depot_events.log";

/// Header written to a fresh inventory file
pub const INVENTORY_HEADER: &str = "identifier,mass,length,width,height";

/// Header written to a fresh recipient file
pub const RECIPIENTS_HEADER: &str = "surname,packageIdentifier";

/// Paths of the four backing files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotPaths {
    pub inventory: PathBuf,
    pub recipients: PathBuf,
    pub ledger: PathBuf,
    pub event_log: PathBuf,
}

impl DepotPaths {
    /// Standard file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            inventory: dir.join(INVENTORY_FILE),
            recipients: dir.join(RECIPIENTS_FILE),
            ledger: dir.join(LEDGER_FILE),
            event_log: dir.join(EVENT_LOG_FILE),
        }
    }

    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory = path.into();
        self
    }

    pub fn with_recipients(mut self, path: impl Into<PathBuf>) -> Self {
        self.recipients = path.into();
        self
    }

    pub fn with_ledger(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger = path.into();
        self
    }

    pub fn with_event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.event_log = path.into();
        self
    }
}

impl Default for DepotPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}
