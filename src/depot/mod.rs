// src/depot/mod.rs

//! Depot application context
//!
//! [`Depot`] owns the in-memory indices, the event log and the record store,
//! and exposes the operations a front-end invokes:
//! - Bootstrap from the inventory and recipient files
//! - Collection processing (see [`collection`])
//! - Registration and removal of parcels and recipients (see `registry`)
//! - Listings of the inventory, queue, event log and ledger
//!
//! Every operation returns a value or a typed error and writes one line to
//! the event log describing its outcome. Nothing here prints to a console.

pub mod collection;
mod registry;

pub use collection::{CollectionCoordinator, CollectionReceipt, CollectionStage, Divergence};

use crate::charge::ChargeCalculator;
use crate::codec;
use crate::config::{DepotPaths, INVENTORY_HEADER, RECIPIENTS_HEADER};
use crate::error::{Error, Result};
use crate::events::EventLog;
use crate::index::PackageIndex;
use crate::models::{ParcelRecord, RecipientRecord};
use crate::queue::RecipientQueue;
use crate::store::RecordStore;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of bootstrapping from the record files
#[derive(Debug, Default)]
pub struct LoadReport {
    pub parcels: usize,
    pub recipients: usize,
    /// Rows that were not loaded, as `Error::InvalidRecord`
    pub skipped: Vec<Error>,
}

/// The depot's in-memory state and its backing files
#[derive(Debug)]
pub struct Depot {
    paths: DepotPaths,
    index: PackageIndex,
    queue: RecipientQueue,
    events: Arc<EventLog>,
    store: RecordStore,
    calculator: ChargeCalculator,
    next_sequence: u64,
    report: LoadReport,
}

impl Depot {
    /// Create the record files for a new depot
    ///
    /// Inventory and recipient files get their header line. Existing files
    /// are left untouched, so calling this on a live depot is safe.
    pub fn init(paths: &DepotPaths) -> Result<()> {
        debug!("Initializing depot files at: {}", paths.inventory.display());

        for path in [&paths.inventory, &paths.recipients, &paths.ledger, &paths.event_log] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                }
            }
        }

        create_with_header(&paths.inventory, Some(INVENTORY_HEADER))?;
        create_with_header(&paths.recipients, Some(RECIPIENTS_HEADER))?;
        create_with_header(&paths.ledger, None)?;
        create_with_header(&paths.event_log, None)?;

        info!("Depot initialized successfully");
        Ok(())
    }

    /// Open an existing depot, loading inventory then recipients
    pub fn open(paths: DepotPaths) -> Result<Self> {
        let inventory = open_existing(&paths.inventory)?;
        let recipients = open_existing(&paths.recipients)?;
        Self::from_readers(paths, BufReader::new(inventory), BufReader::new(recipients))
    }

    /// Bootstrap from arbitrary line readers. `paths` still decides where
    /// later writes go.
    pub fn from_readers<I, R>(paths: DepotPaths, inventory: I, recipients: R) -> Result<Self>
    where
        I: BufRead,
        R: BufRead,
    {
        let events = Arc::new(EventLog::new(&paths.event_log));
        let mut depot = Self {
            store: RecordStore::new(Arc::clone(&events)),
            events,
            index: PackageIndex::new(),
            queue: RecipientQueue::new(),
            calculator: ChargeCalculator::new(),
            next_sequence: 1,
            report: LoadReport::default(),
            paths,
        };

        let inventory_name = file_label(&depot.paths.inventory);
        let decoded = codec::load_inventory(inventory, &inventory_name)?;
        depot.report.skipped.extend(decoded.skipped);
        for (line, parcel) in decoded.records {
            let id = parcel.id.clone();
            if depot.index.add(parcel) {
                depot.report.parcels += 1;
            } else {
                depot.report.skipped.push(Error::InvalidRecord {
                    file: inventory_name.clone(),
                    line,
                    reason: format!("duplicate identifier {}", id),
                });
            }
        }

        let recipients_name = file_label(&depot.paths.recipients);
        let decoded = codec::load_recipients(recipients, &recipients_name)?;
        depot.report.skipped.extend(decoded.skipped);
        for (_, (surname, package_id)) in decoded.records {
            let sequence = depot.take_sequence();
            depot
                .queue
                .enqueue(RecipientRecord::new(surname, package_id, sequence));
            depot.report.recipients += 1;
        }

        info!(
            "Loaded {} parcel(s) and {} recipient(s), skipped {} record(s)",
            depot.report.parcels,
            depot.report.recipients,
            depot.report.skipped.len()
        );

        Ok(depot)
    }

    pub fn paths(&self) -> &DepotPaths {
        &self.paths
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn parcel(&self, package_id: &str) -> Option<&ParcelRecord> {
        self.index.get(package_id)
    }

    /// Inventory snapshot in insertion order
    pub fn list_inventory(&self) -> Vec<ParcelRecord> {
        self.index.all()
    }

    /// Recipient queue snapshot in FIFO order
    pub fn list_recipients(&self) -> Vec<RecipientRecord> {
        self.queue.snapshot()
    }

    /// Full event log; empty if it cannot be read
    pub fn event_history(&self) -> String {
        self.events.history()
    }

    /// Ledger lines in the order collections completed
    pub fn released_items(&self) -> Result<Vec<String>> {
        self.store.read_lines(&self.paths.ledger)
    }

    /// Count one more storage period against every parcel still waiting.
    /// Returns how many parcels were aged.
    pub fn age_inventory(&mut self) -> usize {
        let mut aged = 0;
        for parcel in self.index.iter_mut().filter(|p| !p.is_collected()) {
            parcel.extend_storage();
            aged += 1;
        }
        self.note(&format!("Storage duration advanced for {} package(s)", aged));
        aged
    }

    /// Process the collection of one parcel by its queued recipient
    pub fn process_collection(&mut self, package_id: &str) -> Result<CollectionReceipt> {
        CollectionCoordinator::new(
            &mut self.index,
            &mut self.queue,
            &self.store,
            &self.events,
            &self.paths,
            &self.calculator,
        )
        .process(package_id)
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Record an outcome. A failed write is already reported through tracing.
    fn note(&self, message: &str) {
        let _ = self.events.record(message);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_existing(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::StoreNotFound(path.display().to_string())
        } else {
            Error::io(path, e)
        }
    })
}

fn create_with_header(path: &Path, header: Option<&str>) -> Result<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            if let Some(header) = header {
                writeln!(file, "{}", header).map_err(|e| Error::io(path, e))?;
            }
            debug!("Created {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_files_with_headers() {
        let dir = tempdir().unwrap();
        let paths = DepotPaths::in_dir(dir.path().join("nested/depot"));

        Depot::init(&paths).unwrap();

        assert_eq!(
            fs::read_to_string(&paths.inventory).unwrap(),
            "identifier,mass,length,width,height\n"
        );
        assert_eq!(
            fs::read_to_string(&paths.recipients).unwrap(),
            "surname,packageIdentifier\n"
        );
        assert_eq!(fs::read_to_string(&paths.ledger).unwrap(), "");
        assert!(paths.event_log.exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempdir().unwrap();
        let paths = DepotPaths::in_dir(dir.path());
        Depot::init(&paths).unwrap();
        fs::write(&paths.inventory, "identifier,mass,length,width,height\nP1,1,1,1,1\n").unwrap();

        Depot::init(&paths).unwrap();

        assert!(fs::read_to_string(&paths.inventory).unwrap().contains("P1,1,1,1,1"));
    }

    #[test]
    fn test_open_missing_depot() {
        let dir = tempdir().unwrap();
        let result = Depot::open(DepotPaths::in_dir(dir.path()));
        assert!(matches!(result.unwrap_err(), Error::StoreNotFound(_)));
    }

    #[test]
    fn test_bootstrap_assigns_sequences_and_reports_skips() {
        let dir = tempdir().unwrap();
        let inventory = "identifier,mass,length,width,height\nP1,1.0,1,1,1\nP1,2.0,2,2,2\nbad,row\n";
        let recipients = "surname,packageIdentifier\nSmith,P1\nJones,P9\n";

        let depot = Depot::from_readers(
            DepotPaths::in_dir(dir.path()),
            Cursor::new(inventory),
            Cursor::new(recipients),
        )
        .unwrap();

        let report = depot.load_report();
        assert_eq!(report.parcels, 1);
        assert_eq!(report.recipients, 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(depot.parcel("P1").unwrap().mass, dec!(1.0));

        let sequences: Vec<u64> = depot.list_recipients().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn test_age_inventory_skips_collected() {
        let dir = tempdir().unwrap();
        let mut depot = Depot::from_readers(
            DepotPaths::in_dir(dir.path()),
            Cursor::new("h\nP1,1,1,1,1\nP2,1,1,1,1\n"),
            Cursor::new("h\n"),
        )
        .unwrap();
        depot.index.get_mut("P2").unwrap().mark_collected(dec!(1)).unwrap();

        assert_eq!(depot.age_inventory(), 1);
        assert_eq!(depot.parcel("P1").unwrap().storage_duration, 1);
        assert_eq!(depot.parcel("P2").unwrap().storage_duration, 0);
        assert!(depot.event_history().contains("Storage duration advanced for 1 package(s)"));
    }

    #[test]
    fn test_released_items_empty_before_any_collection() {
        let dir = tempdir().unwrap();
        let depot = Depot::from_readers(
            DepotPaths::in_dir(dir.path()),
            Cursor::new("h\n"),
            Cursor::new("h\n"),
        )
        .unwrap();
        assert!(depot.released_items().unwrap().is_empty());
    }
}
