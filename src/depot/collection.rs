// src/depot/collection.rs

//! Collection processing
//!
//! A collection moves through `Requested -> Validated -> Charged ->
//! Persisted -> Finalized`. It stops at `Rejected` during validation, or at
//! `Aborted` when the ledger append fails.
//!
//! The ledger append is the commit point. Before it, any failure leaves
//! memory and disk exactly as they were and the request can be retried.
//! After it, the parcel counts as collected: the recipient and inventory
//! files are rewritten and then memory is updated. A rewrite that fails at that
//! point cannot be undone, so it is returned as a [`Divergence`] and logged
//! with a `DIVERGENCE` prefix for manual reconciliation.

use crate::charge::{ChargeCalculator, format_charge};
use crate::codec::{encode_ledger, inventory_line_matches, recipient_line_matches};
use crate::config::DepotPaths;
use crate::error::{Error, Result};
use crate::events::EventLog;
use crate::index::PackageIndex;
use crate::models::{ParcelRecord, RecipientRecord};
use crate::queue::RecipientQueue;
use crate::store::RecordStore;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Progress of a single collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectionStage {
    Requested,
    Validated,
    Charged,
    Persisted,
    Finalized,
    Rejected,
    /// The ledger append failed; nothing was changed
    Aborted,
}

impl CollectionStage {
    pub fn as_str(&self) -> &str {
        match self {
            CollectionStage::Requested => "requested",
            CollectionStage::Validated => "validated",
            CollectionStage::Charged => "charged",
            CollectionStage::Persisted => "persisted",
            CollectionStage::Finalized => "finalized",
            CollectionStage::Rejected => "rejected",
            CollectionStage::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CollectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backing file left out of step with memory after the commit point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub file: PathBuf,
    pub reason: String,
}

/// Result of a committed collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReceipt {
    pub surname: String,
    pub package_id: String,
    pub charge: Decimal,
    pub ledger_line: String,
    pub stage: CollectionStage,
    pub divergences: Vec<Divergence>,
}

impl CollectionReceipt {
    /// True when every backing file was brought in step
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
    }
}

/// Runs one collection against the depot's indices and files
pub struct CollectionCoordinator<'a> {
    index: &'a mut PackageIndex,
    queue: &'a mut RecipientQueue,
    store: &'a RecordStore,
    events: &'a EventLog,
    paths: &'a DepotPaths,
    calculator: &'a ChargeCalculator,
    stage: CollectionStage,
}

impl<'a> CollectionCoordinator<'a> {
    pub fn new(
        index: &'a mut PackageIndex,
        queue: &'a mut RecipientQueue,
        store: &'a RecordStore,
        events: &'a EventLog,
        paths: &'a DepotPaths,
        calculator: &'a ChargeCalculator,
    ) -> Self {
        Self {
            index,
            queue,
            store,
            events,
            paths,
            calculator,
            stage: CollectionStage::Requested,
        }
    }

    pub fn stage(&self) -> CollectionStage {
        self.stage
    }

    pub fn process(&mut self, package_id: &str) -> Result<CollectionReceipt> {
        let package_id = package_id.trim();
        debug!("Processing collection for package {}", package_id);

        let (parcel, recipient) = match self.validate(package_id) {
            Ok(found) => found,
            Err(e) => {
                self.stage = CollectionStage::Rejected;
                self.note(&format!("Processing failed: {}", rejection_reason(&e, package_id)));
                return Err(e);
            }
        };
        self.stage = CollectionStage::Validated;

        let charge = self.calculator.charge(&parcel);
        self.stage = CollectionStage::Charged;

        // Ledger line describes the parcel as it will be once collected
        let mut collected = parcel;
        collected.mark_collected(charge)?;
        let mut released = recipient;
        released.mark_collected();
        let ledger_line = encode_ledger(&released, &collected, charge);

        if let Err(e) = self.store.append(&self.paths.ledger, &ledger_line) {
            self.stage = CollectionStage::Aborted;
            self.note(&format!(
                "Processing failed: Package {} ledger update failed: {}",
                package_id, e
            ));
            return Err(e);
        }

        // Committed
        let mut divergences = Vec::new();
        let surname = released.surname.clone();
        self.sync_file(
            &self.paths.recipients,
            |line| recipient_line_matches(line, &surname, package_id),
            &mut divergences,
        );
        self.sync_file(
            &self.paths.inventory,
            |line| inventory_line_matches(line, package_id),
            &mut divergences,
        );
        self.stage = CollectionStage::Persisted;

        for d in &divergences {
            error!("Divergence on {}: {}", d.file.display(), d.reason);
            self.note(&format!(
                "DIVERGENCE: Package {} collected by {} but {} was not updated: {}",
                package_id,
                released.surname,
                d.file.display(),
                d.reason
            ));
        }

        if let Some(p) = self.index.get_mut(package_id) {
            p.mark_collected(charge)?;
        }
        if let Some(r) = self.queue.get_mut(released.sequence) {
            r.mark_collected();
        }
        self.queue.remove(released.sequence);
        self.stage = CollectionStage::Finalized;

        self.note(&format!(
            "Collection processed: Recipient {} collected package {}. Charge: {}",
            released.surname,
            package_id,
            format_charge(charge)
        ));

        Ok(CollectionReceipt {
            surname: released.surname,
            package_id: package_id.to_string(),
            charge,
            ledger_line,
            stage: self.stage,
            divergences,
        })
    }

    fn validate(&self, package_id: &str) -> Result<(ParcelRecord, RecipientRecord)> {
        let parcel = self
            .index
            .get(package_id)
            .ok_or_else(|| Error::package_not_found(package_id))?;

        let recipient = self
            .queue
            .find_for_package(package_id)
            .ok_or_else(|| Error::NoRecipient(package_id.to_string()))?;

        if parcel.is_collected() {
            return Err(Error::AlreadyCollected(package_id.to_string()));
        }

        Ok((parcel.clone(), recipient.clone()))
    }

    fn sync_file<F>(&self, path: &Path, exclude: F, divergences: &mut Vec<Divergence>)
    where
        F: FnMut(&str) -> bool,
    {
        let reason = match self.store.rewrite_records_excluding(path, exclude) {
            Ok(true) => return,
            Ok(false) => "no matching record".to_string(),
            Err(e) => e.to_string(),
        };
        divergences.push(Divergence {
            file: path.to_path_buf(),
            reason,
        });
    }

    fn note(&self, message: &str) {
        let _ = self.events.record(message);
    }
}

fn rejection_reason(e: &Error, package_id: &str) -> String {
    match e {
        Error::NotFound(_) => format!("Package {} not found", package_id),
        Error::NoRecipient(_) => format!("No recipient for package {}", package_id),
        Error::AlreadyCollected(_) => format!("Package {} already collected", package_id),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimensions;
    use rust_decimal_macros::dec;
    use std::fs;
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _dir: TempDir,
        paths: DepotPaths,
        index: PackageIndex,
        queue: RecipientQueue,
        events: Arc<EventLog>,
        store: RecordStore,
        calculator: ChargeCalculator,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let paths = DepotPaths::in_dir(dir.path());
            fs::write(
                &paths.inventory,
                "identifier,mass,length,width,height\nP100,2.0,30,20,10\nP200,1.0,5,5,5\n",
            )
            .unwrap();
            fs::write(
                &paths.recipients,
                "surname,packageIdentifier\nSmith,P100\nJones,P200\n",
            )
            .unwrap();

            let mut index = PackageIndex::new();
            index.add(ParcelRecord::new(
                "P100".to_string(),
                dec!(2.0),
                Dimensions::new(dec!(30), dec!(20), dec!(10)),
            ));
            index.add(ParcelRecord::new(
                "P200".to_string(),
                dec!(1.0),
                Dimensions::new(dec!(5), dec!(5), dec!(5)),
            ));

            let mut queue = RecipientQueue::new();
            queue.enqueue(RecipientRecord::new("Smith".to_string(), "P100".to_string(), 1));
            queue.enqueue(RecipientRecord::new("Jones".to_string(), "P200".to_string(), 2));

            let events = Arc::new(EventLog::new(&paths.event_log));
            let store = RecordStore::new(Arc::clone(&events));

            Self {
                _dir: dir,
                paths,
                index,
                queue,
                events,
                store,
                calculator: ChargeCalculator::new(),
            }
        }

        fn process(&mut self, package_id: &str) -> (Result<CollectionReceipt>, CollectionStage) {
            let mut coordinator = CollectionCoordinator::new(
                &mut self.index,
                &mut self.queue,
                &self.store,
                &self.events,
                &self.paths,
                &self.calculator,
            );
            let result = coordinator.process(package_id);
            (result, coordinator.stage())
        }
    }

    #[test]
    fn test_successful_collection_reaches_finalized() {
        let mut fx = Fixture::new();
        let (result, stage) = fx.process("P100");
        let receipt = result.unwrap();

        assert_eq!(stage, CollectionStage::Finalized);
        assert_eq!(receipt.stage, CollectionStage::Finalized);
        assert!(receipt.is_clean());
        assert_eq!(receipt.charge, dec!(14.00));
        assert_eq!(receipt.ledger_line, "Smith,P100,2.0,30x20x10,Collected,£14.00");

        assert!(fx.index.get("P100").unwrap().is_collected());
        assert_eq!(fx.index.get("P100").unwrap().charge, Some(dec!(14.00)));
        assert!(fx.queue.find_for_package("P100").is_none());
        assert_eq!(fx.queue.len(), 1);

        let log = fx.events.history();
        assert!(log.contains("Collection processed: Recipient Smith collected package P100. Charge: £14.00"));
    }

    #[test]
    fn test_rejections_leave_everything_untouched() {
        let mut fx = Fixture::new();
        let inventory_before = fs::read_to_string(&fx.paths.inventory).unwrap();

        let (result, stage) = fx.process("P999");
        assert!(matches!(result.unwrap_err(), Error::NotFound(_)));
        assert_eq!(stage, CollectionStage::Rejected);

        fx.queue.remove(2);
        let (result, _) = fx.process("P200");
        assert!(matches!(result.unwrap_err(), Error::NoRecipient(id) if id == "P200"));

        assert_eq!(fs::read_to_string(&fx.paths.inventory).unwrap(), inventory_before);
        assert!(!fx.paths.ledger.exists());
        assert!(!fx.index.get("P200").unwrap().is_collected());

        let log = fx.events.history();
        assert!(log.contains("Processing failed: Package P999 not found"));
        assert!(log.contains("Processing failed: No recipient for package P200"));
    }

    #[test]
    fn test_already_collected_is_rejected() {
        let mut fx = Fixture::new();
        fx.process("P100").0.unwrap();
        fx.queue
            .enqueue(RecipientRecord::new("Smith".to_string(), "P100".to_string(), 3));

        let (result, stage) = fx.process("P100");
        assert!(matches!(result.unwrap_err(), Error::AlreadyCollected(_)));
        assert_eq!(stage, CollectionStage::Rejected);
        assert_eq!(fx.queue.len(), 2);
    }

    #[test]
    fn test_ledger_failure_is_clean() {
        let mut fx = Fixture::new();
        // A directory where the ledger file should be makes the append fail
        fs::create_dir(&fx.paths.ledger).unwrap();

        let (result, stage) = fx.process("P100");
        assert!(result.unwrap_err().is_io());
        assert_eq!(stage, CollectionStage::Aborted);

        assert!(!fx.index.get("P100").unwrap().is_collected());
        assert_eq!(fx.queue.len(), 2);
        assert!(fs::read_to_string(&fx.paths.recipients).unwrap().contains("Smith,P100"));
    }

    #[test]
    fn test_rewrite_failure_after_commit_is_divergence() {
        let mut fx = Fixture::new();
        fs::remove_file(&fx.paths.recipients).unwrap();

        let (result, _) = fx.process("P100");
        let receipt = result.unwrap();

        assert!(!receipt.is_clean());
        assert_eq!(receipt.divergences.len(), 1);
        assert_eq!(receipt.divergences[0].file, fx.paths.recipients);
        assert!(fx.index.get("P100").unwrap().is_collected());
        assert!(!fs::read_to_string(&fx.paths.inventory).unwrap().contains("P100"));

        let log = fx.events.history();
        assert!(log.contains("DIVERGENCE: Package P100 collected by Smith"));
    }

    #[test]
    fn test_matched_recipient_removed_not_head() {
        let mut fx = Fixture::new();
        let (result, _) = fx.process("P200");
        assert_eq!(result.unwrap().surname, "Jones");

        let remaining = fx.queue.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].surname, "Smith");
        assert_eq!(
            fs::read_to_string(&fx.paths.recipients).unwrap(),
            "surname,packageIdentifier\nSmith,P100\n"
        );
    }
}
