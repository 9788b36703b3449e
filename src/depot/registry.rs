// src/depot/registry.rs

//! Registration and removal of parcels and recipients
//!
//! Each operation validates first, then writes the backing file, and only
//! mutates memory once the write has succeeded.

use super::Depot;
use crate::codec::{encode_parcel, encode_recipient, inventory_line_matches, recipient_line_matches};
use crate::error::{Error, Result};
use crate::models::{Dimensions, ParcelRecord, RecipientRecord, parse_non_negative};
use tracing::debug;

/// Trim a raw field and reject values that would corrupt a record line
fn clean_field(field: &'static str, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::invalid_field(field, "must not be empty"));
    }
    if value.contains([',', '\n', '\r']) {
        return Err(Error::invalid_field(
            field,
            format!("{:?} must not contain commas or line breaks", value),
        ));
    }
    Ok(value.to_string())
}

impl Depot {
    /// Queue a recipient for an existing, uncollected parcel
    pub fn register_recipient(&mut self, surname: &str, package_id: &str) -> Result<RecipientRecord> {
        let surname = clean_field("surname", surname)?;
        let package_id = clean_field("package identifier", package_id)?;

        let rejection = match self.index.get(&package_id) {
            None => Some(Error::package_not_found(&package_id)),
            Some(p) if p.is_collected() => Some(Error::AlreadyCollected(package_id.clone())),
            Some(_) if self.queue.find(&surname, &package_id).is_some() => {
                Some(Error::DuplicateIdentifier(format!(
                    "{} is already queued for package {}",
                    surname, package_id
                )))
            }
            Some(_) => None,
        };
        if let Some(e) = rejection {
            self.note(&format!("Registration failed: {} - {}", surname, e));
            return Err(e);
        }

        let line = encode_recipient(&surname, &package_id);
        if let Err(e) = self.store.append(&self.paths.recipients, &line) {
            self.note(&format!("Failed to register recipient {}: {}", surname, e));
            return Err(e);
        }

        let sequence = self.take_sequence();
        let recipient = RecipientRecord::new(surname, package_id, sequence);
        self.queue.enqueue(recipient.clone());

        debug!("Queued {} at sequence {}", recipient.surname, sequence);
        self.note(&format!(
            "New recipient registered: {} for package: {}",
            recipient.surname, recipient.package_id
        ));
        Ok(recipient)
    }

    /// Add a parcel from raw field values
    ///
    /// `mass` is a non-negative decimal; `dimensions` holds three components
    /// separated by `x`, whitespace or commas.
    pub fn register_parcel(
        &mut self,
        package_id: &str,
        mass: &str,
        dimensions: &str,
    ) -> Result<ParcelRecord> {
        let parsed = clean_field("package identifier", package_id).and_then(|id| {
            let mass = parse_non_negative("mass", mass)?;
            let dimensions = dimensions.parse::<Dimensions>()?;
            Ok(ParcelRecord::new(id, mass, dimensions))
        });

        let parcel = match parsed {
            Ok(parcel) if self.index.contains(&parcel.id) => {
                let e = Error::DuplicateIdentifier(format!("package {}", parcel.id));
                self.note(&format!(
                    "Registration failed: Package {} already exists",
                    parcel.id
                ));
                return Err(e);
            }
            Ok(parcel) => parcel,
            Err(e) => {
                self.note(&format!("Registration failed: {}", e));
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .append(&self.paths.inventory, &encode_parcel(&parcel))
        {
            self.note(&format!("Failed to register package {}: {}", parcel.id, e));
            return Err(e);
        }

        self.index.add(parcel.clone());
        self.note(&format!(
            "New package registered: {} (Mass: {}kg, Size: {})",
            parcel.id,
            parcel.mass,
            parcel.size_spec()
        ));
        Ok(parcel)
    }

    /// Remove a recipient whose parcel is no longer waiting in the depot
    pub fn deregister_recipient(&mut self, surname: &str, package_id: &str) -> Result<()> {
        let surname = surname.trim();
        let package_id = package_id.trim();

        if self.index.get(package_id).is_some_and(|p| !p.is_collected()) {
            let e = Error::PreconditionFailed(format!(
                "package {} has not been collected",
                package_id
            ));
            self.note(&format!(
                "Deregistration failed: {} - Package {} not yet collected",
                surname, package_id
            ));
            return Err(e);
        }

        let queued = self.queue.find(surname, package_id).map(|r| r.sequence);

        let removed_from_file = match self.store.rewrite_records_excluding(&self.paths.recipients, |line| {
            recipient_line_matches(line, surname, package_id)
        }) {
            Ok(removed) => removed,
            Err(e) => {
                self.note(&format!("Error during recipient deregistration: {}", e));
                return Err(e);
            }
        };

        if !removed_from_file && queued.is_none() {
            self.note(&format!(
                "Deregistration failed: Recipient {} not found in records",
                surname
            ));
            return Err(Error::NotFound(format!(
                "Recipient {} for package {}",
                surname, package_id
            )));
        }

        if let Some(sequence) = queued {
            self.queue.remove(sequence);
        }

        self.note(&format!(
            "Recipient deregistered: {} with package: {}",
            surname, package_id
        ));
        Ok(())
    }

    /// Drop a collected parcel from the inventory
    pub fn remove_parcel(&mut self, package_id: &str) -> Result<ParcelRecord> {
        let package_id = package_id.trim();

        let parcel = match self.index.get(package_id) {
            None => {
                self.note(&format!("Removal failed: Package {} not found", package_id));
                return Err(Error::package_not_found(package_id));
            }
            Some(p) if !p.is_collected() => {
                self.note(&format!(
                    "Removal failed: Package {} not yet collected",
                    package_id
                ));
                return Err(Error::PreconditionFailed(format!(
                    "package {} has not been collected",
                    package_id
                )));
            }
            Some(p) => p.clone(),
        };

        let had_record = match self
            .store
            .rewrite_records_excluding(&self.paths.inventory, |line| inventory_line_matches(line, package_id))
        {
            Ok(removed) => removed,
            Err(e) => {
                self.note(&format!("Error during package removal: {}", e));
                return Err(e);
            }
        };

        self.index.remove(package_id);

        if had_record {
            self.note(&format!("Package removed from system: {}", package_id));
        } else {
            self.note(&format!(
                "Package removed from system: {} (inventory record already cleared)",
                package_id
            ));
        }
        Ok(parcel)
    }
}
