// src/index.rs

//! Keyed parcel lookup

use crate::models::ParcelRecord;
use std::collections::HashMap;

/// Parcels keyed by identifier, iterated in insertion order
#[derive(Debug, Default)]
pub struct PackageIndex {
    parcels: HashMap<String, ParcelRecord>,
    order: Vec<String>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parcel. Returns false, leaving the index untouched, if the
    /// identifier is already present.
    pub fn add(&mut self, parcel: ParcelRecord) -> bool {
        if self.parcels.contains_key(&parcel.id) {
            return false;
        }
        self.order.push(parcel.id.clone());
        self.parcels.insert(parcel.id.clone(), parcel);
        true
    }

    pub fn get(&self, id: &str) -> Option<&ParcelRecord> {
        self.parcels.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ParcelRecord> {
        self.parcels.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parcels.contains_key(id)
    }

    /// Remove a parcel. Returns true iff it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.parcels.remove(id).is_none() {
            return false;
        }
        self.order.retain(|k| k != id);
        true
    }

    /// Owned snapshot in insertion order
    pub fn all(&self) -> Vec<ParcelRecord> {
        self.order
            .iter()
            .filter_map(|id| self.parcels.get(id).cloned())
            .collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ParcelRecord> {
        self.parcels.values_mut()
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }
}
