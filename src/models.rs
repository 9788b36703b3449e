// src/models.rs

//! Value entities tracked by the depot
//!
//! Parcels and recipients are created at bootstrap or by explicit
//! registration, and only the collection path mutates them afterwards.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Delivery state of a parcel. The only transition is Pending -> Collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryState {
    Pending,
    Collected,
}

impl DeliveryState {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryState::Pending => "Pending",
            DeliveryState::Collected => "Collected",
        }
    }
}

impl FromStr for DeliveryState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(DeliveryState::Pending),
            "Collected" => Ok(DeliveryState::Collected),
            _ => Err(format!("Invalid delivery state: {}", s)),
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length, width and height of a parcel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

impl Dimensions {
    pub fn new(length: Decimal, width: Decimal, height: Decimal) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Size specification string, e.g. `30x20x10`
    pub fn spec(&self) -> String {
        format!("{}x{}x{}", self.length, self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = Error;

    /// Accepts `LxWxH`, `L W H` or `L,W,H`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s
            .split(|c: char| c == 'x' || c == 'X' || c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() != 3 {
            return Err(Error::invalid_field(
                "dimensions",
                format!("expected three components, got {} in {:?}", parts.len(), s),
            ));
        }

        let mut values = [Decimal::ZERO; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = parse_non_negative("dimensions", part)?;
        }

        Ok(Self::new(values[0], values[1], values[2]))
    }
}

/// Parse a non-negative decimal field value
pub(crate) fn parse_non_negative(field: &'static str, raw: &str) -> Result<Decimal> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|e| Error::invalid_field(field, format!("{:?} is not a number: {}", raw, e)))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::invalid_field(
            field,
            format!("{} must not be negative", value),
        ));
    }
    // Drops the sign of a negative zero
    Ok(value.abs())
}

/// A parcel held at the depot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelRecord {
    pub id: String,
    pub mass: Decimal,
    pub dimensions: Dimensions,
    pub storage_duration: u32,
    pub state: DeliveryState,
    pub charge: Option<Decimal>,
}

impl ParcelRecord {
    /// Create a new Pending parcel with no storage time
    pub fn new(id: String, mass: Decimal, dimensions: Dimensions) -> Self {
        Self {
            id,
            mass,
            dimensions,
            storage_duration: 0,
            state: DeliveryState::Pending,
            charge: None,
        }
    }

    pub fn size_spec(&self) -> String {
        self.dimensions.spec()
    }

    pub fn is_collected(&self) -> bool {
        self.state == DeliveryState::Collected
    }

    /// Count one more storage period against a parcel still waiting
    pub fn extend_storage(&mut self) {
        if !self.is_collected() {
            self.storage_duration += 1;
        }
    }

    /// Transition to Collected and fix the charge
    pub fn mark_collected(&mut self, charge: Decimal) -> Result<()> {
        if self.is_collected() {
            return Err(Error::AlreadyCollected(self.id.clone()));
        }
        self.state = DeliveryState::Collected;
        self.charge = Some(charge);
        Ok(())
    }
}

impl fmt::Display for ParcelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Package[ID={}, Mass={}, Measurements={}, Duration={}, State={}]",
            self.id,
            self.mass.round_dp(2),
            self.size_spec(),
            self.storage_duration,
            self.state
        )
    }
}

/// A person queued to collect one specific parcel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientRecord {
    pub surname: String,
    pub package_id: String,
    pub sequence: u64,
    pub collected: bool,
}

impl RecipientRecord {
    pub fn new(surname: String, package_id: String, sequence: u64) -> Self {
        Self {
            surname,
            package_id,
            sequence,
            collected: false,
        }
    }

    /// Exact field equality on (surname, package identifier)
    pub fn matches(&self, surname: &str, package_id: &str) -> bool {
        self.surname == surname && self.package_id == package_id
    }

    pub fn mark_collected(&mut self) {
        self.collected = true;
    }
}

impl fmt::Display for RecipientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recipient[Name={}, PackageID={}, Sequence={}]",
            self.surname, self.package_id, self.sequence
        )
    }
}
