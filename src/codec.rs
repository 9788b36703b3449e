// src/codec.rs

//! Typed encode/decode for the depot's comma-separated records
//!
//! Formats (the first line of the inventory and recipient files is a header):
//! - Inventory: `identifier,mass,length,width,height`
//! - Recipients: `surname,packageIdentifier`
//! - Ledger: `surname,packageIdentifier,mass,sizeSpec,deliveryState,£charge`

use crate::charge::format_charge;
use crate::error::{Error, Result};
use crate::models::{Dimensions, ParcelRecord, RecipientRecord, parse_non_negative};
use rust_decimal::Decimal;
use std::io::BufRead;
use tracing::warn;

const INVENTORY_FIELDS: usize = 5;
const RECIPIENT_FIELDS: usize = 2;

/// Records decoded from one file, with the rows that had to be skipped
#[derive(Debug)]
pub struct Decoded<T> {
    /// (line number, record), line numbers are 1-based
    pub records: Vec<(usize, T)>,
    pub skipped: Vec<Error>,
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn expect_fields<'a>(line: &'a str, expected: usize) -> std::result::Result<Vec<&'a str>, String> {
    let fields = split_fields(line);
    if fields.len() != expected {
        return Err(format!(
            "expected {} fields, found {}",
            expected,
            fields.len()
        ));
    }
    if let Some(pos) = fields.iter().position(|f| f.is_empty()) {
        return Err(format!("field {} is empty", pos + 1));
    }
    Ok(fields)
}

/// Decode one inventory row into a Pending parcel
pub fn decode_parcel(line: &str) -> std::result::Result<ParcelRecord, String> {
    let fields = expect_fields(line, INVENTORY_FIELDS)?;

    let mass = parse_non_negative("mass", fields[1]).map_err(|e| e.to_string())?;
    let mut dims = [Decimal::ZERO; 3];
    for (slot, raw) in dims.iter_mut().zip(&fields[2..]) {
        *slot = parse_non_negative("dimensions", raw).map_err(|e| e.to_string())?;
    }

    Ok(ParcelRecord::new(
        fields[0].to_string(),
        mass,
        Dimensions::new(dims[0], dims[1], dims[2]),
    ))
}

pub fn encode_parcel(parcel: &ParcelRecord) -> String {
    format!(
        "{},{},{},{},{}",
        parcel.id,
        parcel.mass,
        parcel.dimensions.length,
        parcel.dimensions.width,
        parcel.dimensions.height
    )
}

/// Decode one recipient row into (surname, package identifier)
pub fn decode_recipient(line: &str) -> std::result::Result<(String, String), String> {
    let fields = expect_fields(line, RECIPIENT_FIELDS)?;
    Ok((fields[0].to_string(), fields[1].to_string()))
}

pub fn encode_recipient(surname: &str, package_id: &str) -> String {
    format!("{},{}", surname, package_id)
}

/// Ledger line for a completed collection
pub fn encode_ledger(recipient: &RecipientRecord, parcel: &ParcelRecord, charge: Decimal) -> String {
    format!(
        "{},{},{},{},{},{}",
        recipient.surname,
        parcel.id,
        format_mass(parcel.mass),
        parcel.size_spec(),
        parcel.state,
        format_charge(charge)
    )
}

/// Mass at its own scale, but with at least one decimal place
pub fn format_mass(mass: Decimal) -> String {
    let mut mass = mass;
    if mass.scale() == 0 {
        mass.rescale(1);
    }
    mass.to_string()
}

/// True if an inventory row is for `package_id`
pub fn inventory_line_matches(line: &str, package_id: &str) -> bool {
    split_fields(line).first().is_some_and(|id| *id == package_id)
}

/// True if a recipient row is exactly (`surname`, `package_id`)
pub fn recipient_line_matches(line: &str, surname: &str, package_id: &str) -> bool {
    let fields = split_fields(line);
    fields.len() >= RECIPIENT_FIELDS && fields[0] == surname && fields[1] == package_id
}

fn load<R, T, F>(reader: R, file: &str, mut decode: F) -> Result<Decoded<T>>
where
    R: BufRead,
    F: FnMut(&str) -> std::result::Result<T, String>,
{
    let mut decoded = Decoded {
        records: Vec::new(),
        skipped: Vec::new(),
    };

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(file, e))?;
        let line_no = idx + 1;

        // Header
        if line_no == 1 || line.trim().is_empty() {
            continue;
        }

        match decode(&line) {
            Ok(record) => decoded.records.push((line_no, record)),
            Err(reason) => {
                warn!("Skipping {}:{}: {}", file, line_no, reason);
                decoded.skipped.push(Error::InvalidRecord {
                    file: file.to_string(),
                    line: line_no,
                    reason,
                });
            }
        }
    }

    Ok(decoded)
}

/// Parse an inventory file, skipping the header and malformed rows
pub fn load_inventory<R: BufRead>(reader: R, file: &str) -> Result<Decoded<ParcelRecord>> {
    load(reader, file, decode_parcel)
}

/// Parse a recipient file, skipping the header and malformed rows
pub fn load_recipients<R: BufRead>(reader: R, file: &str) -> Result<Decoded<(String, String)>> {
    load(reader, file, decode_recipient)
}
