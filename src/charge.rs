// src/charge.rs

//! Collection charge computation
//!
//! `charge = base + mass * mass_rate + storage_duration * duration_rate`,
//! computed exactly in decimal. Rounding happens only in [`format_charge`].

use crate::models::ParcelRecord;
use rust_decimal::{Decimal, RoundingStrategy};

/// Flat fee applied to every collection (12.50)
pub const BASE_CHARGE: Decimal = Decimal::from_parts(1250, 0, 0, false, 2);

/// Charge per unit of mass (0.75)
pub const MASS_RATE: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Charge per storage period (1.25)
pub const DURATION_RATE: Decimal = Decimal::from_parts(125, 0, 0, false, 2);

/// Pure fee schedule for collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeCalculator {
    base: Decimal,
    mass_rate: Decimal,
    duration_rate: Decimal,
}

impl ChargeCalculator {
    pub fn new() -> Self {
        Self {
            base: BASE_CHARGE,
            mass_rate: MASS_RATE,
            duration_rate: DURATION_RATE,
        }
    }

    pub fn charge(&self, parcel: &ParcelRecord) -> Decimal {
        self.base
            + parcel.mass * self.mass_rate
            + Decimal::from(parcel.storage_duration) * self.duration_rate
    }
}

impl Default for ChargeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a charge for presentation: pound sign, two decimal places
pub fn format_charge(charge: Decimal) -> String {
    let rounded = charge.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("£{:.2}", rounded)
}
