use std::fmt;

use serde::{Deserialize, Serialize};

/// A monetary amount carried in minor units (pesewas for GHS, cents for USD).
///
/// The gateway only speaks minor units; the human-facing API boundary speaks
/// major units. Conversion is `major * 100` rounded, and must round-trip
/// exactly for every representable currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Wrap an amount already expressed in minor units.
    pub fn from_minor(minor: i64) -> Self {
        Amount(minor)
    }

    /// Convert a major-unit decimal amount (e.g. 150.00 GHS) to minor units.
    pub fn from_major(major: f64) -> Self {
        Amount((major * 100.0).round() as i64)
    }

    /// The amount in minor units, as the gateway expects it.
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// The amount back in major units.
    pub fn major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.major())
    }
}
