use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// An exact decimal monetary value.
///
/// Amounts are stored on the ledger as plain decimal strings (`"500.00"`),
/// never as binary floating point. The scale of the parsed string is kept,
/// so `"500.00"` encodes back to `"500.00"` and arithmetic between two
/// amounts carries the larger scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the amount is strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Exact addition. Returns `None` on overflow and also when the sum
    /// needs more than 28 significant digits and would otherwise be rounded.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0
            .checked_add(other.0)
            .and_then(|sum| self.exact(other, sum))
    }

    /// Exact subtraction, with the same rules as [`Amount::checked_add`].
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0
            .checked_sub(other.0)
            .and_then(|diff| self.exact(other, diff))
    }

    // rust_decimal drops fractional digits instead of failing once the
    // mantissa is full, which shows up as a scale below the operands'.
    fn exact(self, other: Amount, result: Decimal) -> Option<Amount> {
        let scale = self.0.scale().max(other.0.scale());
        (result.scale() >= scale).then_some(Amount(result))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    /// Parse a decimal string.
    ///
    /// Plain notation is preferred. Exponent notation (`"3.5E+03"`) is
    /// accepted so records written by older float-formatting writers still
    /// decode to their exact value. Such values are normalized, so they
    /// lose their original scale the first time the record is rewritten.
    ///
    /// Digit separators (`"1_000"`) and bare points (`".5"`, `"5."`) are
    /// rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidAmount {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        if s.is_empty() {
            return Err(invalid("empty string"));
        }
        if s.contains('_') {
            return Err(invalid("digit separators are not allowed"));
        }
        let mantissa = s.split(['e', 'E']).next().unwrap_or(s);
        if let Some((int, frac)) = mantissa.split_once('.') {
            let digit_before = int.bytes().last().is_some_and(|b| b.is_ascii_digit());
            let digit_after = frac.bytes().next().is_some_and(|b| b.is_ascii_digit());
            if !(digit_before && digit_after) {
                return Err(invalid("decimal point must have digits on both sides"));
            }
        }
        if s.contains(['e', 'E']) {
            return Decimal::from_scientific(s)
                .map(|d| Amount(d.normalize()))
                .map_err(|e| invalid(&e.to_string()));
        }
        Decimal::from_str_exact(s)
            .map(Amount)
            .map_err(|e| invalid(&e.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
