//! Funds amounts in the host ledger's smallest denomination.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Number of fractional digits shown by [`Amount`]'s `Display` impl.
pub const AMOUNT_PRECISION: u32 = 4;

/// Non-negative quantity of the system token, in smallest units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    /// Zero funds.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw amount.
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Raw amount.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// True when the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u64.pow(AMOUNT_PRECISION);
        write!(
            f,
            "{}.{:0width$}",
            self.0 / scale,
            self.0 % scale,
            width = AMOUNT_PRECISION as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_fixed_precision() {
        assert_eq!(Amount(12_345).to_string(), "1.2345");
        assert_eq!(Amount(7).to_string(), "0.0007");
    }

    #[test]
    fn checked_sub_rejects_underflow() {
        assert_eq!(Amount(5).checked_sub(Amount(6)), None);
        assert_eq!(Amount(5).saturating_sub(Amount(6)), Amount::ZERO);
    }
}
