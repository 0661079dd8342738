//! Simulated capacity market
//!
//! A constant-product bonding curve between a funds reserve and the pool of
//! unsold capacity units. Buying `n` units out of a pool of `U` backed by `R`
//! funds costs `ceil(R * n / (U - n))`; selling them back yields
//! `floor(R * n / (U + n))`. A fee in basis points is added to purchases and
//! deducted from sales.

use drops_core::{Amount, CapacityMarket, MarketError, Reservation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

const BPS_DENOMINATOR: u128 = 10_000;

/// Observable market state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Funds backing the curve
    pub reserve_funds: u64,
    /// Units still for sale
    pub available_units: u64,
    /// Units bought and not yet released
    pub held_units: u64,
    /// Fees collected
    pub fees: u64,
    /// Reservations neither confirmed nor cancelled
    pub pending: usize,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    units: u64,
    gross: u64,
    fee: u64,
}

/// Deterministic in-memory [`CapacityMarket`].
#[derive(Debug, Clone)]
pub struct SimulatedMarket {
    reserve_funds: u64,
    available_units: u64,
    held_units: u64,
    fees: u64,
    fee_bps: u16,
    next_reservation: u64,
    pending: BTreeMap<u64, Pending>,
}

impl SimulatedMarket {
    /// Default fee, half a percent.
    pub const DEFAULT_FEE_BPS: u16 = 50;

    /// Market with `reserve_funds` backing `available_units` and the default fee.
    pub fn new(reserve_funds: u64, available_units: u64) -> Self {
        Self::with_fee(reserve_funds, available_units, Self::DEFAULT_FEE_BPS)
    }

    /// Market with an explicit fee in basis points.
    pub fn with_fee(reserve_funds: u64, available_units: u64, fee_bps: u16) -> Self {
        Self {
            reserve_funds,
            available_units,
            held_units: 0,
            fees: 0,
            fee_bps,
            next_reservation: 1,
            pending: BTreeMap::new(),
        }
    }

    /// Current reserve, units, fees and pending reservations.
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            reserve_funds: self.reserve_funds,
            available_units: self.available_units,
            held_units: self.held_units,
            fees: self.fees,
            pending: self.pending.len(),
        }
    }

    /// Units bought and not yet released.
    pub fn held_units(&self) -> u64 {
        self.held_units
    }

    fn gross_buy(&self, units: u64) -> Option<u64> {
        if units >= self.available_units {
            return None;
        }
        let numerator = u128::from(self.reserve_funds) * u128::from(units);
        let denominator = u128::from(self.available_units - units);
        u64::try_from(numerator.div_ceil(denominator)).ok()
    }

    fn gross_sell(&self, units: u64) -> u64 {
        let numerator = u128::from(self.reserve_funds) * u128::from(units);
        let denominator = u128::from(self.available_units) + u128::from(units);
        if denominator == 0 {
            return 0;
        }
        // Never more than the reserve, since units / (U + units) < 1.
        (numerator / denominator) as u64
    }

    fn fee_on(&self, gross: u64) -> u64 {
        let fee = (u128::from(gross) * u128::from(self.fee_bps)).div_ceil(BPS_DENOMINATOR);
        fee as u64
    }
}

impl Default for SimulatedMarket {
    /// 64 GiB of capacity backed by 10 million whole funds units.
    fn default() -> Self {
        Self::new(100_000_000_000, 64 * 1024 * 1024 * 1024)
    }
}

impl CapacityMarket for SimulatedMarket {
    fn buy_cost(&self, units: u64) -> Amount {
        match self.gross_buy(units) {
            Some(gross) => Amount(gross.saturating_add(self.fee_on(gross))),
            None => Amount(u64::MAX),
        }
    }

    fn sell_proceeds(&self, units: u64) -> Amount {
        let gross = self.gross_sell(units);
        Amount(gross.saturating_sub(self.fee_on(gross)))
    }

    fn reserve(&mut self, units: u64) -> Result<Reservation, MarketError> {
        let gross = self
            .gross_buy(units)
            .ok_or(MarketError::InsufficientCapacity {
                requested: units,
                available: self.available_units,
            })?;
        let fee = self.fee_on(gross);

        self.reserve_funds += gross;
        self.available_units -= units;
        self.held_units += units;
        self.fees += fee;

        let id = self.next_reservation;
        self.next_reservation += 1;
        self.pending.insert(id, Pending { units, gross, fee });
        trace!(id, units, gross, fee, "Capacity reserved");
        Ok(Reservation { id, units })
    }

    fn confirm(&mut self, reservation: Reservation) {
        self.pending.remove(&reservation.id);
        trace!(id = reservation.id, "Reservation confirmed");
    }

    fn cancel(&mut self, reservation: Reservation) {
        let Some(pending) = self.pending.remove(&reservation.id) else {
            return;
        };
        self.reserve_funds -= pending.gross;
        self.available_units += pending.units;
        self.held_units -= pending.units;
        self.fees -= pending.fee;
        trace!(id = reservation.id, units = pending.units, "Reservation cancelled");
    }

    fn release(&mut self, units: u64) -> Result<Amount, MarketError> {
        if units > self.held_units {
            return Err(MarketError::InsufficientHoldings {
                requested: units,
                held: self.held_units,
            });
        }
        let gross = self.gross_sell(units);
        let fee = self.fee_on(gross);

        self.reserve_funds -= gross;
        self.available_units += units;
        self.held_units -= units;
        self.fees += fee;
        trace!(units, gross, fee, "Capacity released");
        Ok(Amount(gross - fee))
    }
}
