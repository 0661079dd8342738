//! Capacity market collaborator
//!
//! Every token is backed by capacity units bought from an external market whose
//! price follows a bonding curve with a fee. The ledger never prices capacity
//! itself; it only asks the market for quotes and moves units.
//!
//! Reservations are two-phase: [`CapacityMarket::reserve`] moves the curve and
//! must later be either confirmed or cancelled. Cancelling restores the market to
//! its state before the reservation, which is how an issuance that fails its
//! funds check leaves no trace.

use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// Errors reported by the capacity market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MarketError {
    /// Not enough capacity left for sale
    #[error("requested {requested} units but only {available} available")]
    InsufficientCapacity {
        /// Units requested
        requested: u64,
        /// Units the market can sell
        available: u64,
    },
    /// Releasing more units than are held
    #[error("cannot release {requested} units, only {held} held")]
    InsufficientHoldings {
        /// Units to release
        requested: u64,
        /// Units currently held
        held: u64,
    },
    /// Unknown or already settled reservation
    #[error("reservation {0} is not pending")]
    UnknownReservation(u64),
}

/// Pending capacity purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Market-assigned identifier
    pub id: u64,
    /// Units reserved
    pub units: u64,
}

/// Priced capacity market.
pub trait CapacityMarket {
    /// Cost, fee included, of buying `units` at the current price.
    fn buy_cost(&self, units: u64) -> Amount;

    /// Proceeds, fee deducted, of selling `units` at the current price.
    fn sell_proceeds(&self, units: u64) -> Amount;

    /// Reserve `units`, moving the price. Must be confirmed or cancelled.
    fn reserve(&mut self, units: u64) -> Result<Reservation, MarketError>;

    /// Make a reservation permanent.
    fn confirm(&mut self, reservation: Reservation);

    /// Undo a reservation, restoring the price it moved.
    fn cancel(&mut self, reservation: Reservation);

    /// Sell `units` back to the market, returning the proceeds.
    fn release(&mut self, units: u64) -> Result<Amount, MarketError>;
}

impl<M: CapacityMarket + ?Sized> CapacityMarket for Box<M> {
    fn buy_cost(&self, units: u64) -> Amount {
        (**self).buy_cost(units)
    }

    fn sell_proceeds(&self, units: u64) -> Amount {
        (**self).sell_proceeds(units)
    }

    fn reserve(&mut self, units: u64) -> Result<Reservation, MarketError> {
        (**self).reserve(units)
    }

    fn confirm(&mut self, reservation: Reservation) {
        (**self).confirm(reservation);
    }

    fn cancel(&mut self, reservation: Reservation) {
        (**self).cancel(reservation);
    }

    fn release(&mut self, units: u64) -> Result<Amount, MarketError> {
        (**self).release(units)
    }
}
