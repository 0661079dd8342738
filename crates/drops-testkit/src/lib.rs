//! Drops Testing Infrastructure
//!
//! Deterministic stand-ins for the ledger's external collaborators and common
//! fixtures, shared by the unit and integration tests of every drops crate and
//! by the `dropsctl` scenario runner.
//!
//! - [`ManualClock`] - a clock that only moves when told to
//! - [`SimulatedMarket`] - a constant-product capacity market with a fee
//! - [`fixtures`] - accounts, seeds and a ready-to-use enabled state

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod clock;
pub mod fixtures;
pub mod market;

pub use clock::ManualClock;
pub use fixtures::*;
pub use market::{MarketSnapshot, SimulatedMarket};
