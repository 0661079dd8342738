//! # Drops Core
//!
//! Shared vocabulary for the drops ledger: identifiers, digests, amounts, the
//! error taxonomy, configuration, the persisted state tables and the traits
//! through which the ledger reaches its external collaborators (wall clock and
//! capacity market).
//!
//! Nothing in this crate performs an operation on its own. The oracle and
//! ledger crates implement the operations over [`DropsState`], and the runtime
//! crate wraps them into atomic units of work.

#![forbid(unsafe_code)]

pub mod amount;
pub mod config;
pub mod errors;
pub mod hash;
pub mod identifiers;
pub mod market;
pub mod notification;
pub mod state;
pub mod time;

pub use amount::Amount;
pub use config::DropsConfig;
pub use errors::{DropsError, ErrorKind, Result};
pub use hash::Hash32;
pub use identifiers::{AccountId, EpochNumber, TokenId};
pub use market::{CapacityMarket, MarketError, Reservation};
pub use notification::{Notification, Outbox};
pub use state::{CommitRecord, DropsState, EpochRecord, GlobalState, RevealRecord, TokenRecord};
pub use time::{PhysicalClock, PhysicalTime, SystemClock};
