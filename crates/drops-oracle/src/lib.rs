//! # Drops Oracle
//!
//! The entropy side of drops: a registered committee of oracles commits to
//! secrets during an epoch, reveals them once the epoch's commit window has
//! closed, and the sorted reveal set is hashed into the epoch's entropy.
//!
//! - `entropy` - pure digest functions (epoch entropy, derived token values)
//! - `coordinator` - commit/reveal bookkeeping and finalization
//! - `scheduler` - epoch creation and advancement
//! - `registry` - oracle registry and epoch subscribers
//!
//! Every function takes the state context explicitly; atomicity is the
//! caller's concern.

#![forbid(unsafe_code)]

pub mod coordinator;
pub mod entropy;
pub mod registry;
pub mod scheduler;

pub use coordinator::{commit, finalize_if_ready, reveal, FinalizationStatus};
pub use entropy::{
    compute_epoch_entropy, derive_item_value, derive_latest_item_value, entropy_from_reveals,
    item_value,
};
pub use scheduler::{advance, advance_to_present, initialize};
