//! Common test fixtures.

use drops_core::hash::{hash, Hash32};
use drops_core::{AccountId, DropsConfig, DropsState, PhysicalTime};
use drops_oracle::{registry, scheduler};

/// A 32-character seed, the shortest accepted by the default config.
pub const SEED: &str = "0123456789abcdef0123456789abcdef";

/// Start of epoch 1 in [`enabled_state`].
pub const GENESIS_SECS: u64 = 120;

/// Account named `name`.
pub fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

/// Distinct valid seed for index `n`.
pub fn seed(n: u64) -> String {
    format!("{n:032}")
}

/// Digest an oracle commits to for `payload`.
pub fn commitment(payload: &str) -> Hash32 {
    hash(payload.as_bytes())
}

/// Initialized, enabled state with `oracles` registered and epoch 1 spanning
/// [`GENESIS_SECS`] to one phase later.
pub fn enabled_state(config: &DropsConfig, oracles: &[&str]) -> DropsState {
    let mut state = DropsState::new();
    for oracle in oracles {
        registry::add_oracle(&mut state, account(oracle)).expect("fresh registry");
    }
    scheduler::initialize(&mut state, config, PhysicalTime::from_secs(GENESIS_SECS))
        .expect("initialize");
    state.global_mut().expect("initialized").enabled = true;
    state
}
