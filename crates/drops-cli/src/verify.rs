//! Offline verification
//!
//! Anyone holding an epoch's reveal set can recompute its entropy and every
//! token value derived from it without access to the runtime.

use anyhow::{Context, Result};
use drops_core::hash::hash;
use drops_core::{EpochNumber, Hash32, TokenId};
use drops_ledger::token_id;
use drops_oracle::{entropy_from_reveals, item_value};
use serde::Serialize;

/// Token id derived for one mint index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedTokenId {
    /// Mint index within the issuance
    pub index: u32,
    /// Derived id
    pub token: TokenId,
}

/// Digest an oracle commits to before revealing `payload`.
pub fn commitment(payload: &str) -> Hash32 {
    hash(payload.as_bytes())
}

/// Entropy of `epoch` from its reveal payloads, in any order.
pub fn epoch_entropy(epoch: EpochNumber, payloads: &[String]) -> Hash32 {
    entropy_from_reveals(epoch, payloads)
}

/// Value of `token` under hex-encoded `entropy`.
pub fn token_value(entropy: &str, token: u64) -> Result<Hash32> {
    let entropy: Hash32 = entropy
        .parse()
        .with_context(|| format!("entropy must be 64 hex characters, got {entropy:?}"))?;
    Ok(item_value(&entropy, TokenId(token)))
}

/// Identifiers minted by an issuance of `count` tokens from `seed`.
pub fn token_ids(seed: &str, count: u32) -> Vec<DerivedTokenId> {
    (0..count)
        .map(|index| DerivedTokenId {
            index,
            token: token_id(index, seed),
        })
        .collect()
}
