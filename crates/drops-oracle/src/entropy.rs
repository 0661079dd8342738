//! Randomness aggregation
//!
//! Pure digest computations over reveal sets and (entropy, token) pairs.
//!
//! Epoch entropy is `sha256(decimal(epoch) ‖ p₁ ‖ p₂ ‖ …)` where the reveal
//! payloads `pᵢ` are sorted by byte value. Sorting makes the digest independent
//! of the order reveals were submitted in, so anyone holding the reveal set can
//! reproduce it.
//!
//! A token's derived value is `sha256(entropy ‖ token_id_le)`: unpredictable
//! until the epoch finalizes, publicly reproducible afterwards.

use drops_core::hash::{hash, hasher};
use drops_core::{DropsError, DropsState, EpochNumber, Hash32, Result, TokenId};

/// Entropy of `epoch` from an unordered set of reveal payloads.
pub fn entropy_from_reveals<S: AsRef<str>>(epoch: EpochNumber, payloads: &[S]) -> Hash32 {
    let mut sorted: Vec<&[u8]> = payloads.iter().map(|p| p.as_ref().as_bytes()).collect();
    sorted.sort_unstable();

    let mut h = hasher();
    h.update(epoch.to_string().as_bytes());
    for payload in sorted {
        h.update(payload);
    }
    h.finalize()
}

/// Value of `token` under a finalized `entropy`.
pub fn item_value(entropy: &Hash32, token: TokenId) -> Hash32 {
    let mut input = Vec::with_capacity(40);
    input.extend_from_slice(entropy.as_bytes());
    input.extend_from_slice(&token.to_le_bytes());
    hash(&input)
}

/// Recompute the entropy of `epoch` from its persisted reveals.
///
/// Works on partially revealed epochs too, which lets third parties inspect an
/// epoch that is still waiting on oracles. Fails if the epoch is unknown or has
/// no reveals at all.
pub fn compute_epoch_entropy(state: &DropsState, epoch: EpochNumber) -> Result<Hash32> {
    state.epoch(epoch)?;

    let payloads: Vec<&str> = state
        .reveals_for(epoch)
        .map(|reveal| reveal.payload.as_str())
        .collect();
    if payloads.is_empty() {
        return Err(DropsError::EpochNotResolved { epoch });
    }

    Ok(entropy_from_reveals(epoch, &payloads))
}

/// Derived value of `token` for `epoch`.
///
/// The token must have been minted in or before `epoch`, and the epoch's
/// entropy must already be finalized.
pub fn derive_item_value(state: &DropsState, epoch: EpochNumber, token: TokenId) -> Result<Hash32> {
    let record = state.token(token)?;
    if record.epoch > epoch {
        return Err(DropsError::invalid(format!(
            "Token {token} was minted in epoch {} and is not valid for epoch {epoch}",
            record.epoch
        )));
    }

    let entropy = state
        .entropy
        .get(&epoch)
        .ok_or(DropsError::EpochNotResolved { epoch })?;

    Ok(item_value(entropy, token))
}

/// Derived value of `token` for the epoch before the active one.
pub fn derive_latest_item_value(state: &DropsState, token: TokenId) -> Result<(EpochNumber, Hash32)> {
    let current = state.current_epoch()?;
    let previous = current
        .checked_sub(1)
        .ok_or(DropsError::EpochNotResolved { epoch: 0 })?;
    derive_item_value(state, previous, token).map(|value| (previous, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drops_core::{AccountId, TokenRecord};
    use proptest::prelude::*;

    #[test]
    fn entropy_concatenates_epoch_and_sorted_payloads() {
        assert_eq!(
            entropy_from_reveals(5, &["foo", "bar"]),
            hash(b"5barfoo")
        );
    }

    #[test]
    fn sort_is_bytewise() {
        // 'Z' (0x5a) sorts before 'a' (0x61)
        assert_eq!(entropy_from_reveals(1, &["a", "Z"]), hash(b"1Za"));
    }

    #[test]
    fn item_value_hashes_entropy_then_token_bytes() {
        let entropy = hash(b"5barfoo");
        let mut expected = entropy.as_bytes().to_vec();
        expected.extend_from_slice(&42u64.to_le_bytes());
        assert_eq!(item_value(&entropy, TokenId(42)), hash(&expected));
    }

    #[test]
    fn derive_requires_finalized_entropy() {
        let mut state = DropsState::new();
        state.tokens.insert(
            TokenId(7),
            TokenRecord {
                id: TokenId(7),
                owner: AccountId::from("alice"),
                epoch: 2,
            },
        );

        assert_eq!(
            derive_item_value(&state, 2, TokenId(7)),
            Err(DropsError::EpochNotResolved { epoch: 2 })
        );
        assert!(matches!(
            derive_item_value(&state, 1, TokenId(7)),
            Err(DropsError::Invalid { .. })
        ));

        let entropy = hash(b"2x");
        state.entropy.insert(2, entropy);
        let first = derive_item_value(&state, 2, TokenId(7)).unwrap();
        let second = derive_item_value(&state, 2, TokenId(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, item_value(&entropy, TokenId(7)));
    }

    proptest! {
        #[test]
        fn entropy_is_order_independent(
            epoch in 1u64..10_000,
            mut payloads in proptest::collection::vec("[a-zA-Z0-9]{1,16}", 1..8),
        ) {
            let forward = entropy_from_reveals(epoch, &payloads);
            payloads.reverse();
            let reversed = entropy_from_reveals(epoch, &payloads);
            prop_assert_eq!(forward, reversed);
        }
    }
}
