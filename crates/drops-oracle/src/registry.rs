//! Oracle registry and epoch subscribers.
//!
//! The registry is only read at epoch creation, where it is snapshotted into
//! the new epoch. Changing it never affects epochs that already exist.

use drops_core::{AccountId, DropsError, DropsState, Result};
use tracing::info;

/// Register an oracle for future epochs.
pub fn add_oracle(state: &mut DropsState, oracle: AccountId) -> Result<()> {
    if !state.oracles.insert(oracle.clone()) {
        return Err(DropsError::DuplicateOracle { oracle });
    }
    info!(oracle = %oracle, "Oracle registered");
    Ok(())
}

/// Remove an oracle from future epochs.
pub fn remove_oracle(state: &mut DropsState, oracle: &AccountId) -> Result<()> {
    if !state.oracles.remove(oracle) {
        return Err(DropsError::OracleNotFound {
            oracle: oracle.clone(),
        });
    }
    info!(oracle = %oracle, "Oracle removed");
    Ok(())
}

/// Current registry contents, in account order.
pub fn snapshot(state: &DropsState) -> Result<Vec<AccountId>> {
    if state.oracles.is_empty() {
        return Err(DropsError::NoOracles);
    }
    Ok(state.oracles.iter().cloned().collect())
}

/// Add an account to the epoch-advance notification list.
pub fn subscribe(state: &mut DropsState, subscriber: AccountId) -> Result<()> {
    if !state.subscribers.insert(subscriber.clone()) {
        return Err(DropsError::AlreadySubscribed { subscriber });
    }
    Ok(())
}

/// Remove an account from the notification list.
pub fn unsubscribe(state: &mut DropsState, subscriber: &AccountId) -> Result<()> {
    if !state.subscribers.remove(subscriber) {
        return Err(DropsError::NotSubscribed {
            subscriber: subscriber.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn duplicate_oracle_is_rejected() {
        let mut state = DropsState::new();
        add_oracle(&mut state, "alice".into()).unwrap();
        assert_matches!(
            add_oracle(&mut state, "alice".into()),
            Err(DropsError::DuplicateOracle { .. })
        );
    }

    #[test]
    fn snapshot_requires_oracles() {
        let mut state = DropsState::new();
        assert_eq!(snapshot(&state), Err(DropsError::NoOracles));
        add_oracle(&mut state, "bob".into()).unwrap();
        add_oracle(&mut state, "alice".into()).unwrap();
        assert_eq!(
            snapshot(&state).unwrap(),
            vec![AccountId::from("alice"), AccountId::from("bob")]
        );
        remove_oracle(&mut state, &"bob".into()).unwrap();
        assert_matches!(
            remove_oracle(&mut state, &"bob".into()),
            Err(DropsError::OracleNotFound { .. })
        );
    }

    #[test]
    fn subscription_round_trip() {
        let mut state = DropsState::new();
        subscribe(&mut state, "game".into()).unwrap();
        assert_matches!(
            subscribe(&mut state, "game".into()),
            Err(DropsError::AlreadySubscribed { .. })
        );
        unsubscribe(&mut state, &"game".into()).unwrap();
        assert_matches!(
            unsubscribe(&mut state, &"game".into()),
            Err(DropsError::NotSubscribed { .. })
        );
    }
}
