//! Account balance bookkeeping
//!
//! An account's total must always equal the sum of its per-epoch counters.
//! [`apply_delta`] is the only writer of either, and it updates both in one
//! step, so issuance, transfer and destruction cannot drift apart.

use drops_core::{AccountId, DropsError, DropsState, EpochNumber, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Balances of one account after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Account total
    pub total: u64,
    /// Counter for the epoch that was touched
    pub epoch: u64,
}

/// Add `delta` tokens from `epoch` to `account`.
///
/// Positive deltas create missing rows. Negative deltas require both rows and
/// fail without writing anything if either would underflow.
pub fn apply_delta(
    state: &mut DropsState,
    account: &AccountId,
    epoch: EpochNumber,
    delta: i64,
) -> Result<BalanceSnapshot> {
    let total = state.account_total(account).unwrap_or(0);
    let stat = state.epoch_stat(account, epoch).unwrap_or(0);

    let (new_total, new_stat) = if delta >= 0 {
        let add = delta.unsigned_abs();
        (total.checked_add(add), stat.checked_add(add))
    } else {
        if state.account_total(account).is_none() {
            return Err(DropsError::AccountNotFound {
                account: account.clone(),
            });
        }
        let sub = delta.unsigned_abs();
        (total.checked_sub(sub), stat.checked_sub(sub))
    };

    let (Some(new_total), Some(new_stat)) = (new_total, new_stat) else {
        return Err(DropsError::invalid(format!(
            "Balance of {account} in epoch {epoch} cannot change by {delta}"
        )));
    };

    state.accounts.insert(account.clone(), new_total);
    state.epoch_stats.insert((account.clone(), epoch), new_stat);
    debug!(account = %account, epoch, delta, total = new_total, epoch_total = new_stat, "Balance updated");

    Ok(BalanceSnapshot {
        total: new_total,
        epoch: new_stat,
    })
}

/// Create zero-balance rows for `account` and (`account`, `epoch`).
///
/// Returns false if the epoch row already existed; nothing is written then.
pub fn ensure_rows(state: &mut DropsState, account: &AccountId, epoch: EpochNumber) -> bool {
    if state.epoch_stat(account, epoch).is_some() {
        return false;
    }
    state.accounts.entry(account.clone()).or_insert(0);
    state.epoch_stats.insert((account.clone(), epoch), 0);
    true
}

/// True if `account`'s total equals the sum of its epoch counters.
pub fn is_consistent(state: &DropsState, account: &AccountId) -> bool {
    let total = state.account_total(account).unwrap_or(0);
    let sum: u64 = state.epoch_stats_for(account).map(|(_, count)| count).sum();
    total == sum
}

/// Accounts whose total disagrees with their epoch counters.
pub fn inconsistent_accounts(state: &DropsState) -> Vec<AccountId> {
    let mut accounts: Vec<AccountId> = state.accounts.keys().cloned().collect();
    accounts.extend(state.epoch_stats.keys().map(|(account, _)| account.clone()));
    accounts.sort();
    accounts.dedup();
    accounts
        .into_iter()
        .filter(|account| !is_consistent(state, account))
        .collect()
}
