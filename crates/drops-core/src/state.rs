//! Persisted state tables
//!
//! [`DropsState`] is the explicit state context every operation receives. It
//! holds one ordered map per entity; secondary lookups keyed by
//! (principal, epoch) use composite tuple keys so that uniqueness per pair is
//! structural. The state is cheap to clone, which is what the runtime relies on
//! to make each operation all-or-nothing.

use crate::errors::{DropsError, Result};
use crate::hash::Hash32;
use crate::identifiers::{AccountId, EpochNumber, TokenId};
use crate::time::PhysicalTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Single global row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Active epoch
    pub epoch: EpochNumber,
    /// Gates every non-administrative mutation
    pub enabled: bool,
}

/// One epoch. The oracle snapshot is frozen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch number
    pub epoch: EpochNumber,
    /// Commit window opens
    pub start: PhysicalTime,
    /// Commit window closes, reveal window opens
    pub end: PhysicalTime,
    /// Oracles entitled to participate
    pub oracles: Vec<AccountId>,
    /// Set once every snapshot oracle revealed and entropy was written
    pub completed: bool,
}

impl EpochRecord {
    /// True if `oracle` belongs to the frozen snapshot.
    pub fn has_oracle(&self, oracle: &AccountId) -> bool {
        self.oracles.contains(oracle)
    }
}

/// Oracle commitment for an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Committing oracle
    pub oracle: AccountId,
    /// Target epoch
    pub epoch: EpochNumber,
    /// SHA-256 of the secret to be revealed
    pub digest: Hash32,
}

/// Oracle reveal for an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRecord {
    /// Revealing oracle
    pub oracle: AccountId,
    /// Target epoch
    pub epoch: EpochNumber,
    /// Secret whose digest matched the commit
    pub payload: String,
}

/// An issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Identifier
    pub id: TokenId,
    /// Current owner
    pub owner: AccountId,
    /// Epoch the token was minted in
    pub epoch: EpochNumber,
}

/// All persisted tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropsState {
    /// `None` until `init`
    pub global: Option<GlobalState>,
    /// Every epoch created so far
    pub epochs: BTreeMap<EpochNumber, EpochRecord>,
    /// Keyed by (epoch, oracle)
    pub commits: BTreeMap<(EpochNumber, AccountId), CommitRecord>,
    /// Keyed by (epoch, oracle)
    pub reveals: BTreeMap<(EpochNumber, AccountId), RevealRecord>,
    /// Finalized epoch entropy, written once
    pub entropy: BTreeMap<EpochNumber, Hash32>,
    /// Outstanding tokens
    pub tokens: BTreeMap<TokenId, TokenRecord>,
    /// Total tokens per account
    pub accounts: BTreeMap<AccountId, u64>,
    /// Tokens per (account, creation epoch)
    pub epoch_stats: BTreeMap<(AccountId, EpochNumber), u64>,
    /// Registry snapshotted into each new epoch
    pub oracles: BTreeSet<AccountId>,
    /// Notified on each epoch advance
    pub subscribers: BTreeSet<AccountId>,
}

impl DropsState {
    /// Empty, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The global row.
    pub fn global(&self) -> Result<&GlobalState> {
        self.global.as_ref().ok_or(DropsError::NotInitialized)
    }

    /// The global row, mutably.
    pub fn global_mut(&mut self) -> Result<&mut GlobalState> {
        self.global.as_mut().ok_or(DropsError::NotInitialized)
    }

    /// Active epoch number.
    pub fn current_epoch(&self) -> Result<EpochNumber> {
        Ok(self.global()?.epoch)
    }

    /// Fail with `Disabled` unless the system is enabled.
    pub fn ensure_enabled(&self) -> Result<()> {
        if self.global()?.enabled {
            Ok(())
        } else {
            Err(DropsError::Disabled)
        }
    }

    /// Look up an epoch.
    pub fn epoch(&self, epoch: EpochNumber) -> Result<&EpochRecord> {
        self.epochs
            .get(&epoch)
            .ok_or(DropsError::EpochNotFound { epoch })
    }

    /// Look up an epoch mutably.
    pub fn epoch_mut(&mut self, epoch: EpochNumber) -> Result<&mut EpochRecord> {
        self.epochs
            .get_mut(&epoch)
            .ok_or(DropsError::EpochNotFound { epoch })
    }

    /// Commit of `oracle` for `epoch`, if any.
    pub fn commit(&self, epoch: EpochNumber, oracle: &AccountId) -> Option<&CommitRecord> {
        self.commits.get(&(epoch, oracle.clone()))
    }

    /// Reveal of `oracle` for `epoch`, if any.
    pub fn reveal(&self, epoch: EpochNumber, oracle: &AccountId) -> Option<&RevealRecord> {
        self.reveals.get(&(epoch, oracle.clone()))
    }

    /// Every reveal recorded for `epoch`, ordered by oracle.
    pub fn reveals_for(&self, epoch: EpochNumber) -> impl Iterator<Item = &RevealRecord> {
        self.reveals
            .range((epoch, AccountId::new(String::new()))..)
            .take_while(move |((e, _), _)| *e == epoch)
            .map(|(_, reveal)| reveal)
    }

    /// Look up a token.
    pub fn token(&self, id: TokenId) -> Result<&TokenRecord> {
        self.tokens
            .get(&id)
            .ok_or(DropsError::TokenNotFound { token: id })
    }

    /// Total tokens held by `account`, if it has a row.
    pub fn account_total(&self, account: &AccountId) -> Option<u64> {
        self.accounts.get(account).copied()
    }

    /// Tokens held by `account` from `epoch`, if the row exists.
    pub fn epoch_stat(&self, account: &AccountId, epoch: EpochNumber) -> Option<u64> {
        self.epoch_stats.get(&(account.clone(), epoch)).copied()
    }

    /// Every (epoch, count) stat row of `account`.
    pub fn epoch_stats_for<'a>(
        &'a self,
        account: &'a AccountId,
    ) -> impl Iterator<Item = (EpochNumber, u64)> + 'a {
        self.epoch_stats
            .range((account.clone(), EpochNumber::MIN)..=(account.clone(), EpochNumber::MAX))
            .map(|((_, epoch), count)| (*epoch, *count))
    }
}
