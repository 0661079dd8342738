//! Commit-reveal coordination
//!
//! Per-epoch phases are derived from the clock at call time, never stored:
//!
//! - **Open**: `start < now < end`, snapshot oracles may commit a digest
//! - **Closed**: `now >= end`, oracles reveal the secret behind their digest
//! - **Finalized**: every snapshot oracle revealed; entropy is persisted
//!
//! Both the reveal path and the recovery path go through
//! [`finalize_if_ready`], the single place that decides whether an epoch is done.

use crate::entropy::compute_epoch_entropy;
use drops_core::hash::hash;
use drops_core::{
    AccountId, CommitRecord, DropsError, DropsState, EpochNumber, Hash32, PhysicalTime, Result,
    RevealRecord,
};
use tracing::{debug, info};

/// Outcome of a completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizationStatus {
    /// Entropy was already persisted by an earlier call
    AlreadyFinalized,
    /// Some snapshot oracles have not revealed yet
    Pending {
        /// Snapshot oracles that revealed
        revealed: usize,
        /// Snapshot size
        required: usize,
    },
    /// This call finalized the epoch
    Finalized {
        /// Persisted entropy
        entropy: Hash32,
    },
}

impl FinalizationStatus {
    /// True once entropy exists for the epoch.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Record `oracle`'s commitment for `epoch`.
pub fn commit(
    state: &mut DropsState,
    now: PhysicalTime,
    oracle: AccountId,
    epoch: EpochNumber,
    digest: Hash32,
) -> Result<()> {
    state.ensure_enabled()?;

    let record = state.epoch(epoch)?;
    if !record.has_oracle(&oracle) {
        return Err(DropsError::OracleNotEligible { oracle, epoch });
    }
    if now <= record.start {
        return Err(DropsError::phase(epoch, "Epoch not started"));
    }
    if now >= record.end {
        return Err(DropsError::phase(epoch, "Epoch no longer accepting commits"));
    }
    if state.commit(epoch, &oracle).is_some() {
        return Err(DropsError::DuplicateCommit { oracle, epoch });
    }

    debug!(epoch, oracle = %oracle, digest = %digest, "Commit recorded");
    state.commits.insert(
        (epoch, oracle.clone()),
        CommitRecord {
            oracle,
            epoch,
            digest,
        },
    );
    Ok(())
}

/// Record `oracle`'s reveal for `epoch` and finalize the epoch if it was the
/// last one outstanding.
pub fn reveal(
    state: &mut DropsState,
    now: PhysicalTime,
    oracle: AccountId,
    epoch: EpochNumber,
    payload: String,
) -> Result<FinalizationStatus> {
    state.ensure_enabled()?;

    let record = state.epoch(epoch)?;
    if record.completed {
        return Err(DropsError::EpochCompleted { epoch });
    }
    if now < record.end {
        return Err(DropsError::phase(epoch, "Epoch has not concluded"));
    }
    if state.reveal(epoch, &oracle).is_some() {
        return Err(DropsError::DuplicateReveal { oracle, epoch });
    }
    let expected = state
        .commit(epoch, &oracle)
        .map(|c| c.digest)
        .ok_or_else(|| DropsError::CommitNotFound {
            oracle: oracle.clone(),
            epoch,
        })?;

    let computed = hash(payload.as_bytes());
    if computed != expected {
        return Err(DropsError::RevealMismatch { computed, expected });
    }

    debug!(epoch, oracle = %oracle, "Reveal recorded");
    state.reveals.insert(
        (epoch, oracle.clone()),
        RevealRecord {
            oracle,
            epoch,
            payload,
        },
    );

    finalize_if_ready(state, epoch)
}

/// Finalize `epoch` if every snapshot oracle has revealed.
///
/// Idempotent: an already finalized or not yet ready epoch is reported, not
/// treated as an error. Only an unknown epoch fails.
pub fn finalize_if_ready(state: &mut DropsState, epoch: EpochNumber) -> Result<FinalizationStatus> {
    let record = state.epoch(epoch)?;
    if record.completed {
        return Ok(FinalizationStatus::AlreadyFinalized);
    }

    let required = record.oracles.len();
    let revealed = record
        .oracles
        .iter()
        .filter(|oracle| state.reveal(epoch, oracle).is_some())
        .count();
    if required == 0 || revealed < required {
        return Ok(FinalizationStatus::Pending { revealed, required });
    }

    let entropy = compute_epoch_entropy(state, epoch)?;
    state.epoch_mut(epoch)?.completed = true;
    let previous = state.entropy.insert(epoch, entropy);
    debug_assert!(previous.is_none(), "entropy written twice for epoch {epoch}");

    info!(epoch, entropy = %entropy, oracles = required, "Epoch finalized");
    Ok(FinalizationStatus::Finalized { entropy })
}
