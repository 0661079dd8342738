//! Error type shared by every drops operation
//!
//! Each variant names one concrete failure; [`DropsError::kind`] folds them
//! onto the coarse taxonomy callers match on. Any error aborts the whole
//! invoking operation with no partial effect.

use crate::amount::Amount;
use crate::hash::Hash32;
use crate::identifiers::{AccountId, EpochNumber, TokenId};
use crate::market::MarketError;
use crate::time::PhysicalTime;
use serde::{Deserialize, Serialize};

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// Caller not entitled to act as the named principal.
    Authorization,
    /// Operation attempted outside its valid epoch phase.
    PhaseViolation,
    /// Commit, reveal, enrollment or registration repeated.
    DuplicateSubmission,
    /// Referenced epoch, token, oracle, commit or account absent.
    NotFound,
    /// Provided funds do not cover the capacity cost.
    InsufficientFunds,
    /// System paused.
    Disabled,
    /// Entropy requested before the epoch was finalized.
    EpochNotResolved,
    /// Reveal payload does not hash to the stored commit.
    RevealMismatch,
    /// The capacity market refused a reservation or release.
    Collaborator,
}

/// Unified error type for drops operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DropsError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// What was wrong with the input
        message: String,
    },

    /// Caller is not the named principal
    #[error("Missing authority of {required} (caller {caller})")]
    Unauthorized {
        /// Invoking account
        caller: AccountId,
        /// Account whose authority is required
        required: AccountId,
    },

    /// Oracle is not part of the epoch's frozen snapshot
    #[error("Oracle {oracle} is not in the oracle set of epoch {epoch}")]
    OracleNotEligible {
        /// Submitting oracle
        oracle: AccountId,
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Token owned by somebody else
    #[error("Account {account} does not own token {token}")]
    NotOwner {
        /// Claimed owner
        account: AccountId,
        /// Token in question
        token: TokenId,
    },

    /// Commit or reveal window violated
    #[error("Phase violation for epoch {epoch}: {message}")]
    PhaseViolation {
        /// Target epoch
        epoch: EpochNumber,
        /// Which window was violated
        message: String,
    },

    /// Advance attempted before the active epoch ended
    #[error("Current epoch {epoch} has not ended ({end})")]
    EpochNotEnded {
        /// Active epoch
        epoch: EpochNumber,
        /// Its end time
        end: PhysicalTime,
    },

    /// Reveal attempted on an epoch that is already finalized
    #[error("Epoch {epoch} has already completed")]
    EpochCompleted {
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Oracle committed twice for the same epoch
    #[error("Oracle {oracle} has already committed for epoch {epoch}")]
    DuplicateCommit {
        /// Submitting oracle
        oracle: AccountId,
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Oracle revealed twice for the same epoch
    #[error("Oracle {oracle} has already revealed for epoch {epoch}")]
    DuplicateReveal {
        /// Submitting oracle
        oracle: AccountId,
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Epoch stat row already exists
    #[error("Account {account} is already enrolled for epoch {epoch}")]
    AlreadyEnrolled {
        /// Enrolling account
        account: AccountId,
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Subscriber already registered
    #[error("{subscriber} is already subscribed to notifications")]
    AlreadySubscribed {
        /// Subscribing account
        subscriber: AccountId,
    },

    /// Oracle already registered
    #[error("Oracle {oracle} is already registered")]
    DuplicateOracle {
        /// Oracle account
        oracle: AccountId,
    },

    /// `init` called twice
    #[error("System is already initialized")]
    AlreadyInitialized,

    /// Two minted tokens hash to the same identifier
    #[error("Token id {token} already exists")]
    TokenIdCollision {
        /// Colliding identifier
        token: TokenId,
    },

    /// Epoch does not exist
    #[error("Epoch {epoch} does not exist")]
    EpochNotFound {
        /// Requested epoch
        epoch: EpochNumber,
    },

    /// Token does not exist
    #[error("Token {token} not found")]
    TokenNotFound {
        /// Requested token
        token: TokenId,
    },

    /// Oracle is not registered
    #[error("Oracle {oracle} not found")]
    OracleNotFound {
        /// Oracle account
        oracle: AccountId,
    },

    /// Reveal without a prior commit
    #[error("Oracle {oracle} never committed for epoch {epoch}")]
    CommitNotFound {
        /// Revealing oracle
        oracle: AccountId,
        /// Target epoch
        epoch: EpochNumber,
    },

    /// Balance row missing for an account that should hold tokens
    #[error("Account {account} not found")]
    AccountNotFound {
        /// Account name
        account: AccountId,
    },

    /// Unsubscribe without subscription
    #[error("{subscriber} is not currently subscribed")]
    NotSubscribed {
        /// Account name
        subscriber: AccountId,
    },

    /// Global state row missing
    #[error("System has not been initialized")]
    NotInitialized,

    /// Advance or init with an empty oracle registry
    #[error("No oracles registered")]
    NoOracles,

    /// Funds do not cover the post-reservation cost
    #[error("The amount sent ({provided}) does not cover the capacity cost (requires {required})")]
    InsufficientFunds {
        /// Actual cost
        required: Amount,
        /// Funds provided by the payer
        provided: Amount,
    },

    /// System paused
    #[error("System is currently disabled")]
    Disabled,

    /// Entropy for the epoch has not been finalized yet
    #[error("Epoch {epoch} has not yet been resolved")]
    EpochNotResolved {
        /// Requested epoch
        epoch: EpochNumber,
    },

    /// Reveal payload does not match the commit
    #[error("Reveal hashes to '{computed}' which does not match commit value '{expected}'")]
    RevealMismatch {
        /// Digest of the submitted payload
        computed: Hash32,
        /// Digest stored at commit time
        expected: Hash32,
    },

    /// Capacity market failure
    #[error("Capacity market error: {0}")]
    Market(#[from] MarketError),
}

impl DropsError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a phase violation error
    pub fn phase(epoch: EpochNumber, message: impl Into<String>) -> Self {
        Self::PhaseViolation {
            epoch,
            message: message.into(),
        }
    }

    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid { .. } | Self::TokenIdCollision { .. } | Self::NoOracles => {
                ErrorKind::Validation
            }
            Self::Unauthorized { .. } | Self::OracleNotEligible { .. } | Self::NotOwner { .. } => {
                ErrorKind::Authorization
            }
            Self::PhaseViolation { .. } | Self::EpochNotEnded { .. } | Self::EpochCompleted { .. } => {
                ErrorKind::PhaseViolation
            }
            Self::DuplicateCommit { .. }
            | Self::DuplicateReveal { .. }
            | Self::AlreadyEnrolled { .. }
            | Self::AlreadySubscribed { .. }
            | Self::DuplicateOracle { .. }
            | Self::AlreadyInitialized => ErrorKind::DuplicateSubmission,
            Self::EpochNotFound { .. }
            | Self::TokenNotFound { .. }
            | Self::OracleNotFound { .. }
            | Self::CommitNotFound { .. }
            | Self::AccountNotFound { .. }
            | Self::NotSubscribed { .. }
            | Self::NotInitialized => ErrorKind::NotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Disabled => ErrorKind::Disabled,
            Self::EpochNotResolved { .. } => ErrorKind::EpochNotResolved,
            Self::RevealMismatch { .. } => ErrorKind::RevealMismatch,
            Self::Market(_) => ErrorKind::Collaborator,
        }
    }

    /// Stable machine-readable code, unique per variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::Unauthorized { .. } => "unauthorized",
            Self::OracleNotEligible { .. } => "oracle_not_eligible",
            Self::NotOwner { .. } => "not_owner",
            Self::PhaseViolation { .. } => "phase_violation",
            Self::EpochNotEnded { .. } => "epoch_not_ended",
            Self::EpochCompleted { .. } => "epoch_completed",
            Self::DuplicateCommit { .. } => "duplicate_commit",
            Self::DuplicateReveal { .. } => "duplicate_reveal",
            Self::AlreadyEnrolled { .. } => "already_enrolled",
            Self::AlreadySubscribed { .. } => "already_subscribed",
            Self::DuplicateOracle { .. } => "duplicate_oracle",
            Self::AlreadyInitialized => "already_initialized",
            Self::TokenIdCollision { .. } => "token_id_collision",
            Self::EpochNotFound { .. } => "epoch_not_found",
            Self::TokenNotFound { .. } => "token_not_found",
            Self::OracleNotFound { .. } => "oracle_not_found",
            Self::CommitNotFound { .. } => "commit_not_found",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::NotSubscribed { .. } => "not_subscribed",
            Self::NotInitialized => "not_initialized",
            Self::NoOracles => "no_oracles",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Disabled => "disabled",
            Self::EpochNotResolved { .. } => "epoch_not_resolved",
            Self::RevealMismatch { .. } => "reveal_mismatch",
            Self::Market(_) => "market",
        }
    }
}

/// Standard Result type for drops operations
pub type Result<T> = std::result::Result<T, DropsError>;
