//! # Drops Runtime
//!
//! The operation surface of drops. [`DropsRuntime`] checks the caller's
//! authority, runs the oracle and ledger operations against its state as atomic
//! units of work, and queues their notifications for the host.

#![forbid(unsafe_code)]

pub mod auth;
pub mod runtime;

pub use auth::{require_admin, require_auth};
pub use runtime::DropsRuntime;

pub use drops_ledger::{DestroyAllReceipt, DestroyReceipt, IncomingTransfer, IssueReceipt};
pub use drops_oracle::FinalizationStatus;
