//! Drops Ledger - capacity-backed tokens
//!
//! Tokens are minted against capacity bought from a [`drops_core::CapacityMarket`],
//! moved between accounts without touching the market, and destroyed to sell
//! their capacity back. Per-account and per-epoch balances are kept in lockstep
//! by [`balances::apply_delta`].

#![forbid(unsafe_code)]

pub mod balances;
pub mod ledger;
pub mod memo;

pub use balances::{apply_delta, ensure_rows, inconsistent_accounts, is_consistent, BalanceSnapshot};
pub use ledger::{
    token_id, DestroyAllReceipt, DestroyReceipt, IncomingTransfer, IssueReceipt, OwnerPayout,
    ResourceLedger,
};
pub use memo::{parse_issue_memo, IssueMemo};
