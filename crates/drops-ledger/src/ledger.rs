//! Resource-backed issuance and destruction
//!
//! Each token is backed by capacity bought from the [`CapacityMarket`]. Minting
//! buys capacity, destroying sells it back, transferring only moves ownership.
//!
//! Issuance follows an explicit reserve, verify, confirm-or-cancel protocol:
//! capacity is reserved first, the actual cost is quoted at the
//! post-reservation price, and the reservation is cancelled if anything after
//! it fails. State writes happen only once every check has passed, so a failed
//! operation leaves neither the market nor the tables changed.

use crate::balances::{self, BalanceSnapshot};
use crate::memo::parse_issue_memo;
use drops_core::hash::hash;
use drops_core::{
    AccountId, Amount, CapacityMarket, DropsConfig, DropsError, DropsState, EpochNumber,
    Notification, Outbox, Result, TokenId, TokenRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Identifier of the `index`-th token minted from `seed`.
///
/// The first 64 bits of `sha256(decimal(index) ‖ seed)`, little-endian.
pub fn token_id(index: u32, seed: &str) -> TokenId {
    TokenId(hash(format!("{index}{seed}").as_bytes()).truncate_u64())
}

/// Incoming funds transfer as reported by the host's funds ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingTransfer {
    /// Sender
    pub from: AccountId,
    /// Receiver
    pub to: AccountId,
    /// Amount transferred
    pub quantity: Amount,
    /// Free-form memo
    pub memo: String,
}

/// Result of an issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReceipt {
    /// Tokens minted
    pub count: u32,
    /// Epoch the tokens are tagged with
    pub epoch: EpochNumber,
    /// Capacity units reserved
    pub units: u64,
    /// Actual capacity cost
    pub cost: Amount,
    /// Funds returned to the payer
    pub refund: Amount,
    /// Payer's new total
    pub total_tokens: u64,
    /// Payer's new count for `epoch`
    pub epoch_tokens: u64,
    /// Minted identifiers, in mint order
    pub tokens: Vec<TokenId>,
}

/// Result of a destruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyReceipt {
    /// Capacity units released
    pub units: u64,
    /// Proceeds paid to the owner
    pub proceeds: Amount,
}

/// Per-owner payout of an administrative destroy-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPayout {
    /// Former owner
    pub owner: AccountId,
    /// Tokens destroyed for this owner
    pub tokens: u64,
    /// Proceeds paid
    pub proceeds: Amount,
}

/// Result of an administrative destroy-all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyAllReceipt {
    /// Tokens destroyed
    pub tokens: u64,
    /// Capacity units released
    pub units: u64,
    /// Payouts, ordered by owner
    pub payouts: Vec<OwnerPayout>,
}

/// Issuance, transfer and destruction over one state context.
///
/// The market is not part of any state snapshot. Every operation validates
/// before it touches the market, and undoes its own reservation with
/// [`CapacityMarket::cancel`] if settling fails, so a failed operation never
/// leaves capacity bought or sold.
pub struct ResourceLedger<'a, M: CapacityMarket + ?Sized> {
    state: &'a mut DropsState,
    config: &'a DropsConfig,
    market: &'a mut M,
    outbox: &'a mut Outbox,
}

impl<'a, M: CapacityMarket + ?Sized> ResourceLedger<'a, M> {
    /// Borrow one operation's state, config, market and outbox.
    pub fn new(
        state: &'a mut DropsState,
        config: &'a DropsConfig,
        market: &'a mut M,
        outbox: &'a mut Outbox,
    ) -> Self {
        Self {
            state,
            config,
            market,
            outbox,
        }
    }

    /// Capacity units an issuance of `count` tokens to `payer` would reserve.
    pub fn required_units(&self, payer: &AccountId, count: u32) -> Result<u64> {
        let epoch = self.state.current_epoch()?;
        let overflow = || DropsError::invalid("Token count overflows capacity units");
        let mut units = u64::from(count)
            .checked_mul(self.config.units_per_token()?)
            .ok_or_else(overflow)?;
        if self.state.account_total(payer).is_none() {
            units = units
                .checked_add(self.config.account_row_units)
                .ok_or_else(overflow)?;
        }
        if self.state.epoch_stat(payer, epoch).is_none() {
            units = units
                .checked_add(self.config.epoch_stat_row_units)
                .ok_or_else(overflow)?;
        }
        Ok(units)
    }

    /// Capacity held by the records of `count` tokens.
    fn record_units(&self, count: u64) -> Result<u64> {
        count
            .checked_mul(self.config.token_record_units)
            .ok_or_else(|| DropsError::invalid("Token count overflows capacity units"))
    }

    /// Mint `count` tokens for `payer`, paid from `funds`.
    pub fn issue(
        &mut self,
        payer: &AccountId,
        funds: Amount,
        count: u32,
        seed: &str,
    ) -> Result<IssueReceipt> {
        if funds.is_zero() {
            return Err(DropsError::invalid("The transaction amount must be a positive value"));
        }
        if count == 0 {
            return Err(DropsError::invalid(
                "The amount of tokens to generate must be a positive value",
            ));
        }
        if seed.chars().count() < self.config.min_seed_len {
            return Err(DropsError::invalid(format!(
                "Seed must be at least {} characters in length",
                self.config.min_seed_len
            )));
        }
        self.state.ensure_enabled()?;

        let units = self.required_units(payer, count)?;
        let reservation = self.market.reserve(units)?;

        match self.settle_issue(payer, funds, count, seed, units) {
            Ok(receipt) => {
                self.market.confirm(reservation);
                Ok(receipt)
            }
            Err(err) => {
                debug!(payer = %payer, units, error = %err, "Cancelling capacity reservation");
                self.market.cancel(reservation);
                Err(err)
            }
        }
    }

    fn settle_issue(
        &mut self,
        payer: &AccountId,
        funds: Amount,
        count: u32,
        seed: &str,
        units: u64,
    ) -> Result<IssueReceipt> {
        let epoch = self.state.current_epoch()?;

        // Quoted after the reservation moved the price. Checked before any id
        // is derived so an underfunded request does no per-token work.
        let cost = self.market.buy_cost(units);
        let refund = funds
            .checked_sub(cost)
            .ok_or(DropsError::InsufficientFunds {
                required: cost,
                provided: funds,
            })?;

        let mut tokens = Vec::with_capacity(count as usize);
        let mut minted = BTreeSet::new();
        for index in 0..count {
            let id = token_id(index, seed);
            if self.state.tokens.contains_key(&id) || !minted.insert(id) {
                return Err(DropsError::TokenIdCollision { token: id });
            }
            tokens.push(id);
        }

        for id in &tokens {
            self.state.tokens.insert(
                *id,
                TokenRecord {
                    id: *id,
                    owner: payer.clone(),
                    epoch,
                },
            );
        }
        let BalanceSnapshot {
            total,
            epoch: epoch_tokens,
        } = balances::apply_delta(self.state, payer, epoch, i64::from(count))?;

        if !refund.is_zero() {
            self.outbox.push(Notification::FundsTransfer {
                to: payer.clone(),
                amount: refund,
                memo: String::new(),
            });
        }

        info!(payer = %payer, count, epoch, units, cost = %cost, refund = %refund, "Tokens issued");
        Ok(IssueReceipt {
            count,
            epoch,
            units,
            cost,
            refund,
            total_tokens: total,
            epoch_tokens,
            tokens,
        })
    }

    /// Handle a funds transfer notification from the host.
    ///
    /// Transfers that are not purchases (not addressed to the contract, sent by
    /// the contract or the market, or carrying the bypass memo) are ignored.
    pub fn on_funds_received(&mut self, transfer: &IncomingTransfer) -> Result<Option<IssueReceipt>> {
        if transfer.to != self.config.contract
            || transfer.from == self.config.contract
            || transfer.from == self.config.market_account
            || transfer.memo == self.config.bypass_memo
        {
            debug!(from = %transfer.from, to = %transfer.to, "Ignoring funds transfer");
            return Ok(None);
        }

        let order = parse_issue_memo(&transfer.memo)?;
        self.issue(&transfer.from, transfer.quantity, order.count, &order.seed)
            .map(Some)
    }

    /// Move `ids` from `from` to `to`. No capacity changes hands.
    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, ids: &[TokenId]) -> Result<()> {
        self.state.ensure_enabled()?;
        if from == to {
            return Err(DropsError::invalid("Cannot transfer tokens to the same account"));
        }
        let per_epoch = self.owned_by_epoch(from, ids)?;

        for id in ids {
            if let Some(token) = self.state.tokens.get_mut(id) {
                token.owner = to.clone();
            }
        }
        for (&epoch, &count) in &per_epoch {
            let count = signed(count)?;
            balances::apply_delta(self.state, from, epoch, -count)?;
            balances::apply_delta(self.state, to, epoch, count)?;
        }

        for recipient in [from, to] {
            self.outbox.push(Notification::TransferNotice {
                recipient: recipient.clone(),
                from: from.clone(),
                to: to.clone(),
                tokens: ids.to_vec(),
            });
        }

        info!(from = %from, to = %to, count = ids.len(), "Tokens transferred");
        Ok(())
    }

    /// Destroy `ids` and pay the resale value of their capacity to `owner`.
    pub fn destroy(&mut self, owner: &AccountId, ids: &[TokenId]) -> Result<DestroyReceipt> {
        self.state.ensure_enabled()?;
        let per_epoch = self.owned_by_epoch(owner, ids)?;

        let count = ids.len() as u64;
        let units = self.record_units(count)?;
        let proceeds = self.market.release(units)?;

        for id in ids {
            self.state.tokens.remove(id);
        }
        for (&epoch, &n) in &per_epoch {
            balances::apply_delta(self.state, owner, epoch, -signed(n)?)?;
        }

        if !proceeds.is_zero() {
            self.outbox.push(Notification::FundsTransfer {
                to: owner.clone(),
                amount: proceeds,
                memo: format!("Reclaimed capacity value of {count} token(s)"),
            });
        }

        info!(owner = %owner, count, units, proceeds = %proceeds, "Tokens destroyed");
        Ok(DestroyReceipt { units, proceeds })
    }

    /// Destroy every outstanding token and refund each former owner.
    ///
    /// Each owner's payout is quoted separately for that owner's units at the
    /// price before the release, then all capacity is released at once.
    pub fn destroy_all(&mut self) -> Result<DestroyAllReceipt> {
        let mut per_owner: BTreeMap<AccountId, u64> = BTreeMap::new();
        for token in self.state.tokens.values() {
            *per_owner.entry(token.owner.clone()).or_insert(0) += 1;
        }

        let tokens: u64 = per_owner.values().sum();
        if tokens == 0 {
            return Ok(DestroyAllReceipt::default());
        }
        let units = self.record_units(tokens)?;

        let payouts = per_owner
            .into_iter()
            .map(|(owner, count)| {
                Ok(OwnerPayout {
                    proceeds: self.market.sell_proceeds(self.record_units(count)?),
                    owner,
                    tokens: count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.market.release(units)?;

        self.state.tokens.clear();
        self.state.accounts.values_mut().for_each(|total| *total = 0);
        self.state.epoch_stats.values_mut().for_each(|count| *count = 0);

        for payout in &payouts {
            if payout.proceeds.is_zero() {
                continue;
            }
            self.outbox.push(Notification::FundsTransfer {
                to: payout.owner.clone(),
                amount: payout.proceeds,
                memo: format!(
                    "Reset - Reclaimed capacity value of {} token(s)",
                    payout.tokens
                ),
            });
        }

        info!(tokens, units, owners = payouts.len(), "All tokens destroyed");
        Ok(DestroyAllReceipt {
            tokens,
            units,
            payouts,
        })
    }

    /// Create a zero-balance stat row for (`account`, `epoch`).
    pub fn enroll(&mut self, account: &AccountId, epoch: EpochNumber) -> Result<()> {
        self.state.ensure_enabled()?;
        if !balances::ensure_rows(self.state, account, epoch) {
            return Err(DropsError::AlreadyEnrolled {
                account: account.clone(),
                epoch,
            });
        }
        debug!(account = %account, epoch, "Account enrolled");
        Ok(())
    }

    /// Check that `owner` holds every id exactly once; count them per
    /// creation epoch.
    fn owned_by_epoch(
        &self,
        owner: &AccountId,
        ids: &[TokenId],
    ) -> Result<BTreeMap<EpochNumber, u64>> {
        if ids.is_empty() {
            return Err(DropsError::invalid("No tokens were provided"));
        }

        let mut seen = BTreeSet::new();
        let mut per_epoch = BTreeMap::new();
        for &id in ids {
            if !seen.insert(id) {
                return Err(DropsError::invalid(format!("Token {id} listed more than once")));
            }
            let token = self.state.token(id)?;
            if &token.owner != owner {
                return Err(DropsError::NotOwner {
                    account: owner.clone(),
                    token: id,
                });
            }
            *per_epoch.entry(token.epoch).or_insert(0u64) += 1;
        }
        Ok(per_epoch)
    }
}

fn signed(count: u64) -> Result<i64> {
    i64::try_from(count).map_err(|_| DropsError::invalid("Token count out of range"))
}
