//! Drops runtime
//!
//! [`DropsRuntime`] owns the state tables, the outbox and the two external
//! collaborators, and exposes every externally invoked operation. Each mutating
//! operation runs as one unit of work: the state and the outbox watermark are
//! captured up front and restored if the operation fails, so callers observe
//! either all of an operation's writes or none of them.
//!
//! Notifications produced by committed operations stay in the outbox until the
//! host collects them with [`DropsRuntime::drain_outbox`].

use crate::auth::{require_admin, require_auth};
use drops_core::{
    AccountId, Amount, CapacityMarket, DropsConfig, DropsState, EpochNumber,
    EpochRecord, Hash32, Notification, Outbox, PhysicalClock, PhysicalTime, Result, TokenId,
};
use drops_ledger::{
    DestroyAllReceipt, DestroyReceipt, IncomingTransfer, IssueReceipt, ResourceLedger,
};
use drops_oracle::{registry, scheduler, FinalizationStatus};
use tracing::{info, warn};

/// Borrowed view of the runtime handed to one operation.
struct UnitOfWork<'a, M> {
    state: &'a mut DropsState,
    config: &'a DropsConfig,
    market: &'a mut M,
    outbox: &'a mut Outbox,
    now: PhysicalTime,
}

impl<'a, M: CapacityMarket> UnitOfWork<'a, M> {
    fn ledger(&mut self) -> ResourceLedger<'_, M> {
        ResourceLedger::new(
            &mut *self.state,
            self.config,
            &mut *self.market,
            &mut *self.outbox,
        )
    }
}

/// Entry point for every drops operation.
pub struct DropsRuntime<M, C> {
    config: DropsConfig,
    state: DropsState,
    market: M,
    clock: C,
    outbox: Outbox,
}

impl<M: CapacityMarket, C: PhysicalClock> DropsRuntime<M, C> {
    /// Create an empty, uninitialized runtime.
    pub fn new(config: DropsConfig, market: M, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: DropsState::new(),
            market,
            clock,
            outbox: Outbox::new(),
        })
    }

    /// Configuration the runtime was created with.
    pub fn config(&self) -> &DropsConfig {
        &self.config
    }

    /// Read-only view of the state tables.
    pub fn state(&self) -> &DropsState {
        &self.state
    }

    /// Capacity market backing the tokens.
    pub fn market(&self) -> &M {
        &self.market
    }

    /// Clock the epoch phases are read from.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Notifications committed but not yet collected.
    pub fn pending_notifications(&self) -> &[Notification] {
        self.outbox.messages()
    }

    /// Hand committed notifications to the host for dispatch.
    pub fn drain_outbox(&mut self) -> Vec<Notification> {
        self.outbox.drain()
    }

    /// Run `operation` as one all-or-nothing unit of work.
    ///
    /// Only the state tables and the outbox are snapshotted; the clone costs
    /// one copy of every table, tokens included. The market is not captured:
    /// a ledger operation must finish validating before it buys or sells
    /// capacity, and must cancel its own reservation on failure.
    fn atomic<T>(
        &mut self,
        name: &'static str,
        operation: impl FnOnce(&mut UnitOfWork<'_, M>) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.physical_time();
        let snapshot = self.state.clone();
        let mark = self.outbox.len();

        let mut unit = UnitOfWork {
            state: &mut self.state,
            config: &self.config,
            market: &mut self.market,
            outbox: &mut self.outbox,
            now,
        };

        operation(&mut unit).map_err(|err| {
            self.state = snapshot;
            self.outbox.truncate(mark);
            warn!(operation = name, code = err.code(), error = %err, "Operation rolled back");
            err
        })
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Create epoch 1 from the current oracle registry. The system starts
    /// disabled.
    pub fn init(&mut self, caller: &AccountId) -> Result<EpochRecord> {
        require_admin(&self.config, caller)?;
        self.atomic("init", |unit| {
            scheduler::initialize(unit.state, unit.config, unit.now)
        })
    }

    /// Erase every table, the oracle registry and subscriber list included.
    ///
    /// Capacity held by the market is not released; call
    /// [`DropsRuntime::destroy_all`] first to refund token holders.
    pub fn wipe(&mut self, caller: &AccountId) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("wipe", |unit| {
            let tokens = unit.state.tokens.len();
            *unit.state = DropsState::new();
            warn!(tokens, "All state wiped");
            Ok(())
        })
    }

    /// Turn commits, reveals and token operations on or off.
    pub fn enable(&mut self, caller: &AccountId, enabled: bool) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("enable", |unit| {
            unit.state.global_mut()?.enabled = enabled;
            info!(enabled, "System enable flag set");
            Ok(())
        })
    }

    /// Register an oracle for epochs created from now on.
    pub fn add_oracle(&mut self, caller: &AccountId, oracle: AccountId) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("add_oracle", |unit| registry::add_oracle(unit.state, oracle))
    }

    /// Deregister an oracle. Epochs already created keep their snapshot.
    pub fn remove_oracle(&mut self, caller: &AccountId, oracle: &AccountId) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("remove_oracle", |unit| registry::remove_oracle(unit.state, oracle))
    }

    /// Notify `subscriber` of every new epoch.
    pub fn subscribe(&mut self, caller: &AccountId, subscriber: AccountId) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("subscribe", |unit| registry::subscribe(unit.state, subscriber))
    }

    /// Stop notifying `subscriber`.
    pub fn unsubscribe(&mut self, caller: &AccountId, subscriber: &AccountId) -> Result<()> {
        require_admin(&self.config, caller)?;
        self.atomic("unsubscribe", |unit| {
            registry::unsubscribe(unit.state, subscriber)
        })
    }

    // ------------------------------------------------------------------
    // Epochs and entropy
    // ------------------------------------------------------------------

    /// Advance until the active epoch ends in the future, creating one epoch
    /// per elapsed phase. Returns the new active epoch.
    pub fn advance(&mut self) -> Result<EpochRecord> {
        self.atomic("advance", |unit| {
            scheduler::advance_to_present(unit.state, unit.config, unit.now, unit.outbox)
        })
    }

    /// Advance exactly one epoch.
    pub fn advance_once(&mut self) -> Result<EpochRecord> {
        self.atomic("advance_once", |unit| {
            scheduler::advance(unit.state, unit.config, unit.now, unit.outbox)
        })
    }

    /// Record `oracle`'s commitment digest during `epoch`'s commit phase.
    pub fn commit(
        &mut self,
        caller: &AccountId,
        oracle: &AccountId,
        epoch: EpochNumber,
        digest: Hash32,
    ) -> Result<()> {
        require_auth(caller, oracle)?;
        self.atomic("commit", |unit| {
            drops_oracle::commit(unit.state, unit.now, oracle.clone(), epoch, digest)
        })
    }

    /// Reveal the payload behind `oracle`'s commitment, finalizing the epoch
    /// once every snapshotted oracle has revealed.
    pub fn reveal(
        &mut self,
        caller: &AccountId,
        oracle: &AccountId,
        epoch: EpochNumber,
        payload: String,
    ) -> Result<FinalizationStatus> {
        require_auth(caller, oracle)?;
        self.atomic("reveal", |unit| {
            drops_oracle::reveal(unit.state, unit.now, oracle.clone(), epoch, payload)
        })
    }

    /// Recovery path: finalize `epoch` if all its oracles have revealed.
    pub fn finalize_if_ready(&mut self, epoch: EpochNumber) -> Result<FinalizationStatus> {
        self.atomic("finalize_if_ready", |unit| {
            drops_oracle::finalize_if_ready(unit.state, epoch)
        })
    }

    /// Entropy over the payloads revealed for `epoch` so far.
    pub fn compute_epoch_entropy(&self, epoch: EpochNumber) -> Result<Hash32> {
        drops_oracle::compute_epoch_entropy(&self.state, epoch)
    }

    /// Value of `token` under `epoch`'s finalized entropy.
    pub fn compute_item_value(&self, epoch: EpochNumber, token: TokenId) -> Result<Hash32> {
        drops_oracle::derive_item_value(&self.state, epoch, token)
    }

    /// Value of `token` under the most recent epoch that can be finalized.
    pub fn compute_latest_item_value(&self, token: TokenId) -> Result<(EpochNumber, Hash32)> {
        drops_oracle::derive_latest_item_value(&self.state, token)
    }

    /// Like [`DropsRuntime::compute_latest_item_value`], and notify
    /// `recipient` of the result.
    pub fn compute_latest_item_value_for(
        &mut self,
        token: TokenId,
        recipient: AccountId,
    ) -> Result<(EpochNumber, Hash32)> {
        self.atomic("compute_latest_item_value_for", |unit| {
            let (epoch, value) = drops_oracle::derive_latest_item_value(unit.state, token)?;
            unit.outbox.push(Notification::ValueComputed {
                recipient,
                epoch,
                token,
                value,
            });
            Ok((epoch, value))
        })
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Mint `count` tokens for `payer` from `seed`, paid from `funds`.
    pub fn issue(
        &mut self,
        caller: &AccountId,
        payer: &AccountId,
        funds: Amount,
        count: u32,
        seed: &str,
    ) -> Result<IssueReceipt> {
        require_auth(caller, payer)?;
        self.atomic("issue", |unit| unit.ledger().issue(payer, funds, count, seed))
    }

    /// Entry point for funds transfers reported by the host's funds ledger.
    pub fn on_funds_received(&mut self, transfer: &IncomingTransfer) -> Result<Option<IssueReceipt>> {
        self.atomic("on_funds_received", |unit| {
            unit.ledger().on_funds_received(transfer)
        })
    }

    /// Move `tokens` from `from` to `to`.
    pub fn transfer(
        &mut self,
        caller: &AccountId,
        from: &AccountId,
        to: &AccountId,
        tokens: &[TokenId],
    ) -> Result<()> {
        require_auth(caller, from)?;
        self.atomic("transfer", |unit| unit.ledger().transfer(from, to, tokens))
    }

    /// Destroy `owner`'s `tokens` and pay out their capacity's resale value.
    pub fn destroy(
        &mut self,
        caller: &AccountId,
        owner: &AccountId,
        tokens: &[TokenId],
    ) -> Result<DestroyReceipt> {
        require_auth(caller, owner)?;
        self.atomic("destroy", |unit| unit.ledger().destroy(owner, tokens))
    }

    /// Destroy every token and refund all owners.
    pub fn destroy_all(&mut self, caller: &AccountId) -> Result<DestroyAllReceipt> {
        require_admin(&self.config, caller)?;
        self.atomic("destroy_all", |unit| unit.ledger().destroy_all())
    }

    /// Create `account`'s rows for `epoch` without minting.
    pub fn enroll(&mut self, caller: &AccountId, account: &AccountId, epoch: EpochNumber) -> Result<()> {
        require_auth(caller, account)?;
        self.atomic("enroll", |unit| unit.ledger().enroll(account, epoch))
    }
}

impl<M, C> std::fmt::Debug for DropsRuntime<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropsRuntime")
            .field("contract", &self.config.contract)
            .field("epoch", &self.state.global.as_ref().map(|g| g.epoch))
            .field("tokens", &self.state.tokens.len())
            .field("pending_notifications", &self.outbox.len())
            .finish_non_exhaustive()
    }
}

