//! Scenario runner
//!
//! A scenario is a JSON document listing operations to apply, in order, to a
//! fresh runtime backed by a [`SimulatedMarket`] and a [`ManualClock`]. Every
//! step produces a [`StepReport`] with the operation's result or error and the
//! notifications it committed.
//!
//! ```json
//! {
//!   "start_secs": 125,
//!   "steps": [
//!     { "op": "add_oracle", "caller": "drops", "oracle": "alice" },
//!     { "op": "init", "caller": "drops" },
//!     { "op": "commit", "oracle": "alice", "epoch": 1, "payload": "secret" }
//!   ]
//! }
//! ```
//!
//! `caller` defaults to the principal the step names (oracle, payer, owner,
//! sender, account). Token lists may be given explicitly with `tokens` or as
//! `count`, which takes that many of the principal's tokens in id order.

use anyhow::{Context, Result};
use drops_core::hash::hash;
use drops_core::{
    AccountId, Amount, DropsConfig, DropsError, EpochNumber, ErrorKind, Notification,
    PhysicalTime, TokenId,
};
use drops_runtime::{DropsRuntime, FinalizationStatus, IncomingTransfer};
use drops_testkit::{ManualClock, SimulatedMarket};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

fn default_start_secs() -> u64 {
    120
}

/// Parameters of the simulated market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Funds backing the curve
    pub reserve_funds: u64,
    /// Units for sale at the start
    pub available_units: u64,
    /// Fee in basis points
    pub fee_bps: u16,
}

impl Default for MarketParams {
    fn default() -> Self {
        let snapshot = SimulatedMarket::default().snapshot();
        Self {
            reserve_funds: snapshot.reserve_funds,
            available_units: snapshot.available_units,
            fee_bps: SimulatedMarket::DEFAULT_FEE_BPS,
        }
    }
}

/// A scripted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Initial clock reading, in seconds
    #[serde(default = "default_start_secs")]
    pub start_secs: u64,
    /// Simulated market parameters
    #[serde(default)]
    pub market: MarketParams,
    /// Operations, applied in order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario document.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid scenario document")
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&content)
    }
}

/// Tokens named by a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSelection {
    /// Explicit token ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenId>,
    /// Otherwise, the first `count` tokens the account owns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// One scripted operation.
///
/// Field names follow the runtime operation of the same name. A `caller` left
/// out defaults to the principal the operation acts for.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Move the clock to an absolute time
    SetTime { secs: u64 },
    /// Move the clock forward
    Sleep { secs: u64 },
    /// Create epoch 1
    Init { caller: AccountId },
    /// Erase all state
    Wipe { caller: AccountId },
    /// Set the enable flag
    Enable { caller: AccountId, enabled: bool },
    /// Register an oracle
    AddOracle { caller: AccountId, oracle: AccountId },
    /// Deregister an oracle
    RemoveOracle { caller: AccountId, oracle: AccountId },
    /// Add an epoch subscriber
    Subscribe { caller: AccountId, subscriber: AccountId },
    /// Remove an epoch subscriber
    Unsubscribe { caller: AccountId, subscriber: AccountId },
    /// Catch up to the present epoch
    Advance,
    /// Advance a single epoch
    AdvanceOnce,
    /// Commit to `payload`; the runner hashes it
    Commit {
        caller: Option<AccountId>,
        oracle: AccountId,
        epoch: EpochNumber,
        payload: String,
    },
    /// Reveal a committed payload
    Reveal {
        caller: Option<AccountId>,
        oracle: AccountId,
        epoch: EpochNumber,
        payload: String,
    },
    /// Finalize an epoch whose oracles have all revealed
    FinalizeIfReady { epoch: EpochNumber },
    /// Mint tokens directly
    Issue {
        caller: Option<AccountId>,
        payer: AccountId,
        funds: Amount,
        count: u32,
        seed: String,
    },
    /// Incoming funds transfer; `to` defaults to the contract account
    Fund {
        from: AccountId,
        to: Option<AccountId>,
        quantity: Amount,
        memo: String,
    },
    /// Move tokens between accounts
    Transfer {
        caller: Option<AccountId>,
        from: AccountId,
        to: AccountId,
        #[serde(flatten)]
        selection: TokenSelection,
    },
    /// Destroy an owner's tokens
    Destroy {
        caller: Option<AccountId>,
        owner: AccountId,
        #[serde(flatten)]
        selection: TokenSelection,
    },
    /// Destroy every token
    DestroyAll { caller: AccountId },
    /// Create rows without minting
    Enroll {
        caller: Option<AccountId>,
        account: AccountId,
        epoch: EpochNumber,
    },
    /// Entropy of an epoch
    EpochEntropy { epoch: EpochNumber },
    /// Value of a token under an epoch
    ItemValue { epoch: EpochNumber, token: TokenId },
    /// Latest item value; notifies `recipient` when given
    LatestItemValue {
        token: TokenId,
        recipient: Option<AccountId>,
    },
}

/// Result of one step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Step succeeded
    Ok {
        /// Operation result as JSON
        result: Value,
    },
    /// Step failed and was rolled back
    Error {
        /// Stable error code
        code: &'static str,
        /// Error category
        kind: ErrorKind,
        /// Rendered error
        message: String,
    },
}

impl Outcome {
    /// Whether the step succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<DropsError> for Outcome {
    fn from(err: DropsError) -> Self {
        Self::Error {
            code: err.code(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Report for one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Position in the scenario
    pub index: usize,
    /// Clock reading after the step
    pub at: PhysicalTime,
    /// The step as parsed
    pub step: Step,
    /// Result or error
    pub outcome: Outcome,
    /// Notifications the step committed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
}

/// Applies scenario steps to a simulated runtime.
pub struct ScenarioRunner {
    runtime: DropsRuntime<SimulatedMarket, ManualClock>,
    clock: ManualClock,
}

impl ScenarioRunner {
    /// Fresh runtime on a manual clock and simulated market configured by
    /// `scenario`.
    pub fn new(config: DropsConfig, scenario: &Scenario) -> Result<Self> {
        let clock = ManualClock::at_secs(scenario.start_secs);
        let market = SimulatedMarket::with_fee(
            scenario.market.reserve_funds,
            scenario.market.available_units,
            scenario.market.fee_bps,
        );
        let runtime = DropsRuntime::new(config, market, clock.clone())?;
        Ok(Self { runtime, clock })
    }

    /// Runtime driven by the steps.
    pub fn runtime(&self) -> &DropsRuntime<SimulatedMarket, ManualClock> {
        &self.runtime
    }

    /// Run every step of `scenario`, stopping at the first failure when
    /// `fail_fast` is set.
    pub fn run(&mut self, scenario: &Scenario, fail_fast: bool) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            let report = self.apply(index, step)?;
            let failed = !report.outcome.is_ok();
            reports.push(report);
            if failed && fail_fast {
                info!(index, "Stopping at first failed step");
                break;
            }
        }
        Ok(reports)
    }

    /// Apply a single step.
    pub fn apply(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        debug!(index, ?step, "Applying step");
        let outcome = match self.execute(step)? {
            Ok(result) => Outcome::Ok { result },
            Err(err) => Outcome::from(err),
        };
        Ok(StepReport {
            index,
            at: self.clock.now(),
            step: step.clone(),
            outcome,
            notifications: self.runtime.drain_outbox(),
        })
    }

    /// Summary of the final state.
    pub fn summary(&self) -> Value {
        let state = self.runtime.state();
        let market = self.runtime.market().snapshot();
        json!({
            "epoch": state.global.as_ref().map(|g| g.epoch),
            "enabled": state.global.as_ref().map(|g| g.enabled),
            "tokens": state.tokens.len(),
            "balances": state.accounts,
            "entropy": state.entropy,
            "market": market,
        })
    }

    fn execute(&mut self, step: &Step) -> Result<std::result::Result<Value, DropsError>> {
        let rt = &mut self.runtime;
        match step {
            Step::SetTime { secs } => {
                self.clock.set(PhysicalTime::from_secs(*secs));
                render(Ok(self.clock.now()))
            }
            Step::Sleep { secs } => render(Ok(self.clock.advance(Duration::from_secs(*secs)))),
            Step::Init { caller } => render(rt.init(caller)),
            Step::Wipe { caller } => render(rt.wipe(caller)),
            Step::Enable { caller, enabled } => render(rt.enable(caller, *enabled)),
            Step::AddOracle { caller, oracle } => render(rt.add_oracle(caller, oracle.clone())),
            Step::RemoveOracle { caller, oracle } => render(rt.remove_oracle(caller, oracle)),
            Step::Subscribe { caller, subscriber } => {
                render(rt.subscribe(caller, subscriber.clone()))
            }
            Step::Unsubscribe { caller, subscriber } => {
                render(rt.unsubscribe(caller, subscriber))
            }
            Step::Advance => render(rt.advance()),
            Step::AdvanceOnce => render(rt.advance_once()),
            Step::Commit {
                caller,
                oracle,
                epoch,
                payload,
            } => {
                let digest = hash(payload.as_bytes());
                render(
                    rt.commit(caller.as_ref().unwrap_or(oracle), oracle, *epoch, digest)
                        .map(|()| json!({ "digest": digest })),
                )
            }
            Step::Reveal {
                caller,
                oracle,
                epoch,
                payload,
            } => render(
                rt.reveal(caller.as_ref().unwrap_or(oracle), oracle, *epoch, payload.clone())
                    .map(|status| finalization_json(&status)),
            ),
            Step::FinalizeIfReady { epoch } => render(
                rt.finalize_if_ready(*epoch)
                    .map(|status| finalization_json(&status)),
            ),
            Step::Issue {
                caller,
                payer,
                funds,
                count,
                seed,
            } => render(rt.issue(caller.as_ref().unwrap_or(payer), payer, *funds, *count, seed)),
            Step::Fund {
                from,
                to,
                quantity,
                memo,
            } => {
                let transfer = IncomingTransfer {
                    from: from.clone(),
                    to: to.clone().unwrap_or_else(|| rt.config().contract.clone()),
                    quantity: *quantity,
                    memo: memo.clone(),
                };
                render(rt.on_funds_received(&transfer))
            }
            Step::Transfer {
                caller,
                from,
                to,
                selection,
            } => {
                let tokens = select_tokens(rt, from, selection);
                render(
                    rt.transfer(caller.as_ref().unwrap_or(from), from, to, &tokens)
                        .map(|()| json!({ "tokens": tokens })),
                )
            }
            Step::Destroy {
                caller,
                owner,
                selection,
            } => {
                let tokens = select_tokens(rt, owner, selection);
                render(rt.destroy(caller.as_ref().unwrap_or(owner), owner, &tokens))
            }
            Step::DestroyAll { caller } => render(rt.destroy_all(caller)),
            Step::Enroll {
                caller,
                account,
                epoch,
            } => render(rt.enroll(caller.as_ref().unwrap_or(account), account, *epoch)),
            Step::EpochEntropy { epoch } => render(
                rt.compute_epoch_entropy(*epoch)
                    .map(|entropy| json!({ "entropy": entropy })),
            ),
            Step::ItemValue { epoch, token } => render(
                rt.compute_item_value(*epoch, *token)
                    .map(|value| json!({ "value": value })),
            ),
            Step::LatestItemValue { token, recipient } => {
                let result = match recipient {
                    Some(recipient) => rt.compute_latest_item_value_for(*token, recipient.clone()),
                    None => rt.compute_latest_item_value(*token),
                };
                render(result.map(|(epoch, value)| json!({ "epoch": epoch, "value": value })))
            }
        }
    }
}

/// Serialize a successful result; operation errors pass through untouched.
fn render<T: Serialize>(
    result: drops_core::Result<T>,
) -> Result<std::result::Result<Value, DropsError>> {
    match result {
        Ok(value) => {
            let value = serde_json::to_value(value).context("failed to serialize step result")?;
            Ok(Ok(value))
        }
        Err(err) => Ok(Err(err)),
    }
}

fn finalization_json(status: &FinalizationStatus) -> Value {
    match status {
        FinalizationStatus::AlreadyFinalized => json!({ "status": "already_finalized" }),
        FinalizationStatus::Pending { revealed, required } => {
            json!({ "status": "pending", "revealed": revealed, "required": required })
        }
        FinalizationStatus::Finalized { entropy } => {
            json!({ "status": "finalized", "entropy": entropy })
        }
    }
}

fn select_tokens(
    rt: &DropsRuntime<SimulatedMarket, ManualClock>,
    owner: &AccountId,
    selection: &TokenSelection,
) -> Vec<TokenId> {
    match selection.count {
        Some(count) if selection.tokens.is_empty() => rt
            .state()
            .tokens
            .values()
            .filter(|token| &token.owner == owner)
            .map(|token| token.id)
            .take(count)
            .collect(),
        _ => selection.tokens.clone(),
    }
}
