//! Property tests for balance bookkeeping
//!
//! Random sequences of issue, transfer and destroy must keep every account's
//! total equal to the sum of its epoch counters, and the sum of all totals
//! equal to the number of outstanding tokens.

use drops_core::{AccountId, Amount, DropsConfig, DropsState, Outbox, TokenId};
use drops_ledger::{inconsistent_accounts, ResourceLedger};
use drops_oracle::scheduler;
use drops_testkit::{account, enabled_state, seed, SimulatedMarket};
use proptest::prelude::*;

const ACCOUNTS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Issue { who: usize, count: u32 },
    Transfer { from: usize, to: usize, take: usize },
    Destroy { who: usize, take: usize },
    Advance,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..ACCOUNTS.len(), 1u32..5).prop_map(|(who, count)| Op::Issue { who, count }),
        2 => (0..ACCOUNTS.len(), 0..ACCOUNTS.len(), 1usize..4)
            .prop_map(|(from, to, take)| Op::Transfer { from, to, take }),
        2 => (0..ACCOUNTS.len(), 1usize..4).prop_map(|(who, take)| Op::Destroy { who, take }),
        1 => Just(Op::Advance),
    ]
}

fn owned_by(state: &DropsState, owner: &AccountId, take: usize) -> Vec<TokenId> {
    state
        .tokens
        .values()
        .filter(|token| &token.owner == owner)
        .map(|token| token.id)
        .take(take)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: totals and epoch counters never drift apart
    #[test]
    fn totals_match_epoch_counters(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let config = DropsConfig::default();
        let mut state = enabled_state(&config, &["oracle"]);
        let mut market = SimulatedMarket::default();
        let mut outbox = Outbox::new();
        let mut seeds = 0u64;

        for op in ops {
            match op {
                Op::Issue { who, count } => {
                    seeds += 1;
                    let mut ledger = ResourceLedger::new(&mut state, &config, &mut market, &mut outbox);
                    ledger
                        .issue(&account(ACCOUNTS[who]), Amount(1_000_000_000), count, &seed(seeds))
                        .unwrap();
                }
                Op::Transfer { from, to, take } => {
                    let from = account(ACCOUNTS[from]);
                    let ids = owned_by(&state, &from, take);
                    let mut ledger = ResourceLedger::new(&mut state, &config, &mut market, &mut outbox);
                    let result = ledger.transfer(&from, &account(ACCOUNTS[to]), &ids);
                    prop_assert_eq!(result.is_ok(), !ids.is_empty() && ACCOUNTS[to] != from.as_str());
                }
                Op::Destroy { who, take } => {
                    let owner = account(ACCOUNTS[who]);
                    let ids = owned_by(&state, &owner, take);
                    let mut ledger = ResourceLedger::new(&mut state, &config, &mut market, &mut outbox);
                    let result = ledger.destroy(&owner, &ids);
                    prop_assert_eq!(result.is_ok(), !ids.is_empty());
                }
                Op::Advance => {
                    let end = state.epoch(state.current_epoch().unwrap()).unwrap().end;
                    scheduler::advance(&mut state, &config, end, &mut outbox).unwrap();
                }
            }

            prop_assert!(inconsistent_accounts(&state).is_empty());
            let total: u64 = state.accounts.values().sum();
            prop_assert_eq!(total, state.tokens.len() as u64);
        }
    }

    /// Property: issuing N then destroying them restores the owner's balance
    #[test]
    fn issue_destroy_round_trip(first in 1u32..6, n in 1u32..10) {
        let config = DropsConfig::default();
        let mut state = enabled_state(&config, &["oracle"]);
        let mut market = SimulatedMarket::default();
        let mut outbox = Outbox::new();
        let alice = account("alice");

        let mut ledger = ResourceLedger::new(&mut state, &config, &mut market, &mut outbox);
        ledger.issue(&alice, Amount(1_000_000_000), first, &seed(1)).unwrap();
        let before = ledger.issue(&alice, Amount(1_000_000_000), n, &seed(2)).unwrap();
        let receipt = ledger.destroy(&alice, &before.tokens).unwrap();

        prop_assert_eq!(receipt.units, u64::from(n) * config.token_record_units);
        prop_assert_eq!(state.account_total(&alice), Some(u64::from(first)));
        prop_assert!(inconsistent_accounts(&state).is_empty());
    }
}
