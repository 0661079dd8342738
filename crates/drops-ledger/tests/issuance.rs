//! Issuance, transfer and destruction scenarios
//!
//! Every test runs against a fresh enabled state in epoch 1 and the default
//! simulated market.

use assert_matches::assert_matches;
use drops_core::hash::hash;
use drops_core::{
    Amount, CapacityMarket, DropsConfig, DropsError, DropsState, Notification, Outbox, TokenId,
};
use drops_ledger::{inconsistent_accounts, token_id, IncomingTransfer, ResourceLedger};
use drops_testkit::{account, enabled_state, seed, SimulatedMarket, SEED};

struct Harness {
    config: DropsConfig,
    state: DropsState,
    market: SimulatedMarket,
    outbox: Outbox,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(DropsConfig::default())
    }

    fn with_config(config: DropsConfig) -> Self {
        let state = enabled_state(&config, &["oracle"]);
        Self {
            config,
            state,
            market: SimulatedMarket::default(),
            outbox: Outbox::new(),
        }
    }

    fn ledger(&mut self) -> ResourceLedger<'_, SimulatedMarket> {
        ResourceLedger::new(
            &mut self.state,
            &self.config,
            &mut self.market,
            &mut self.outbox,
        )
    }

    /// Cost the ledger will be charged for reserving `units` right now.
    fn quote(&self, units: u64) -> Amount {
        let mut market = self.market.clone();
        let reservation = market.reserve(units).unwrap();
        let cost = market.buy_cost(units);
        market.cancel(reservation);
        cost
    }

    fn mint(&mut self, owner: &str, count: u32, seed: &str) -> Vec<TokenId> {
        self.ledger()
            .issue(&account(owner), Amount(1_000_000_000), count, seed)
            .unwrap()
            .tokens
    }
}

// ============================================================================
// Issuance
// ============================================================================

#[test]
fn first_issue_reserves_surcharges_and_refunds_exact_change() {
    let mut h = Harness::new();
    let alice = account("alice");

    let units = 3 * (146 + 8) + 124 + 160;
    assert_eq!(h.ledger().required_units(&alice, 3).unwrap(), units);

    let cost = h.quote(units);
    let funds = Amount(cost.value() + 5_000);
    let receipt = h.ledger().issue(&alice, funds, 3, SEED).unwrap();

    assert_eq!(receipt.count, 3);
    assert_eq!(receipt.epoch, 1);
    assert_eq!(receipt.units, units);
    assert_eq!(receipt.cost, cost);
    assert_eq!(receipt.refund, Amount(5_000));
    assert_eq!(receipt.total_tokens, 3);
    assert_eq!(receipt.epoch_tokens, 3);
    assert_eq!(h.market.held_units(), units);

    assert_eq!(
        h.outbox.messages(),
        &[Notification::FundsTransfer {
            to: alice.clone(),
            amount: Amount(5_000),
            memo: String::new(),
        }]
    );

    for (i, id) in receipt.tokens.iter().enumerate() {
        let expected = hash(format!("{i}{SEED}").as_bytes()).truncate_u64();
        assert_eq!(id.value(), expected);
        let token = h.state.token(*id).unwrap();
        assert_eq!(token.owner, alice);
        assert_eq!(token.epoch, 1);
    }
}

#[test]
fn repeat_issue_in_same_epoch_pays_no_surcharge() {
    let mut h = Harness::new();
    let alice = account("alice");
    h.mint("alice", 1, &seed(1));
    assert_eq!(h.ledger().required_units(&alice, 2).unwrap(), 2 * 154);

    let receipt = h
        .ledger()
        .issue(&alice, Amount(1_000_000), 2, &seed(2))
        .unwrap();
    assert_eq!(receipt.units, 308);
    assert_eq!(receipt.total_tokens, 3);
}

#[test]
fn exact_funds_produce_no_refund_notice() {
    let mut h = Harness::new();
    let cost = h.quote(154 + 124 + 160);
    let receipt = h.ledger().issue(&account("bob"), cost, 1, SEED).unwrap();
    assert_eq!(receipt.refund, Amount::ZERO);
    assert!(h.outbox.is_empty());
}

#[test]
fn insufficient_funds_leave_market_and_state_untouched() {
    let mut h = Harness::new();
    let market_before = h.market.snapshot();
    let state_before = h.state.clone();

    let err = h
        .ledger()
        .issue(&account("alice"), Amount(1), 3, SEED)
        .unwrap_err();

    assert_matches!(err, DropsError::InsufficientFunds { provided: Amount(1), .. });
    assert_eq!(h.market.snapshot(), market_before);
    assert_eq!(h.state, state_before);
    assert!(h.outbox.is_empty());
}

#[test]
fn funds_are_checked_before_token_ids_are_derived() {
    let mut h = Harness::new();
    h.mint("alice", 2, SEED);
    let market_before = h.market.snapshot();

    // The seed collides, but the shortfall is reported first.
    let err = h
        .ledger()
        .issue(&account("bob"), Amount(1), 3, SEED)
        .unwrap_err();
    assert_matches!(err, DropsError::InsufficientFunds { .. });

    let err = h
        .ledger()
        .issue(&account("bob"), Amount(1_000_000), 400_000_000, &seed(7))
        .unwrap_err();
    assert_matches!(err, DropsError::InsufficientFunds { provided: Amount(1_000_000), .. });
    assert_eq!(h.market.snapshot(), market_before);
    assert_eq!(h.state.tokens.len(), 2);
}

#[test]
fn oversized_row_surcharge_is_rejected_not_wrapped() {
    let mut h = Harness::with_config(DropsConfig {
        account_row_units: u64::MAX,
        ..DropsConfig::default()
    });
    let alice = account("alice");

    assert_matches!(
        h.ledger().required_units(&alice, 1),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(
        h.ledger().issue(&alice, Amount(1_000_000), 1, SEED),
        Err(DropsError::Invalid { .. })
    );
    assert_eq!(h.market.snapshot().pending, 0);
}

#[test]
fn issue_input_validation() {
    let mut h = Harness::new();
    let alice = account("alice");
    let mut ledger = h.ledger();

    assert_matches!(
        ledger.issue(&alice, Amount::ZERO, 1, SEED),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(
        ledger.issue(&alice, Amount(10), 0, SEED),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(
        ledger.issue(&alice, Amount(10), 1, "too short"),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(
        ledger.issue(&alice, Amount(10), 1, ""),
        Err(DropsError::Invalid { .. })
    );
}

#[test]
fn issue_requires_enabled_system() {
    let mut h = Harness::new();
    h.state.global_mut().unwrap().enabled = false;
    assert_eq!(
        h.ledger()
            .issue(&account("alice"), Amount(1_000_000), 1, SEED)
            .unwrap_err(),
        DropsError::Disabled
    );
    assert_eq!(h.market.snapshot().pending, 0);
}

#[test]
fn reused_seed_is_a_collision() {
    let mut h = Harness::new();
    h.mint("alice", 2, SEED);
    let market_before = h.market.snapshot();

    let err = h
        .ledger()
        .issue(&account("bob"), Amount(1_000_000_000), 3, SEED)
        .unwrap_err();

    assert_eq!(
        err,
        DropsError::TokenIdCollision {
            token: token_id(0, SEED)
        }
    );
    assert_eq!(h.market.snapshot(), market_before);
    assert_eq!(h.state.tokens.len(), 2);
}

// ============================================================================
// Funds notifications
// ============================================================================

#[test]
fn funds_with_purchase_memo_issue_tokens() {
    let mut h = Harness::new();
    let transfer = IncomingTransfer {
        from: account("alice"),
        to: h.config.contract.clone(),
        quantity: Amount(1_000_000),
        memo: format!("2,{SEED}"),
    };
    let receipt = h.ledger().on_funds_received(&transfer).unwrap().unwrap();
    assert_eq!(receipt.count, 2);
    assert_eq!(h.state.account_total(&account("alice")), Some(2));
}

#[test]
fn non_purchase_transfers_are_ignored() {
    let mut h = Harness::new();
    let contract = h.config.contract.clone();
    let market = h.config.market_account.clone();
    let purchase = format!("1,{SEED}");

    let ignored = [
        (market, contract.clone(), purchase.clone()),
        (account("alice"), account("bob"), purchase.clone()),
        (contract.clone(), account("alice"), purchase),
        (account("alice"), contract, "bypass".to_string()),
    ];
    for (from, to, memo) in ignored {
        let transfer = IncomingTransfer {
            from,
            to,
            quantity: Amount(1_000_000),
            memo,
        };
        assert_eq!(h.ledger().on_funds_received(&transfer).unwrap(), None);
    }
    assert!(h.state.tokens.is_empty());
}

#[test]
fn malformed_memo_is_rejected() {
    let mut h = Harness::new();
    let transfer = IncomingTransfer {
        from: account("alice"),
        to: h.config.contract.clone(),
        quantity: Amount(1_000_000),
        memo: "hello".to_string(),
    };
    assert_matches!(
        h.ledger().on_funds_received(&transfer),
        Err(DropsError::Invalid { .. })
    );
}

// ============================================================================
// Transfer
// ============================================================================

#[test]
fn transfer_moves_balances_and_notifies_both_parties() {
    let mut h = Harness::new();
    let ids = h.mint("alice", 3, SEED);
    h.outbox.drain();
    let (alice, bob) = (account("alice"), account("bob"));

    h.ledger().transfer(&alice, &bob, &ids[..2]).unwrap();

    assert_eq!(h.state.account_total(&alice), Some(1));
    assert_eq!(h.state.account_total(&bob), Some(2));
    assert_eq!(h.state.epoch_stat(&bob, 1), Some(2));
    assert_eq!(h.state.token(ids[0]).unwrap().owner, bob);
    assert!(inconsistent_accounts(&h.state).is_empty());

    let recipients: Vec<_> = h.outbox.messages().iter().map(|m| m.recipient().clone()).collect();
    assert_eq!(recipients, vec![alice, bob]);
    assert_matches!(
        &h.outbox.messages()[0],
        Notification::TransferNotice { tokens, .. } if tokens.as_slice() == &ids[..2]
    );
}

#[test]
fn transfer_does_not_touch_the_market() {
    let mut h = Harness::new();
    let ids = h.mint("alice", 2, SEED);
    let before = h.market.snapshot();
    h.ledger()
        .transfer(&account("alice"), &account("bob"), &ids)
        .unwrap();
    assert_eq!(h.market.snapshot(), before);
}

#[test]
fn transfer_rejects_bad_requests_without_writes() {
    let mut h = Harness::new();
    let ids = h.mint("alice", 2, SEED);
    let before = h.state.clone();
    let (alice, bob) = (account("alice"), account("bob"));
    let mut ledger = h.ledger();

    assert_matches!(
        ledger.transfer(&bob, &alice, &ids),
        Err(DropsError::NotOwner { .. })
    );
    assert_matches!(
        ledger.transfer(&alice, &alice, &ids),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(ledger.transfer(&alice, &bob, &[]), Err(DropsError::Invalid { .. }));
    assert_matches!(
        ledger.transfer(&alice, &bob, &[ids[0], ids[0]]),
        Err(DropsError::Invalid { .. })
    );
    assert_matches!(
        ledger.transfer(&alice, &bob, &[ids[0], TokenId(42)]),
        Err(DropsError::TokenNotFound { .. })
    );
    assert_eq!(h.state, before);
}

// ============================================================================
// Destruction
// ============================================================================

#[test]
fn issue_then_destroy_round_trips_balances() {
    let mut h = Harness::new();
    let alice = account("alice");
    h.mint("alice", 2, &seed(1));
    let held_before = h.market.held_units();

    let ids = h.mint("alice", 5, &seed(2));
    h.outbox.drain();
    let receipt = h.ledger().destroy(&alice, &ids).unwrap();

    assert_eq!(receipt.units, 5 * 146);
    assert!(!receipt.proceeds.is_zero());
    assert_eq!(h.state.account_total(&alice), Some(2));
    assert_eq!(h.state.epoch_stat(&alice, 1), Some(2));
    assert_eq!(h.market.held_units(), held_before + 5 * 8);
    assert_eq!(
        h.outbox.messages(),
        &[Notification::FundsTransfer {
            to: alice,
            amount: receipt.proceeds,
            memo: "Reclaimed capacity value of 5 token(s)".to_string(),
        }]
    );
}

#[test]
fn destroy_requires_ownership() {
    let mut h = Harness::new();
    let ids = h.mint("alice", 1, SEED);
    let before = h.market.snapshot();
    assert_matches!(
        h.ledger().destroy(&account("bob"), &ids),
        Err(DropsError::NotOwner { .. })
    );
    assert_matches!(
        h.ledger().destroy(&account("alice"), &[]),
        Err(DropsError::Invalid { .. })
    );
    assert_eq!(h.market.snapshot(), before);
    assert_eq!(h.state.tokens.len(), 1);
}

#[test]
fn destroy_all_pays_each_owner_separately() {
    let mut h = Harness::new();
    h.mint("alice", 3, &seed(1));
    h.mint("bob", 1, &seed(2));
    h.outbox.drain();

    let alice_quote = h.market.sell_proceeds(3 * 146);
    let bob_quote = h.market.sell_proceeds(146);
    let receipt = h.ledger().destroy_all().unwrap();

    assert_eq!(receipt.tokens, 4);
    assert_eq!(receipt.units, 4 * 146);
    assert_eq!(receipt.payouts.len(), 2);
    assert_eq!(receipt.payouts[0].owner, account("alice"));
    assert_eq!(receipt.payouts[0].proceeds, alice_quote);
    assert_eq!(receipt.payouts[1].proceeds, bob_quote);

    assert!(h.state.tokens.is_empty());
    assert_eq!(h.state.account_total(&account("alice")), Some(0));
    assert_eq!(h.state.epoch_stat(&account("bob"), 1), Some(0));
    assert_eq!(h.outbox.len(), 2);
}

#[test]
fn destroy_all_on_empty_ledger_is_a_no_op() {
    let mut h = Harness::new();
    let receipt = h.ledger().destroy_all().unwrap();
    assert_eq!(receipt.tokens, 0);
    assert!(receipt.payouts.is_empty());
}

// ============================================================================
// Enrollment
// ============================================================================

#[test]
fn enroll_creates_rows_once() {
    let mut h = Harness::new();
    let carol = account("carol");
    h.ledger().enroll(&carol, 1).unwrap();
    assert_eq!(h.state.account_total(&carol), Some(0));
    assert_eq!(h.state.epoch_stat(&carol, 1), Some(0));
    assert_matches!(
        h.ledger().enroll(&carol, 1),
        Err(DropsError::AlreadyEnrolled { epoch: 1, .. })
    );

    // Enrolled accounts skip both surcharges.
    assert_eq!(h.ledger().required_units(&carol, 1).unwrap(), 154);
}
