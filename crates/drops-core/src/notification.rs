//! Deferred notifications
//!
//! Operations never call out to other parties directly. Instead they append
//! messages to an [`Outbox`] that the runtime hands to the host after the
//! operation's unit of work commits. A rolled back operation takes its
//! messages with it.

use crate::amount::Amount;
use crate::hash::Hash32;
use crate::identifiers::{AccountId, EpochNumber, TokenId};
use serde::{Deserialize, Serialize};

/// Message addressed to another party on the host ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Signal to a subscriber that a new epoch started
    EpochAdvanced {
        /// Subscriber being notified
        subscriber: AccountId,
        /// Newly created epoch
        epoch: EpochNumber,
    },
    /// Tokens changed hands; sent to both parties
    TransferNotice {
        /// Party being notified
        recipient: AccountId,
        /// Previous owner
        from: AccountId,
        /// New owner
        to: AccountId,
        /// Tokens moved
        tokens: Vec<TokenId>,
    },
    /// Outgoing funds: refunds and resale proceeds
    FundsTransfer {
        /// Receiving account
        to: AccountId,
        /// Amount sent
        amount: Amount,
        /// Human-readable memo
        memo: String,
    },
    /// Result of a verification query forwarded to a third party
    ValueComputed {
        /// Party being notified
        recipient: AccountId,
        /// Epoch whose entropy was used
        epoch: EpochNumber,
        /// Token the value was derived for
        token: TokenId,
        /// Derived value
        value: Hash32,
    },
}

impl Notification {
    /// Account the message is delivered to.
    pub fn recipient(&self) -> &AccountId {
        match self {
            Self::EpochAdvanced { subscriber, .. } => subscriber,
            Self::TransferNotice { recipient, .. } => recipient,
            Self::FundsTransfer { to, .. } => to,
            Self::ValueComputed { recipient, .. } => recipient,
        }
    }
}

/// Ordered list of pending notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbox {
    messages: Vec<Notification>,
}

impl Outbox {
    /// Empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: Notification) {
        self.messages.push(message);
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message appended after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.messages.truncate(mark);
    }

    /// Pending messages in append order.
    pub fn messages(&self) -> &[Notification] {
        &self.messages
    }

    /// Take all pending messages.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_discards_messages_after_mark() {
        let mut outbox = Outbox::new();
        outbox.push(Notification::EpochAdvanced {
            subscriber: "sub".into(),
            epoch: 2,
        });
        let mark = outbox.len();
        outbox.push(Notification::FundsTransfer {
            to: "alice".into(),
            amount: Amount(10),
            memo: String::new(),
        });
        outbox.truncate(mark);
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.messages()[0].recipient().as_str(), "sub");
        assert_eq!(outbox.drain().len(), 1);
        assert!(outbox.is_empty());
    }
}
