// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of a submitted transaction, as reported by the wallet provider.

use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use alloy_primitives::B256;
use futures::{channel::mpsc, stream::BoxStream, Stream, StreamExt as _};
use serde::{Deserialize, Serialize};

use crate::contract::TransactionKind;

/// An event emitted by the wallet provider for a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    /// The provider accepted the transaction and assigned it a hash.
    HashAssigned(B256),
    /// The receipt is buried under `n` blocks.
    Confirmation(u64),
    /// The transaction was mined successfully.
    Receipt { block_number: u64 },
    /// The provider, the user or the contract rejected the transaction.
    Failed(String),
}

/// Where a submitted transaction stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Submitted,
    HashKnown { hash: B256 },
    Confirming { hash: B256, confirmations: u64 },
    Settled { hash: B256, block_number: u64 },
    Failed { message: String },
}

/// What changed after feeding an event to a [`TransactionState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    HashAssigned(B256),
    Confirmed(u64),
    Settled { hash: B256, block_number: u64 },
    Failed(String),
    /// The event does not apply in the current state and was dropped.
    Ignored,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Settled { .. } | TransactionState::Failed { .. }
        )
    }

    pub fn hash(&self) -> Option<B256> {
        match self {
            TransactionState::HashKnown { hash }
            | TransactionState::Confirming { hash, .. }
            | TransactionState::Settled { hash, .. } => Some(*hash),
            TransactionState::Submitted | TransactionState::Failed { .. } => None,
        }
    }

    /// Advances the state machine.
    ///
    /// A receipt or a confirmation is only accepted once the hash is known, and nothing is
    /// accepted after a terminal state.
    pub fn apply(&mut self, event: TransactionEvent) -> Transition {
        use TransactionEvent as E;
        use TransactionState as S;

        let (next, transition) = match (&*self, event) {
            (S::Settled { .. } | S::Failed { .. }, _) => return Transition::Ignored,
            (_, E::Failed(message)) => (
                S::Failed {
                    message: message.clone(),
                },
                Transition::Failed(message),
            ),
            (S::Submitted, E::HashAssigned(hash)) => {
                (S::HashKnown { hash }, Transition::HashAssigned(hash))
            }
            (S::Submitted, E::Confirmation(_) | E::Receipt { .. }) => return Transition::Ignored,
            (S::HashKnown { .. } | S::Confirming { .. }, E::HashAssigned(_)) => {
                return Transition::Ignored
            }
            (S::HashKnown { hash } | S::Confirming { hash, .. }, E::Confirmation(n)) => (
                S::Confirming {
                    hash: *hash,
                    confirmations: n,
                },
                Transition::Confirmed(n),
            ),
            (S::HashKnown { hash } | S::Confirming { hash, .. }, E::Receipt { block_number }) => (
                S::Settled {
                    hash: *hash,
                    block_number,
                },
                Transition::Settled {
                    hash: *hash,
                    block_number,
                },
            ),
        };
        *self = next;
        transition
    }
}

/// The stream of lifecycle events of one submitted transaction.
pub type TransactionEvents = BoxStream<'static, TransactionEvent>;

/// Creates a connected sender and event stream.
pub fn channel() -> (mpsc::UnboundedSender<TransactionEvent>, TransactionEvents) {
    let (sender, receiver) = mpsc::unbounded();
    (sender, receiver.boxed())
}

/// A transaction handed to the wallet provider, whose events have not been consumed yet.
pub struct PendingTransaction {
    kind: TransactionKind,
    events: TransactionEvents,
}

impl PendingTransaction {
    pub fn new(kind: TransactionKind, events: TransactionEvents) -> Self {
        Self { kind, events }
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Stream for PendingTransaction {
    type Item = TransactionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

#[cfg(test)]
#[path = "unit_tests/lifecycle_tests.rs"]
mod tests;
