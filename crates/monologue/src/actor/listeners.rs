//! Reply listener registry.
//!
//! Owned by the mailbox task, which serializes every mutation and broadcast,
//! so nothing here locks. Entries keep insertion order (broadcast order is
//! registration order) and are keyed by token, making removal idempotent:
//! removing a token that was already consumed or removed is a no-op.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Correlation token tying a listener registration to whoever made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered reply sink. `Subscriber` stays until removed or its receiver
/// goes away; `Call` is consumed by the first broadcast that reaches it.
pub(crate) enum ReplySink<R> {
    Subscriber(mpsc::UnboundedSender<R>),
    Call(oneshot::Sender<R>),
}

/// Insertion-ordered, token-keyed set of reply sinks.
pub(crate) struct Listeners<R> {
    entries: Vec<(ListenerId, ReplySink<R>)>,
}

impl<R> Listeners<R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn insert(&mut self, token: ListenerId, sink: ReplySink<R>) {
        self.entries.push((token, sink));
    }

    /// Remove the registration keyed by `token`, reporting whether it was
    /// still present.
    pub(crate) fn remove(&mut self, token: ListenerId) -> bool {
        match self.entries.iter().position(|(id, _)| *id == token) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Deliver `value` to every sink in registration order and report how
    /// many deliveries landed. Call sinks are consumed by the pass; subscriber
    /// sinks whose receiver is gone are pruned.
    pub(crate) fn broadcast(&mut self, value: &R) -> usize
    where
        R: Clone,
    {
        let entries = std::mem::take(&mut self.entries);
        let mut kept = Vec::with_capacity(entries.len());
        let mut delivered = 0;
        for (token, sink) in entries {
            match sink {
                ReplySink::Subscriber(tx) => {
                    if tx.send(value.clone()).is_ok() {
                        delivered += 1;
                        kept.push((token, ReplySink::Subscriber(tx)));
                    }
                }
                ReplySink::Call(tx) => {
                    if tx.send(value.clone()).is_ok() {
                        delivered += 1;
                    }
                }
            }
        }
        self.entries = kept;
        delivered
    }

    /// Drop every registration. Pending call sinks see their channel close.
    pub(crate) fn drain(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}
