//! # Actor Mailbox
//!
//! The task that owns an actor's state. The behavior slot and the listener
//! registry live here and nowhere else; every public operation arrives as a
//! [`MailboxOp`] and is processed to completion, in order, one at a time.
//! Whether the behavior slot is occupied is the single source of truth for
//! open versus closed.
//!
//! The mailbox never awaits a behavior. Invocations are handed to their own
//! task so a slow or stuck behavior cannot stall the registry or the closed
//! check.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::id::ActorId;

use super::listeners::{Listeners, ReplySink};
use super::types::{ActorError, Behavior, Capabilities, MailboxOp};

pub(crate) struct Mailbox<M, R> {
    id: ActorId,
    behavior: Option<Behavior<M, R>>,
    listeners: Listeners<R>,
    ops_rx: mpsc::UnboundedReceiver<MailboxOp<M, R>>,
    /// Weak handle to our own queue, cloned into each invocation's
    /// capabilities. Weak, so the task still winds down once every external
    /// handle is gone.
    ops_weak: mpsc::WeakUnboundedSender<MailboxOp<M, R>>,
}

impl<M, R> Mailbox<M, R>
where
    M: Send + 'static,
    R: Clone + Send + 'static,
{
    pub(crate) fn new(
        id: ActorId,
        behavior: Behavior<M, R>,
        ops_rx: mpsc::UnboundedReceiver<MailboxOp<M, R>>,
        ops_weak: mpsc::WeakUnboundedSender<MailboxOp<M, R>>,
    ) -> Self {
        Self {
            id,
            behavior: Some(behavior),
            listeners: Listeners::new(),
            ops_rx,
            ops_weak,
        }
    }

    /// Process operations until every sender is gone.
    pub(crate) async fn run(mut self) {
        debug!(actor_id = %self.id, "mailbox started");
        while let Some(op) = self.ops_rx.recv().await {
            self.handle_op(op);
        }
        debug!(actor_id = %self.id, "mailbox stopped");
    }

    fn handle_op(&mut self, op: MailboxOp<M, R>) {
        match op {
            MailboxOp::Deliver {
                message,
                dispatched_tx,
            } => {
                let _ = dispatched_tx.send(self.dispatch(message));
            }
            MailboxOp::Call {
                message,
                token,
                reply_tx,
                dispatched_tx,
            } => {
                if self.behavior.is_none() {
                    let _ = dispatched_tx.send(Err(ActorError::Closed(self.id.clone())));
                    return;
                }
                self.listeners.insert(token, ReplySink::Call(reply_tx));
                debug!(
                    actor_id = %self.id,
                    %token,
                    listeners = self.listeners.len(),
                    "call listener registered"
                );
                let _ = dispatched_tx.send(self.dispatch(message));
            }
            MailboxOp::Subscribe {
                token,
                reply_tx,
                registered_tx,
            } => {
                // A closed actor registers nothing; dropping the sink here
                // ends the subscription stream right away.
                if self.behavior.is_some() {
                    self.listeners.insert(token, ReplySink::Subscriber(reply_tx));
                    debug!(
                        actor_id = %self.id,
                        %token,
                        listeners = self.listeners.len(),
                        "listener registered"
                    );
                }
                let _ = registered_tx.send(());
            }
            MailboxOp::Unsubscribe { token } => {
                if self.listeners.remove(token) {
                    debug!(actor_id = %self.id, %token, "listener removed");
                }
            }
            MailboxOp::Emit { value } => {
                let delivered = self.listeners.broadcast(&value);
                debug!(actor_id = %self.id, delivered, "reply broadcast");
            }
            MailboxOp::IsClosed { response_tx } => {
                let _ = response_tx.send(self.behavior.is_none());
            }
            MailboxOp::Close => self.close(),
        }
    }

    /// Hand `message` to the behavior on its own task, or refuse it when the
    /// behavior is already gone.
    fn dispatch(&mut self, message: M) -> Result<(), ActorError> {
        let Some(behavior) = self.behavior.as_ref() else {
            return Err(ActorError::Closed(self.id.clone()));
        };
        let capabilities = Capabilities::new(Arc::new(self.ops_weak.clone()));
        tokio::spawn(behavior(capabilities, message));
        Ok(())
    }

    fn close(&mut self) {
        if self.behavior.is_none() {
            return;
        }
        self.behavior = None;
        let dropped = self.listeners.drain();
        info!(actor_id = %self.id, dropped_listeners = dropped, "actor closed");
    }
}
