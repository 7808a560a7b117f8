//! # Actor Types
//!
//! Core types shared across the actor system: the error taxonomy, the default
//! call deadline, the capability handle behaviors receive, and the operation
//! enum the mailbox task processes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::id::ActorId;
use crate::snapshot::SnapshotError;

use super::listeners::ListenerId;

/// Deadline applied to `call` when the caller has no tighter bound in mind.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// # ActorError
///
/// ## Purpose
///
/// Every way a `send` or `call` can fail. Errors are returned to the caller,
/// never logged and never retried. An error here does not mean the actor
/// crashed, only that this submission was refused or produced no reply in
/// time.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorError {
    /// The behavior has been dropped; the actor accepts nothing further.
    #[error("actor {0} is already closed")]
    Closed(ActorId),

    /// No reply reached the call's listener within the caller's deadline.
    #[error("actor {0} did not answer within {1:?}")]
    Timeout(ActorId, Duration),

    /// The message could not be deep-copied for delivery.
    #[error("failed to snapshot message: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Boxed behavior invoked once per accepted delivery, on its own task.
pub(crate) type Behavior<M, R> =
    Arc<dyn Fn(Capabilities<R>, M) -> BoxFuture<'static, ()> + Send + Sync>;

/// Operations accepted by the mailbox task.
///
/// Variants that need an answer carry a oneshot sender for it. The mailbox
/// finishes each operation before picking up the next, which is the entire
/// mutual-exclusion story for the closed state and the listener registry.
#[derive(Debug)]
pub(crate) enum MailboxOp<M, R> {
    /// Fire-and-forget delivery, acknowledged once the behavior has been
    /// dispatched or refused.
    Deliver {
        message: M,
        dispatched_tx: oneshot::Sender<Result<(), ActorError>>,
    },
    /// Request/reply delivery. Registering the reply sink and dispatching the
    /// message happen as one step so no close can land in between.
    Call {
        message: M,
        token: ListenerId,
        reply_tx: oneshot::Sender<R>,
        dispatched_tx: oneshot::Sender<Result<(), ActorError>>,
    },
    /// Register a persistent listener.
    Subscribe {
        token: ListenerId,
        reply_tx: mpsc::UnboundedSender<R>,
        registered_tx: oneshot::Sender<()>,
    },
    /// Drop the registration keyed by `token`; unknown tokens are a no-op.
    Unsubscribe { token: ListenerId },
    /// Broadcast a reply to every registered listener.
    Emit { value: R },
    /// Report whether the behavior is still in place.
    IsClosed { response_tx: oneshot::Sender<bool> },
    /// Drop the behavior and drain the registry. Terminal and idempotent.
    Close,
}

/// Type-erased channel back into the mailbox, carrying only reply-typed
/// operations. Behaviors and subscriptions hold this instead of a full sender
/// so they stay independent of the message type.
pub(crate) trait MailboxPort<R>: Send + Sync {
    fn emit(&self, value: R);
    fn close(&self);
    fn unsubscribe(&self, token: ListenerId);
}

/// Ports hold weak senders: a behavior that stashes its capabilities must not
/// keep an abandoned mailbox alive. After teardown every method is a no-op.
impl<M, R> MailboxPort<R> for mpsc::WeakUnboundedSender<MailboxOp<M, R>>
where
    M: Send + 'static,
    R: Send + 'static,
{
    fn emit(&self, value: R) {
        if let Some(ops) = self.upgrade() {
            let _ = ops.send(MailboxOp::Emit { value });
        }
    }

    fn close(&self) {
        if let Some(ops) = self.upgrade() {
            let _ = ops.send(MailboxOp::Close);
        }
    }

    fn unsubscribe(&self, token: ListenerId) {
        if let Some(ops) = self.upgrade() {
            let _ = ops.send(MailboxOp::Unsubscribe { token });
        }
    }
}

/// # Capabilities
///
/// ## Purpose
///
/// The handle a behavior receives alongside each message. `emit` broadcasts a
/// reply to every listener registered at processing time; `close` moves the
/// actor to its terminal state.
///
/// Both are plain synchronous calls, safe at any point in the invocation, and
/// both quietly become no-ops once the actor is gone, so a behavior may clone
/// and keep this handle without pinning the actor in memory.
pub struct Capabilities<R> {
    port: Arc<dyn MailboxPort<R>>,
}

impl<R> Capabilities<R> {
    pub(crate) fn new(port: Arc<dyn MailboxPort<R>>) -> Self {
        Self { port }
    }

    /// Broadcast `value` to every listener currently registered.
    pub fn emit(&self, value: R) {
        self.port.emit(value);
    }

    /// Close the actor. Terminal and idempotent; pending and later operations
    /// are rejected as closed.
    pub fn close(&self) {
        self.port.close();
    }
}

impl<R> Clone for Capabilities<R> {
    fn clone(&self) -> Self {
        Self {
            port: Arc::clone(&self.port),
        }
    }
}

impl<R> fmt::Debug for Capabilities<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
