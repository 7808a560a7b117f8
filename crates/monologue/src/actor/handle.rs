//! # Actor Handle
//!
//! The public face of an actor: a cheap-to-clone handle whose operations all
//! travel over the mailbox queue. Handles never touch actor state directly;
//! they submit an operation and await the mailbox's answer, so every
//! interleaving question is settled by queue order.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::debug;

use crate::id::ActorId;
use crate::snapshot::{JsonSnapshot, SnapshotStrategy};

use super::listeners::ListenerId;
use super::mailbox::Mailbox;
use super::types::{ActorError, Behavior, Capabilities, MailboxOp, MailboxPort};

/// # Actor
///
/// ## Purpose
///
/// A single-receiver messaging primitive: one behavior function invoked once
/// per accepted message, plus a registry of reply listeners. The handle
/// exposes fire-and-forget delivery (`send`), request/reply with a deadline
/// (`call`), persistent listeners (`subscribe`) and terminal shutdown
/// (`close`).
///
/// Cloning an `Actor` clones the handle, not the actor; every clone addresses
/// the same mailbox. Once the last handle and every capability are gone, the
/// mailbox task stops on its own.
pub struct Actor<M, R> {
    id: ActorId,
    ops: mpsc::UnboundedSender<MailboxOp<M, R>>,
    snapshot: Arc<dyn SnapshotStrategy<M>>,
}

impl<M, R> Actor<M, R>
where
    M: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Spawn an actor around `behavior`, deep-copying messages through the
    /// default JSON snapshot strategy.
    ///
    /// The behavior runs once per accepted message, on its own task, with a
    /// [`Capabilities`] handle for emitting replies and closing the actor.
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F, Fut>(behavior: F) -> Self
    where
        M: Serialize + DeserializeOwned,
        F: Fn(Capabilities<R>, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_snapshot(behavior, JsonSnapshot)
    }

    /// Spawn an actor with a caller-chosen [`SnapshotStrategy`].
    pub fn spawn_with_snapshot<F, Fut, S>(behavior: F, snapshot: S) -> Self
    where
        F: Fn(Capabilities<R>, M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        S: SnapshotStrategy<M> + 'static,
    {
        let id = ActorId::generate();
        let behavior: Behavior<M, R> =
            Arc::new(move |capabilities, message| behavior(capabilities, message).boxed());
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let mailbox = Mailbox::new(id.clone(), behavior, ops_rx, ops_tx.downgrade());
        tokio::spawn(mailbox.run());
        debug!(actor_id = %id, "actor spawned");
        Self {
            id,
            ops: ops_tx,
            snapshot: Arc::new(snapshot),
        }
    }

    /// The actor's opaque identifier, as carried in error values and logs.
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Deliver a message without waiting for any reply.
    ///
    /// The message is deep-copied before submission; mutations the caller
    /// makes afterwards are invisible to the behavior. Resolution means the
    /// invocation was dispatched, not that it ran to completion.
    ///
    /// ## Returns
    ///
    /// * `Ok(())` - The behavior was handed its own copy of the message
    /// * `Err(ActorError::Closed)` - The actor was closed before dispatch
    /// * `Err(ActorError::Snapshot)` - The message could not be deep-copied
    pub async fn send(&self, message: &M) -> Result<(), ActorError> {
        let message = self.snapshot.snapshot(message)?;
        let (dispatched_tx, dispatched_rx) = oneshot::channel();
        self.ops
            .send(MailboxOp::Deliver {
                message,
                dispatched_tx,
            })
            .map_err(|_| ActorError::Closed(self.id.clone()))?;
        match dispatched_rx.await {
            Ok(result) => result,
            // Mailbox gone between submit and ack: same as closed.
            Err(_) => Err(ActorError::Closed(self.id.clone())),
        }
    }

    /// Deliver a message and wait for the first reply, up to `deadline`.
    ///
    /// Registering the one-shot reply listener and dispatching the message
    /// happen as a single mailbox step, so an emission cannot miss the caller
    /// and a concurrent close cannot strand it. The first emission after
    /// registration completes the call and consumes the listener; if the
    /// deadline passes first, the listener is removed instead. Exactly one of
    /// the two happens.
    ///
    /// Replies are not routed per request: whichever emission reaches the
    /// registry first satisfies every call listener pending at that moment.
    ///
    /// ## Parameters
    ///
    /// * `message` - Value to deliver; deep-copied before submission
    /// * `deadline` - How long to wait for a reply. `Duration::ZERO` times
    ///   out immediately unless a reply is already available.
    ///   [`DEFAULT_CALL_TIMEOUT`](crate::DEFAULT_CALL_TIMEOUT) is a
    ///   reasonable pick when nothing tighter applies.
    ///
    /// ## Returns
    ///
    /// * `Ok(reply)` - First reply emitted within the deadline
    /// * `Err(ActorError::Timeout)` - No reply within `deadline`
    /// * `Err(ActorError::Closed)` - Closed before dispatch, or closed while
    ///   the call was waiting
    /// * `Err(ActorError::Snapshot)` - The message could not be deep-copied
    pub async fn call(&self, message: &M, deadline: Duration) -> Result<R, ActorError> {
        let message = self.snapshot.snapshot(message)?;
        let token = ListenerId::generate();
        let (reply_tx, reply_rx) = oneshot::channel();
        let (dispatched_tx, dispatched_rx) = oneshot::channel();
        self.ops
            .send(MailboxOp::Call {
                message,
                token,
                reply_tx,
                dispatched_tx,
            })
            .map_err(|_| ActorError::Closed(self.id.clone()))?;
        // Removal is keyed and idempotent, so the guard fires on every exit:
        // a no-op after a consumed reply, the actual cleanup after a timeout
        // or a dropped call future.
        let _guard = ListenerGuard {
            ops: self.ops.clone(),
            token,
        };
        match dispatched_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(error),
            Err(_) => return Err(ActorError::Closed(self.id.clone())),
        }
        match timeout(deadline, reply_rx).await {
            Ok(Ok(value)) => Ok(value),
            // Registry torn down with our listener still in it.
            Ok(Err(_)) => Err(ActorError::Closed(self.id.clone())),
            Err(_) => Err(ActorError::Timeout(self.id.clone(), deadline)),
        }
    }

    /// Close the actor. Terminal and idempotent.
    ///
    /// The behavior is dropped, every registered listener (calls currently
    /// waiting included) is rejected as closed, and all later submissions are
    /// refused. In-flight behavior invocations are not interrupted, but their
    /// emissions land in an empty registry.
    pub fn close(&self) {
        let _ = self.ops.send(MailboxOp::Close);
    }

    /// Whether the actor has reached its terminal closed state.
    pub async fn is_closed(&self) -> bool {
        let (response_tx, response_rx) = oneshot::channel();
        if self.ops.send(MailboxOp::IsClosed { response_tx }).is_err() {
            return true;
        }
        response_rx.await.unwrap_or(true)
    }

    /// Register a persistent listener for every reply this actor emits.
    ///
    /// Replies arrive in emission order. The registration lives until the
    /// [`Subscription`] is dropped or the actor closes; subscribing to a
    /// closed actor yields a stream that ends immediately.
    pub async fn subscribe(&self) -> Subscription<R> {
        let token = ListenerId::generate();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (registered_tx, registered_rx) = oneshot::channel();
        let submitted = self
            .ops
            .send(MailboxOp::Subscribe {
                token,
                reply_tx,
                registered_tx,
            })
            .is_ok();
        if submitted {
            // Wait for the mailbox to pick the registration up so emissions
            // after this point are guaranteed to reach the subscription.
            let _ = registered_rx.await;
        }
        Subscription {
            token,
            replies: reply_rx,
            port: Arc::new(self.ops.downgrade()),
        }
    }
}

impl<M, R> Clone for Actor<M, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            ops: self.ops.clone(),
            snapshot: Arc::clone(&self.snapshot),
        }
    }
}

impl<M, R> fmt::Debug for Actor<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Sends the deregistration for a call's listener when the call completes or
/// its future is dropped mid-wait.
struct ListenerGuard<M, R> {
    ops: mpsc::UnboundedSender<MailboxOp<M, R>>,
    token: ListenerId,
}

impl<M, R> Drop for ListenerGuard<M, R> {
    fn drop(&mut self) {
        let _ = self.ops.send(MailboxOp::Unsubscribe { token: self.token });
    }
}

/// A persistent listener registration, produced by [`Actor::subscribe`].
///
/// Holds the receiving end of the reply stream; dropping it removes the
/// registration from the actor.
pub struct Subscription<R> {
    token: ListenerId,
    replies: mpsc::UnboundedReceiver<R>,
    port: Arc<dyn MailboxPort<R>>,
}

impl<R> Subscription<R> {
    /// Receive the next reply, in emission order. Returns `None` once the
    /// actor has closed or gone away and every reply already delivered has
    /// been consumed.
    pub async fn recv(&mut self) -> Option<R> {
        self.replies.recv().await
    }

    /// Take a reply if one is already buffered. `None` means nothing is
    /// waiting right now, or the stream has ended.
    pub fn try_recv(&mut self) -> Option<R> {
        self.replies.try_recv().ok()
    }

    /// Deregister now instead of on drop.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<R> Drop for Subscription<R> {
    fn drop(&mut self) {
        self.port.unsubscribe(self.token);
    }
}

impl<R> fmt::Debug for Subscription<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
