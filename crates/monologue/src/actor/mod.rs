//! # Actor
//!
//! The actor primitive and its moving parts: the public [`Actor`] handle, the
//! mailbox task that owns all state, and the listener registry replies are
//! broadcast through.

pub mod handle;
pub mod types;

mod listeners;
mod mailbox;

pub use handle::{Actor, Subscription};
pub use types::{ActorError, Capabilities, DEFAULT_CALL_TIMEOUT};
