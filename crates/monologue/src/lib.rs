//! # Monologue
//!
//! A single-receiver messaging primitive. One [`Actor`] wraps one behavior
//! function; callers get fire-and-forget delivery ([`Actor::send`]),
//! request/reply with a deadline ([`Actor::call`]), persistent reply
//! listeners ([`Actor::subscribe`]) and terminal shutdown ([`Actor::close`]).
//! The behavior answers through the [`Capabilities`] handle it receives with
//! each message.
//!
//! Every message is deep-copied before delivery (see [`snapshot`]), so caller
//! and behavior never share mutable state. All actor state is owned by a
//! single mailbox task and every operation is processed in submission order,
//! which settles each race (reply versus timeout, close versus delivery) by
//! queue position rather than by locking.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use monologue::{Actor, Capabilities};
//!
//! async fn demo() -> Result<(), monologue::ActorError> {
//!     let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
//!         caps.emit(message.to_uppercase());
//!     });
//!
//!     let reply = actor.call(&"hi".to_string(), Duration::from_secs(1)).await?;
//!     assert_eq!(reply, "HI");
//!
//!     actor.close();
//!     assert!(actor.send(&"anyone?".to_string()).await.is_err());
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod id;
pub mod logging;
pub mod snapshot;

pub use actor::{Actor, ActorError, Capabilities, Subscription, DEFAULT_CALL_TIMEOUT};
pub use id::ActorId;
pub use snapshot::{CloneSnapshot, JsonSnapshot, SnapshotError, SnapshotStrategy};
