//! # Message Snapshots
//!
//! Every accepted delivery hands the behavior an independent deep copy of the
//! caller's message, taken before dispatch. Once a snapshot is made, nothing
//! the caller does to the original value can reach the behavior, and nothing
//! the behavior does can reach the caller.
//!
//! The copy step is a pluggable [`SnapshotStrategy`] so the actor core stays
//! agnostic about what makes a message copyable. The default strategy
//! round-trips through `serde_json`, which doubles as the arbiter of what a
//! message may contain: values JSON cannot express fail loudly at the
//! submission site instead of arriving aliased.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to produce an independent copy of a message.
///
/// Carries the rendered reason rather than the underlying error so it stays
/// cheap to clone and compare.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{reason}")]
pub struct SnapshotError {
    reason: String,
}

impl SnapshotError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Deep-copy seam invoked once per `send`/`call`, before delivery.
///
/// A strategy must return a value sharing no mutable state with the original.
/// "Cannot represent this message" is an error, never a silent shallow copy.
pub trait SnapshotStrategy<M>: Send + Sync {
    fn snapshot(&self, message: &M) -> Result<M, SnapshotError>;
}

/// Default strategy: serialize to JSON and deserialize back.
///
/// Anything that survives the round trip is an independent copy by
/// construction. Payloads JSON has no shape for (non-string map keys, live
/// handles) are rejected here.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSnapshot;

impl<M> SnapshotStrategy<M> for JsonSnapshot
where
    M: Serialize + DeserializeOwned,
{
    fn snapshot(&self, message: &M) -> Result<M, SnapshotError> {
        let bytes = serde_json::to_vec(message)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Strategy for plain-data messages whose `Clone` already deep-copies.
///
/// The caller vouches that cloning does not alias; a message holding an `Arc`
/// or similar shared handle does not qualify.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneSnapshot;

impl<M: Clone> SnapshotStrategy<M> for CloneSnapshot {
    fn snapshot(&self, message: &M) -> Result<M, SnapshotError> {
        Ok(message.clone())
    }
}
