//! The message-passing seam the coordinator is generic over: a small set
//! of transport-level tags (§6 of the engine's wire protocol), a
//! [`Transport`] trait shaped around non-blocking polls and a
//! timeout-bounded blocking receive, and one in-process, channel-backed
//! implementation used for single-host runs and tests.
//!
//! A real multi-host transport (MPI, TCP, ...) is a Non-goal of this
//! engine; client code that needs one implements [`Transport`] itself.

mod channel;
/// Error-related type definitions.
pub mod error;
mod process;
mod tag;

use std::time::Duration;

pub use channel::ChannelTransport;
pub use error::Error;
pub use process::ProcessId;
pub use tag::Tag;

/// One message in flight: who sent it, under which tag, carrying what
/// bytes (empty for the purely-signaling tags; see [`Tag::expects_payload`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The sending rank.
    pub from: ProcessId,
    /// The transport-level tag this message was sent under.
    pub tag: Tag,
    /// The message's raw payload, already framed by the caller if needed.
    pub payload: Vec<u8>,
}

/// The message-passing seam a coordinator is generic over.
///
/// Implementations need not be thread-safe across concurrent callers --
/// each process (one OS thread, in the in-process implementation; one
/// address space, in a real deployment) owns exactly one [`Transport`]
/// instance and drives it from a single control-flow loop, per the
/// engine's single-threaded-cooperative scheduling model.
pub trait Transport: Send {
    /// This process's own rank in the transport's world.
    fn rank(&self) -> ProcessId;

    /// The total number of processes (hub included) in the world.
    fn world_size(&self) -> usize;

    /// Sends `payload` to `to` under `tag`. Fails with
    /// [`Error::SendZeroSize`] if `tag` expects a non-empty payload and
    /// `payload` is empty -- that combination would desynchronize
    /// whatever framing the receiver expects to decode.
    fn send(&self, to: ProcessId, tag: Tag, payload: Vec<u8>) -> Result<(), Error>;

    /// Sends `payload` to every other rank in the world under `tag`.
    fn broadcast(&self, tag: Tag, payload: Vec<u8>) -> Result<(), Error>;

    /// Returns the next queued message, if any, without blocking.
    fn try_recv(&self) -> Option<Message>;

    /// Blocks for up to `timeout` waiting for the next message. Bounding
    /// the wait lets a process that has no local work still wake up
    /// periodically to run its load-balance and termination checks.
    fn recv_timeout(&self, timeout: Duration) -> Option<Message>;
}
