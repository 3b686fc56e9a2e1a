use thiserror::Error;

use crate::ProcessId;

/// The Error type for the message-passing seam.
#[derive(Error, Debug)]
pub enum Error {
    /// A send carried a zero-length payload, which would desynchronize
    /// whatever framing the receiver expects on that tag.
    #[error("refusing to send a zero-size payload to {0:?} (tag {1:?})")]
    SendZeroSize(ProcessId, crate::Tag),
    /// The named peer is not part of this transport's world.
    #[error("no such process: {0:?}")]
    NoSuchProcess(ProcessId),
    /// The transport has been shut down and can no longer carry traffic.
    #[error("transport closed")]
    Closed,
}
