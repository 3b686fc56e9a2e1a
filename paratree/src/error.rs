use thiserror::Error;

use paratree_transport::ProcessId;

/// The aggregate error type for the driver binary: every lower-layer
/// error (framing, core, transport) folds in here via `#[from]`, plus the
/// handful of conditions that only make sense at the coordinator level.
#[derive(Error, Debug)]
pub enum Error {
    /// A framed buffer failed to decode.
    #[error(transparent)]
    Framing(#[from] paratree_framing::Error),
    /// The search-node engine hit a fatal condition.
    #[error(transparent)]
    Core(#[from] paratree_core::Error),
    /// The message-passing seam hit a fatal condition.
    #[error(transparent)]
    Transport(#[from] paratree_transport::Error),
    /// A worker disconnected (its channel closed) before replying to
    /// `TERMINATE`.
    #[error("worker {0} did not acknowledge termination")]
    WorkerLost(ProcessId),
}
