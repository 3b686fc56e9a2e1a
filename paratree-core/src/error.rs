use thiserror::Error;

use crate::node::Status;

/// The Error type for the search-node engine.
///
/// Decode failures bubble up from the framing layer unchanged, while
/// bad-status and empty-branch conditions are fatal client-misuse bugs
/// raised directly by the executor.
#[derive(Error, Debug)]
pub enum Error {
    /// A framed buffer failed to decode (overrun, unknown type, bad size).
    #[error("framing error: {0}")]
    Framing(#[from] paratree_framing::Error),
    /// A node surfaced a status the executor does not know how to dispatch
    /// on. Only `candidate`, `evaluated` and `pregnant` nodes may be popped
    /// from the node pool; anything else is a client bug.
    #[error("bad node status: a popped or processed node had status {0:?}, which is never valid there")]
    BadNodeStatus(Status),
    /// `branch` returned no children for a pregnant node.
    #[error("empty branch: branch() returned no children for a pregnant node")]
    EmptyBranch,
    /// A child descriptor from `branch` carried the `branched` status,
    /// which only ever results from the executor's own wiring.
    #[error("child carried status `branched`, which a client must never assign directly")]
    ChildBranchedStatus,
    /// A parameter file could not be opened.
    #[error("could not open parameter file '{0}': {1}")]
    ParameterFileUnopenable(std::path::PathBuf, std::io::Error),
}
