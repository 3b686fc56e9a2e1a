/// The message tags carried over the wire between hub and workers.
///
/// Matches the transport-level tag set exactly: each tag's direction and
/// payload shape are fixed by the protocol, not negotiated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// hub → worker (broadcast): framed model.
    Model,
    /// hub → worker (broadcast): framed parameter set.
    Params,
    /// hub ↔ worker, worker ↔ worker: size-prefixed framed node.
    Node,
    /// hub → worker: empty, ends the initial node-receiving phase.
    FinishInit,
    /// worker → hub: (quality, owner id).
    Incumbent,
    /// hub → worker: updated incumbent quality.
    IncumbentUpdate,
    /// worker → hub: this worker's current load metric.
    LoadReport,
    /// hub → worker: empty, requests a load report.
    AskLoad,
    /// hub → worker: asks the donor to ship nodes to the named receiver.
    AskDonor,
    /// hub → worker: empty, pause local subtree execution.
    AskPause,
    /// hub → worker: empty, resume local subtree execution.
    AskCont,
    /// worker → hub: empty, this worker's local pool is empty.
    Idle,
    /// hub → worker (broadcast): empty, cooperative shutdown signal.
    Terminate,
    /// worker → hub: this worker's final node/solution counters and its
    /// best local solution, sent once in reply to `Terminate`.
    ///
    /// Not part of the distilled wire table (§6); carried over from the
    /// original `AlpsMsgFinishedAlps` tag so the hub's final report (§4.7
    /// step 5) has something concrete to collect from each worker.
    Stats,
}

impl Tag {
    /// Whether this tag's payload is allowed to be empty on the wire.
    ///
    /// `FinishInit`, `AskLoad`, `AskDonor`'s own empty variants, `AskPause`,
    /// `AskCont`, `Idle` and `Terminate` carry no data beyond the tag
    /// itself; every other tag's meaning lives entirely in its payload, so
    /// a zero-size send under one of those tags would silently drop
    /// information the receiver expects to decode.
    pub fn expects_payload(self) -> bool {
        matches!(
            self,
            Tag::Model
                | Tag::Params
                | Tag::Node
                | Tag::Incumbent
                | Tag::IncumbentUpdate
                | Tag::LoadReport
                | Tag::AskDonor
                | Tag::Stats
        )
    }
}
