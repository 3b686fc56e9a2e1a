//! Encodes and decodes the small, fixed-shape payloads carried by the
//! control tags (`INCUMBENT`, `LOAD_REPORT`, `ASK_DONOR`,
//! `INCUMBENT_UPDATE`, `STATS`) through the framing layer, so every
//! on-wire value -- not just `MODEL` and `NODE` -- goes through the same
//! length-prefixed, cursor-driven buffer.

use paratree_core::{Error as CoreError, Solution};
use paratree_framing::FramedBuffer;

/// `INCUMBENT(value, owner-id)`: a worker reporting a newly found or
/// improved solution's quality back to the hub.
pub fn encode_incumbent(value: f64, owner: usize) -> Vec<u8> {
    let mut buf = FramedBuffer::new("incumbent");
    buf.write(value);
    buf.write(owner as u64);
    buf.to_wire()
}

/// Inverse of [`encode_incumbent`].
pub fn decode_incumbent(payload: &[u8]) -> Result<(f64, usize), CoreError> {
    let mut buf = FramedBuffer::from_wire(payload)?;
    let value = buf.read::<f64>()?;
    let owner = buf.read::<u64>()? as usize;
    Ok((value, owner))
}

/// `INCUMBENT_UPDATE(value)`: the hub broadcasting a new global incumbent.
pub fn encode_incumbent_update(value: f64) -> Vec<u8> {
    let mut buf = FramedBuffer::new("incumbent_update");
    buf.write(value);
    buf.to_wire()
}

/// Inverse of [`encode_incumbent_update`].
pub fn decode_incumbent_update(payload: &[u8]) -> Result<f64, CoreError> {
    let mut buf = FramedBuffer::from_wire(payload)?;
    Ok(buf.read::<f64>()?)
}

/// `LOAD_REPORT(value)`: a worker's current load metric (§4.7).
pub fn encode_load_report(value: f64) -> Vec<u8> {
    let mut buf = FramedBuffer::new("load_report");
    buf.write(value);
    buf.to_wire()
}

/// Inverse of [`encode_load_report`].
pub fn decode_load_report(payload: &[u8]) -> Result<f64, CoreError> {
    let mut buf = FramedBuffer::from_wire(payload)?;
    Ok(buf.read::<f64>()?)
}

/// `ASK_DONOR(receiver-id)`: the hub asking a donor to ship nodes to an
/// underloaded peer.
pub fn encode_ask_donor(receiver: usize) -> Vec<u8> {
    let mut buf = FramedBuffer::new("ask_donor");
    buf.write(receiver as u64);
    buf.to_wire()
}

/// Inverse of [`encode_ask_donor`].
pub fn decode_ask_donor(payload: &[u8]) -> Result<usize, CoreError> {
    let mut buf = FramedBuffer::from_wire(payload)?;
    Ok(buf.read::<u64>()? as usize)
}

/// A worker's final report, sent once in reply to `TERMINATE`: how many
/// nodes it processed, how many solutions it found, and its own best
/// solution if it holds one -- the supplemented "final stats" feature
/// (see `SPEC_FULL.md`).
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// The total number of nodes this worker popped and processed.
    pub nodes_processed: u64,
    /// The total number of solutions this worker ever offered.
    pub solutions_found: u64,
    /// This worker's best retained solution, if any.
    pub best: Option<Solution>,
}

impl WorkerStats {
    /// Encodes this report for the `STATS` tag.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = FramedBuffer::new("stats");
        buf.write(self.nodes_processed);
        buf.write(self.solutions_found);
        buf.write(self.best.is_some());
        if let Some(best) = &self.best {
            best.encode(&mut buf);
        }
        buf.to_wire()
    }

    /// Inverse of [`Self::encode`].
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut buf = FramedBuffer::from_wire(payload)?;
        let nodes_processed = buf.read::<u64>()?;
        let solutions_found = buf.read::<u64>()?;
        let has_best = buf.read::<bool>()?;
        let best = if has_best {
            Some(Solution::decode(&mut buf)?)
        } else {
            None
        };
        Ok(WorkerStats {
            nodes_processed,
            solutions_found,
            best,
        })
    }
}
