use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::Error;
use crate::process::ProcessId;
use crate::tag::Tag;
use crate::{Message, Transport};

/// An in-process, channel-backed [`Transport`]: every rank in the world
/// runs on its own OS thread and holds a [`Sender`] to every peer plus its
/// own [`Receiver`]. Used for the driver's single-host mode and for
/// integration tests, where "process" means "thread" rather than a
/// separate address space -- a real multi-host transport (MPI, TCP, ...)
/// is out of this crate's scope, per the engine's Non-goals.
pub struct ChannelTransport {
    rank: ProcessId,
    world_size: usize,
    senders: Vec<Sender<Message>>,
    receiver: Receiver<Message>,
}

impl ChannelTransport {
    /// Builds one fully-connected endpoint per rank in `0..world_size`,
    /// rank 0 being the hub by convention.
    pub fn in_process_world(world_size: usize) -> Vec<ChannelTransport> {
        let mut senders = Vec::with_capacity(world_size);
        let mut receivers = Vec::with_capacity(world_size);
        for _ in 0..world_size {
            let (tx, rx) = mpsc::channel();
            senders.push(tx);
            receivers.push(rx);
        }
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ChannelTransport {
                rank: ProcessId(rank),
                world_size,
                senders: senders.clone(),
                receiver,
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> ProcessId {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn send(&self, to: ProcessId, tag: Tag, payload: Vec<u8>) -> Result<(), Error> {
        if tag.expects_payload() && payload.is_empty() {
            warn!(from = ?self.rank, ?to, ?tag, "refusing zero-size send on a payload-bearing tag");
            return Err(Error::SendZeroSize(to, tag));
        }
        let Some(sender) = self.senders.get(to.0) else {
            warn!(from = ?self.rank, ?to, ?tag, "no such process in this transport's world");
            return Err(Error::NoSuchProcess(to));
        };
        trace!(from = ?self.rank, ?to, ?tag, bytes = payload.len(), "sending message");
        sender
            .send(Message {
                from: self.rank,
                tag,
                payload,
            })
            .map_err(|_| {
                warn!(from = ?self.rank, ?to, ?tag, "peer's channel is closed");
                Error::Closed
            })
    }

    fn broadcast(&self, tag: Tag, payload: Vec<u8>) -> Result<(), Error> {
        trace!(from = ?self.rank, ?tag, world_size = self.world_size, "broadcasting message");
        for rank in 0..self.world_size {
            if rank == self.rank.0 {
                continue;
            }
            self.send(ProcessId(rank), tag, payload.clone())?;
        }
        Ok(())
    }

    fn try_recv(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }

    fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_and_receive_round_trips_a_payload() {
        let mut world = ChannelTransport::in_process_world(2);
        let worker = world.pop().unwrap();
        let hub = world.pop().unwrap();

        hub.send(ProcessId(1), Tag::Model, vec![1, 2, 3]).unwrap();
        let msg = worker.try_recv().unwrap();
        assert_eq!(msg.from, ProcessId(0));
        assert_eq!(msg.tag, Tag::Model);
        assert_eq!(msg.payload, vec![1, 2, 3]);
    }

    #[test]
    fn broadcast_reaches_every_other_rank_but_not_self() {
        let world = ChannelTransport::in_process_world(3);
        world[0].broadcast(Tag::Terminate, vec![0xFF]).unwrap();
        assert!(world[0].try_recv().is_none());
        assert_eq!(world[1].try_recv().unwrap().tag, Tag::Terminate);
        assert_eq!(world[2].try_recv().unwrap().tag, Tag::Terminate);
    }

    #[test]
    fn zero_size_payload_on_a_payload_bearing_tag_is_rejected() {
        let world = ChannelTransport::in_process_world(2);
        let err = world[0].send(ProcessId(1), Tag::Node, vec![]).unwrap_err();
        assert!(matches!(err, Error::SendZeroSize(ProcessId(1), Tag::Node)));
    }

    #[test]
    fn empty_payload_is_fine_on_a_pure_signal_tag() {
        let world = ChannelTransport::in_process_world(2);
        world[0].send(ProcessId(1), Tag::Terminate, vec![]).unwrap();
        assert_eq!(world[1].try_recv().unwrap().tag, Tag::Terminate);
    }

    #[test]
    fn recv_timeout_returns_none_when_nothing_arrives() {
        let world = ChannelTransport::in_process_world(2);
        let start = std::time::Instant::now();
        assert!(world[1].recv_timeout(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sending_to_an_unknown_rank_is_an_error() {
        let world = ChannelTransport::in_process_world(2);
        let err = world[0].send(ProcessId(5), Tag::Terminate, vec![]).unwrap_err();
        assert!(matches!(err, Error::NoSuchProcess(ProcessId(5))));
    }
}
