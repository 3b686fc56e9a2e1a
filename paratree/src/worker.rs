use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use paratree_core::knowledge::{self, MODEL_TAG};
use paratree_core::{Model, NodeDescription, NodeLogic, ParameterSet, SubtreeExecutor};
use paratree_framing::{FramedBuffer, Registry};
use paratree_transport::{Message, ProcessId, Tag, Transport};

use crate::config::RunConfig;
use crate::error::Error;
use crate::wire::{self, WorkerStats};

/// How long a worker blocks on a single receive while waiting for
/// something it cannot proceed without (startup messages). Generous, but
/// not infinite, so a lost hub surfaces as an error instead of a hang.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the worker role end to end (§4.8): receive the model and
/// parameters, receive the initial frontier, then alternate local subtree
/// work with message handling until told to terminate.
pub fn run<D, L, M>(
    transport: impl Transport,
    logic: L,
    config: RunConfig,
) -> Result<WorkerStats, Error>
where
    D: NodeDescription + 'static,
    L: NodeLogic<D>,
    M: Model + 'static,
{
    let rank = transport.rank();

    let mut registry = Registry::new();
    knowledge::register_default_knowledge::<D, M>(&mut registry);

    let model_msg = blocking_recv(&transport, STARTUP_TIMEOUT)?;
    let mut model_buf = FramedBuffer::from_wire(&model_msg.payload)?;
    debug_assert_eq!(model_buf.type_tag(), MODEL_TAG);
    let model: Arc<M> = knowledge::decode_model::<M>(&registry, &mut model_buf)?;

    let params_msg = blocking_recv(&transport, STARTUP_TIMEOUT)?;
    let mut params_buf = FramedBuffer::from_wire(&params_msg.payload)?;
    let params = ParameterSet::unpack(&mut params_buf)?;
    // `logic` already closes over its own model handle (the driver builds
    // every process's logic from the same broadcast model); decoding it
    // here exercises the wire round trip without being consulted further.
    drop(model);
    info!(rank = rank.0, "received model and parameters");

    let mut executor = SubtreeExecutor::<D>::new_empty();
    loop {
        let msg = blocking_recv(&transport, STARTUP_TIMEOUT)?;
        match msg.tag {
            Tag::Node => {
                let mut buf = FramedBuffer::from_wire(&msg.payload)?;
                let node = knowledge::decode_node::<D>(&registry, &mut buf)?;
                executor.insert_remote_root(node);
            }
            Tag::FinishInit => break,
            other => {
                debug!(rank = rank.0, tag = ?other, "unexpected message during init");
            }
        }
    }
    info!(rank = rank.0, pending = executor.pending(), "received initial frontier");

    let mut solutions = paratree_core::SolutionPool::new(config.solution_capacity);
    let mut paused = false;
    let mut nodes_processed: u64 = 0;
    let mut solutions_found: u64 = 0;
    let mut reported_idle = false;

    'outer: loop {
        if !paused && executor.pending() > 0 {
            let before_cutoff = solutions.cutoff();
            let did = executor.bounded_unit(&logic, &mut solutions, config.bounded_unit)?;
            nodes_processed += did as u64;
            if solutions.cutoff() != before_cutoff {
                solutions_found += 1;
                if let Some(incumbent) = solutions.incumbent() {
                    transport.send(
                        ProcessId::HUB,
                        Tag::Incumbent,
                        wire::encode_incumbent(incumbent.objective(), rank.0),
                    )?;
                }
            }
        }

        if executor.pending() == 0 && !reported_idle {
            transport.send(ProcessId::HUB, Tag::Idle, vec![0])?;
            reported_idle = true;
        } else if executor.pending() > 0 {
            reported_idle = false;
        }

        let poll = if executor.pending() == 0 || paused {
            transport.recv_timeout(config.coord_period)
        } else {
            transport.try_recv()
        };

        let Some(msg) = poll else { continue };
        match msg.tag {
            Tag::AskDonor => {
                let receiver = wire::decode_ask_donor(&msg.payload)?;
                if let Some(node) = executor.take_best() {
                    let mut buf = FramedBuffer::new(knowledge::NODE_TAG);
                    node.encode(&mut buf);
                    transport.send(ProcessId(receiver), Tag::Node, buf.to_wire())?;
                } else {
                    transport.send(ProcessId::HUB, Tag::Idle, vec![0])?;
                }
            }
            Tag::AskLoad => {
                let load = load_metric(&executor, &solutions, config.load_exponent);
                transport.send(ProcessId::HUB, Tag::LoadReport, wire::encode_load_report(load))?;
            }
            Tag::AskPause => paused = true,
            Tag::AskCont => paused = false,
            Tag::IncumbentUpdate => {
                let value = wire::decode_incumbent_update(&msg.payload)?;
                solutions.install_cutoff(value);
                debug!(rank = rank.0, value, "installed peer incumbent as cutoff");
            }
            Tag::Node => {
                let mut buf = FramedBuffer::from_wire(&msg.payload)?;
                let node = knowledge::decode_node::<D>(&registry, &mut buf)?;
                executor.insert_remote_root(node);
                reported_idle = false;
            }
            Tag::Terminate => break 'outer,
            other => {
                debug!(rank = rank.0, tag = ?other, "unexpected message in main loop");
            }
        }
    }

    let best = solutions.incumbent().map(|s| (**s).clone());
    let stats = WorkerStats {
        nodes_processed,
        solutions_found,
        best,
    };
    transport.send(ProcessId::HUB, Tag::Stats, stats.encode())?;
    info!(rank = rank.0, nodes_processed, solutions_found, "worker terminated");
    Ok(stats)
}

/// The load a worker reports to the hub: `sum(|incumbent - quality|^rho)`
/// over every pending node, falling back to 0 when there is no incumbent
/// yet to measure distance from (§4.7).
fn load_metric<D>(
    executor: &SubtreeExecutor<D>,
    solutions: &paratree_core::SolutionPool,
    rho: f64,
) -> f64
where
    D: NodeDescription,
{
    let Some(incumbent) = solutions.cutoff() else {
        return executor.pending() as f64;
    };
    executor
        .pending_qualities()
        .map(|q| (incumbent - q).abs().powf(rho))
        .sum()
}

/// Blocks in bounded slices until a message arrives or `budget` elapses.
fn blocking_recv(transport: &impl Transport, budget: Duration) -> Result<Message, Error> {
    let slice = Duration::from_millis(200).min(budget);
    let mut waited = Duration::ZERO;
    loop {
        if let Some(msg) = transport.recv_timeout(slice) {
            return Ok(msg);
        }
        waited += slice;
        if waited >= budget {
            return Err(Error::WorkerLost(ProcessId::HUB));
        }
    }
}
