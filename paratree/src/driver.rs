//! Wires a model, its branching logic and a parameter set together with
//! an in-process [`ChannelTransport`] world and runs the whole search on
//! the current host: one thread for the hub, one per worker.

use std::sync::Arc;
use std::thread;

use paratree_core::{Model, NodeDescription, NodeLogic, ParameterSet};
use paratree_transport::{ChannelTransport, ProcessId};

use crate::config::RunConfig;
use crate::error::Error;
use crate::hub::{self, Report};
use crate::worker;

/// Runs a single-host search: spawns `config.workers` worker threads plus
/// the hub on the calling thread, and blocks until every process has
/// reported in after termination.
pub fn run_single_host<D, L, M>(
    model: Arc<M>,
    logic: L,
    root: D,
    root_quality: f64,
    params: ParameterSet,
    config: RunConfig,
) -> Result<Report, Error>
where
    D: NodeDescription + 'static,
    L: NodeLogic<D> + Clone + 'static,
    M: Model + 'static,
{
    let mut world = ChannelTransport::in_process_world(config.workers + 1);
    // `in_process_world` hands back ranks in ascending order; rank 0 is
    // the hub by the transport's own convention.
    world.reverse();
    let hub_transport = world.pop().expect("world has at least one rank");

    let mut handles = Vec::with_capacity(config.workers);
    for rank in 1..=config.workers {
        let transport = world.pop().expect("one transport per worker rank");
        let worker_logic = logic.clone();
        handles.push((
            rank,
            thread::spawn(move || worker::run::<D, L, M>(transport, worker_logic, config)),
        ));
    }

    let report = hub::run::<D, L, M>(hub_transport, model, logic, root, root_quality, params, config)?;

    for (rank, handle) in handles {
        match handle.join() {
            Ok(Ok(_stats)) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(Error::WorkerLost(ProcessId(rank))),
        }
    }

    Ok(report)
}
