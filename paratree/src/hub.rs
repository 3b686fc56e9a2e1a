use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use paratree_core::knowledge::{self, MODEL_TAG};
use paratree_core::{Context, Model, NodeDescription, NodeLogic, ParameterSet, SubtreeExecutor};
use paratree_framing::{FramedBuffer, Registry};
use paratree_transport::{ProcessId, Tag, Transport};

use crate::config::RunConfig;
use crate::error::Error;
use crate::wire::{self, WorkerStats};

/// The hub's final report: the globally best solution (if the search
/// found one) and each worker's own tally, gathered at shutdown.
#[derive(Debug, Default)]
pub struct Report {
    /// The best solution quality found anywhere, if the search found one.
    pub best_objective: Option<f64>,
    /// Per-worker rank, its final stats.
    pub worker_stats: HashMap<usize, WorkerStats>,
}

/// Runs the hub role end to end (§4.7): seed, distribute, coordinate
/// until termination, then collect each worker's final report.
pub fn run<D, L, M>(
    transport: impl Transport,
    model: Arc<M>,
    logic: L,
    root: D,
    root_quality: f64,
    params: ParameterSet,
    config: RunConfig,
) -> Result<Report, Error>
where
    D: NodeDescription + 'static,
    L: NodeLogic<D>,
    M: Model + 'static,
{
    let mut registry = Registry::new();
    knowledge::register_default_knowledge::<D, M>(&mut registry);
    let mut ctx = Context::new(Arc::clone(&model), params, registry, config.solution_capacity);

    // 1. Startup: broadcast the model, then the parameters.
    let mut model_buf = FramedBuffer::new(MODEL_TAG);
    model.encode(&mut model_buf);
    transport.broadcast(Tag::Model, model_buf.to_wire())?;

    let mut params_buf = FramedBuffer::new("params");
    ctx.params().pack(&mut params_buf);
    transport.broadcast(Tag::Params, params_buf.to_wire())?;
    info!(workers = config.workers, "broadcast model and parameters");

    // 2. Seed: grow the frontier until it reaches the configured size or
    // the whole problem turns out to fit in one subtree.
    let mut executor = SubtreeExecutor::new(root, root_quality);
    executor.set_ramp_up(true);
    loop {
        if executor.pending() >= config.initial_frontier_size {
            break;
        }
        if executor.bounded_unit(&logic, ctx.solutions_mut(), 1)? == 0 {
            break;
        }
    }
    executor.set_ramp_up(false);

    if executor.pending() == 0 {
        info!("seed phase fully explored the problem locally, skipping distribution");
        executor.drain(&logic, ctx.solutions_mut())?;
        for w in 1..=config.workers {
            transport.send(ProcessId(w), Tag::FinishInit, vec![0])?;
            transport.send(ProcessId(w), Tag::Terminate, vec![0])?;
        }
        return collect(&transport, config, ctx.solutions().incumbent().map(|s| s.objective()));
    }

    // 3. Distribute: round-robin the seeded frontier across workers.
    let mut next_worker = 0usize;
    let mut distributed = 0usize;
    while let Some(node) = executor.take_best() {
        let worker = 1 + (next_worker % config.workers);
        next_worker += 1;
        let mut buf = FramedBuffer::new(knowledge::NODE_TAG);
        node.encode(&mut buf);
        transport.send(ProcessId(worker), Tag::Node, buf.to_wire())?;
        distributed += 1;
    }
    for w in 1..=config.workers {
        transport.send(ProcessId(w), Tag::FinishInit, vec![0])?;
    }
    info!(distributed, "seeded initial frontier to workers");

    // 4. Coordinate until termination.
    let mut loads: HashMap<usize, f64> = HashMap::new();
    let mut idle: HashSet<usize> = HashSet::new();
    let mut best: Option<f64> = ctx.cutoff();

    loop {
        while let Some(msg) = transport.try_recv() {
            handle_message(&transport, msg, &mut loads, &mut idle, &mut best, config)?;
        }

        let sum_load: f64 = loads.values().sum();
        let all_idle = loads.len() == config.workers && idle.len() == config.workers;
        if all_idle && sum_load < config.zero_threshold {
            break;
        }

        maybe_balance(&transport, &loads, config)?;
        for w in 1..=config.workers {
            transport.send(ProcessId(w), Tag::AskLoad, vec![0])?;
        }

        if let Some(msg) = transport.recv_timeout(config.coord_period) {
            handle_message(&transport, msg, &mut loads, &mut idle, &mut best, config)?;
        }
    }

    info!(best = ?best, "coordination loop observed global termination");

    // 5. Collect.
    transport.broadcast(Tag::Terminate, vec![0])?;
    collect(&transport, config, best)
}

fn handle_message(
    transport: &impl Transport,
    msg: paratree_transport::Message,
    loads: &mut HashMap<usize, f64>,
    idle: &mut HashSet<usize>,
    best: &mut Option<f64>,
    config: RunConfig,
) -> Result<(), Error> {
    match msg.tag {
        Tag::Incumbent => {
            let (value, owner) = wire::decode_incumbent(&msg.payload)?;
            if best.map_or(true, |b| value < b) {
                *best = Some(value);
                let update = wire::encode_incumbent_update(value);
                for w in 1..=config.workers {
                    if w != owner {
                        transport.send(ProcessId(w), Tag::IncumbentUpdate, update.clone())?;
                    }
                }
                debug!(value, owner, "new global incumbent");
            }
        }
        Tag::LoadReport => {
            let value = wire::decode_load_report(&msg.payload)?;
            loads.insert(msg.from.0, value);
            if value > config.zero_threshold {
                idle.remove(&msg.from.0);
            } else {
                idle.insert(msg.from.0);
            }
        }
        Tag::Idle => {
            idle.insert(msg.from.0);
            loads.insert(msg.from.0, 0.0);
        }
        other => {
            warn!(from = ?msg.from, tag = ?other, "unexpected message at hub");
        }
    }
    Ok(())
}

fn maybe_balance(
    transport: &impl Transport,
    loads: &HashMap<usize, f64>,
    config: RunConfig,
) -> Result<(), Error> {
    if loads.len() < config.workers {
        return Ok(());
    }
    let mean = loads.values().sum::<f64>() / loads.len() as f64;
    if mean <= 0.0 {
        return Ok(());
    }
    let donor = loads
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(&rank, &load)| (rank, load));
    let receiver = loads
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(&rank, &load)| (rank, load));

    if let (Some((donor, donor_load)), Some((receiver, receiver_load))) = (donor, receiver) {
        if donor != receiver
            && donor_load > config.donor_threshold * mean
            && receiver_load < config.receiver_threshold * mean
        {
            info!(donor, receiver, donor_load, receiver_load, "asking donor to share load");
            transport.send(ProcessId(donor), Tag::AskDonor, wire::encode_ask_donor(receiver))?;
        }
    }
    Ok(())
}

fn collect(
    transport: &impl Transport,
    config: RunConfig,
    mut best: Option<f64>,
) -> Result<Report, Error> {
    let mut worker_stats = HashMap::new();
    let collect_timeout = config.coord_period * 20;
    while worker_stats.len() < config.workers {
        let Some(msg) = transport.recv_timeout(collect_timeout) else {
            let missing = (1..=config.workers)
                .find(|w| !worker_stats.contains_key(w))
                .unwrap_or(0);
            return Err(Error::WorkerLost(ProcessId(missing)));
        };
        if msg.tag == Tag::Stats {
            let stats = wire::WorkerStats::decode(&msg.payload)?;
            if let Some(solution) = &stats.best {
                if best.map_or(true, |b| solution.objective() < b) {
                    best = Some(solution.objective());
                }
            }
            worker_stats.insert(msg.from.0, stats);
        }
    }
    info!(best = ?best, "collected final reports from every worker");
    Ok(Report {
        best_objective: best,
        worker_stats,
    })
}
