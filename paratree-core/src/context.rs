use std::sync::Arc;

use paratree_framing::Registry;

use crate::params::ParameterSet;
use crate::pool::SolutionPool;

/// Process-wide state constructed once in the driver and threaded by
/// reference through the coordinator and the subtree executor, in place
/// of ambient singletons: the model, the parameter set, the shared
/// solution pool, and the type-tag registry all live here.
pub struct Context<M> {
    model: Arc<M>,
    params: ParameterSet,
    solutions: SolutionPool,
    registry: Registry,
}

impl<M> Context<M> {
    /// Builds a context around a shared model, its parameter set, and the
    /// registry populated for this run. `solution_capacity` bounds the
    /// shared solution pool (0 = unbounded).
    pub fn new(model: Arc<M>, params: ParameterSet, registry: Registry, solution_capacity: usize) -> Self {
        Context {
            model,
            params,
            solutions: SolutionPool::new(solution_capacity),
            registry,
        }
    }

    /// The shared, read-only model every node's description refers back to.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// A cheap clone of the shared model handle, for moving into another
    /// worker's own executor loop.
    pub fn model_handle(&self) -> Arc<M> {
        Arc::clone(&self.model)
    }

    /// The authoritative, broadcast parameter set.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Mutable access, used only by the hub before broadcasting `PARAMS`.
    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// The process-local solution pool. Shared within a process by
    /// reference counting at the `Arc<Solution>` level; the pool itself
    /// has a single owner (this context).
    pub fn solutions(&self) -> &SolutionPool {
        &self.solutions
    }

    /// Mutable access for the executor to offer newly found solutions.
    pub fn solutions_mut(&mut self) -> &mut SolutionPool {
        &mut self.solutions
    }

    /// The type-tag registry, populated before any process begins work
    /// and never mutated afterwards.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The current incumbent's quality, the search's live cutoff bound.
    pub fn cutoff(&self) -> Option<f64> {
        self.solutions.cutoff()
    }
}
