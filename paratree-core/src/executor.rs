use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::Error;
use crate::node::{ChildSpec, Node, NodeDescription, NodeId, NodeLogic, ProcessOutcome, Status};
use crate::pool::{NodePool, SolutionPool};

/// Owns one subtree's nodes and drives their life cycle: pop the most
/// promising candidate, hand it to the client's logic, wire up whatever
/// children `branch` produces, and prune anything fathomed.
///
/// Nodes live in an arena keyed by index rather than in a conventional
/// owned tree, since a node's parent and children are both referenced (not
/// owned) by index -- the arena is the single owner.
pub struct SubtreeExecutor<D> {
    arena: HashMap<NodeId, Node<D>>,
    pool: NodePool,
    next_index: NodeId,
    root: Option<NodeId>,
    ramp_up: bool,
}

impl<D: NodeDescription> SubtreeExecutor<D> {
    /// Starts a fresh subtree rooted at `description`.
    pub fn new(description: D, quality: f64) -> Self {
        let root = Node::new_root(description, quality);
        let root_id = root.index();
        let mut arena = HashMap::new();
        let mut pool = NodePool::new();
        pool.push(root_id, root.priority());
        arena.insert(root_id, root);
        SubtreeExecutor {
            arena,
            pool,
            next_index: root_id + 1,
            root: Some(root_id),
            ramp_up: false,
        }
    }

    /// Starts with no root of its own -- a worker process builds its
    /// subtree purely out of nodes grafted in via
    /// [`Self::insert_remote_root`], each becoming an independent,
    /// parentless root within this one executor's arena.
    pub fn new_empty() -> Self {
        SubtreeExecutor {
            arena: HashMap::new(),
            pool: NodePool::new(),
            next_index: 0,
            root: None,
            ramp_up: false,
        }
    }

    /// Grafts an already-materialized node (typically received from
    /// another process) as a new, independently rooted subtree.
    ///
    /// The incoming node is re-keyed under this executor's own index
    /// space: subtree-local uniqueness is all the engine promises, so a
    /// node arriving from elsewhere never reuses its sender's index.
    pub fn insert_remote_root(&mut self, node: Node<D>) -> NodeId {
        let id = self.next_index;
        self.next_index += 1;
        let rekeyed = node.rekey_as_root(id);
        let priority = rekeyed.priority();
        let should_queue = matches!(rekeyed.status(), Status::Candidate | Status::Evaluated);
        self.arena.insert(id, rekeyed);
        if should_queue {
            self.pool.push(id, priority);
        }
        id
    }

    /// Removes and returns the most promising pending node, detaching it
    /// from this subtree entirely without processing it -- used to hand a
    /// node to another process (initial distribution, or a donor sharing
    /// load with an underloaded peer) rather than work on it locally.
    ///
    /// If the node had a parent still present in this arena, it is
    /// detached from that parent's children list; the parent's own status
    /// is left untouched; since the parent need not be fathomed, this
    /// does not trigger the prune-upward walk.
    pub fn take_best(&mut self) -> Option<Node<D>> {
        let id = self.pool.pop()?;
        let node = self
            .arena
            .remove(&id)
            .expect("pool only ever holds ids present in the arena");
        if let Some(parent_id) = node.parent() {
            if let Some(parent) = self.arena.get_mut(&parent_id) {
                parent.detach_child(id);
            }
        }
        Some(node)
    }

    /// This subtree's own root index, or `None` for an executor started
    /// with [`Self::new_empty`].
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Borrows a node by index, if it is still present in the arena.
    pub fn node(&self, id: NodeId) -> Option<&Node<D>> {
        self.arena.get(&id)
    }

    /// How many nodes this subtree currently holds (processed or pending).
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the subtree holds no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// How many nodes are queued for processing.
    pub fn pending(&self) -> usize {
        self.pool.len()
    }

    /// The quality of every node currently queued, in arbitrary order --
    /// the raw input to a process's load metric (§4.7).
    pub fn pending_qualities(&self) -> impl Iterator<Item = f64> + '_ {
        self.pool.priorities()
    }

    /// Marks this subtree as in ramp-up: the flag forwarded to
    /// `process` so client logic can relax pruning while the search is
    /// still building up a working set of nodes across processes.
    pub fn set_ramp_up(&mut self, ramp_up: bool) {
        self.ramp_up = ramp_up;
    }

    /// Processes every queued node to exhaustion.
    pub fn drain(
        &mut self,
        logic: &impl NodeLogic<D>,
        solutions: &mut SolutionPool,
    ) -> Result<(), Error> {
        while self.step(logic, solutions)? {}
        Ok(())
    }

    /// Processes up to `unit` queued nodes, stopping early if the pool
    /// empties first. Returns how many nodes were actually processed.
    ///
    /// Used to interleave subtree work with other duties (message
    /// polling, load reporting) without draining the whole subtree in one
    /// uninterruptible call.
    pub fn bounded_unit(
        &mut self,
        logic: &impl NodeLogic<D>,
        solutions: &mut SolutionPool,
        unit: usize,
    ) -> Result<usize, Error> {
        let mut done = 0;
        while done < unit && self.step(logic, solutions)? {
            done += 1;
        }
        Ok(done)
    }

    /// Pops the most promising pending node and processes it once.
    /// Returns `false` if the pool was empty, in which case nothing
    /// happened.
    fn step(
        &mut self,
        logic: &impl NodeLogic<D>,
        solutions: &mut SolutionPool,
    ) -> Result<bool, Error> {
        let Some(id) = self.pool.pop() else {
            return Ok(false);
        };

        let is_root = self.root == Some(id);
        let outcome = {
            let node = self
                .arena
                .get_mut(&id)
                .expect("pool only ever holds ids present in the arena");
            match node.status() {
                Status::Candidate | Status::Evaluated => {}
                other => return Err(Error::BadNodeStatus(other)),
            }
            node.set_active(true);
            let outcome = logic.process(node, is_root, self.ramp_up, solutions)?;
            node.set_active(false);
            outcome
        };

        if let ProcessOutcome::BetterSolutionFound = outcome {
            trace!(node = id, "process reported a new incumbent candidate");
        }

        let status = self.arena[&id].status();
        match status {
            Status::Pregnant => self.branch_one(id, logic)?,
            Status::Evaluated => self.pool.push(id, self.arena[&id].priority()),
            Status::Fathomed => self.prune(id),
            Status::Candidate => {
                // process() left it unresolved; requeue so it gets another
                // look rather than stalling the subtree silently.
                self.pool.push(id, self.arena[&id].priority());
            }
            Status::Branched => return Err(Error::BadNodeStatus(status)),
        }

        Ok(true)
    }

    fn branch_one(&mut self, id: NodeId, logic: &impl NodeLogic<D>) -> Result<(), Error> {
        let specs = {
            let node = &self.arena[&id];
            logic.branch(node)?
        };
        if specs.is_empty() {
            return Err(Error::EmptyBranch);
        }
        for spec in &specs {
            if spec.status == Status::Branched {
                return Err(Error::ChildBranchedStatus);
            }
        }

        let depth = self.arena[&id].depth() + 1;
        let mut child_ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let child_id = self.next_index;
            self.next_index += 1;
            let child = Node::new_child(child_id, id, depth, spec);
            self.arena.insert(child_id, child);
            child_ids.push(child_id);
        }

        let parent = self.arena.get_mut(&id).expect("just processed");
        for &child_id in &child_ids {
            parent.attach_child(child_id);
        }
        parent.set_status(Status::Branched);
        debug!(node = id, children = child_ids.len(), "branched node");

        // Wire children (§4.3): a fathomed child is pruned immediately
        // rather than queued, since the executor's pool dispatch only
        // ever expects to pop candidate/evaluated/pregnant nodes.
        for child_id in child_ids {
            let child = &self.arena[&child_id];
            if child.status() == Status::Fathomed {
                self.prune(child_id);
            } else {
                self.pool.push(child_id, child.priority());
            }
        }

        Ok(())
    }

    /// Removes a fathomed node and, recursively, any descendants still
    /// reachable only through it -- a fathomed node's subtree can never
    /// yield a better solution, so nothing under it can either. Also
    /// walks back up the weak parent chain: a branched node stops being
    /// worth keeping around once its very last child is gone, so it is
    /// pruned in turn, and so on up to (and including) the root.
    pub fn prune(&mut self, id: NodeId) {
        let children = match self.arena.get(&id) {
            Some(node) => node.children().to_vec(),
            None => return,
        };
        for child in children {
            self.prune(child);
        }
        let Some(node) = self.arena.remove(&id) else {
            return;
        };
        let Some(parent_id) = node.parent() else {
            return;
        };
        let Some(parent) = self.arena.get_mut(&parent_id) else {
            return;
        };
        parent.detach_child(id);
        if parent.status() == Status::Branched && parent.children().is_empty() {
            self.prune(parent_id);
        }
    }
}
