use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use paratree_framing::{Error as FramingError, FramedBuffer};

use crate::node::NodeId;

/// Wraps an `f64` priority so it can sit inside a max-heap ordered with
/// lower values coming out first (a search wants the most promising node,
/// i.e. the smallest quality, next).
#[derive(Debug, Clone, Copy, PartialEq)]
struct MinKey(f64);

impl Eq for MinKey {}

impl PartialOrd for MinKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that BinaryHeap, a max-heap, pops the smallest
        // priority first. NaN priorities sort as the least promising.
        other
            .0
            .partial_cmp(&self.0)
            .unwrap_or(Ordering::Equal)
    }
}

struct PoolEntry {
    key: MinKey,
    seq: u64,
    node: NodeId,
}

impl PartialEq for PoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl Eq for PoolEntry {}

impl PartialOrd for PoolEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken by insertion order (earlier entries win), giving the
        // pool a stable, deterministic pop sequence.
        self.key
            .cmp(&other.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A priority queue of pending node indices, ordered by ascending priority
/// with FIFO tie-breaking among equal priorities.
#[derive(Default)]
pub struct NodePool {
    heap: BinaryHeap<PoolEntry>,
    next_seq: u64,
}

impl NodePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        NodePool {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Inserts `node` at `priority`.
    pub fn push(&mut self, node: NodeId, priority: f64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PoolEntry {
            key: MinKey(priority),
            seq,
            node,
        });
    }

    /// Removes and returns the most promising node, if any.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.heap.pop().map(|entry| entry.node)
    }

    /// Number of nodes currently queued.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the pool holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes every queued node, returning their indices in arbitrary
    /// order. Used when a subtree is pruned wholesale.
    pub fn drain_all(&mut self) -> Vec<NodeId> {
        self.heap.drain().map(|entry| entry.node).collect()
    }

    /// The priority (quality) of every node currently queued, in
    /// arbitrary order. Used to compute a process's load metric without
    /// disturbing the pool itself.
    pub fn priorities(&self) -> impl Iterator<Item = f64> + '_ {
        self.heap.iter().map(|entry| entry.key.0)
    }
}

/// One accepted feasible solution, the node's description snapshotted as a
/// flat vector of values plus the objective it achieves.
#[derive(Debug, Clone)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
    quality: f64,
}

impl Solution {
    /// Builds a solution from its value vector and objective. `quality`
    /// defaults to the objective unless the caller overrides it.
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Solution {
            values,
            objective,
            quality: objective,
        }
    }

    /// Overrides the ranking quality independently of the objective.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }

    /// The solution's value vector.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// How many values the solution carries.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// The raw objective value achieved.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// The ranking key used by the solution pool (lower is better).
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Appends this solution's values, objective and quality to `buf`.
    pub fn encode(&self, buf: &mut FramedBuffer) {
        buf.write_slice(&self.values);
        buf.write(self.objective);
        buf.write(self.quality);
    }

    /// Reconstructs a solution from a buffer written by [`Self::encode`].
    pub fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError> {
        let values = buf.read_vec::<f64>()?;
        let objective = buf.read::<f64>()?;
        let quality = buf.read::<f64>()?;
        Ok(Solution {
            values,
            objective,
            quality,
        })
    }
}

/// A bounded collection of the best solutions found so far, kept sorted
/// ascending by quality with the incumbent at index 0.
pub struct SolutionPool {
    capacity: usize,
    solutions: Vec<Arc<Solution>>,
    /// A cutoff learned from elsewhere (an `INCUMBENT_UPDATE` from the
    /// hub) with no accompanying solution vector of its own -- still
    /// usable to prune against even though [`Self::incumbent`] has
    /// nothing to show for it locally.
    external_cutoff: Option<f64>,
}

impl SolutionPool {
    /// Creates a pool that retains at most `capacity` solutions. A
    /// capacity of 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        SolutionPool {
            capacity,
            solutions: Vec::new(),
            external_cutoff: None,
        }
    }

    /// Whether `quality` would improve on (or tie into) the pool, i.e.
    /// whether it is worth calling [`Self::offer`] at all.
    pub fn would_accept(&self, quality: f64) -> bool {
        if let Some(cutoff) = self.external_cutoff {
            if quality >= cutoff {
                return false;
            }
        }
        if self.capacity == 0 {
            return true;
        }
        self.solutions.len() < self.capacity
            || quality < self.solutions[self.solutions.len() - 1].quality()
    }

    /// Inserts `solution` in sorted position, evicting the worst entry if
    /// the pool is over capacity afterwards. Returns `true` if `solution`
    /// became (or tied) the new incumbent.
    pub fn offer(&mut self, solution: Solution) -> bool {
        let quality = solution.quality();
        let pos = self
            .solutions
            .partition_point(|s| s.quality() <= quality);
        self.solutions.insert(pos, Arc::new(solution));
        if self.capacity != 0 && self.solutions.len() > self.capacity {
            self.solutions.pop();
        }
        pos == 0
    }

    /// The current incumbent, the single best solution found, if any.
    pub fn incumbent(&self) -> Option<&Arc<Solution>> {
        self.solutions.first()
    }

    /// The incumbent's quality, used as the search's current cutoff
    /// bound, tightened further by any externally installed cutoff.
    pub fn cutoff(&self) -> Option<f64> {
        match (self.incumbent().map(|s| s.quality()), self.external_cutoff) {
            (Some(local), Some(external)) => Some(local.min(external)),
            (Some(local), None) => Some(local),
            (None, external) => external,
        }
    }

    /// Installs (or tightens) a cutoff learned from a peer's reported
    /// incumbent, without fabricating a solution vector this process
    /// never actually found.
    pub fn install_cutoff(&mut self, value: f64) {
        self.external_cutoff = Some(match self.external_cutoff {
            Some(current) => current.min(value),
            None => value,
        });
    }

    /// All retained solutions, best first.
    pub fn solutions(&self) -> &[Arc<Solution>] {
        &self.solutions
    }

    /// How many solutions the pool currently retains.
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Whether the pool retains no solutions.
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_pool_pops_lowest_priority_first() {
        let mut pool = NodePool::new();
        pool.push(1, 5.0);
        pool.push(2, 1.0);
        pool.push(3, 3.0);
        assert_eq!(pool.pop(), Some(2));
        assert_eq!(pool.pop(), Some(3));
        assert_eq!(pool.pop(), Some(1));
        assert_eq!(pool.pop(), None);
    }

    #[test]
    fn node_pool_breaks_ties_by_insertion_order() {
        let mut pool = NodePool::new();
        pool.push(1, 2.0);
        pool.push(2, 2.0);
        pool.push(3, 2.0);
        assert_eq!(pool.pop(), Some(1));
        assert_eq!(pool.pop(), Some(2));
        assert_eq!(pool.pop(), Some(3));
    }

    #[test]
    fn solution_pool_keeps_only_the_best_k() {
        let mut pool = SolutionPool::new(2);
        assert!(pool.offer(Solution::new(vec![1.0], 10.0)));
        assert!(!pool.offer(Solution::new(vec![2.0], 20.0)));
        assert!(pool.offer(Solution::new(vec![3.0], 5.0)));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.incumbent().unwrap().objective(), 5.0);
        assert_eq!(pool.solutions()[1].objective(), 10.0);
    }

    #[test]
    fn solution_pool_would_accept_respects_capacity_and_cutoff() {
        let mut pool = SolutionPool::new(1);
        assert!(pool.would_accept(100.0));
        pool.offer(Solution::new(vec![], 10.0));
        assert!(!pool.would_accept(10.0));
        assert!(pool.would_accept(9.9));
    }

    #[test]
    fn solution_encode_decode_round_trips() {
        let solution = Solution::new(vec![1.0, 2.5, -3.0], 6.25).with_quality(6.0);
        let mut buf = FramedBuffer::new("solution");
        solution.encode(&mut buf);
        buf.rewind();
        let decoded = Solution::decode(&mut buf).unwrap();
        assert_eq!(decoded.values(), solution.values());
        assert_eq!(decoded.objective(), solution.objective());
        assert_eq!(decoded.quality(), solution.quality());
    }

    #[test]
    fn unbounded_solution_pool_retains_everything() {
        let mut pool = SolutionPool::new(0);
        for i in 0..50 {
            pool.offer(Solution::new(vec![], i as f64));
        }
        assert_eq!(pool.len(), 50);
    }

    #[test]
    fn external_cutoff_prunes_even_without_a_local_solution() {
        let mut pool = SolutionPool::new(1);
        assert_eq!(pool.cutoff(), None);
        pool.install_cutoff(6.0);
        assert_eq!(pool.cutoff(), Some(6.0));
        assert!(!pool.would_accept(6.0));
        assert!(pool.would_accept(5.9));

        pool.offer(Solution::new(vec![], 4.0));
        assert_eq!(pool.cutoff(), Some(4.0));
        pool.install_cutoff(7.0);
        assert_eq!(pool.cutoff(), Some(4.0));
    }
}
