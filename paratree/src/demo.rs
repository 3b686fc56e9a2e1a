//! A small number-partitioning problem: split a list of numbers into two
//! sides minimizing the absolute difference of their sums. Used as the
//! CLI's default problem instance and exercised by the integration tests
//! -- the core engine is solver-agnostic (concrete branch-and-bound logic
//! is a client concern, out of the engine's own scope), but a runnable
//! binary needs *something* to search over.

use std::sync::Arc;

use paratree_core::{
    ChildSpec, Model, Node, NodeDescription, NodeLogic, ProcessOutcome, Solution, SolutionPool,
    Status,
};
use paratree_framing::{Error as FramingError, FramedBuffer};

/// The list of numbers to partition, broadcast once as the search's model.
#[derive(Debug, Clone)]
pub struct Numbers {
    /// The values to split into two sides.
    pub values: Vec<f64>,
}

impl Numbers {
    /// The total of every value, used to compute the admissible bound.
    fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// The sum of values from `depth` onward, i.e. what is still
    /// undecided below a node at that depth.
    fn remaining_from(&self, depth: usize) -> f64 {
        self.values[depth.min(self.values.len())..].iter().sum()
    }
}

impl Model for Numbers {
    fn encode(&self, buf: &mut FramedBuffer) {
        buf.write_slice(&self.values);
    }

    fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError> {
        Ok(Numbers {
            values: buf.read_vec::<f64>()?,
        })
    }
}

/// A partial assignment: how many of the leading values have been
/// decided, and the running `sum(side A) - sum(side B)` over them.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// How many values have already been assigned a side.
    pub depth: usize,
    /// The signed running difference between the two sides.
    pub diff: f64,
}

impl NodeDescription for Assignment {
    fn encode(&self, buf: &mut FramedBuffer) {
        buf.write(self.depth as u64);
        buf.write(self.diff);
    }

    fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError> {
        Ok(Assignment {
            depth: buf.read::<u64>()? as usize,
            diff: buf.read::<f64>()?,
        })
    }
}

/// `max(0, |diff| - remaining)`: the best a partial assignment could
/// possibly do once every remaining value is placed on whichever side
/// cancels `diff` the most. Admissible (never overestimates how good the
/// final difference can get) and, as used here, monotonically
/// non-decreasing from parent to child -- each child's own `|diff'| +
/// (value just placed)` is at least the parent's `|diff|` by the triangle
/// inequality, so the bound after subtracting the now-smaller `remaining`
/// can only hold or grow.
fn bound(diff: f64, remaining: f64) -> f64 {
    (diff.abs() - remaining).max(0.0)
}

/// Branches every pregnant node in two, processes every candidate by
/// checking it against the best-known bound, and records a solution once
/// every value has been assigned a side.
#[derive(Clone)]
pub struct Partition {
    model: Arc<Numbers>,
}

impl Partition {
    /// Builds the branching logic around a shared model handle.
    pub fn new(model: Arc<Numbers>) -> Self {
        Partition { model }
    }
}

impl NodeLogic<Assignment> for Partition {
    fn process(
        &self,
        node: &mut Node<Assignment>,
        _is_root: bool,
        ramp_up: bool,
        solutions: &mut SolutionPool,
    ) -> Result<ProcessOutcome, paratree_core::Error> {
        let depth = node.description().depth;
        let diff = node.description().diff;

        if depth == self.model.values.len() {
            let quality = diff.abs();
            if solutions.would_accept(quality) {
                let improved = solutions.offer(Solution::new(vec![diff], quality));
                node.set_status(Status::Fathomed);
                return Ok(if improved {
                    ProcessOutcome::BetterSolutionFound
                } else {
                    ProcessOutcome::NoChange
                });
            }
            node.set_status(Status::Fathomed);
            return Ok(ProcessOutcome::NoChange);
        }

        let remaining = self.model.remaining_from(depth);
        let lower_bound = bound(diff, remaining);
        node.set_quality(lower_bound);

        // During ramp-up the frontier is still being built up across
        // processes, so pruning against a cutoff would starve the other
        // workers of nodes to pick up; branch everything instead.
        if !ramp_up {
            if let Some(cutoff) = solutions.cutoff() {
                if lower_bound >= cutoff {
                    node.set_status(Status::Fathomed);
                    return Ok(ProcessOutcome::NoChange);
                }
            }
        }

        node.set_status(Status::Pregnant);
        Ok(ProcessOutcome::NoChange)
    }

    fn branch(
        &self,
        node: &Node<Assignment>,
    ) -> Result<Vec<ChildSpec<Assignment>>, paratree_core::Error> {
        let depth = node.description().depth;
        let diff = node.description().diff;
        let value = self.model.values[depth];
        let remaining = self.model.remaining_from(depth + 1);

        let left = Assignment {
            depth: depth + 1,
            diff: diff + value,
        };
        let right = Assignment {
            depth: depth + 1,
            diff: diff - value,
        };

        Ok(vec![
            ChildSpec::new(left.clone(), Status::Candidate, bound(left.diff, remaining)),
            ChildSpec::new(right.clone(), Status::Candidate, bound(right.diff, remaining)),
        ])
    }
}

/// Builds the root node and its quality for a fresh `Numbers` model.
pub fn root_for(model: &Numbers) -> (Assignment, f64) {
    let root = Assignment { depth: 0, diff: 0.0 };
    let quality = bound(root.diff, model.total());
    (root, quality)
}
