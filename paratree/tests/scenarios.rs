//! End-to-end scenarios exercising the search-node engine, the parameter
//! set's file-merge semantics, and the framing layer's truncation
//! handling, each driven by a literal, hand-picked input and checked
//! against a literal expected output.

use std::sync::Arc;

use paratree_core::{
    ChildSpec, Error as CoreError, Node, NodeDescription, NodeLogic, ParamValue, ParameterSet,
    ProcessOutcome, Solution, SolutionPool, Status, SubtreeExecutor,
};
use paratree_framing::{Error as FramingError, FramedBuffer};

/// A bare, id-tagged subproblem description used by every scenario fixture
/// below -- the scenarios care about the life-cycle transitions `process`
/// and `branch` drive, not about any particular subproblem's payload.
#[derive(Debug, Clone)]
struct Tagged {
    id: u32,
}

impl NodeDescription for Tagged {
    fn encode(&self, buf: &mut FramedBuffer) {
        buf.write(self.id);
    }

    fn decode(buf: &mut FramedBuffer) -> Result<Self, FramingError> {
        Ok(Tagged {
            id: buf.read::<u32>()?,
        })
    }
}

/// S1 -- a root whose `process` immediately fathoms it at quality 7.0,
/// producing no solution and no children.
struct FathomsRootImmediately;

impl NodeLogic<Tagged> for FathomsRootImmediately {
    fn process(
        &self,
        node: &mut Node<Tagged>,
        _is_root: bool,
        _ramp_up: bool,
        _solutions: &mut SolutionPool,
    ) -> Result<ProcessOutcome, CoreError> {
        node.set_quality(7.0);
        node.set_status(Status::Fathomed);
        Ok(ProcessOutcome::NoChange)
    }

    fn branch(&self, _node: &Node<Tagged>) -> Result<Vec<ChildSpec<Tagged>>, CoreError> {
        unreachable!("a root fathomed on its first process() never branches")
    }
}

#[test]
fn s1_single_node_reports_no_solutions_and_an_infinite_best() {
    let mut executor = SubtreeExecutor::new(Tagged { id: 0 }, 7.0);
    let mut solutions = SolutionPool::new(1);

    executor.drain(&FathomsRootImmediately, &mut solutions).unwrap();

    assert!(solutions.is_empty());
    assert_eq!(solutions.cutoff(), None, "no incumbent means the reported best is +infinity");
    assert!(executor.is_empty(), "the fathomed root is pruned away entirely");
}

/// S2 -- root becomes pregnant at quality 1.0 and branches into two
/// children (quality 2.0 and 3.0). The cheaper child yields a solution;
/// the other is fathomed outright.
struct TwoNodeBranch;

impl NodeLogic<Tagged> for TwoNodeBranch {
    fn process(
        &self,
        node: &mut Node<Tagged>,
        is_root: bool,
        _ramp_up: bool,
        solutions: &mut SolutionPool,
    ) -> Result<ProcessOutcome, CoreError> {
        if is_root {
            node.set_quality(1.0);
            node.set_status(Status::Pregnant);
            return Ok(ProcessOutcome::NoChange);
        }

        match node.description().id {
            1 => {
                let improved = solutions.offer(Solution::new(vec![2.0], 2.5));
                node.set_status(Status::Fathomed);
                Ok(if improved {
                    ProcessOutcome::BetterSolutionFound
                } else {
                    ProcessOutcome::NoChange
                })
            }
            2 => {
                node.set_status(Status::Fathomed);
                Ok(ProcessOutcome::NoChange)
            }
            other => panic!("unexpected node id {other} in this scenario"),
        }
    }

    fn branch(&self, _node: &Node<Tagged>) -> Result<Vec<ChildSpec<Tagged>>, CoreError> {
        Ok(vec![
            ChildSpec::new(Tagged { id: 1 }, Status::Candidate, 2.0),
            ChildSpec::new(Tagged { id: 2 }, Status::Candidate, 3.0),
        ])
    }
}

#[test]
fn s2_two_node_branch_keeps_the_single_solution_and_prunes_everything() {
    let mut executor = SubtreeExecutor::new(Tagged { id: 0 }, 0.0);
    let mut solutions = SolutionPool::new(1);

    executor.drain(&TwoNodeBranch, &mut solutions).unwrap();

    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions.incumbent().unwrap().objective(), 2.5);
    assert!(
        executor.is_empty(),
        "root and both children are pruned once every leaf is fathomed"
    );
}

/// S3 -- a four-way fan-out at qualities 5, 6, 7 and 8. The first node
/// processed (quality 5) yields a solution of objective 6.0; every
/// remaining node checks the live cutoff and fathoms once its own
/// quality is no longer an improvement.
struct IncumbentCutoffFanOut;

impl NodeLogic<Tagged> for IncumbentCutoffFanOut {
    fn process(
        &self,
        node: &mut Node<Tagged>,
        is_root: bool,
        _ramp_up: bool,
        solutions: &mut SolutionPool,
    ) -> Result<ProcessOutcome, CoreError> {
        if is_root {
            node.set_status(Status::Pregnant);
            return Ok(ProcessOutcome::NoChange);
        }

        let quality = node.quality();
        if let Some(cutoff) = solutions.cutoff() {
            if quality >= cutoff {
                node.set_status(Status::Fathomed);
                return Ok(ProcessOutcome::NoChange);
            }
        }

        let improved = solutions.offer(Solution::new(vec![quality], 6.0));
        node.set_status(Status::Fathomed);
        Ok(if improved {
            ProcessOutcome::BetterSolutionFound
        } else {
            ProcessOutcome::NoChange
        })
    }

    fn branch(&self, _node: &Node<Tagged>) -> Result<Vec<ChildSpec<Tagged>>, CoreError> {
        Ok(vec![
            ChildSpec::new(Tagged { id: 1 }, Status::Candidate, 5.0),
            ChildSpec::new(Tagged { id: 2 }, Status::Candidate, 6.0),
            ChildSpec::new(Tagged { id: 3 }, Status::Candidate, 7.0),
            ChildSpec::new(Tagged { id: 4 }, Status::Candidate, 8.0),
        ])
    }
}

#[test]
fn s3_incumbent_cutoff_fathoms_every_node_no_better_than_the_first_solution() {
    let mut executor = SubtreeExecutor::new(Tagged { id: 0 }, 0.0);
    let mut solutions = SolutionPool::new(1);

    executor.drain(&IncumbentCutoffFanOut, &mut solutions).unwrap();

    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions.incumbent().unwrap().objective(), 6.0);
    assert!(executor.is_empty());
}

/// S4 -- two independent subtrees stand in for two workers: one holds
/// only cheap, immediately-fathoming nodes, the other only nodes that
/// each branch into two further candidates. After the donor hands its two
/// pending nodes to the other side (the hand-off a load-balance tick
/// would trigger), both sides drain to nothing.
struct CheapOrExpensive;

impl NodeLogic<Tagged> for CheapOrExpensive {
    fn process(
        &self,
        node: &mut Node<Tagged>,
        _is_root: bool,
        _ramp_up: bool,
        _solutions: &mut SolutionPool,
    ) -> Result<ProcessOutcome, CoreError> {
        if node.description().id == 0 {
            node.set_status(Status::Fathomed);
        } else {
            node.set_status(Status::Pregnant);
        }
        Ok(ProcessOutcome::NoChange)
    }

    fn branch(&self, _node: &Node<Tagged>) -> Result<Vec<ChildSpec<Tagged>>, CoreError> {
        Ok(vec![
            ChildSpec::new(Tagged { id: 0 }, Status::Candidate, 1.0),
            ChildSpec::new(Tagged { id: 0 }, Status::Candidate, 1.0),
        ])
    }
}

#[test]
fn s4_parallel_balance_drains_both_sides_after_a_donor_hand_off() {
    let logic = CheapOrExpensive;
    let mut solutions = SolutionPool::new(1);

    let mut worker_a = SubtreeExecutor::new_empty();
    let mut worker_b = SubtreeExecutor::new_empty();
    for _ in 0..4 {
        worker_a.insert_remote_root(Node::new_root(Tagged { id: 0 }, 1.0));
        worker_b.insert_remote_root(Node::new_root(Tagged { id: 1 }, 1.0));
    }

    // Worker A's four cheap nodes fathom outright, emptying it.
    worker_a.drain(&logic, &mut solutions).unwrap();
    assert!(worker_a.is_empty());

    // Worker B processes one expensive node (branching it into two new
    // candidates), then -- asked to donate before draining any further --
    // hands its two still-pending nodes to A.
    worker_b.bounded_unit(&logic, &mut solutions, 1).unwrap();
    assert_eq!(worker_b.pending(), 5, "3 untouched roots plus 2 fresh children");

    let donated = worker_b.take_best().unwrap();
    worker_a.insert_remote_root(donated);
    let donated = worker_b.take_best().unwrap();
    worker_a.insert_remote_root(donated);

    worker_a.drain(&logic, &mut solutions).unwrap();
    worker_b.drain(&logic, &mut solutions).unwrap();

    assert!(worker_a.is_empty());
    assert!(worker_b.is_empty());
    assert_eq!(worker_a.pending() + worker_b.pending(), 0);
}

/// S5 -- `p.cfg` sets `Alps_maxNodes 100` and `Alps_logLevel 2`, then
/// includes `q.cfg`, which overrides `Alps_logLevel` to 3. The include's
/// assignment must win, and the untouched key must survive.
#[test]
fn s5_a_param_file_include_overrides_its_includer() {
    let dir = std::env::temp_dir().join(format!("paratree-s5-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let p_path = dir.join("p.cfg");
    let q_path = dir.join("q.cfg");
    std::fs::write(&q_path, "Alps_logLevel 3\n").unwrap();
    std::fs::write(
        &p_path,
        "Alps_maxNodes 100\nAlps_logLevel 2\nParamFile q.cfg\n",
    )
    .unwrap();

    let mut params = ParameterSet::new();
    params.declare("Alps_maxNodes", ParamValue::Int(0));
    params.declare("Alps_logLevel", ParamValue::Int(0));
    params.read_file(&p_path).unwrap();

    assert_eq!(params.get("Alps_logLevel"), Some(&ParamValue::Int(3)));
    assert_eq!(params.get("Alps_maxNodes"), Some(&ParamValue::Int(100)));

    let _ = std::fs::remove_dir_all(&dir);
}

/// S6 -- truncating a framed node message's payload by four bytes must
/// surface a decode-overrun rather than silently decoding garbage.
#[test]
fn s6_a_truncated_node_message_surfaces_a_decode_overrun() {
    let node = Node::new_root(Tagged { id: 7 }, 4.0);
    let mut buf = FramedBuffer::new("node");
    node.encode(&mut buf);
    let mut wire = buf.to_wire();

    let original_len = wire.len();
    wire.truncate(original_len - 4);

    let err = FramedBuffer::from_wire(&wire).unwrap_err();
    assert!(
        matches!(err, FramingError::DecodeOverrun { .. }),
        "expected a decode overrun, got {err:?}"
    );
}

/// A light end-to-end smoke test of the hub/worker coordinator loop over
/// the in-process transport: a single worker, a tiny partition instance
/// whose optimum is known by hand, run to completion.
#[test]
fn single_worker_search_finds_an_exact_partition() {
    use paratree::config::RunConfig;
    use paratree::demo::{root_for, Numbers, Partition};
    use paratree::driver;

    let model = Arc::new(Numbers {
        values: vec![3.0, 1.0, 1.0, 1.0],
    });
    let logic = Partition::new(Arc::clone(&model));
    let (root, root_quality) = root_for(&model);

    let mut params = ParameterSet::new();
    RunConfig::declare(&mut params);
    params.read_args(&["Workers".to_string(), "1".to_string()]);
    let config = RunConfig::from_params(&params);

    let report = driver::run_single_host(model, logic, root, root_quality, params, config).unwrap();

    assert_eq!(report.best_objective, Some(0.0));
    assert_eq!(report.worker_stats.len(), 1);
}
