//! The search-node life-cycle engine: the node model and its client
//! contract, the node and solution pools, the subtree executor that
//! drives them, the parameter set, and the process-wide context that
//! holds it all together.

mod context;
/// Error-related type definitions.
pub mod error;
mod executor;
/// Type-tag registration for the model, node and solution kinds.
pub mod knowledge;
mod model;
mod node;
mod params;
mod pool;

pub use context::Context;
pub use error::Error;
pub use executor::SubtreeExecutor;
pub use model::Model;
pub use node::{ChildSpec, Node, NodeDescription, NodeId, NodeLogic, ProcessOutcome, Status};
pub use params::{ParamValue, ParameterSet};
pub use pool::{NodePool, Solution, SolutionPool};
