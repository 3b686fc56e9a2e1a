//! A distributed branch-and-bound search engine: a generic search-node
//! arena and pool (`paratree-core`), a length-prefixed wire format and
//! type-tag registry (`paratree-framing`), a message-passing seam
//! (`paratree-transport`), and the hub/worker coordinator roles and CLI
//! that tie them together for a runnable search.

pub mod config;
pub mod demo;
pub mod driver;
pub mod error;
pub mod hub;
pub mod logging;
pub mod wire;
pub mod worker;

pub use config::RunConfig;
pub use driver::run_single_host;
pub use error::Error;
pub use hub::Report;
