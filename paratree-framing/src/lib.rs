//! Serialization framing for paratree: length-prefixed, cursor-driven
//! buffers and the type-tag knowledge registry that decodes them.

mod buffer;
/// Error-related type definitions.
pub mod error;
mod registry;

pub use buffer::{FramePrimitive, FramedBuffer};
pub use error::Error;
pub use registry::{Knowledge, Prototype, Registry};
