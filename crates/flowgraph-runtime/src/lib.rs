//! # Flowgraph Runtime
//!
//! The façade crate: wires the evaluation queue
//! ([`flowgraph_eval`]), the event queue ([`flowgraph_events`]), and the
//! path-node indexer ([`flowgraph_index`]) into one single-threaded
//! reactive data-flow graph, and sequences a tick so write commits always
//! follow the evaluation cycle that produced them.

pub mod error;
pub mod runtime;

pub use error::{Result, RuntimeError};
pub use runtime::{Runtime, RuntimeConfig};

pub use flowgraph_eval as eval;
pub use flowgraph_events as events;
pub use flowgraph_index as index;
