//! # Flowgraph Events
//!
//! The event queue: turns raw input events into an ordered, serialized
//! message-delivery sequence across recipient areas, with propagation,
//! opacity, pointer-in-area tracking, coalescing, focus transfer, and
//! cancellation/timeout.
//!
//! Single-threaded cooperative, like every other crate in this workspace.

pub mod area;
pub mod config;
pub mod error;
pub mod payload;
pub mod pointer;
pub mod queue;

pub use area::{AreaGraph, PropagateEdge};
pub use config::{CoalesceFamily, Config};
pub use error::{EventError, Result};
pub use payload::{EventKind, EventPayload, Modifiers, MouseButton};
pub use pointer::{PointerInAreaDelta, PointerState};
pub use queue::{EventQueue, EventState, Message, QueuedEvent};
