//! # Flowgraph Foundation
//!
//! Typed IDs, the process-wide path ID allocator, a shared error taxonomy,
//! and a single-threaded change-notification primitive used by every other
//! crate in the workspace.
//!
//! ## Why this crate exists
//!
//! The evaluation queue, event queue, and indexer all need the same small
//! set of cross-cutting concerns — stable identities, a place to put
//! errors that cross a subsystem boundary, and "notify whoever's
//! listening" — without depending on each other. The runtime is single
//! threaded and cooperative, so these use `Rc<RefCell<_>>` rather than
//! `Arc<Mutex<_>>`.

pub mod error;
pub mod id;
pub mod notifier;
pub mod path_id;

pub use error::{FoundationError, Result};
pub use id::{AreaId, ElementId, IdGenerator, ListenerId, MonitorId, PathId, QueryId, ValueId, WatcherId};
pub use notifier::{ChangeNotifier, Listenable, ListenerCallback};
pub use path_id::{PathIdAllocator, PathTuple};
