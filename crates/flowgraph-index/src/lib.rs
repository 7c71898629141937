//! # Flowgraph Index
//!
//! The indexer core: a path-trie of per-path indexed state, sub-index
//! lookups for selection queries, range-key algebra for range nodes, and
//! sub-tree monitoring with a shared compression registry.
//!
//! Single-threaded cooperative, like every other crate in this workspace —
//! query-calc and sub-tree-monitor callbacks are `Rc<RefCell<dyn Trait>>`,
//! not `Arc<dyn Trait + Send + Sync>`.

pub mod data_element;
pub mod error;
pub mod indexer;
pub mod key;
pub mod node_entry;
pub mod path_node;
pub mod query;
pub mod range_key;
pub mod sub_index;
pub mod subtree;

pub use data_element::{DataElement, DataElementTable};
pub use error::{IndexError, Result};
pub use indexer::Indexer;
pub use key::{Key, KeyType};
pub use node_entry::{NodeEntry, NodeKey};
pub use path_node::{KeyUpdate, PathNode};
pub use query::QueryCalc;
pub use range_key::RangeKey;
pub use sub_index::{DiscreteKey, SubIndex};
pub use subtree::{CompressionRegistry, SubTree, SubTreeMonitor};
