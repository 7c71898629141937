//! Per-(path node, element) entry: the indexed state of one data node.

use crate::key::Key;
use crate::range_key::RangeKey;
use flowgraph_foundation::{ElementId, PathId};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// A node's key, either a plain scalar or a range operator's algebraic
/// key.
#[derive(Debug, Clone)]
pub enum NodeKey {
    Scalar(Key),
    Range(RangeKey),
}

/// Indexed state for one element at one path node.
#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub element_id: ElementId,
    pub type_name: Option<String>,
    pub key: Option<NodeKey>,
    /// The element ID of the range node directly dominating this one, if
    /// this entry is an operand of a range.
    pub range_node_id: Option<ElementId>,
    pub has_attrs: bool,
    pub non_attrs: HashSet<String>,
    pub num_sub_tree_requests: usize,
    /// Covering sub-tree roots: path of the root -> its element ID.
    /// `len()` is the node's sub-tree-root sharing count.
    pub sub_tree_roots: HashMap<PathId, ElementId>,
    pub simple_compressed_value: Option<u64>,
}

impl NodeEntry {
    #[must_use]
    pub fn new(element_id: ElementId) -> Self {
        Self {
            element_id,
            type_name: None,
            key: None,
            range_node_id: None,
            has_attrs: false,
            non_attrs: HashSet::new(),
            num_sub_tree_requests: 0,
            sub_tree_roots: HashMap::new(),
            simple_compressed_value: None,
        }
    }

    /// A node is active unless it is either directly dominated by an
    /// active, non-empty range (its parent range "wins" and hides it),
    /// or is itself an inactive-or-empty range (whose operands are the
    /// visible terminals instead).
    #[must_use]
    pub fn is_active(&self, dominating_range_active: bool) -> bool {
        if self.range_node_id.is_some() && dominating_range_active {
            return false;
        }
        match &self.key {
            Some(NodeKey::Range(range)) => range.is_active(),
            _ => true,
        }
    }

    /// A cheap, collision-prone hash of `(type_name, key)`, held under a
    /// reference count by the indexer's [`crate::subtree::CompressionRegistry`]
    /// so identical scalar values share one compressed representation.
    #[must_use]
    pub fn compute_simple_compression(type_name: &str, key: &Key) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        type_name.hash(&mut hasher);
        match key {
            Key::Bool(b) => {
                0u8.hash(&mut hasher);
                b.hash(&mut hasher);
            }
            Key::Int(i) => {
                1u8.hash(&mut hasher);
                i.hash(&mut hasher);
            }
            Key::Float(f) => {
                2u8.hash(&mut hasher);
                f.to_bits().hash(&mut hasher);
            }
            Key::Str(s) => {
                3u8.hash(&mut hasher);
                s.hash(&mut hasher);
            }
            Key::Element(e) => {
                4u8.hash(&mut hasher);
                e.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
