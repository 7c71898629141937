//! The data-element table: element ID → ancestry and reference count.

use flowgraph_foundation::{ElementId, PathId};
use std::collections::HashMap;

/// One data element: a node occurrence inside a multi-valued subtree.
#[derive(Debug, Clone)]
pub struct DataElement {
    pub path_id: PathId,
    pub parent_element_id: Option<ElementId>,
    pub ref_count: usize,
    /// Children keyed by the path they occur at.
    pub children: HashMap<PathId, std::collections::HashSet<ElementId>>,
}

/// Map from element ID to its ancestry record.
#[derive(Debug, Default)]
pub struct DataElementTable {
    elements: HashMap<ElementId, DataElement>,
}

impl DataElementTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new data element. Root-path elements pass
    /// `parent_element_id: None`.
    pub fn add(&mut self, id: ElementId, path_id: PathId, parent_element_id: Option<ElementId>) {
        if let Some(parent) = parent_element_id {
            if let Some(parent_entry) = self.elements.get_mut(&parent) {
                parent_entry.children.entry(path_id).or_default().insert(id);
            }
        }
        self.elements.insert(
            id,
            DataElement {
                path_id,
                parent_element_id,
                ref_count: 1,
                children: HashMap::new(),
            },
        );
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&DataElement> {
        self.elements.get(&id)
    }

    /// Increments the reference count for `id`.
    ///
    /// # Panics
    /// Panics if `id` is not a registered element.
    pub fn acquire(&mut self, id: ElementId) {
        self.elements
            .get_mut(&id)
            .expect("acquire of an unregistered data element")
            .ref_count += 1;
    }

    /// Decrements the reference count, removing the element (and
    /// detaching it from its parent's child set) once it reaches zero.
    ///
    /// # Panics
    /// Panics if `id` is not a registered element, or is already at zero
    /// references.
    pub fn release(&mut self, id: ElementId) {
        let parent = {
            let entry = self
                .elements
                .get_mut(&id)
                .expect("release of an unregistered data element");
            entry.ref_count = entry
                .ref_count
                .checked_sub(1)
                .expect("data element released more times than it was acquired");
            if entry.ref_count > 0 {
                return;
            }
            entry.parent_element_id
        };
        if let Some(parent) = parent {
            if let Some(parent_entry) = self.elements.get_mut(&parent) {
                let path = self.elements[&id].path_id;
                if let Some(set) = parent_entry.children.get_mut(&path) {
                    set.remove(&id);
                }
            }
        }
        self.elements.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_a_child_registers_it_under_the_parent() {
        let mut table = DataElementTable::new();
        let root_path = PathId::new(1);
        let child_path = PathId::new(2);
        let root = ElementId::new(1);
        let child = ElementId::new(2);
        table.add(root, root_path, None);
        table.add(child, child_path, Some(root));
        assert!(table.get(root).unwrap().children[&child_path].contains(&child));
    }

    #[test]
    fn release_to_zero_removes_the_element() {
        let mut table = DataElementTable::new();
        let e = ElementId::new(1);
        table.add(e, PathId::new(1), None);
        table.release(e);
        assert!(table.get(e).is_none());
    }
}
