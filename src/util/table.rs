use std::fmt;

use crate::ast::NodeId;

/// A side table holding at most one value per node.
///
/// Slots are written once: a pass that decorates the same node twice is
/// broken, so [`NodeTable::set`] panics instead of overwriting.
pub struct NodeTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> NodeTable<T> {
    pub fn new(node_count: usize) -> NodeTable<T> {
        let mut slots = Vec::with_capacity(node_count);
        slots.resize_with(node_count, || None);
        NodeTable { slots }
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Decorates the given node.
    ///
    /// # Panics
    ///
    /// If the node is already decorated or doesn't belong to the program this
    /// table was sized for.
    #[track_caller]
    pub fn set(&mut self, id: NodeId, value: T) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            panic!("node {id} is out of the table bounds ({})", self.slots.len());
        };
        assert!(slot.is_none(), "node {id} is already decorated");
        *slot = Some(value);
    }

    /// Number of decorated nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let id = NodeId::new(u32::try_from(i).expect("node ids fit in u32"));
            slot.as_ref().map(|value| (id, value))
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut t = NodeTable::new(3);
        assert!(t.is_empty());
        t.set(NodeId::new(1), "one");
        assert_eq!(t.get(NodeId::new(0)), None);
        assert_eq!(t.get(NodeId::new(1)), Some(&"one"));
        assert_eq!(t.get(NodeId::new(7)), None);
        assert_eq!(t.len(), 1);
        assert_eq!(t.iter().collect::<Vec<_>>(), [(NodeId::new(1), &"one")]);
    }

    #[test]
    #[should_panic = "already decorated"]
    fn rebinding_panics() {
        let mut t = NodeTable::new(1);
        t.set(NodeId::new(0), 1);
        t.set(NodeId::new(0), 2);
    }

    #[test]
    #[should_panic = "out of the table bounds"]
    fn foreign_node_panics() {
        let mut t = NodeTable::new(1);
        t.set(NodeId::new(1), 1);
    }
}
