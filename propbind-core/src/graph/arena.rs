//! Node Arena
//!
//! The binding tree is stored flat: every node lives in one table indexed by
//! [`NodeId`], and parents refer to children by id. Ownership is still a
//! tree, since a node is only ever reachable through its parent's child
//! table, but nothing holds a pointer into another node. Removing a node is
//! a table operation, and a stale id simply fails to resolve.
//!
//! Traversals collect ids breadth-first so callers can snapshot a subtree
//! before running any callback that might mutate it.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::node::{BindingNode, NodeId, Registration};

/// Table of all nodes in one host's binding tree.
#[derive(Debug)]
pub(crate) struct NodeArena {
    /// All nodes, indexed by ID.
    nodes: HashMap<NodeId, BindingNode>,
    root: NodeId,
}

impl NodeArena {
    /// Create an arena holding only an unbound root.
    pub fn new() -> Self {
        let root = BindingNode::new();
        let root_id = root.id();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&BindingNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut BindingNode> {
        self.nodes.get_mut(&id)
    }

    /// Create an unbound child of `parent` for `property`.
    ///
    /// If `parent` is gone the node is still created, unreachable, and goes
    /// away at the next [`clear`](Self::clear).
    pub fn add_child(&mut self, parent: NodeId, property: Rc<str>) -> NodeId {
        let child = BindingNode::new();
        let child_id = child.id();
        self.nodes.insert(child_id, child);
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.insert_child(property, child_id);
        }
        child_id
    }

    /// Follow child links from the root along `segments`.
    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<NodeId> {
        let mut current = self.root;
        for segment in segments {
            current = self.nodes.get(&current)?.child(segment.as_ref())?;
        }
        Some(current)
    }

    /// `start` and all of its descendants, breadth-first.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&id) {
                result.push(id);
                for (_, child) in node.children() {
                    queue.push_back(child);
                }
            }
        }
        result
    }

    /// Snapshot of every registration held anywhere in the subtree.
    pub fn subtree_registrations(&self, start: NodeId) -> Vec<Registration> {
        self.subtree(start)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .flat_map(BindingNode::all_registrations)
            .collect()
    }

    /// Remove every node and leave a fresh, unbound root with the same id.
    ///
    /// Returns the removed nodes so the caller can drop them (and with them
    /// their subscriptions and callbacks) outside of any borrow.
    #[must_use]
    pub fn clear(&mut self) -> Vec<BindingNode> {
        let drained: Vec<BindingNode> = self.nodes.drain().map(|(_, node)| node).collect();
        self.nodes
            .insert(self.root, BindingNode::with_id(self.root));
        drained
    }

    /// Get the total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn registration_count(&self) -> usize {
        self.nodes.values().map(BindingNode::registration_count).sum()
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}
