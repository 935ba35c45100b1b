//! Suppression scope for writes made through the engine.
//!
//! While a [`SuppressionGuard`] is alive, the next change notification for
//! its property on its node counts as self-inflicted. Dropping the guard
//! removes the mark whether or not the notification arrived, and whether
//! the write returned an error or unwound. A failed write therefore never
//! leaves a property permanently muted.

use std::cell::RefCell;
use std::rc::Rc;

use super::arena::NodeArena;
use super::node::NodeId;

pub(crate) struct SuppressionGuard<'a> {
    arena: &'a RefCell<NodeArena>,
    node: NodeId,
    property: Rc<str>,
}

impl<'a> SuppressionGuard<'a> {
    /// Mark `property` on `node` until the guard is dropped.
    pub fn enter(arena: &'a RefCell<NodeArena>, node: NodeId, property: Rc<str>) -> Self {
        if let Some(n) = arena.borrow_mut().get_mut(node) {
            n.suppress(Rc::clone(&property));
        }
        Self {
            arena,
            node,
            property,
        }
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        // try_borrow_mut: the guard may be dropped while unwinding out of a
        // frame that still holds the arena.
        if let Ok(mut arena) = self.arena.try_borrow_mut() {
            if let Some(node) = arena.get_mut(self.node) {
                node.take_suppressed(&self.property);
            }
        }
    }
}
