//! Log Performer
//!
//! Turns notifications back into tree edits. Undoing or replaying a log
//! against the performer therefore re-runs the ordinary mutators, and every
//! observer of the affected nodes hears about it the usual way.

use crate::{Node, NodeObserver, Quark};

/// Observer that performs each notified change on the tree
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPerformer;

impl NodeObserver for LogPerformer {
    fn notify_child_added(&self, node: &Node, child: &Node, prev: Option<&Node>) {
        node.add_child(child, prev);
    }

    fn notify_child_removed(&self, node: &Node, child: &Node, _prev: Option<&Node>) {
        node.remove_child(child);
    }

    fn notify_child_order_changed(
        &self,
        node: &Node,
        child: &Node,
        _old_prev: Option<&Node>,
        new_prev: Option<&Node>,
    ) {
        node.change_order(child, new_prev);
    }

    fn notify_content_changed(&self, node: &Node, _old: Option<&str>, new: Option<&str>) {
        node.set_content(new);
    }

    fn notify_attribute_changed(
        &self,
        node: &Node,
        key: Quark,
        _old: Option<&str>,
        new: Option<&str>,
    ) {
        node.set_attribute_code(key, new);
    }
}
