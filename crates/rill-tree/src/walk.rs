//! Listener protocol
//!
//! `walk` drives a depth-first traversal and fires `enter` before a node's
//! children and `exit` after them. Tokens produce no events. The first
//! error returned by the listener stops the walk.

use crate::node::Node;
use rill_error::Result;

/// Receives enter/exit events for every node in the tree
pub trait Listener {
    fn enter(&mut self, node: &Node) -> Result<()>;

    fn exit(&mut self, node: &Node) -> Result<()>;
}

/// Walks `node` and its descendants in depth-first order
pub fn walk<L: Listener + ?Sized>(node: &Node, listener: &mut L) -> Result<()> {
    listener.enter(node)?;
    for child in node.nodes() {
        walk(child, listener)?;
    }
    listener.exit(node)
}
