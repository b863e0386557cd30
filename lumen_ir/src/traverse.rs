//! Tree traversal capability.
//!
//! Rewrites are expressed as a visitor over [`Node`]: for every node the
//! visitor either supplies a replacement ([`Visit::Replace`]) or asks for the
//! default recursion into the node's children ([`Visit::Recurse`]). The
//! [`Traversal`] trait is the seam; [`DepthFirst`] is the stock walker.

use crate::node::Node;

// =============================================================================
// Cursor
// =============================================================================

/// Where a visited node sits in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Position among the parent's children.
    pub index: usize,
    /// The node is a statement of the root statement sequence.
    pub top_level: bool,
    /// The node is evaluated for its value (call argument, condition, ...).
    pub read: bool,
}

impl Cursor {
    /// Cursor of the traversal root.
    pub const ROOT: Cursor = Cursor {
        index: 0,
        top_level: false,
        read: false,
    };
}

/// Visitor decision for a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Visit {
    /// Use this node instead; its children are not visited.
    Replace(Node),
    /// Keep the node and visit its children.
    Recurse,
}

// =============================================================================
// Traversal
// =============================================================================

/// Depth-first rewrite over an IR tree with threaded caller state.
pub trait Traversal {
    /// Rewrite `node`, calling `visit` on every node parent-before-child.
    fn rewrite<S, F>(&self, node: Node, state: &mut S, visit: &mut F) -> Node
    where
        F: FnMut(&Node, &mut S, Cursor) -> Visit;
}

/// Stock depth-first walker; children are visited in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFirst;

impl DepthFirst {
    fn walk<S, F>(&self, node: Node, state: &mut S, visit: &mut F, cursor: Cursor, root: bool) -> Node
    where
        F: FnMut(&Node, &mut S, Cursor) -> Visit,
    {
        match visit(&node, state, cursor) {
            Visit::Replace(replacement) => replacement,
            Visit::Recurse => self.recurse(node, state, visit, root),
        }
    }

    fn recurse<S, F>(&self, node: Node, state: &mut S, visit: &mut F, root: bool) -> Node
    where
        F: FnMut(&Node, &mut S, Cursor) -> Visit,
    {
        let read_at = |index| Cursor {
            index,
            top_level: false,
            read: true,
        };

        match node {
            Node::Assign { local, value } => Node::Assign {
                local,
                value: Box::new(self.walk(*value, state, visit, read_at(0), false)),
            },
            Node::Call { callee, args } => Node::Call {
                callee,
                args: self.walk_all(args, state, visit, read_at),
            },
            Node::GotoIfNot { cond, target } => Node::GotoIfNot {
                cond: Box::new(self.walk(*cond, state, visit, read_at(0), false)),
                target,
            },
            Node::Return(value) => {
                Node::Return(Box::new(self.walk(*value, state, visit, read_at(0), false)))
            }
            Node::Block(stmts) => Node::Block(self.walk_all(stmts, state, visit, |index| Cursor {
                index,
                top_level: root,
                read: false,
            })),
            Node::Other { head, args } => Node::Other {
                head,
                args: self.walk_all(args, state, visit, read_at),
            },
            leaf => leaf,
        }
    }

    fn walk_all<S, F, C>(&self, nodes: Vec<Node>, state: &mut S, visit: &mut F, cursor: C) -> Vec<Node>
    where
        F: FnMut(&Node, &mut S, Cursor) -> Visit,
        C: Fn(usize) -> Cursor,
    {
        nodes
            .into_iter()
            .enumerate()
            .map(|(i, child)| self.walk(child, state, visit, cursor(i), false))
            .collect()
    }
}

impl Traversal for DepthFirst {
    fn rewrite<S, F>(&self, node: Node, state: &mut S, visit: &mut F) -> Node
    where
        F: FnMut(&Node, &mut S, Cursor) -> Visit,
    {
        self.walk(node, state, visit, Cursor::ROOT, true)
    }
}
