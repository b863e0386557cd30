//! IR node definitions.
//!
//! Program fragments are trees of [`Node`]. The node set is closed: every
//! kind carries only the fields it needs, and passes match on kinds instead
//! of inspecting untyped heads.
//!
//! # Statement Sequences
//!
//! A function body is a [`Node::Block`] whose children are the top-level
//! statements. Jumps ([`Node::Goto`], [`Node::GotoIfNot`]) and jump targets
//! ([`Node::Label`]) are statements of that sequence.

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Interned-style name used for callees, locals and node heads.
pub type Symbol = Arc<str>;

// =============================================================================
// Label Identifier
// =============================================================================

/// Identifier of a jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

impl LabelId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Node
// =============================================================================

/// A node of the IR tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Constant value.
    Literal(Value),
    /// Positional argument of the enclosing function.
    Argument(u32),
    /// Read of a named local.
    Local(Symbol),
    /// Write to a named local; evaluates to the written value.
    Assign { local: Symbol, value: Box<Node> },
    /// Call of a named callee.
    Call { callee: Symbol, args: Vec<Node> },
    /// Jump-target definition.
    Label(LabelId),
    /// Unconditional jump.
    Goto(LabelId),
    /// Jump when `cond` is falsy.
    GotoIfNot { cond: Box<Node>, target: LabelId },
    /// Return from the enclosing function.
    Return(Box<Node>),
    /// Statement sequence.
    Block(Vec<Node>),
    /// Any other form, identified by its head.
    Other { head: Symbol, args: Vec<Node> },
}

impl Node {
    pub fn lit(value: impl Into<Value>) -> Self {
        Node::Literal(value.into())
    }

    pub fn arg(index: u32) -> Self {
        Node::Argument(index)
    }

    pub fn local(name: &str) -> Self {
        Node::Local(Arc::from(name))
    }

    pub fn assign(local: &str, value: Node) -> Self {
        Node::Assign {
            local: Arc::from(local),
            value: Box::new(value),
        }
    }

    pub fn call(callee: &str, args: Vec<Node>) -> Self {
        Node::Call {
            callee: Arc::from(callee),
            args,
        }
    }

    pub fn label(id: u32) -> Self {
        Node::Label(LabelId(id))
    }

    pub fn goto(id: u32) -> Self {
        Node::Goto(LabelId(id))
    }

    pub fn goto_if_not(cond: Node, id: u32) -> Self {
        Node::GotoIfNot {
            cond: Box::new(cond),
            target: LabelId(id),
        }
    }

    pub fn ret(value: Node) -> Self {
        Node::Return(Box::new(value))
    }

    pub fn block(stmts: Vec<Node>) -> Self {
        Node::Block(stmts)
    }

    /// Check if this node defines a jump target.
    #[inline]
    pub fn is_label(&self) -> bool {
        matches!(self, Node::Label(_))
    }

    /// Check if this node transfers control to a label.
    #[inline]
    pub fn is_jump(&self) -> bool {
        matches!(self, Node::Goto(_) | Node::GotoIfNot { .. })
    }

    /// Label defined or targeted by this node, if any.
    pub fn label_ref(&self) -> Option<LabelId> {
        match self {
            Node::Label(id) | Node::Goto(id) => Some(*id),
            Node::GotoIfNot { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Statements of a block.
    pub fn statements(&self) -> Option<&[Node]> {
        match self {
            Node::Block(stmts) => Some(stmts),
            _ => None,
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::Argument(_) => "argument",
            Node::Local(_) => "local",
            Node::Assign { .. } => "assign",
            Node::Call { .. } => "call",
            Node::Label(_) => "label",
            Node::Goto(_) => "goto",
            Node::GotoIfNot { .. } => "gotoifnot",
            Node::Return(_) => "return",
            Node::Block(_) => "block",
            Node::Other { .. } => "other",
        }
    }
}

// =============================================================================
// Fragment
// =============================================================================

/// A function body at some IR level, plus its declared arity.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Declared parameter count.
    pub arity: usize,
    /// Body; function-body-shaped when this is a [`Node::Block`].
    pub body: Node,
}

impl Fragment {
    /// Build a function-body-shaped fragment from statements.
    pub fn new(arity: usize, stmts: Vec<Node>) -> Self {
        Self {
            arity,
            body: Node::Block(stmts),
        }
    }

    /// Wrap an arbitrary node without checking its shape.
    pub fn from_node(arity: usize, body: Node) -> Self {
        Self { arity, body }
    }

    /// Check if the body is a statement sequence.
    #[inline]
    pub fn is_function_body(&self) -> bool {
        matches!(self.body, Node::Block(_))
    }

    /// Top-level statements (empty if not function-body-shaped).
    pub fn statements(&self) -> &[Node] {
        self.body.statements().unwrap_or(&[])
    }
}

// =============================================================================
// Function Definition
// =============================================================================

/// A surface-level function definition as handed to the annotation entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub body: Node,
}

impl FunctionDef {
    pub fn new(name: &str, params: &[&str], body: Node) -> Self {
        Self {
            name: Arc::from(name),
            params: params.iter().map(|p| Arc::from(*p)).collect(),
            body,
        }
    }

    /// Declared parameter count.
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Same definition under another name.
    pub fn renamed(&self, name: Symbol) -> Self {
        Self {
            name,
            params: self.params.clone(),
            body: self.body.clone(),
        }
    }
}
