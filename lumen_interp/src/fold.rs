//! Constant folding for the optimizing analysis.
//!
//! Calls to unshadowed builtins whose arguments are all literals are
//! evaluated ahead of time. Conditional jumps on a folded condition become
//! either nothing (condition truthy) or an unconditional jump.

use crate::builtins;
use crate::namespace::Namespace;
use lumen_ir::{Fragment, Node, Value};

/// Fold constants throughout `fragment`.
pub fn fold_constants(namespace: &Namespace, fragment: Fragment) -> Fragment {
    let Fragment { arity, body } = fragment;
    Fragment::from_node(arity, fold_node(namespace, body))
}

fn fold_statements(namespace: &Namespace, stmts: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match fold_node(namespace, stmt) {
            Node::GotoIfNot { cond, target } => match *cond {
                Node::Literal(value) if value.is_truthy() => {}
                Node::Literal(_) => out.push(Node::Goto(target)),
                cond => out.push(Node::GotoIfNot {
                    cond: Box::new(cond),
                    target,
                }),
            },
            folded => out.push(folded),
        }
    }
    out
}

fn fold_node(namespace: &Namespace, node: Node) -> Node {
    match node {
        Node::Call { callee, args } => {
            let args: Vec<Node> = args.into_iter().map(|arg| fold_node(namespace, arg)).collect();
            if namespace.is_builtin(&callee) {
                if let Some(value) = literal_args(&args).and_then(|values| evaluate(&callee, &values)) {
                    return Node::Literal(value);
                }
            }
            Node::Call { callee, args }
        }
        Node::Assign { local, value } => Node::Assign {
            local,
            value: Box::new(fold_node(namespace, *value)),
        },
        Node::GotoIfNot { cond, target } => Node::GotoIfNot {
            cond: Box::new(fold_node(namespace, *cond)),
            target,
        },
        Node::Return(value) => Node::Return(Box::new(fold_node(namespace, *value))),
        Node::Block(stmts) => Node::Block(fold_statements(namespace, stmts)),
        Node::Other { head, args } => Node::Other {
            head,
            args: args.into_iter().map(|arg| fold_node(namespace, arg)).collect(),
        },
        leaf => leaf,
    }
}

fn literal_args(args: &[Node]) -> Option<Vec<Value>> {
    args.iter()
        .map(|arg| match arg {
            Node::Literal(value) => Some(value.clone()),
            _ => None,
        })
        .collect()
}

/// Evaluate a builtin; failures are left for run time.
fn evaluate(name: &str, values: &[Value]) -> Option<Value> {
    builtins::apply(name, values)?.ok()
}
