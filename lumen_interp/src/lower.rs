//! Lowering of surface definitions.
//!
//! Surface bodies name their parameters as locals. Lowering replaces every
//! read of a parameter with its positional [`Node::Argument`]. A parameter
//! that the body reassigns stays a local, initialized from its argument by
//! a prologue assignment.

use lumen_ir::{Fragment, FunctionDef, Node, Symbol, Traversal, Visit};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Errors found while lowering a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("parameter `{0}` is declared twice")]
    DuplicateParameter(Symbol),
}

/// Lower `def` into a function-body-shaped fragment.
pub fn lower_definition<T: Traversal>(traversal: &T, def: &FunctionDef) -> Result<Fragment, LowerError> {
    let mut params: FxHashMap<Symbol, u32> = FxHashMap::default();
    for (index, name) in def.params.iter().enumerate() {
        if params.insert(name.clone(), index as u32).is_some() {
            return Err(LowerError::DuplicateParameter(name.clone()));
        }
    }

    let stmts = match &def.body {
        Node::Block(stmts) => stmts.clone(),
        expr => vec![Node::ret(expr.clone())],
    };
    let body = Node::Block(stmts);

    let mut assigned = FxHashSet::default();
    let body = traversal.rewrite(body, &mut assigned, &mut |node, assigned: &mut FxHashSet<Symbol>, _| {
        if let Node::Assign { local, .. } = node {
            assigned.insert(local.clone());
        }
        Visit::Recurse
    });

    let mut prologue: Vec<Node> = def
        .params
        .iter()
        .enumerate()
        .filter(|(_, name)| assigned.contains(*name))
        .map(|(index, name)| Node::Assign {
            local: name.clone(),
            value: Box::new(Node::Argument(index as u32)),
        })
        .collect();

    let body = traversal.rewrite(body, &mut (), &mut |node, _, _| match node {
        Node::Local(name) if !assigned.contains(name) => match params.get(name) {
            Some(index) => Visit::Replace(Node::Argument(*index)),
            None => Visit::Recurse,
        },
        _ => Visit::Recurse,
    });

    if let Node::Block(stmts) = body {
        prologue.extend(stmts);
    }
    Ok(Fragment::new(def.arity(), prologue))
}
