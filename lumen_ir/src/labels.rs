//! Label normalization.
//!
//! Rewriting passes leave jump targets with arbitrary, possibly sparse or
//! duplicated ids. Normalization renumbers them canonically:
//!
//! 1. **Collection**: walk the body in document order and assign each label
//!    the next canonical id. A label that directly follows another label in
//!    the same statement sequence is aliased to the previous label's id
//!    instead of taking a new one. Runs never cross a block boundary.
//! 2. **Rewrite**: replace every label definition and every jump target with
//!    its canonical id.
//! 3. **Cleanup**: in each statement sequence, drop a label definition whose
//!    predecessor is also a label definition (the aliases from step 1).
//!
//! Afterwards the ids form the contiguous range `0..k` in document order and
//! no two adjacent statements are both label definitions.

use crate::error::{IrError, IrResult};
use crate::node::{Fragment, LabelId, Node};
use crate::traverse::{Traversal, Visit};
use rustc_hash::FxHashMap;

// =============================================================================
// Label Map
// =============================================================================

/// Mapping from original label ids to canonical ids.
///
/// Lives for a single normalization.
#[derive(Debug, Default, Clone)]
pub struct LabelMap {
    canonical: FxHashMap<LabelId, LabelId>,
    next_block_num: u32,
    prev_was_label: bool,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id for an original label.
    #[inline]
    pub fn get(&self, label: LabelId) -> Option<LabelId> {
        self.canonical.get(&label).copied()
    }

    /// Number of distinct canonical ids handed out.
    #[inline]
    pub fn canonical_count(&self) -> u32 {
        self.next_block_num
    }

    /// Record a label definition encountered in document order.
    fn define(&mut self, label: LabelId) -> IrResult<()> {
        let canonical = if self.prev_was_label && self.next_block_num > 0 {
            LabelId(self.next_block_num - 1)
        } else {
            let id = LabelId(self.next_block_num);
            self.next_block_num += 1;
            id
        };

        if let Some(existing) = self.canonical.insert(label, canonical) {
            if existing != canonical {
                return Err(IrError::DuplicateLabel { label });
            }
        }
        self.prev_was_label = true;
        Ok(())
    }

    /// Any non-label node breaks a run of consecutive labels.
    #[inline]
    fn break_run(&mut self) {
        self.prev_was_label = false;
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize the labels of a function body.
pub fn normalize_labels<T: Traversal>(traversal: &T, body: Node) -> IrResult<Node> {
    let map = collect(traversal, &body)?;

    let mut state = RewriteState {
        map: &map,
        error: None,
    };
    let rewritten = rewrite_refs(traversal, body, &mut state);
    if let Some(err) = state.error {
        return Err(err);
    }

    Ok(drop_aliases(rewritten))
}

/// Normalize the labels of a fragment's body.
pub fn normalize_fragment<T: Traversal>(traversal: &T, fragment: Fragment) -> IrResult<Fragment> {
    Ok(Fragment {
        arity: fragment.arity,
        body: normalize_labels(traversal, fragment.body)?,
    })
}

struct CollectState {
    map: LabelMap,
    error: Option<IrError>,
}

fn collect<T: Traversal>(traversal: &T, body: &Node) -> IrResult<LabelMap> {
    let mut state = CollectState {
        map: LabelMap::new(),
        error: None,
    };
    collect_into(traversal, body, &mut state);

    match state.error {
        Some(err) => Err(err),
        None => Ok(state.map),
    }
}

fn collect_into<T: Traversal>(traversal: &T, node: &Node, state: &mut CollectState) {
    traversal.rewrite(node.clone(), state, &mut |node, state, _| match node {
        Node::Label(label) => {
            if let Err(err) = state.map.define(*label) {
                state.error.get_or_insert(err);
            }
            Visit::Replace(node.clone())
        }
        Node::Block(stmts) => {
            // A nested sequence starts and ends its own run of labels.
            state.map.break_run();
            for stmt in stmts {
                collect_into(traversal, stmt, state);
            }
            state.map.break_run();
            Visit::Replace(Node::Block(Vec::new()))
        }
        _ => {
            state.map.break_run();
            Visit::Recurse
        }
    });
}

struct RewriteState<'a> {
    map: &'a LabelMap,
    error: Option<IrError>,
}

impl RewriteState<'_> {
    fn resolve(&mut self, label: LabelId) -> LabelId {
        match self.map.get(label) {
            Some(canonical) => canonical,
            None => {
                self.error.get_or_insert(IrError::UndefinedLabel { label });
                label
            }
        }
    }
}

fn rewrite_refs<T: Traversal>(traversal: &T, node: Node, state: &mut RewriteState<'_>) -> Node {
    traversal.rewrite(node, state, &mut |node, state, _| match node {
        Node::Label(label) => Visit::Replace(Node::Label(state.resolve(*label))),
        Node::Goto(label) => Visit::Replace(Node::Goto(state.resolve(*label))),
        Node::GotoIfNot { cond, target } => {
            let target = state.resolve(*target);
            let cond = rewrite_refs(traversal, (**cond).clone(), state);
            Visit::Replace(Node::GotoIfNot {
                cond: Box::new(cond),
                target,
            })
        }
        _ => Visit::Recurse,
    })
}

fn drop_aliases(node: Node) -> Node {
    match node {
        Node::Block(stmts) => {
            let mut kept = Vec::with_capacity(stmts.len());
            let mut prev_was_label = false;
            for stmt in stmts {
                match stmt {
                    Node::Label(label) => {
                        if !prev_was_label {
                            kept.push(Node::Label(label));
                        }
                        prev_was_label = true;
                    }
                    other => {
                        kept.push(drop_aliases(other));
                        prev_was_label = false;
                    }
                }
            }
            Node::Block(kept)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traverse::DepthFirst;

    fn normalize(stmts: Vec<Node>) -> IrResult<Vec<Node>> {
        let out = normalize_labels(&DepthFirst, Node::block(stmts))?;
        match out {
            Node::Block(stmts) => Ok(stmts),
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_sparse_labels_become_dense() {
        let out = normalize(vec![
            Node::goto(40),
            Node::label(17),
            Node::ret(Node::lit(1)),
            Node::label(40),
            Node::goto(17),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![
                Node::goto(1),
                Node::label(0),
                Node::ret(Node::lit(1)),
                Node::label(1),
                Node::goto(0),
            ]
        );
    }

    #[test]
    fn test_consecutive_labels_collapse() {
        let out = normalize(vec![
            Node::label(5),
            Node::label(9),
            Node::label(2),
            Node::goto_if_not(Node::arg(0), 9),
            Node::goto(2),
            Node::label(3),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![
                Node::label(0),
                Node::goto_if_not(Node::arg(0), 0),
                Node::goto(0),
                Node::label(1),
            ]
        );
    }

    #[test]
    fn test_body_without_labels_is_unchanged() {
        let stmts = vec![
            Node::assign("x", Node::call("+", vec![Node::arg(0), Node::lit(2)])),
            Node::ret(Node::local("x")),
        ];
        assert_eq!(normalize(stmts.clone()).unwrap(), stmts);
    }

    #[test]
    fn test_undefined_target_is_rejected() {
        let err = normalize(vec![Node::label(1), Node::goto(2)]).unwrap_err();
        assert_eq!(err, IrError::UndefinedLabel { label: LabelId(2) });
    }

    #[test]
    fn test_duplicate_definition_is_rejected() {
        let err = normalize(vec![
            Node::label(1),
            Node::ret(Node::lit(0)),
            Node::label(1),
        ])
        .unwrap_err();
        assert_eq!(err, IrError::DuplicateLabel { label: LabelId(1) });
    }

    #[test]
    fn test_repeated_consecutive_definition_is_an_alias() {
        let out = normalize(vec![Node::label(4), Node::label(4), Node::goto(4)]).unwrap();
        assert_eq!(out, vec![Node::label(0), Node::goto(0)]);
    }

    #[test]
    fn test_nested_trailing_label_does_not_alias_outer_label() {
        let out = normalize(vec![
            Node::goto(3),
            Node::block(vec![Node::assign("t", Node::lit(1)), Node::label(8)]),
            Node::label(3),
            Node::ret(Node::lit(2)),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![
                Node::goto(1),
                Node::block(vec![Node::assign("t", Node::lit(1)), Node::label(0)]),
                Node::label(1),
                Node::ret(Node::lit(2)),
            ]
        );
    }

    #[test]
    fn test_nested_leading_label_does_not_alias_outer_label() {
        let out = normalize(vec![
            Node::label(5),
            Node::block(vec![Node::label(6), Node::goto(5)]),
            Node::goto(6),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![
                Node::label(0),
                Node::block(vec![Node::label(1), Node::goto(0)]),
                Node::goto(1),
            ]
        );
    }

    #[test]
    fn test_consecutive_labels_collapse_inside_nested_block() {
        let out = normalize(vec![
            Node::block(vec![Node::label(2), Node::label(4), Node::goto(2)]),
            Node::goto(4),
        ])
        .unwrap();

        assert_eq!(
            out,
            vec![
                Node::block(vec![Node::label(0), Node::goto(0)]),
                Node::goto(0),
            ]
        );
    }

    #[test]
    fn test_label_map_counts() {
        let body = Node::block(vec![Node::label(3), Node::label(4), Node::lit(0), Node::label(9)]);
        let map = collect(&DepthFirst, &body).unwrap();
        assert_eq!(map.canonical_count(), 2);
        assert_eq!(map.get(LabelId(3)), Some(LabelId(0)));
        assert_eq!(map.get(LabelId(4)), Some(LabelId(0)));
        assert_eq!(map.get(LabelId(9)), Some(LabelId(1)));
        assert_eq!(map.get(LabelId(1)), None);
    }

    #[test]
    fn test_normalize_fragment_keeps_arity() {
        let fragment = Fragment::new(2, vec![Node::label(7), Node::goto(7)]);
        let out = normalize_fragment(&DepthFirst, fragment).unwrap();
        assert_eq!(out.arity, 2);
        assert_eq!(out.statements(), &[Node::label(0), Node::goto(0)]);
    }
}
