//! Tree-walking interpreter.
//!
//! A function body is a statement sequence. Labels are resolved against
//! the top-level statements only; a jump out of a nested block unwinds to
//! the top level and continues at the target there.

use crate::namespace::Namespace;
use lumen_ir::{CallError, CallResult, LabelId, Node, Symbol, Value};
use rustc_hash::FxHashMap;

/// Outcome of executing one statement.
#[derive(Debug)]
enum Flow {
    Next,
    Jump(LabelId),
    Return(Value),
}

/// Execution state of one call.
pub struct Frame<'a> {
    args: &'a [Value],
    locals: FxHashMap<Symbol, Value>,
    namespace: &'a Namespace,
}

impl<'a> Frame<'a> {
    pub fn new(args: &'a [Value], namespace: &'a Namespace) -> Self {
        Self {
            args,
            locals: FxHashMap::default(),
            namespace,
        }
    }

    /// Run a body to completion.
    ///
    /// Statement sequences evaluate to the returned value, or nothing when
    /// control falls off the end; any other node is evaluated as an
    /// expression.
    pub fn run(&mut self, body: &Node) -> CallResult<Value> {
        match body {
            Node::Block(stmts) => self.run_sequence(stmts),
            expr => self.eval(expr),
        }
    }

    fn run_sequence(&mut self, stmts: &[Node]) -> CallResult<Value> {
        let targets: FxHashMap<LabelId, usize> = stmts
            .iter()
            .enumerate()
            .filter_map(|(i, stmt)| match stmt {
                Node::Label(id) => Some((*id, i)),
                _ => None,
            })
            .collect();

        let mut pc = 0;
        while let Some(stmt) = stmts.get(pc) {
            match self.exec(stmt)? {
                Flow::Next => pc += 1,
                Flow::Jump(label) => {
                    pc = *targets
                        .get(&label)
                        .ok_or_else(|| CallError::Failed(format!("jump to undefined label {}", label)))?;
                }
                Flow::Return(value) => return Ok(value),
            }
        }
        Ok(Value::Nothing)
    }

    fn exec(&mut self, stmt: &Node) -> CallResult<Flow> {
        match stmt {
            Node::Label(_) => Ok(Flow::Next),
            Node::Goto(target) => Ok(Flow::Jump(*target)),
            Node::GotoIfNot { cond, target } => {
                if self.eval(cond)?.is_truthy() {
                    Ok(Flow::Next)
                } else {
                    Ok(Flow::Jump(*target))
                }
            }
            Node::Return(value) => Ok(Flow::Return(self.eval(value)?)),
            Node::Block(stmts) => {
                for stmt in stmts {
                    match self.exec(stmt)? {
                        Flow::Next => {}
                        flow => return Ok(flow),
                    }
                }
                Ok(Flow::Next)
            }
            expr => {
                self.eval(expr)?;
                Ok(Flow::Next)
            }
        }
    }

    /// Evaluate an expression.
    pub fn eval(&mut self, node: &Node) -> CallResult<Value> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Argument(index) => self
                .args
                .get(*index as usize)
                .cloned()
                .ok_or_else(|| CallError::Failed(format!("argument {} out of range", index))),
            Node::Local(name) => self
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| CallError::Undefined { name: name.to_string() }),
            Node::Assign { local, value } => {
                let value = self.eval(value)?;
                self.locals.insert(local.clone(), value.clone());
                Ok(value)
            }
            Node::Call { callee, args } => {
                let callable = self
                    .namespace
                    .get(callee)
                    .ok_or_else(|| CallError::Undefined { name: callee.to_string() })?;
                let values = args.iter().map(|arg| self.eval(arg)).collect::<CallResult<Vec<_>>>()?;
                callable.call(&values)
            }
            Node::Block(stmts) => {
                let mut last = Value::Nothing;
                for stmt in stmts {
                    last = self.eval(stmt)?;
                }
                Ok(last)
            }
            Node::Other { head, .. } => Err(CallError::Failed(format!("unsupported form `{}`", head))),
            control => Err(CallError::Failed(format!(
                "{} is not valid in expression position",
                control.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(body: Node, args: &[Value]) -> CallResult<Value> {
        let ns = Namespace::new();
        Frame::new(args, &ns).run(&body)
    }

    /// sum(n) = 0 + 1 + ... + (n - 1)
    fn sum_loop() -> Node {
        Node::block(vec![
            Node::assign("acc", Node::lit(0)),
            Node::assign("i", Node::lit(0)),
            Node::label(1),
            Node::goto_if_not(Node::call("<", vec![Node::local("i"), Node::arg(0)]), 2),
            Node::assign("acc", Node::call("+", vec![Node::local("acc"), Node::local("i")])),
            Node::assign("i", Node::call("+", vec![Node::local("i"), Node::lit(1)])),
            Node::goto(1),
            Node::label(2),
            Node::ret(Node::local("acc")),
        ])
    }

    #[test]
    fn test_loop_with_labels() {
        assert_eq!(run(sum_loop(), &[Value::Int(5)]).unwrap(), Value::Int(10));
        assert_eq!(run(sum_loop(), &[Value::Int(0)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_fall_off_end_is_nothing() {
        let body = Node::block(vec![Node::assign("x", Node::lit(1))]);
        assert_eq!(run(body, &[]).unwrap(), Value::Nothing);
    }

    #[test]
    fn test_return_from_nested_block() {
        let body = Node::block(vec![
            Node::block(vec![Node::ret(Node::lit(1))]),
            Node::ret(Node::lit(2)),
        ]);
        assert_eq!(run(body, &[]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_jump_out_of_nested_block() {
        let body = Node::block(vec![
            Node::block(vec![Node::goto(7), Node::ret(Node::lit(1))]),
            Node::label(7),
            Node::ret(Node::lit(2)),
        ]);
        assert_eq!(run(body, &[]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_undefined_label() {
        let err = run(Node::block(vec![Node::goto(3)]), &[]).unwrap_err();
        assert!(err.to_string().contains("#3"));
    }

    #[test]
    fn test_undefined_names() {
        assert!(matches!(
            run(Node::local("x"), &[]).unwrap_err(),
            CallError::Undefined { .. }
        ));
        assert!(matches!(
            run(Node::call("nope", vec![]), &[]).unwrap_err(),
            CallError::Undefined { .. }
        ));
    }

    #[test]
    fn test_other_is_rejected() {
        let node = Node::Other {
            head: Symbol::from("quote"),
            args: vec![],
        };
        assert!(run(node, &[]).is_err());
    }

    #[test]
    fn test_argument_out_of_range() {
        assert!(run(Node::arg(1), &[Value::Int(0)]).is_err());
    }
}
