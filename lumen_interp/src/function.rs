//! Functions executed by the interpreter.

use crate::interpreter::Frame;
use crate::namespace::Namespace;
use lumen_ir::{CallError, CallResult, Fragment, Function, Value};
use parking_lot::RwLock;
use std::sync::Arc;

/// A function whose body is IR run by the interpreter.
///
/// Bodies are swapped in place by [`InterpretedFunction::install`]; calls in
/// flight keep running the body they started with.
pub struct InterpretedFunction {
    name: Arc<str>,
    arity: usize,
    body: RwLock<Option<Arc<Fragment>>>,
    namespace: Arc<Namespace>,
}

impl InterpretedFunction {
    /// Create a function with no body yet.
    pub fn skeleton(name: &str, arity: usize, namespace: Arc<Namespace>) -> Self {
        Self {
            name: Arc::from(name),
            arity,
            body: RwLock::new(None),
            namespace,
        }
    }

    /// Create a function with `body` installed.
    pub fn with_body(name: &str, body: Fragment, namespace: Arc<Namespace>) -> Self {
        let function = Self::skeleton(name, body.arity, namespace);
        function.install(body);
        function
    }

    /// Replace the body.
    pub fn install(&self, body: Fragment) {
        *self.body.write() = Some(Arc::new(body));
    }

    /// Current body, if any.
    pub fn body(&self) -> Option<Arc<Fragment>> {
        self.body.read().clone()
    }
}

impl Function for InterpretedFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, args: &[Value]) -> CallResult<Value> {
        let body = self
            .body()
            .ok_or_else(|| CallError::Failed(format!("`{}` has no body", self.name)))?;
        Frame::new(args, &self.namespace).run(&body.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ir::{Callable, Node};

    #[test]
    fn test_skeleton_has_no_body() {
        let f = InterpretedFunction::skeleton("f", 1, Arc::new(Namespace::new()));
        assert!(f.body().is_none());
        assert!(f.invoke(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_install_replaces_body() {
        let ns = Arc::new(Namespace::new());
        let f = Arc::new(InterpretedFunction::with_body(
            "f",
            Fragment::new(1, vec![Node::ret(Node::arg(0))]),
            ns,
        ));
        let callable = Callable::new(f.clone());
        assert_eq!(callable.call(&[Value::Int(3)]).unwrap(), Value::Int(3));

        f.install(Fragment::new(1, vec![Node::ret(Node::lit(0))]));
        assert_eq!(callable.call(&[Value::Int(3)]).unwrap(), Value::Int(0));
    }
}
