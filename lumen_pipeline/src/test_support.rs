//! In-memory frontend for unit tests.

use crate::frontend::{Frontend, FrontendError};
use lumen_ir::{CallSignature, Callable, CallableId, Fragment, FunctionDef, Node, Value};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Stores one body per callable; analysis returns it unchanged.
#[derive(Default)]
pub(crate) struct StubFrontend {
    bodies: Mutex<FxHashMap<CallableId, Fragment>>,
    names: Mutex<FxHashMap<String, Callable>>,
    pub analyses: AtomicUsize,
    pub optimizing_analyses: AtomicUsize,
    pub duplicate_candidates: AtomicBool,
    pub malformed_analysis: AtomicBool,
}

impl StubFrontend {
    /// Register a callable whose lowered form is `body`.
    pub fn define(&self, name: &str, body: Fragment) -> Callable {
        let callable = Callable::native(name, body.arity, |_| Ok(Value::Nothing));
        self.bodies.lock().insert(callable.id(), body);
        callable
    }

    /// Body currently installed for `callable`.
    pub fn body_of(&self, callable: &Callable) -> Option<Fragment> {
        self.bodies.lock().get(&callable.id()).cloned()
    }

    fn body(&self, callable: &Callable) -> Result<Fragment, FrontendError> {
        self.body_of(callable).ok_or_else(|| FrontendError::NoSource {
            name: callable.name().to_string(),
        })
    }
}

impl Frontend for StubFrontend {
    fn lowered_form(&self, callable: &Callable, _: &CallSignature) -> Result<Vec<Fragment>, FrontendError> {
        Ok(vec![self.body(callable)?])
    }

    fn analyzed_form(
        &self,
        callable: &Callable,
        _: &CallSignature,
        optimize: bool,
    ) -> Result<Vec<Fragment>, FrontendError> {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        if optimize {
            self.optimizing_analyses.fetch_add(1, Ordering::Relaxed);
        }
        let body = self.body(callable)?;
        if self.malformed_analysis.load(Ordering::Relaxed) {
            return Ok(vec![Fragment::from_node(body.arity, Node::lit(0))]);
        }
        if self.duplicate_candidates.load(Ordering::Relaxed) {
            return Ok(vec![body.clone(), body]);
        }
        Ok(vec![body])
    }

    fn skeleton(&self, name: &str, arity: usize) -> Result<Callable, FrontendError> {
        Ok(self.define(name, Fragment::new(arity, Vec::new())))
    }

    fn install_body(&self, skeleton: &Callable, fragment: Fragment) -> Result<(), FrontendError> {
        let mut bodies = self.bodies.lock();
        match bodies.get_mut(&skeleton.id()) {
            Some(slot) => {
                *slot = fragment;
                Ok(())
            }
            None => Err(FrontendError::ForeignCallable {
                name: skeleton.name().to_string(),
            }),
        }
    }

    fn evaluate_definition(&self, def: &FunctionDef) -> Result<Callable, FrontendError> {
        Ok(self.define(&def.name, Fragment::from_node(def.arity(), def.body.clone())))
    }

    fn bind(&self, name: &str, callable: Callable) -> Result<(), FrontendError> {
        self.names.lock().insert(name.to_string(), callable);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<Callable> {
        self.names.lock().get(name).cloned()
    }

    fn has_source(&self, callable: &Callable) -> bool {
        self.bodies.lock().contains_key(&callable.id())
    }
}
