//! [`Frontend`] implementation backed by the interpreter.

use crate::fold::fold_constants;
use crate::function::InterpretedFunction;
use crate::interpreter::Frame;
use crate::lower::lower_definition;
use crate::namespace::Namespace;
use log::debug;
use lumen_ir::{
    CallError, CallResult, CallSignature, Callable, CallableId, DepthFirst, Fragment, FunctionDef, Node, Value,
};
use lumen_pipeline::{Frontend, FrontendError};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Interpreter-backed frontend.
///
/// Every function it creates is an [`InterpretedFunction`] registered by
/// callable identity; callables it did not create (builtins, trampolines,
/// host closures) have no IR.
pub struct ReferenceFrontend {
    namespace: Arc<Namespace>,
    functions: RwLock<FxHashMap<CallableId, Arc<InterpretedFunction>>>,
    analyses: AtomicU64,
    traversal: DepthFirst,
}

impl ReferenceFrontend {
    pub fn new() -> Self {
        Self {
            namespace: Arc::new(Namespace::new()),
            functions: RwLock::new(FxHashMap::default()),
            analyses: AtomicU64::new(0),
            traversal: DepthFirst,
        }
    }

    #[inline]
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Evaluate and bind a definition without any annotation.
    pub fn define(&self, def: &FunctionDef) -> Result<Callable, FrontendError> {
        let callable = self.evaluate_definition(def)?;
        self.bind(&def.name, callable.clone())?;
        Ok(callable)
    }

    /// Evaluate a top-level expression or statement sequence.
    pub fn evaluate(&self, expr: &Node) -> CallResult<Value> {
        Frame::new(&[], &self.namespace).run(expr)
    }

    /// Call the callable bound under `name`.
    pub fn call(&self, name: &str, args: &[Value]) -> CallResult<Value> {
        let callable = self
            .namespace
            .get(name)
            .ok_or_else(|| CallError::Undefined { name: name.to_string() })?;
        callable.call(args)
    }

    /// Number of analyses (optimizing or not) run so far.
    #[inline]
    pub fn analysis_count(&self) -> u64 {
        self.analyses.load(Ordering::Relaxed)
    }

    /// Body currently installed for `callable`.
    pub fn body_of(&self, callable: &Callable) -> Option<Fragment> {
        let function = self.functions.read().get(&callable.id()).cloned()?;
        function.body().map(|body| (*body).clone())
    }

    fn register(&self, function: InterpretedFunction) -> Callable {
        let function = Arc::new(function);
        let callable = Callable::new(function.clone());
        self.functions.write().insert(callable.id(), function);
        callable
    }

    fn function(&self, callable: &Callable) -> Result<Arc<InterpretedFunction>, FrontendError> {
        self.functions
            .read()
            .get(&callable.id())
            .cloned()
            .ok_or_else(|| FrontendError::NoSource {
                name: callable.name().to_string(),
            })
    }

    /// Installed body, or no candidates when `signature` cannot apply.
    fn candidates(&self, callable: &Callable, signature: &CallSignature) -> Result<Option<Fragment>, FrontendError> {
        let function = self.function(callable)?;
        if signature.arity() != callable.arity() {
            return Ok(None);
        }
        let body = function.body().ok_or_else(|| FrontendError::NoSource {
            name: callable.name().to_string(),
        })?;
        Ok(Some((*body).clone()))
    }
}

impl Default for ReferenceFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for ReferenceFrontend {
    fn lowered_form(&self, callable: &Callable, signature: &CallSignature) -> Result<Vec<Fragment>, FrontendError> {
        Ok(self.candidates(callable, signature)?.into_iter().collect())
    }

    fn analyzed_form(
        &self,
        callable: &Callable,
        signature: &CallSignature,
        optimize: bool,
    ) -> Result<Vec<Fragment>, FrontendError> {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        let candidates = self.candidates(callable, signature)?;
        Ok(candidates
            .map(|body| {
                if optimize {
                    fold_constants(&self.namespace, body)
                } else {
                    body
                }
            })
            .into_iter()
            .collect())
    }

    fn skeleton(&self, name: &str, arity: usize) -> Result<Callable, FrontendError> {
        Ok(self.register(InterpretedFunction::skeleton(name, arity, self.namespace.clone())))
    }

    fn install_body(&self, skeleton: &Callable, fragment: Fragment) -> Result<(), FrontendError> {
        let function = self
            .functions
            .read()
            .get(&skeleton.id())
            .cloned()
            .ok_or_else(|| FrontendError::ForeignCallable {
                name: skeleton.name().to_string(),
            })?;
        if fragment.arity != skeleton.arity() {
            return Err(FrontendError::Other(format!(
                "body takes {} arguments but `{}` takes {}",
                fragment.arity,
                skeleton.name(),
                skeleton.arity()
            )));
        }
        function.install(fragment);
        Ok(())
    }

    fn evaluate_definition(&self, def: &FunctionDef) -> Result<Callable, FrontendError> {
        let body = lower_definition(&self.traversal, def).map_err(|err| FrontendError::Definition {
            name: def.name.to_string(),
            message: err.to_string(),
        })?;
        Ok(self.register(InterpretedFunction::with_body(&def.name, body, self.namespace.clone())))
    }

    fn bind(&self, name: &str, callable: Callable) -> Result<(), FrontendError> {
        debug!("binding `{}` to {}", name, callable.id());
        self.namespace.set(name, callable);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Option<Callable> {
        self.namespace.get(name)
    }

    fn has_source(&self, callable: &Callable) -> bool {
        self.functions.read().contains_key(&callable.id())
    }
}
