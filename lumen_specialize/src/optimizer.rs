//! The optimizer context.
//!
//! [`Optimizer`] ties a frontend to a pass registry, a pipeline and a
//! specialization cache, and exposes the annotation entry points:
//!
//! - [`Optimizer::annotate_function_definition`] binds a definition behind
//!   a trampoline under its public name
//! - [`Optimizer::annotate_call_site`] routes every call in an expression
//!   through a trampoline for its callee
//!
//! Embedders usually create one optimizer per program. A process-wide
//! instance can be installed once with [`install_global`].

use crate::annotate::{surface_definition, surface_expression, Annotated};
use crate::cache::SpecializationCache;
use crate::error::{DispatchError, DispatchResult};
use crate::trampoline::Trampoline;
use log::debug;
use lumen_ir::{Callable, Cursor, DepthFirst, FunctionDef, Node, Symbol, Traversal, Visit};
use lumen_pipeline::{Frontend, Pass, PassPipeline, PassRegistry, PassSet, PipelineConfig, PipelineResult};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

// =============================================================================
// Optimizer
// =============================================================================

/// Pass registry, pipeline and cache bound to one frontend.
pub struct Optimizer {
    frontend: Arc<dyn Frontend>,
    registry: RwLock<PassRegistry>,
    pipeline: Arc<PassPipeline>,
    cache: Arc<SpecializationCache>,
    traversal: DepthFirst,
    /// Suffix counter for generated names.
    next_internal: AtomicU64,
}

impl Optimizer {
    /// Create an optimizer with the default configuration.
    pub fn new(frontend: Arc<dyn Frontend>) -> Self {
        Self::with_config(frontend, PipelineConfig::default())
    }

    /// Create an optimizer configured from the environment.
    pub fn from_env(frontend: Arc<dyn Frontend>) -> Self {
        Self::with_config(frontend, PipelineConfig::from_env())
    }

    pub fn with_config(frontend: Arc<dyn Frontend>, config: PipelineConfig) -> Self {
        let pipeline = Arc::new(PassPipeline::new(frontend.clone(), config));
        Self {
            frontend,
            registry: RwLock::new(PassRegistry::new()),
            pipeline,
            cache: Arc::new(SpecializationCache::new()),
            traversal: DepthFirst,
            next_internal: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn frontend(&self) -> &Arc<dyn Frontend> {
        &self.frontend
    }

    #[inline]
    pub fn pipeline(&self) -> &Arc<PassPipeline> {
        &self.pipeline
    }

    #[inline]
    pub fn cache(&self) -> &Arc<SpecializationCache> {
        &self.cache
    }

    // =========================================================================
    // Pass Registry
    // =========================================================================

    /// Append `pass` to the global pass set.
    pub fn register(&self, pass: Pass) -> PipelineResult<()> {
        self.registry.write().register(pass)
    }

    /// Replace the global pass set. On error the set is unchanged.
    pub fn set_default_pass_set<I: IntoIterator<Item = Pass>>(&self, passes: I) -> PipelineResult<()> {
        self.registry.write().set_default_pass_set(passes)
    }

    /// Snapshot of the global pass set.
    pub fn default_pass_set(&self) -> Arc<PassSet> {
        self.registry.read().current()
    }

    /// `explicit` when non-empty, else the global set.
    pub fn resolve_pass_set(&self, explicit: Option<&Arc<PassSet>>) -> PipelineResult<Arc<PassSet>> {
        self.registry.read().resolve_effective_pass_set(explicit)
    }

    /// Clear the global pass set and the specialization cache.
    ///
    /// Trampolines built earlier keep the pass set they captured.
    pub fn reset(&self) {
        self.registry.write().reset();
        self.cache.clear();
    }

    // =========================================================================
    // Trampolines
    // =========================================================================

    /// Build a trampoline over `target`.
    ///
    /// The effective pass set is resolved now and fixed for the lifetime of
    /// the trampoline.
    pub fn build_trampoline(
        &self,
        name: &str,
        target: Callable,
        pass_set: Option<&Arc<PassSet>>,
    ) -> PipelineResult<Trampoline> {
        let passes = self.resolve_pass_set(pass_set)?;
        Ok(self.trampoline(name, target, passes))
    }

    fn trampoline(&self, name: &str, target: Callable, passes: Arc<PassSet>) -> Trampoline {
        debug!("building trampoline `{}` over `{}` with {}", name, target.name(), passes.id());
        Trampoline::new(name, target, passes, self.pipeline.clone(), self.cache.clone())
    }

    fn internal_name(&self, base: &str, kind: &str) -> String {
        let n = self.next_internal.fetch_add(1, Ordering::Relaxed);
        format!("{}#{}{}", base, kind, n)
    }

    // =========================================================================
    // Annotation
    // =========================================================================

    /// Define `def` so that calls to it are specialized per signature.
    ///
    /// Surface passes rewrite the body first. When every pass is
    /// surface-level the rewritten definition is bound under its own name.
    /// Otherwise it is bound under a hidden `name#implN` and the public name
    /// is bound to a trampoline over it.
    pub fn annotate_function_definition(
        &self,
        def: &FunctionDef,
        pass_set: Option<&Arc<PassSet>>,
    ) -> DispatchResult<Annotated> {
        let passes = self.resolve_pass_set(pass_set)?;
        let def = surface_definition(&passes, def)?;

        if passes.is_surface_only() {
            let callable = self.frontend.evaluate_definition(&def)?;
            self.frontend.bind(&def.name, callable.clone())?;
            return Ok(Annotated::Plain(callable));
        }

        let hidden = self.internal_name(&def.name, "impl");
        let implementation = self
            .frontend
            .evaluate_definition(&def.renamed(Symbol::from(hidden.as_str())))?;
        self.frontend.bind(&hidden, implementation.clone())?;

        let public = self.trampoline(&def.name, implementation.clone(), passes).into_callable();
        self.frontend.bind(&def.name, public.clone())?;

        Ok(Annotated::Trampolined { public, implementation })
    }

    /// Route every call in `expr` through a trampoline for its callee.
    ///
    /// One trampoline is built per distinct callee name; arguments are
    /// wrapped before the call that consumes them. Callees the frontend
    /// holds no IR for are left alone. When every pass is surface-level no
    /// call is wrapped.
    pub fn annotate_call_site(&self, expr: Node, pass_set: Option<&Arc<PassSet>>) -> DispatchResult<Node> {
        let passes = self.resolve_pass_set(pass_set)?;
        let expr = surface_expression(&passes, expr)?;
        if passes.is_surface_only() {
            return Ok(expr);
        }

        let mut state = SiteState::default();
        let rewritten = self.wrap_calls(expr, &passes, &mut state);
        match state.failure {
            Some(err) => Err(err),
            None => Ok(rewritten),
        }
    }

    fn wrap_calls(&self, expr: Node, passes: &Arc<PassSet>, state: &mut SiteState) -> Node {
        let mut visit = |node: &Node, state: &mut SiteState, _: Cursor| match node {
            Node::Call { callee, args } if state.failure.is_none() => {
                let args = args
                    .iter()
                    .map(|arg| self.wrap_calls(arg.clone(), passes, state))
                    .collect();
                match self.wrap_callee(callee, passes, &mut state.sites) {
                    Ok(callee) => Visit::Replace(Node::Call { callee, args }),
                    Err(err) => {
                        state.failure = Some(err);
                        Visit::Replace(node.clone())
                    }
                }
            }
            _ => Visit::Recurse,
        };
        self.traversal.rewrite(expr, state, &mut visit)
    }

    fn wrap_callee(
        &self,
        callee: &Symbol,
        passes: &Arc<PassSet>,
        sites: &mut FxHashMap<Symbol, Symbol>,
    ) -> DispatchResult<Symbol> {
        if let Some(site) = sites.get(callee) {
            return Ok(site.clone());
        }

        let target = self
            .frontend
            .resolve(callee)
            .ok_or_else(|| DispatchError::UnresolvedCallee { name: callee.to_string() })?;
        let site = if self.frontend.has_source(&target) {
            let name = self.internal_name(callee, "site");
            let trampoline = self.trampoline(&name, target, passes.clone()).into_callable();
            self.frontend.bind(&name, trampoline)?;
            Symbol::from(name.as_str())
        } else {
            callee.clone()
        };

        sites.insert(callee.clone(), site.clone());
        Ok(site)
    }
}

/// Threaded through call-site rewriting.
#[derive(Default)]
struct SiteState {
    /// Callee name → name the rewritten calls use.
    sites: FxHashMap<Symbol, Symbol>,
    failure: Option<DispatchError>,
}

// =============================================================================
// Process-wide Instance
// =============================================================================

static GLOBAL: OnceLock<Arc<Optimizer>> = OnceLock::new();

/// Install the process-wide optimizer.
///
/// Fails, returning `optimizer`, when one is already installed.
pub fn install_global(optimizer: Arc<Optimizer>) -> Result<(), Arc<Optimizer>> {
    GLOBAL.set(optimizer)
}

/// The process-wide optimizer, if installed.
pub fn global() -> Option<&'static Arc<Optimizer>> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_interp::ReferenceFrontend;
    use lumen_ir::{IrLevel, Value};
    use lumen_pipeline::{PassOutput, PipelineError};

    fn setup() -> (Arc<ReferenceFrontend>, Optimizer) {
        let frontend = Arc::new(ReferenceFrontend::new());
        let optimizer = Optimizer::new(frontend.clone());
        (frontend, optimizer)
    }

    fn identity(level: IrLevel) -> Pass {
        Pass::new("identity", level, |_, f| Ok(PassOutput::Fragment(f)))
    }

    fn square() -> FunctionDef {
        FunctionDef::new("square", &["x"], Node::call("*", vec![Node::local("x"), Node::local("x")]))
    }

    #[test]
    fn test_registry_round_trip() {
        let (_, optimizer) = setup();
        assert!(optimizer.default_pass_set().is_empty());
        optimizer.register(identity(IrLevel::Lowered)).unwrap();
        optimizer.register(identity(IrLevel::TypedOptimized)).unwrap();
        assert_eq!(optimizer.default_pass_set().len(), 2);

        let err = optimizer.register(identity(IrLevel::Surface)).unwrap_err();
        assert!(matches!(err, PipelineError::OrderingViolation { .. }));
        assert_eq!(optimizer.default_pass_set().len(), 2);
    }

    #[test]
    fn test_plain_definition_when_surface_only() {
        let (frontend, optimizer) = setup();
        optimizer.register(identity(IrLevel::Surface)).unwrap();

        let annotated = optimizer.annotate_function_definition(&square(), None).unwrap();
        assert!(matches!(annotated, Annotated::Plain(_)));
        assert_eq!(frontend.resolve("square"), Some(annotated.public().clone()));
        assert_eq!(frontend.call("square", &[Value::Int(3)]).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_trampolined_definition() {
        let (frontend, optimizer) = setup();
        optimizer.register(identity(IrLevel::Lowered)).unwrap();

        let annotated = optimizer.annotate_function_definition(&square(), None).unwrap();
        let Annotated::Trampolined { public, implementation } = &annotated else {
            panic!("expected a trampoline");
        };
        assert_eq!(public.name(), "square");
        assert!(implementation.name().starts_with("square#impl"));
        assert_eq!(frontend.resolve(implementation.name()), Some(implementation.clone()));
        assert_eq!(frontend.call("square", &[Value::Int(4)]).unwrap(), Value::Int(16));
        assert_eq!(optimizer.cache().len(), 1);
    }

    #[test]
    fn test_build_trampoline_requires_passes() {
        let (frontend, optimizer) = setup();
        let f = frontend.define(&square()).unwrap();
        let err = optimizer.build_trampoline("t", f, None).unwrap_err();
        assert!(matches!(err, PipelineError::NoPassesRegistered));
    }

    #[test]
    fn test_call_site_leaves_builtins_alone() {
        let (frontend, optimizer) = setup();
        optimizer.register(identity(IrLevel::Lowered)).unwrap();
        frontend.define(&square()).unwrap();

        let expr = Node::call("+", vec![Node::call("square", vec![Node::lit(2)]), Node::lit(1)]);
        let wrapped = optimizer.annotate_call_site(expr, None).unwrap();

        let Node::Call { callee, args } = &wrapped else {
            panic!("expected a call");
        };
        assert_eq!(&**callee, "+");
        let Node::Call { callee: inner, .. } = &args[0] else {
            panic!("expected a call");
        };
        assert!(inner.starts_with("square#site"));
        assert_eq!(frontend.evaluate(&wrapped).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_call_site_unresolved_callee() {
        let (_, optimizer) = setup();
        optimizer.register(identity(IrLevel::Lowered)).unwrap();
        let err = optimizer
            .annotate_call_site(Node::call("missing", vec![]), None)
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnresolvedCallee { .. }));
    }

    #[test]
    fn test_reset_clears_registry_and_cache() {
        let (frontend, optimizer) = setup();
        optimizer.register(identity(IrLevel::Lowered)).unwrap();
        optimizer.annotate_function_definition(&square(), None).unwrap();
        frontend.call("square", &[Value::Int(2)]).unwrap();
        assert_eq!(optimizer.cache().len(), 1);

        optimizer.reset();
        assert!(optimizer.default_pass_set().is_empty());
        assert!(optimizer.cache().is_empty());

        // The trampoline keeps its captured pass set.
        assert_eq!(frontend.call("square", &[Value::Int(3)]).unwrap(), Value::Int(9));
        assert_eq!(optimizer.cache().len(), 1);
    }
}
