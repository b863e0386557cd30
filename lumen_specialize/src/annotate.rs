//! Annotation-time helpers.
//!
//! Surface passes run once, when a definition or call site is annotated,
//! before the frontend ever sees the code. The remaining passes run later,
//! per signature, behind a trampoline.

use log::trace;
use lumen_ir::{Callable, Fragment, FunctionDef, Node};
use lumen_pipeline::{PassContext, PassOutput, PassSet, PipelineError, PipelineResult};

/// Result of annotating a function definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotated {
    /// Only surface passes apply; the definition is bound as is.
    Plain(Callable),
    /// The public name is bound to a trampoline over a hidden implementation.
    Trampolined { public: Callable, implementation: Callable },
}

impl Annotated {
    /// Callable bound under the definition's name.
    pub fn public(&self) -> &Callable {
        match self {
            Annotated::Plain(callable) => callable,
            Annotated::Trampolined { public, .. } => public,
        }
    }

    /// Callable holding the definition's code.
    pub fn implementation(&self) -> &Callable {
        match self {
            Annotated::Plain(callable) => callable,
            Annotated::Trampolined { implementation, .. } => implementation,
        }
    }
}

/// Apply the surface passes of `pass_set` to `fragment`, in order.
///
/// A pass that abandons stops surface rewriting and keeps its input.
pub(crate) fn apply_surface_passes(pass_set: &PassSet, mut fragment: Fragment) -> PipelineResult<Fragment> {
    let cx = PassContext::surface();
    for pass in pass_set.surface_passes() {
        trace!("running surface pass `{}`", pass.name());
        let input = fragment.clone();
        let output = pass
            .apply(&cx, fragment)
            .map_err(|source| PipelineError::PassFailed {
                pass: pass.name().to_string(),
                source,
            })?;
        fragment = match output {
            PassOutput::Fragment(rewritten) => rewritten,
            PassOutput::Abandon => return Ok(input),
            PassOutput::Callable(_) => {
                return Err(PipelineError::InvalidPassResult {
                    pass: pass.name().to_string(),
                    reason: "surface passes cannot produce a callable".to_string(),
                })
            }
        };
    }
    Ok(fragment)
}

/// Definition with surface passes applied to its body.
pub(crate) fn surface_definition(pass_set: &PassSet, def: &FunctionDef) -> PipelineResult<FunctionDef> {
    let fragment = apply_surface_passes(pass_set, Fragment::from_node(def.arity(), def.body.clone()))?;
    Ok(FunctionDef {
        name: def.name.clone(),
        params: def.params.clone(),
        body: fragment.body,
    })
}

/// Call expression with surface passes applied.
///
/// The expression is handed to the passes as the single statement of a
/// zero-arity body and unwrapped again afterwards.
pub(crate) fn surface_expression(pass_set: &PassSet, expr: Node) -> PipelineResult<Node> {
    let fragment = apply_surface_passes(pass_set, Fragment::new(0, vec![expr]))?;
    Ok(match fragment.body {
        Node::Block(mut stmts) if stmts.len() == 1 => stmts.remove(0),
        body => body,
    })
}
