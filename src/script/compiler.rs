use std::sync::Arc;

use rhai::{AST, Dynamic, Engine, EvalAltResult, ParseError, Position, Scope};

use crate::error::ScriptError;
use crate::trace::diagnostic::Diagnostic;
use crate::trace::sink::DiagnosticSink;

/// A fragment compiled against a fixed, ordered parameter list.
#[derive(Debug)]
pub struct CompiledScript {
    params: Vec<String>,
    ast: AST,
}

/// Result of one invocation: the fragment's value plus the scope it ran in,
/// so callers can read back writes made to parameters.
pub struct Invocation {
    pub result: Dynamic,
    pub scope: Scope<'static>,
}

impl CompiledScript {
    /// Run the fragment with positional arguments bound to the parameters.
    /// Missing trailing arguments are bound to `()`.
    pub fn invoke(&self, engine: &Engine, args: Vec<Dynamic>) -> Result<Invocation, ScriptError> {
        let mut scope = Scope::new();
        let mut args = args.into_iter();
        for name in &self.params {
            scope.push_dynamic(name.clone(), args.next().unwrap_or(Dynamic::UNIT));
        }

        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(runtime_error)?;

        Ok(Invocation { result, scope })
    }
}

/// Either a compiled fragment or the no-op stand-in used after a failure.
#[derive(Debug, Clone)]
pub enum Callable {
    Script(Arc<CompiledScript>),
    Noop,
}

impl Callable {
    /// `Ok(None)` means the no-op ran and the caller should use its default.
    pub fn call(&self, engine: &Engine, args: Vec<Dynamic>) -> Result<Option<Invocation>, ScriptError> {
        match self {
            Callable::Script(script) => script.invoke(engine, args).map(Some),
            Callable::Noop => Ok(None),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Callable::Noop)
    }
}

/// Compile `body` with `params` declared as the only free variables.
pub fn compile(engine: &Engine, params: &[&str], body: &str) -> Result<CompiledScript, ScriptError> {
    let mut declared = Scope::new();
    for name in params {
        declared.push_dynamic(*name, Dynamic::UNIT);
    }

    let ast = engine
        .compile_with_scope(&declared, body)
        .map_err(compile_error)?;

    Ok(CompiledScript {
        params: params.iter().map(|p| p.to_string()).collect(),
        ast,
    })
}

/// Compile, reporting failures to `sink` and falling back to [`Callable::Noop`].
pub fn compile_or_noop(
    engine: &Engine,
    params: &[&str],
    body: &str,
    report: impl FnOnce(&ScriptError) -> Diagnostic,
    sink: &dyn DiagnosticSink,
) -> Callable {
    match compile(engine, params, body) {
        Ok(script) => Callable::Script(Arc::new(script)),
        Err(e) => {
            sink.report(&report(&e));
            Callable::Noop
        }
    }
}

fn compile_error(err: ParseError) -> ScriptError {
    let (line, column) = split_position(err.position());
    ScriptError::Compile {
        message: err.err_type().to_string(),
        line,
        column,
    }
}

fn runtime_error(err: Box<EvalAltResult>) -> ScriptError {
    let mut err = *err;
    let (line, column) = split_position(err.take_position());
    ScriptError::Runtime {
        message: err.to_string(),
        line,
        column,
    }
}

fn split_position(pos: Position) -> (Option<usize>, Option<usize>) {
    (pos.line(), pos.position())
}
