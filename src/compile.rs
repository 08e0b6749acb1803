//! Drive the passes over one [`Context`], stopping at the configured last
//! step or at the first pass that reported errors.

use crate::ast::{self, ast};
use crate::context::{Context, PassStep};
use crate::diag::{MessageText, ReportFormatter};
use crate::lex::{lex, Token, Tokens, TokensWriter};
use crate::parse::{self, Module};
use crate::source::Source;
use crate::symbols::Path;
use crate::tree::{Tree, TreeWriter};
use tracing::instrument;

/// Consistency checks over a parsed module, reported to the context.
pub trait Checker {
    fn check(&mut self, module: &Module, ctx: &mut Context);
}

impl<F> Checker for F
where
    F: FnMut(&Module, &mut Context),
{
    fn check(&mut self, module: &Module, ctx: &mut Context) {
        self(module, ctx)
    }
}

/// Runs a checked module from a path in it.
pub trait Evaluator {
    type Value;

    fn eval(
        &mut self,
        path: &Path,
        module: &Module,
        ctx: &mut Context,
    ) -> Result<Self::Value, EvalError>;
}

impl<F, V> Evaluator for F
where
    F: FnMut(&Path, &Module, &mut Context) -> Result<V, EvalError>,
{
    type Value = V;

    fn eval(&mut self, path: &Path, module: &Module, ctx: &mut Context) -> Result<V, EvalError> {
        self(path, module, ctx)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct EvalError(pub String);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("compilation halted during {step} with {errors} error(s)")]
    Halted { step: PassStep, errors: usize },
    #[error("program not run, stopped at {step}")]
    NotRun { step: PassStep },
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// The furthest result a run produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Output {
    Tokens(Tokens),
    Tree(Tree<Token>),
    Module(Module),
}

impl Output {
    pub fn render(&self, source: &Source) -> String {
        match self {
            Self::Tokens(tokens) => TokensWriter::new(source, tokens).to_string(),
            Self::Tree(tree) => TreeWriter::new(source, tree).to_string(),
            Self::Module(module) => module.to_string(),
        }
    }
}

/// Lex then build the module tree. Returns the tokens instead when lexing
/// finished the run.
pub fn get_tree(ctx: &mut Context) -> Result<Output, CompileError> {
    if ctx.done() {
        return Err(CompileError::NotRun { step: ctx.step() });
    }
    let tokens = lex(ctx);
    if ctx.done() {
        return Ok(Output::Tokens(tokens));
    }
    ctx.start_step(PassStep::Parse);
    Ok(match ast(&tokens, ctx, ast::parse_module) {
        Some(tree) => Output::Tree(tree),
        None => Output::Tokens(tokens),
    })
}

/// Compile up to the configured last step.
#[instrument(skip_all, fields(file = %ctx.source.name))]
pub fn run_compiler(
    ctx: &mut Context,
    checker: &mut impl Checker,
) -> Result<Output, CompileError> {
    let tree = match get_tree(ctx)? {
        Output::Tree(tree) if !ctx.done() => tree,
        output => return stopped(ctx, output),
    };

    let module = parse::parse(&tree, ctx, parse::parse_module);
    if ctx.done() {
        ctx.symbols.for_all(|path, definition| {
            tracing::debug!(%path, %definition, "declared");
        });
        return stopped(ctx, Output::Module(module));
    }

    ctx.start_step(PassStep::Check);
    checker.check(&module, ctx);
    if ctx.done() {
        return stopped(ctx, Output::Module(module));
    }

    ctx.start_step(PassStep::Final);
    Ok(Output::Module(module))
}

/// Compile and evaluate from the root of the module. Later definitions
/// replace earlier ones with the same name.
///
/// An evaluation failure is also recorded as a warning on the module.
#[instrument(skip_all, fields(file = %ctx.source.name))]
pub fn run_compiler_interactive<E: Evaluator>(
    ctx: &mut Context,
    checker: &mut impl Checker,
    evaluator: &mut E,
) -> Result<E::Value, CompileError> {
    ctx.allow_overrides = true;
    let tree = match get_tree(ctx)? {
        Output::Tree(tree) if !ctx.done() => tree,
        _ => return Err(not_run(ctx)),
    };

    let module = parse::parse(&tree, ctx, parse::parse_module);
    if ctx.done() {
        return Err(not_run(ctx));
    }

    ctx.start_step(PassStep::Check);
    checker.check(&module, ctx);
    if ctx.done() {
        return Err(not_run(ctx));
    }

    ctx.start_step(PassStep::Eval);
    let result = evaluator.eval(&Path::root(), &module, ctx);
    if let Err(error) = &result {
        tracing::debug!(%error, "evaluation failed");
        ctx.messages.warning(
            module.location,
            MessageText::EvalFailed {
                reason: error.0.clone(),
            },
        );
    }
    if !ctx.done() {
        ctx.start_step(PassStep::Final);
    }
    Ok(result?)
}

/// Render every message of the context against its source, and clear them.
pub fn finish(ctx: &mut Context) -> String {
    let mut output = String::new();
    let messages = ctx.messages.take();
    let mut formatter =
        ReportFormatter::new(&mut output, &ctx.source).with_color(ctx.config.color);
    for message in &messages {
        // writing to a String cannot fail
        let _ = formatter.write(message);
    }
    output
}

fn stopped(ctx: &Context, output: Output) -> Result<Output, CompileError> {
    if ctx.messages.has_errors() {
        let errors = ctx.messages.error_count();
        tracing::debug!(step = %ctx.step(), errors, "halted");
        return Err(CompileError::Halted {
            step: ctx.step(),
            errors,
        });
    }
    tracing::debug!(step = %ctx.step(), "reached last step");
    Ok(output)
}

fn not_run(ctx: &Context) -> CompileError {
    CompileError::NotRun { step: ctx.step() }
}
