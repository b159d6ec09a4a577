//! Evaluator
//!
//! Walks an `IrNode` tree against a context and produces a
//! `CommandResult`. Owns no mutable state of its own — everything it
//! reads lives in the context it is handed, and every recursive call
//! threads that same context (or a `Derive`d child of it) back in.
//!
//! A `ValidationError` surfacing anywhere aborts the walk immediately
//! without touching the transport — this is why `evaluate` returns
//! `Result<CommandResult, ValidationError>` rather than folding validation
//! failures into an ordinary non-zero exit code.

use std::future::Future;
use std::pin::Pin;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::errors::ValidationError;
use crate::ir::{ChainOp, DecoratorBody, IrNode, ShellPart};
use crate::transport::types::ExecOpts;

/// A recursive `async fn` cannot call itself directly — the resulting
/// future would have infinite size — so `evaluate` is boxed and pinned by
/// hand rather than via an external crate.
type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandResult, ValidationError>> + Send + 'a>>;

/// Evaluate `node` against `ctx`, with no piped-in stdin.
pub fn evaluate<'a>(ctx: &'a ExecutionContext, node: &'a IrNode) -> EvalFuture<'a> {
    evaluate_with_stdin(ctx, node, None)
}

/// Evaluate `node`, optionally with `stdin` piped in from a preceding
/// chain link. Only `Shell` honours it directly; every other node kind
/// ignores a piped-in stdin of its own accord (a pipe's right-hand side in
/// this catalog is always a shell command in practice).
pub fn evaluate_with_stdin<'a>(
    ctx: &'a ExecutionContext,
    node: &'a IrNode,
    stdin: Option<String>,
) -> EvalFuture<'a> {
    Box::pin(async move {
        if ctx.is_cancelled() {
            return Ok(CommandResult::new(124, "", ""));
        }

        match node {
            IrNode::Shell(shell) => evaluate_shell(ctx, shell, stdin).await,
            IrNode::Chain(links) => evaluate_chain(ctx, links).await,
            IrNode::Sequence(nodes) => evaluate_sequence(ctx, nodes).await,
            IrNode::DecoratorApply(apply) => evaluate_decorator(ctx, apply).await,
            IrNode::ValueRef(_) => Err(ValidationError::ValueResolutionFailed {
                decorator: "<value-ref>".to_string(),
                message: "a ValueRef must be resolved during shell rendering, never dispatched directly".to_string(),
            }),
        }
    })
}

/// Render a shell node's text (resolving every embedded value decorator
/// exactly once) and hand the result to the context's transport.
async fn evaluate_shell(
    ctx: &ExecutionContext,
    shell: &crate::ir::ShellNode,
    stdin: Option<String>,
) -> Result<CommandResult, ValidationError> {
    let rendered = render_shell(ctx, shell).await?;
    let argv = vec!["sh".to_string(), "-c".to_string(), rendered];
    let stdout_concrete = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let stderr_concrete = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let stdout_buf: crate::context::SharedWriter = stdout_concrete.clone();
    let stderr_buf: crate::context::SharedWriter = stderr_concrete.clone();

    let opts = ExecOpts {
        stdin: stdin.unwrap_or_default().into_bytes(),
        stdout: stdout_buf,
        stderr: stderr_buf,
        env_overlay: ctx.env_overlay(),
        cwd: Some(ctx.cwd()),
        cancel: ctx.cancel_token(),
    };

    let outcome = ctx.transport().exec(&argv, opts).await;

    let stdout = String::from_utf8_lossy(&stdout_concrete.lock().unwrap()).to_string();
    let stderr = String::from_utf8_lossy(&stderr_concrete.lock().unwrap()).to_string();
    let stderr = match &outcome.error {
        Some(e) => format!("{stderr}{e}"),
        None => stderr,
    };

    Ok(CommandResult::new(outcome.exit_code, stdout, stderr))
}

/// Pure string substitution: each `@decorator(...)` embedded in the shell
/// text is validated and resolved once, in source order.
async fn render_shell(ctx: &ExecutionContext, shell: &crate::ir::ShellNode) -> Result<String, ValidationError> {
    let mut out = String::new();
    for part in &shell.parts {
        match part {
            ShellPart::Literal(text) => out.push_str(text),
            ShellPart::Value(value_ref) => {
                let decorator = ctx.registry().get_value(&value_ref.decorator).ok_or_else(|| {
                    ValidationError::UnknownDecorator { name: value_ref.decorator.clone() }
                })?;
                let validated = decorator.validate(&value_ref.params)?;
                let resolved = decorator.resolve(ctx, &validated).await?;
                out.push_str(&resolved);
            }
        }
    }
    Ok(out)
}

/// Left-to-right, short-circuiting per operator. Piped stdout is
/// swallowed into the next link's stdin rather than appearing in the
/// chain's own output, matching shell pipeline semantics.
async fn evaluate_chain(ctx: &ExecutionContext, links: &[crate::ir::ChainLink]) -> Result<CommandResult, ValidationError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let mut pending_stdin: Option<String> = None;

    for link in links {
        if ctx.is_cancelled() {
            exit_code = 124;
            break;
        }
        let result = evaluate_with_stdin(ctx, &link.node, pending_stdin.take()).await?;
        exit_code = result.exit_code;
        stderr.push_str(&result.stderr);

        match link.op {
            Some(ChainOp::Pipe) => pending_stdin = Some(result.stdout),
            _ => stdout.push_str(&result.stdout),
        }

        let should_continue = match link.op {
            None => false,
            Some(ChainOp::Sequence) | Some(ChainOp::Pipe) => true,
            Some(ChainOp::And) => result.exit_code == 0,
            Some(ChainOp::Or) => result.exit_code != 0,
        };
        if !should_continue {
            break;
        }
    }

    Ok(CommandResult::new(exit_code, stdout, stderr))
}

/// Strictly sequential; stops early only when the context is cancelled,
/// never merely because a step returned nonzero.
pub(crate) async fn evaluate_sequence(ctx: &ExecutionContext, nodes: &[IrNode]) -> Result<CommandResult, ValidationError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;

    for node in nodes {
        if ctx.is_cancelled() {
            exit_code = 124;
            break;
        }
        let result = evaluate(ctx, node).await?;
        stdout.push_str(&result.stdout);
        stderr.push_str(&result.stderr);
        exit_code = result.exit_code;
    }

    Ok(CommandResult::new(exit_code, stdout, stderr))
}

async fn evaluate_decorator(ctx: &ExecutionContext, apply: &crate::ir::DecoratorApply) -> Result<CommandResult, ValidationError> {
    match &apply.body {
        DecoratorBody::Branches(branches) => {
            let decorator = ctx.registry().get_pattern(&apply.name).ok_or_else(|| {
                ValidationError::UnknownDecorator { name: apply.name.clone() }
            })?;
            let validated = decorator.validate(&apply.params)?;
            let names: Vec<String> = branches.iter().map(|(label, _)| label.clone()).collect();
            let errors = decorator.validate_patterns(&names);
            if let Some(first) = errors.into_iter().next() {
                return Err(first);
            }
            if ctx.debug() {
                ctx.debug_trace(&format!("@{} branches={:?}", apply.name, names));
            }
            Ok(decorator.select_branch(ctx, &validated, branches).await)
        }
        DecoratorBody::None | DecoratorBody::Single(_) => {
            let decorator = ctx.registry().get_execution(&apply.name).ok_or_else(|| {
                ValidationError::UnknownDecorator { name: apply.name.clone() }
            })?;
            let validated = decorator.validate(&apply.params)?;
            let inner = match &apply.body {
                DecoratorBody::Single(node) => Some(node.as_ref()),
                _ => None,
            };
            if ctx.debug() {
                ctx.debug_trace(&format!("@{} params={:?}", apply.name, apply.params));
            }
            Ok(decorator.execute(ctx, &validated, inner).await)
        }
    }
}
