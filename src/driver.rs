//! Top-Level Driver
//!
//! Ties together resolve-target → validate → transform-to-IR →
//! build-context → plan-or-evaluate. The surface-syntax parser
//! that would hand this a `Workflow` is out of scope — callers
//! already have one, whether hand-built or produced elsewhere.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::context::{ContextOptions, EnvSnapshot, ExecutionContext, SharedWriter, UiFlags};
use crate::decorators::registry::DecoratorRegistry;
use crate::errors::DriverError;
use crate::ir::IrNode;
use crate::transport::Transport;
use crate::workflow::Workflow;

/// Everything the driver needs beyond the workflow itself: an options
/// record the caller fills in, rather than something read from files or
/// the process environment.
pub struct DriverOptions {
    pub target: String,
    pub dry_run: bool,
    pub debug: bool,
    pub no_color: bool,
    pub auto_confirm: bool,
    pub quiet: bool,
    pub cwd: String,
    pub stdout: SharedWriter,
    pub stderr: SharedWriter,
    pub stdin: Option<Arc<Mutex<dyn std::io::Read + Send>>>,
    pub transport: Arc<dyn Transport>,
    pub blocked_env_names: Vec<String>,
    pub blocked_env_prefixes: Vec<String>,
}

/// Run `workflow`'s target command (or produce its dry-run plan) and
/// write the result through the options' writers. The returned exit code
/// mirrors the evaluator's — non-zero iff the evaluation itself failed.
pub async fn run(workflow: Workflow, options: DriverOptions) -> Result<i32, DriverError> {
    let target_node = workflow
        .commands
        .get(&options.target)
        .cloned()
        .ok_or_else(|| command_not_found(&workflow, &options.target))?;

    workflow.validate_acyclic()?;

    let commands = Arc::new(
        workflow
            .commands
            .iter()
            .map(|(name, node)| (name.clone(), Arc::new(node.clone())))
            .collect::<HashMap<String, Arc<IrNode>>>(),
    );

    let env = Arc::new(EnvSnapshot::capture(
        std::env::vars(),
        &options.blocked_env_names,
        &options.blocked_env_prefixes,
    ));

    let ctx = ExecutionContext::new(ContextOptions {
        env,
        vars: workflow.vars,
        cwd: options.cwd,
        stdout: options.stdout,
        stderr: options.stderr,
        stdin: options.stdin,
        dry_run: options.dry_run,
        debug: options.debug,
        ui: UiFlags {
            no_color: options.no_color,
            auto_confirm: options.auto_confirm,
            quiet: options.quiet,
        },
        transport: options.transport,
        registry: Arc::new(DecoratorRegistry::with_builtins()),
        commands,
    });

    if ctx.dry_run() {
        let plan = crate::planner::build_plan(&ctx, &target_node)?;
        let rendered = serde_json::to_string_pretty(&plan)
            .unwrap_or_else(|e| format!("{{\"error\": \"failed to render plan: {e}\"}}"));
        ctx.write_stdout(&rendered);
        ctx.write_stdout("\n");
        return Ok(0);
    }

    let result = crate::evaluator::evaluate(&ctx, &target_node).await?;
    ctx.write_stdout(&result.stdout);
    ctx.write_stderr(&result.stderr);
    Ok(result.exit_code)
}

fn command_not_found(workflow: &Workflow, target: &str) -> DriverError {
    let mut names: Vec<&String> = workflow.commands.keys().collect();
    names.sort();
    DriverError::CommandNotFound {
        name: target.to_string(),
        available: names
            .into_iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ShellNode;
    use crate::transport::mock::{MockResponse, MockTransport};
    use std::collections::HashMap as Map;

    fn options(target: &str, transport: Arc<MockTransport>) -> DriverOptions {
        DriverOptions {
            target: target.to_string(),
            dry_run: false,
            debug: false,
            no_color: false,
            auto_confirm: false,
            quiet: false,
            cwd: "/work".to_string(),
            stdout: Arc::new(Mutex::new(Vec::new())),
            stderr: Arc::new(Mutex::new(Vec::new())),
            stdin: None,
            transport,
            blocked_env_names: Vec::new(),
            blocked_env_prefixes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn unknown_target_lists_available_commands() {
        let mut commands = Map::new();
        commands.insert("build".to_string(), IrNode::Shell(ShellNode::literal("cargo build")));
        let workflow = Workflow::new(commands, Map::new());
        let err = run(workflow, options("nope", Arc::new(MockTransport::new()))).await.unwrap_err();
        match err {
            DriverError::CommandNotFound { name, available } => {
                assert_eq!(name, "nope");
                assert!(available.contains("build"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_the_target_and_returns_its_exit_code() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "exit 3"], MockResponse::failing(3, ""));
        let mut commands = Map::new();
        commands.insert("fail".to_string(), IrNode::Shell(ShellNode::literal("exit 3")));
        let workflow = Workflow::new(commands, Map::new());
        let code = run(workflow, options("fail", Arc::new(transport))).await.unwrap();
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn dry_run_produces_a_plan_without_executing() {
        let transport = MockTransport::new();
        let mut commands = Map::new();
        commands.insert("build".to_string(), IrNode::Shell(ShellNode::literal("cargo build")));
        let workflow = Workflow::new(commands, Map::new());
        let mut opts = options("build", Arc::new(transport));
        opts.dry_run = true;
        let stdout_handle: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        opts.stdout = stdout_handle.clone();
        let code = run(workflow, opts).await.unwrap();
        assert_eq!(code, 0);
        let written = String::from_utf8_lossy(&stdout_handle.lock().unwrap()).to_string();
        assert!(written.contains("\"kind\""));
    }
}
