//! End-to-end scenario tests driving the evaluator/planner through the
//! decorator catalog against a `MockTransport`, plus the handful of
//! cross-cutting invariants that are practical to check without a real
//! process boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opal_core::context::{ContextOptions, EnvSnapshot, ExecutionContext, UiFlags};
use opal_core::decorators::registry::DecoratorRegistry;
use opal_core::ir::{
    ChainLink, ChainOp, DecoratorApply, DecoratorBody, IrNode, ParamValue, Parameter, ShellNode,
    ShellPart, ValueRef,
};
use opal_core::planner;
use opal_core::transport::mock::{MockResponse, MockTransport};
use opal_core::transport::Transport;

fn shell(cmd: &str) -> IrNode {
    IrNode::Shell(ShellNode::literal(cmd))
}

fn context(vars: HashMap<String, String>, env: Vec<(String, String)>, transport: Arc<dyn Transport>) -> ExecutionContext {
    ExecutionContext::new(ContextOptions {
        env: Arc::new(EnvSnapshot::capture(env, &[], &[])),
        vars,
        cwd: "/work".to_string(),
        stdout: Arc::new(Mutex::new(Vec::new())),
        stderr: Arc::new(Mutex::new(Vec::new())),
        stdin: None,
        dry_run: false,
        debug: false,
        ui: UiFlags::default(),
        transport,
        registry: Arc::new(DecoratorRegistry::with_builtins()),
        commands: Arc::new(HashMap::new()),
    })
}

fn mock_context(transport: Arc<MockTransport>) -> ExecutionContext {
    context(HashMap::new(), Vec::new(), transport)
}

fn duration_param(d: Duration) -> Parameter {
    Parameter::positional(ParamValue::Duration(d))
}

fn int_param(i: i64) -> Parameter {
    Parameter::positional(ParamValue::Integer(i))
}

fn bool_param(b: bool) -> Parameter {
    Parameter::positional(ParamValue::Boolean(b))
}

/// Drives the timeout primitive against a real `LocalTransport` spawning
/// an actual `sleep`, since a scripted mock response never takes wall time.
#[tokio::test(flavor = "multi_thread")]
async fn timeout_under_deadline_exits_124_without_hanging() {
    use opal_core::concurrency::timeout;
    use opal_core::transport::local::LocalTransport;

    let ctx = context(HashMap::new(), Vec::new(), Arc::new(LocalTransport::new()));
    let node = shell("sleep 10");
    let started = std::time::Instant::now();
    let result = timeout::run(&ctx, Duration::from_millis(20), &node).await;
    assert_eq!(result.exit_code, 124);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_exponential_backoff_exhausts_all_attempts_and_waits_at_least_the_backoff_sum() {
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "retry".to_string(),
        params: vec![int_param(3), duration_param(Duration::from_millis(10)), bool_param(true)],
        body: DecoratorBody::Single(Box::new(shell("false"))),
    });

    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "false"], MockResponse::failing(2, ""));
    let ctx = mock_context(transport);

    let started = std::time::Instant::now();
    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.exit_code, 2);
    assert!(elapsed >= Duration::from_millis(30), "expected >= 10ms + 20ms backoff, got {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_immediate_mode_returns_quickly_once_one_task_fails() {
    let steps = IrNode::Sequence(vec![shell("ok-a"), shell("boom"), shell("ok-b")]);
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "parallel".to_string(),
        params: vec![Parameter::named("mode", ParamValue::String("immediate".into()))],
        body: DecoratorBody::Single(Box::new(steps)),
    });

    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "ok-a"], MockResponse::ok(""));
    transport.set_response(&["sh", "-c", "boom"], MockResponse::failing(5, ""));
    transport.set_response(&["sh", "-c", "ok-b"], MockResponse::ok(""));
    let ctx = mock_context(transport);

    let started = std::time::Instant::now();
    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    assert_eq!(result.exit_code, 5);
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// Two of the three tasks are real in-flight `sleep 1`s against a
/// `LocalTransport`, cancelled mid-flight by the third's failure; their
/// resulting 124s must not outrank the failure that triggered the cancel.
#[tokio::test(flavor = "multi_thread")]
async fn parallel_immediate_mode_reports_the_triggering_exit_code_over_a_cancelled_siblings_124() {
    use opal_core::transport::local::LocalTransport;

    let steps = IrNode::Sequence(vec![
        shell("sleep 1; exit 0"),
        shell("exit 5"),
        shell("sleep 1; exit 0"),
    ]);
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "parallel".to_string(),
        params: vec![Parameter::named("mode", ParamValue::String("immediate".into()))],
        body: DecoratorBody::Single(Box::new(steps)),
    });

    let ctx = context(HashMap::new(), Vec::new(), Arc::new(LocalTransport::new()));

    let started = std::time::Instant::now();
    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    assert_eq!(result.exit_code, 5);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_all_mode_runs_every_task_and_reports_first_failure_in_input_order() {
    let steps = IrNode::Sequence(
        ["c0", "c1", "c2", "c3", "c4"].iter().map(|c| shell(c)).collect(),
    );
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "parallel".to_string(),
        params: vec![Parameter::named("mode", ParamValue::String("all".into()))],
        body: DecoratorBody::Single(Box::new(steps)),
    });

    let transport = Arc::new(MockTransport::new());
    for (cmd, code) in [("c0", 0), ("c1", 1), ("c2", 0), ("c3", 2), ("c4", 0)] {
        transport.set_response(&["sh", "-c", cmd], MockResponse::failing(code, ""));
    }
    let ctx = mock_context(transport);

    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    assert_eq!(result.exit_code, 1, "first non-zero exit in input order should win");
}

#[tokio::test]
async fn try_catch_finally_recovers_and_appends_cleanup_output() {
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "try".to_string(),
        params: vec![],
        body: DecoratorBody::Branches(vec![
            ("main".to_string(), shell("main")),
            ("catch".to_string(), shell("echo recovered")),
            ("finally".to_string(), shell("echo cleanup")),
        ]),
    });

    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "main"], MockResponse::failing(1, ""));
    transport.set_response(&["sh", "-c", "echo recovered"], MockResponse::ok("recovered\n"));
    transport.set_response(&["sh", "-c", "echo cleanup"], MockResponse::ok("cleanup\n"));
    let ctx = mock_context(transport);

    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "recovered\ncleanup\n");
}

#[tokio::test]
async fn when_falls_back_to_default_branch_and_the_dry_run_plan_marks_it() {
    let apply = IrNode::DecoratorApply(DecoratorApply {
        name: "when".to_string(),
        params: vec![Parameter::positional(ParamValue::String("OS".into()))],
        body: DecoratorBody::Branches(vec![
            ("linux".to_string(), shell("echo linux")),
            ("darwin".to_string(), shell("echo darwin")),
            ("default".to_string(), shell("echo other")),
        ]),
    });

    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "echo other"], MockResponse::ok("other\n"));
    let ctx = context(HashMap::new(), vec![("OS".to_string(), "freebsd".to_string())], transport);

    let result = opal_core::evaluator::evaluate(&ctx, &apply).await.unwrap();
    assert_eq!(result.stdout, "other\n");

    let plan = planner::build_plan(&ctx, &apply).unwrap();
    let when_step = &plan.root[0];
    assert_eq!(when_step.children.len(), 3);
    let marked: Vec<bool> = when_step.children.iter().map(|c| c.selected_branch).collect();
    assert_eq!(marked, vec![false, false, true]);
}

#[tokio::test]
async fn environment_overlay_reaches_the_transport_without_leaking_the_local_process_env() {
    let mut base = HashMap::new();
    base.insert("PATH".to_string(), "/remote/bin".to_string());
    let transport = Arc::new(MockTransport::with_base_env(base));
    transport.set_response(&["sh", "-c", "env"], MockResponse::ok(""));

    let parent = mock_context(transport.clone());
    let mut overlay_env = HashMap::new();
    overlay_env.insert("X".to_string(), "1".to_string());
    let child = parent.derive(HashMap::new(), overlay_env);

    let result = opal_core::evaluator::evaluate(&child, &shell("env")).await.unwrap();
    assert!(result.is_success());

    let call = transport.calls().into_iter().next().unwrap();
    assert_eq!(call.env_overlay.get("X"), Some(&"1".to_string()));
    assert!(call.env_overlay.get("PATH").is_none());
    assert_eq!(transport.base_env().get("PATH"), Some(&"/remote/bin".to_string()));
}

#[tokio::test]
async fn env_overlay_does_not_leak_back_into_the_parent_after_the_child_runs() {
    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "echo child"], MockResponse::ok("child\n"));
    let parent = mock_context(transport);
    let mut overlay = HashMap::new();
    overlay.insert("SCOPED".to_string(), "value".to_string());
    let child = parent.derive(HashMap::new(), overlay);

    assert!(parent.env_overlay().get("SCOPED").is_none());
    let _ = opal_core::evaluator::evaluate(&child, &shell("echo child")).await.unwrap();
    assert_eq!(child.env_overlay().get("SCOPED"), Some(&"value".to_string()));
    assert!(parent.env_overlay().get("SCOPED").is_none());
}

#[tokio::test]
async fn value_decorator_renders_a_workflow_variable_exactly_once_and_rejects_undefined() {
    let shell_node = IrNode::Shell(ShellNode {
        parts: vec![
            ShellPart::Literal("serve --port=".to_string()),
            ShellPart::Value(ValueRef {
                decorator: "var".to_string(),
                params: vec![Parameter::positional(ParamValue::Identifier("PORT".into()))],
            }),
        ],
    });

    let mut vars = HashMap::new();
    vars.insert("PORT".to_string(), "8080".to_string());
    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "serve --port=8080"], MockResponse::ok(""));
    let ctx = context(vars, Vec::new(), transport.clone());

    let result = opal_core::evaluator::evaluate(&ctx, &shell_node).await.unwrap();
    assert!(result.is_success());
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(
        transport.calls()[0].argv,
        vec!["sh".to_string(), "-c".to_string(), "serve --port=8080".to_string()]
    );

    let undefined = IrNode::Shell(ShellNode {
        parts: vec![ShellPart::Value(ValueRef {
            decorator: "var".to_string(),
            params: vec![Parameter::positional(ParamValue::Identifier("MISSING".into()))],
        })],
    });
    let err = opal_core::evaluator::evaluate(&ctx, &undefined).await.unwrap_err();
    assert!(matches!(err, opal_core::errors::ValidationError::UndefinedVariable { name } if name == "MISSING"));
    // no second transport call was ever made for the rejected render
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn evaluator_is_deterministic_given_a_fixed_environment_snapshot() {
    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "echo hi"], MockResponse::ok("hi\n"));
    let ctx = mock_context(transport);
    let node = shell("echo hi");

    let a = opal_core::evaluator::evaluate(&ctx, &node).await.unwrap();
    let b = opal_core::evaluator::evaluate(&ctx, &node).await.unwrap();
    assert_eq!(a.exit_code, b.exit_code);
    assert_eq!(a.stdout, b.stdout);
}

#[tokio::test]
async fn planner_build_plan_never_touches_the_transport() {
    let transport = Arc::new(MockTransport::new());
    let ctx = mock_context(transport.clone());
    let node = IrNode::Chain(vec![
        ChainLink { node: shell("a"), op: Some(ChainOp::And) },
        ChainLink { node: shell("b"), op: None },
    ]);

    let _ = planner::build_plan(&ctx, &node).unwrap();
    assert!(transport.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn retry_under_outer_cancellation_returns_promptly_instead_of_waiting_out_the_delay() {
    let transport = Arc::new(MockTransport::new());
    transport.set_response(&["sh", "-c", "false"], MockResponse::failing(1, ""));
    let ctx = mock_context(transport);
    let node = shell("false");

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let result = opal_core::concurrency::retry::run(&ctx, 10, Duration::from_secs(5), false, &node).await;
    assert_eq!(result.exit_code, 124);
    assert!(started.elapsed() < Duration::from_secs(1));
}
