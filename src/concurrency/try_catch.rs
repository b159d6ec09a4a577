//! Try / Catch / Finally
//!
//! `main` is required; `catch` and `finally` are each optional. Output is
//! concatenated in execution order. `catch`'s exit code determines outer
//! success when it runs; a failing `finally` always overrides whatever
//! came before it.

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::ir::IrNode;

pub async fn run(
    ctx: &ExecutionContext,
    main: &IrNode,
    catch: Option<&IrNode>,
    finally: Option<&IrNode>,
) -> CommandResult {
    let main_result = match crate::evaluator::evaluate(ctx, main).await {
        Ok(r) => r,
        Err(e) => CommandResult::failure(1, e.to_string()),
    };

    let mut stdout = main_result.stdout.clone();
    let mut stderr = main_result.stderr.clone();
    let mut outcome = main_result;

    if !outcome.is_success() {
        if let Some(catch_node) = catch {
            let catch_result = match crate::evaluator::evaluate(ctx, catch_node).await {
                Ok(r) => r,
                Err(e) => CommandResult::failure(1, e.to_string()),
            };
            stdout.push_str(&catch_result.stdout);
            stderr.push_str(&catch_result.stderr);
            outcome = catch_result;
        }
    }

    if let Some(finally_node) = finally {
        let finally_result = match crate::evaluator::evaluate(ctx, finally_node).await {
            Ok(r) => r,
            Err(e) => CommandResult::failure(1, e.to_string()),
        };
        stdout.push_str(&finally_result.stdout);
        stderr.push_str(&finally_result.stderr);
        if !finally_result.is_success() {
            outcome = finally_result;
        }
    }

    CommandResult::new(outcome.exit_code, stdout, stderr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context_with;
    use crate::ir::ShellNode;
    use crate::transport::mock::{MockResponse, MockTransport};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn shell(cmd: &str) -> IrNode {
        IrNode::Shell(ShellNode::literal(cmd))
    }

    #[tokio::test]
    async fn catch_recovers_and_finally_appends_cleanup() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "main"], MockResponse::failing(1, ""));
        transport.set_response(&["sh", "-c", "echo recovered"], MockResponse::ok("recovered\n"));
        transport.set_response(&["sh", "-c", "echo cleanup"], MockResponse::ok("cleanup\n"));
        let ctx = test_context_with(HashMap::new(), Arc::new(transport));

        let result = run(&ctx, &shell("main"), Some(&shell("echo recovered")), Some(&shell("echo cleanup"))).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "recovered\ncleanup\n");
    }

    #[tokio::test]
    async fn successful_main_skips_catch() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "echo ok"], MockResponse::ok("ok\n"));
        let ctx = test_context_with(HashMap::new(), Arc::new(transport));
        let result = run(&ctx, &shell("echo ok"), Some(&shell("echo unreachable")), None).await;
        assert_eq!(result.stdout, "ok\n");
    }

    #[tokio::test]
    async fn a_failing_finally_overrides_a_successful_outcome() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "echo ok"], MockResponse::ok("ok\n"));
        transport.set_response(&["sh", "-c", "cleanup-fails"], MockResponse::failing(3, ""));
        let ctx = test_context_with(HashMap::new(), Arc::new(transport));
        let result = run(&ctx, &shell("echo ok"), None, Some(&shell("cleanup-fails"))).await;
        assert_eq!(result.exit_code, 3);
    }
}
