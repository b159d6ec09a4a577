//! Timeout Wrapper
//!
//! Rather than racing the inner evaluation in a `select!` — which would
//! drop the losing future and any output buffered inside it — a detached
//! timer cancels a forked child token on expiry and the inner evaluation
//! is simply awaited to completion. Every transport call and composite
//! node dispatch already reacts to that token, so cancellation still
//! lands promptly; this way the inner's own result (including whatever it
//! captured before being cut off) is never discarded.

use std::time::Duration;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::errors::ValidationError;
use crate::ir::IrNode;

/// Above this, a `timeout` duration is almost certainly a typo rather than
/// an intentional deadline.
pub const SANITY_CAP: Duration = Duration::from_secs(24 * 60 * 60);

pub fn validate_duration(decorator: &str, duration: Duration) -> Result<(), ValidationError> {
    if duration.is_zero() {
        return Err(ValidationError::OutOfRange {
            decorator: decorator.to_string(),
            param: "duration".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if duration > SANITY_CAP {
        return Err(ValidationError::OutOfRange {
            decorator: decorator.to_string(),
            param: "duration".to_string(),
            message: "exceeds the 24 hour sanity cap".to_string(),
        });
    }
    Ok(())
}

pub async fn run(ctx: &ExecutionContext, duration: Duration, inner: &IrNode) -> CommandResult {
    let (child_ctx, child_cancel) = ctx.derive_with_cancel();
    let timer_cancel = child_cancel.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        timer_cancel.cancel();
    });

    let result = crate::evaluator::evaluate(&child_ctx, inner).await;
    timer.abort();

    match result {
        Ok(r) => r,
        Err(e) => CommandResult::failure(1, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context_with;
    use crate::ir::ShellNode;
    use crate::transport::local::LocalTransport;
    use crate::transport::mock::{MockResponse, MockTransport};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn rejects_non_positive_duration() {
        assert!(validate_duration("timeout", Duration::from_secs(0)).is_err());
    }

    #[test]
    fn rejects_durations_past_the_sanity_cap() {
        assert!(validate_duration("timeout", Duration::from_secs(25 * 60 * 60)).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expiry_yields_124_without_hanging() {
        let ctx = test_context_with(HashMap::new(), Arc::new(LocalTransport::new()));
        let node = crate::ir::IrNode::Shell(ShellNode::literal("sleep 10"));
        let started = std::time::Instant::now();
        let result = run(&ctx, Duration::from_millis(10), &node).await;
        assert_eq!(result.exit_code, 124);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn completes_normally_when_faster_than_the_deadline() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "echo quick"], MockResponse::ok("quick\n"));
        let ctx = test_context_with(HashMap::new(), Arc::new(transport));
        let node = crate::ir::IrNode::Shell(ShellNode::literal("echo quick"));
        let result = run(&ctx, Duration::from_secs(5), &node).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "quick\n");
    }
}
