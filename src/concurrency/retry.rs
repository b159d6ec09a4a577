//! Retry Wrapper
//!
//! Re-runs the inner node up to `attempts` times until it succeeds. The
//! wait between attempts is itself cancellable — an ancestor cancelling
//! mid-wait aborts the whole retry with 124 rather than letting it sleep
//! out the remaining delay.

use std::time::Duration;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::errors::ValidationError;
use crate::ir::IrNode;

pub const MIN_ATTEMPTS: i64 = 1;
pub const MAX_ATTEMPTS: i64 = 20;

pub fn validate_attempts(attempts: i64) -> Result<u32, ValidationError> {
    if !(MIN_ATTEMPTS..=MAX_ATTEMPTS).contains(&attempts) {
        return Err(ValidationError::OutOfRange {
            decorator: "retry".to_string(),
            param: "attempts".to_string(),
            message: format!("must be between {MIN_ATTEMPTS} and {MAX_ATTEMPTS}, got {attempts}"),
        });
    }
    Ok(attempts as u32)
}

pub async fn run(
    ctx: &ExecutionContext,
    attempts: u32,
    delay: Duration,
    exponential_backoff: bool,
    inner: &IrNode,
) -> CommandResult {
    let mut wait = delay;
    let mut last = CommandResult::new(1, "", "");

    for attempt in 1..=attempts {
        if ctx.is_cancelled() {
            return CommandResult::new(124, last.stdout, last.stderr);
        }

        last = match crate::evaluator::evaluate(ctx, inner).await {
            Ok(r) => r,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };

        ctx.debug_trace(&format!(
            "retry attempt {attempt}/{attempts} exit={} wait={:?}",
            last.exit_code, wait
        ));

        if last.is_success() || attempt == attempts {
            return last;
        }

        let cancel_token = ctx.cancel_token();
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel_token.cancelled() => {
                return CommandResult::new(124, last.stdout, last.stderr);
            }
        }

        if exponential_backoff {
            wait *= 2;
        }
    }

    last
}
