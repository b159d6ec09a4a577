//! `@retry(attempts, delay, exponentialBackoff?)` — re-runs its block until
//! it succeeds or attempts are exhausted.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::concurrency::retry;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind, TimingBlock};

use std::time::Duration;

const DEFAULT_ATTEMPTS: i64 = 3;
const DEFAULT_DELAY: Duration = Duration::from_secs(1);

pub struct RetryDecorator;

#[async_trait]
impl ExecutionDecorator for RetryDecorator {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        let attempts = view.integer("attempts", 0, Some(DEFAULT_ATTEMPTS))?;
        retry::validate_attempts(attempts)?;
        view.duration("delay", 1, Some(DEFAULT_DELAY))?;
        view.boolean("exponentialBackoff", 2, false)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let attempts = view.integer("attempts", 0, Some(DEFAULT_ATTEMPTS)).unwrap_or(DEFAULT_ATTEMPTS);
        let delay = view.duration("delay", 1, Some(DEFAULT_DELAY)).unwrap_or(DEFAULT_DELAY);
        ExecutionStep::new(0, StepKind::Retry, format!("@retry(attempts={attempts})"))
            .with_timing(TimingBlock {
                retry_attempts: Some(attempts as u32),
                retry_delay: Some(delay),
                ..Default::default()
            })
            .with_children(inner_plan.into_iter().collect())
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let attempts = match view
            .integer("attempts", 0, Some(DEFAULT_ATTEMPTS))
            .and_then(retry::validate_attempts)
        {
            Ok(a) => a,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let delay = match view.duration("delay", 1, Some(DEFAULT_DELAY)) {
            Ok(d) => d,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let exponential = view.boolean("exponentialBackoff", 2, false).unwrap_or(false);

        match inner {
            Some(node) => retry::run(ctx, attempts, delay, exponential, node).await,
            None => CommandResult::success(""),
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::ShellBlock { required: true }
    }
}
