//! `@timeout(duration)` — wraps its block with a deadline.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::concurrency::timeout;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind, TimingBlock};

use std::time::Duration;

const DEFAULT_DURATION: Duration = Duration::from_secs(30);

pub struct TimeoutDecorator;

#[async_trait]
impl ExecutionDecorator for TimeoutDecorator {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        let duration = view.duration("duration", 0, Some(DEFAULT_DURATION))?;
        timeout::validate_duration(self.name(), duration)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let duration = view.duration("duration", 0, Some(DEFAULT_DURATION)).unwrap_or(DEFAULT_DURATION);
        ExecutionStep::new(0, StepKind::Timeout, format!("@timeout({duration:?})"))
            .with_timing(TimingBlock { timeout: Some(duration), ..Default::default() })
            .with_children(inner_plan.into_iter().collect())
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let duration = match view.duration("duration", 0, Some(DEFAULT_DURATION)) {
            Ok(d) => d,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        match inner {
            Some(node) => timeout::run(ctx, duration, node).await,
            None => CommandResult::success(""),
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::ShellBlock { required: true }
    }
}
