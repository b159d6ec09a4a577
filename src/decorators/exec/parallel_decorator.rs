//! `@parallel(mode?, concurrency?)` — runs a list of steps concurrently.
//!
//! The IR only gives an execution decorator zero or one child node, so
//! a `parallel` block's list of steps is represented as a `Sequence` child
//! whose own children are the parallel tasks; a bare non-`Sequence` child
//! is treated as a single one-step parallel section.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::concurrency::parallel::{self, ParallelMode};
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind, TimingBlock};

const DEFAULT_MODE: &str = "fail-fast";

pub struct ParallelDecorator;

fn steps_of(inner: Option<&IrNode>) -> Vec<IrNode> {
    match inner {
        Some(IrNode::Sequence(nodes)) => nodes.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    }
}

/// `concurrency` has no sensible default — absent means "use the
/// default formula" rather than any fixed number — so it's read only when
/// actually present among the params.
fn concurrency_param(params: &[Parameter]) -> Result<Option<usize>, ValidationError> {
    let present = params.iter().any(|p| p.name == "concurrency")
        || params.iter().filter(|p| p.is_positional()).count() > 1;
    if !present {
        return Ok(None);
    }
    let view = ParamsView::new("parallel", params);
    Ok(Some(view.integer("concurrency", 1, None)? as usize))
}

#[async_trait]
impl ExecutionDecorator for ParallelDecorator {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        let mode = view.string("mode", 0, Some(DEFAULT_MODE))?;
        if ParallelMode::parse(&mode).is_none() {
            return Err(ValidationError::OutOfRange {
                decorator: self.name().to_string(),
                param: "mode".to_string(),
                message: format!("'{mode}' is not one of fail-fast, immediate, all"),
            });
        }
        concurrency_param(params)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let mode = view.string("mode", 0, Some(DEFAULT_MODE)).unwrap_or_else(|_| DEFAULT_MODE.to_string());
        let concurrency = concurrency_param(&validated.0).ok().flatten();
        ExecutionStep::new(0, StepKind::Parallel, format!("@parallel(mode={mode})"))
            .with_timing(TimingBlock { concurrency_limit: concurrency, ..Default::default() })
            .with_children(inner_plan.into_iter().collect())
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let mode = match view
            .string("mode", 0, Some(DEFAULT_MODE))
            .map(|m| ParallelMode::parse(&m))
        {
            Ok(Some(m)) => m,
            _ => return CommandResult::failure(1, "invalid @parallel mode"),
        };
        let concurrency = match concurrency_param(&validated.0) {
            Ok(c) => c,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let steps = steps_of(inner);
        parallel::run(ctx, mode, concurrency, &steps).await
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::ShellBlock { required: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context_with;
    use crate::ir::{ParamValue, ShellNode};
    use crate::transport::mock::{MockResponse, MockTransport};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn shell(cmd: &str) -> IrNode {
        IrNode::Shell(ShellNode::literal(cmd))
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let decorator = ParallelDecorator;
        let params = vec![Parameter::positional(ParamValue::String("yolo".into()))];
        assert!(decorator.validate(&params).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sequence_child_becomes_the_parallel_step_list() {
        let transport = MockTransport::new();
        transport.set_response(&["sh", "-c", "a"], MockResponse::ok("a\n"));
        transport.set_response(&["sh", "-c", "b"], MockResponse::ok("b\n"));
        let ctx = test_context_with(HashMap::new(), Arc::new(transport));
        let decorator = ParallelDecorator;
        let validated = decorator.validate(&[]).unwrap();
        let inner = IrNode::Sequence(vec![shell("a"), shell("b")]);
        let result = decorator.execute(&ctx, &validated, Some(&inner)).await;
        assert_eq!(result.exit_code, 0);
    }
}
