//! `@workdir(path, createIfNotExists?)` — evaluates its block with a
//! derived working directory. Directory creation goes through the
//! transport (`mkdir -p`) rather than the local filesystem directly, so it
//! still works against a remote transport.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter, ShellNode};
use crate::planner::types::{ExecutionStep, StepKind};

pub struct WorkdirDecorator;

#[async_trait]
impl ExecutionDecorator for WorkdirDecorator {
    fn name(&self) -> &'static str {
        "workdir"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("path", 0, None)?;
        view.boolean("createIfNotExists", 1, false)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let path = view.string("path", 0, None).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Decorator, format!("@workdir({path})"))
            .with_children(inner_plan.into_iter().collect())
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let path = match view.string("path", 0, None) {
            Ok(p) => p,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let create = view.boolean("createIfNotExists", 1, false).unwrap_or(false);

        let mkdir_result = if create {
            let mkdir = IrNode::Shell(ShellNode::literal(format!("mkdir -p '{}'", path.replace('\'', "'\\''"))));
            match crate::evaluator::evaluate(ctx, &mkdir).await {
                Ok(r) if !r.is_success() => return r,
                Ok(r) => Some(r),
                Err(e) => return CommandResult::failure(1, e.to_string()),
            }
        } else {
            None
        };

        let child_ctx = ctx.with_cwd(path);
        let inner_result = match inner {
            Some(node) => match crate::evaluator::evaluate(&child_ctx, node).await {
                Ok(r) => r,
                Err(e) => return CommandResult::failure(1, e.to_string()),
            },
            None => CommandResult::success(""),
        };

        match mkdir_result {
            Some(prior) => prior.then(inner_result),
            None => inner_result,
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::ShellBlock { required: true }
    }
}
