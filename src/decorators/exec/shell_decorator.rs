//! `@shell(command)` — runs its string argument as a shell command; the
//! decorator-syntax equivalent of a bare shell line.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter, ShellNode};
use crate::planner::types::{ExecutionStep, StepKind};

pub struct ShellDecorator;

#[async_trait]
impl ExecutionDecorator for ShellDecorator {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("command", 0, None)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, _inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let command = view.string("command", 0, None).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Shell, format!("@shell({command})")).with_command(command)
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, _inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let command = view.string("command", 0, None).unwrap_or_default();
        let node = IrNode::Shell(ShellNode::literal(command));
        match crate::evaluator::evaluate(ctx, &node).await {
            Ok(result) => result,
            Err(e) => CommandResult::failure(1, e.to_string()),
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::None
    }
}
