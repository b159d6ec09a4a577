//! `@cmd(name)` — cross-references another command in the same workflow,
//! evaluating its already-lowered IR. Acyclicity is checked once, ahead
//! of time, over the whole command table; by the time this decorator
//! executes, `name` is guaranteed to resolve, so a missing entry here is
//! a bug in that earlier pass, not a workflow failure.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::invariant;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind};

pub struct CmdDecorator;

#[async_trait]
impl ExecutionDecorator for CmdDecorator {
    fn name(&self) -> &'static str {
        "cmd"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.identifier("name", 0)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, _inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let name = view.identifier("name", 0).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Decorator, format!("@cmd({name})"))
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, _inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let name = view.identifier("name", 0).unwrap_or_default();
        let commands = ctx.commands();
        let target = commands.get(&name);
        invariant::invariant(
            "CmdDecorator",
            target.is_some(),
            format!("command '{name}' missing from the command table at execution time; acyclicity validation should have caught this"),
        );
        match crate::evaluator::evaluate(ctx, target.unwrap()).await {
            Ok(result) => result,
            Err(e) => CommandResult::failure(1, e.to_string()),
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::None
    }
}
