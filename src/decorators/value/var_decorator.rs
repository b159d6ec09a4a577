//! `@var(name)` — returns a workflow variable's bound value.

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::decorators::types::{ParamsView, ValidatedParams, ValueDecorator};
use crate::errors::ValidationError;
use crate::ir::Parameter;
use crate::planner::types::{ExecutionStep, StepKind};

pub struct VarDecorator;

#[async_trait]
impl ValueDecorator for VarDecorator {
    fn name(&self) -> &'static str {
        "var"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.identifier("name", 0)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let name = view.identifier("name", 0).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Decorator, format!("@var({name})"))
    }

    async fn resolve(&self, ctx: &ExecutionContext, validated: &ValidatedParams) -> Result<String, ValidationError> {
        let view = ParamsView::new(self.name(), &validated.0);
        let name = view.identifier("name", 0)?;
        ctx.get_var(&name)
            .ok_or(ValidationError::UndefinedVariable { name })
    }
}
