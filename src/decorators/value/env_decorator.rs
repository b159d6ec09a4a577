//! `@env(key, default?, allowEmpty?)` — returns a snapshot value; empty is
//! treated as absent unless `allowEmpty`.

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::decorators::types::{ParamsView, ValidatedParams, ValueDecorator};
use crate::errors::ValidationError;
use crate::ir::Parameter;
use crate::planner::types::{ExecutionStep, StepKind};

pub struct EnvDecorator;

#[async_trait]
impl ValueDecorator for EnvDecorator {
    fn name(&self) -> &'static str {
        "env"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("key", 0, None)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let key = view.string("key", 0, None).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Decorator, format!("@env({key})"))
    }

    async fn resolve(&self, ctx: &ExecutionContext, validated: &ValidatedParams) -> Result<String, ValidationError> {
        let view = ParamsView::new(self.name(), &validated.0);
        let key = view.string("key", 0, None)?;
        let default = view.string("default", 1, Some("")).ok();
        let allow_empty = view.boolean("allowEmpty", 2, false)?;

        match ctx.get_env(&key) {
            Some(value) if !value.is_empty() || allow_empty => Ok(value),
            _ => match default {
                Some(d) if !d.is_empty() => Ok(d),
                _ => Err(ValidationError::ValueResolutionFailed {
                    decorator: self.name().to_string(),
                    message: format!("env var '{key}' is absent or empty and no default was given"),
                }),
            },
        }
    }
}
