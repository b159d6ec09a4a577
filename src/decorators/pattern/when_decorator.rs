//! `@when(env)` — selects a branch by the exact value of an environment
//! variable, falling back to `default` when no branch label matches.
//! `default` is the only fallback identifier this crate recognises — no
//! `*` wildcard.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::decorators::types::{ParamsView, PatternDecorator, PatternSchema, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind};

const DEFAULT_BRANCH: &str = "default";

pub struct WhenDecorator;

#[async_trait]
impl PatternDecorator for WhenDecorator {
    fn name(&self) -> &'static str {
        "when"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("env", 0, None)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn validate_patterns(&self, pattern_names: &[String]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for name in pattern_names {
            if !seen.insert(name.clone()) {
                errors.push(ValidationError::UnexpectedBranch {
                    decorator: self.name().to_string(),
                    branch: format!("{name} (duplicate)"),
                });
            }
        }
        errors
    }

    fn pattern_schema(&self) -> PatternSchema {
        PatternSchema {
            allowed_patterns: None,
            required_patterns: Vec::new(),
            allows_wildcard: false,
            allows_any_identifier: true,
        }
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, _branches: &[(String, IrNode)]) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let env_name = view.string("env", 0, None).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Conditional, format!("@when({env_name})"))
    }

    fn selected_branch_label(&self, ctx: &ExecutionContext, validated: &ValidatedParams, branches: &[(String, IrNode)]) -> Option<String> {
        let view = ParamsView::new(self.name(), &validated.0);
        let env_name = view.string("env", 0, None).unwrap_or_default();
        selected_branch_name(ctx, &env_name, branches)
    }

    async fn select_branch(&self, ctx: &ExecutionContext, validated: &ValidatedParams, branches: &[(String, IrNode)]) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let env_name = match view.string("env", 0, None) {
            Ok(n) => n,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let value = ctx.get_env(&env_name).unwrap_or_default();

        let exact = branches.iter().find(|(label, _)| label == &value);
        let fallback = branches.iter().find(|(label, _)| label == DEFAULT_BRANCH);

        ctx.debug_trace(&format!("@when({env_name}) value='{value}' selected={}",
            exact.or(fallback).map(|(l, _)| l.as_str()).unwrap_or("<none>")));

        match exact.or(fallback) {
            Some((_, node)) => match crate::evaluator::evaluate(ctx, node).await {
                Ok(r) => r,
                Err(e) => CommandResult::failure(1, e.to_string()),
            },
            None => CommandResult::failure(1, format!("no branch matches '{env_name}={value}' and no default branch is present")),
        }
    }
}

fn selected_branch_name(ctx: &ExecutionContext, env_name: &str, branches: &[(String, IrNode)]) -> Option<String> {
    let value = ctx.get_env(env_name).unwrap_or_default();
    branches
        .iter()
        .find(|(label, _)| label == &value)
        .or_else(|| branches.iter().find(|(label, _)| label == DEFAULT_BRANCH))
        .map(|(label, _)| label.clone())
}
