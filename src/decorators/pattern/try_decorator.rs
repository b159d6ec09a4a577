//! `@try` — a `main`/`catch`/`finally` branch set dispatched to
//! `concurrency::try_catch::run`.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::concurrency::try_catch;
use crate::context::ExecutionContext;
use crate::decorators::types::{ParamsView, PatternDecorator, PatternSchema, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind};

const MAIN: &str = "main";
const CATCH: &str = "catch";
const FINALLY: &str = "finally";
const ALLOWED: &[&str] = &[MAIN, CATCH, FINALLY];

pub struct TryDecorator;

fn branch<'a>(branches: &'a [(String, IrNode)], label: &str) -> Option<&'a IrNode> {
    branches.iter().find(|(l, _)| l == label).map(|(_, n)| n)
}

#[async_trait]
impl PatternDecorator for TryDecorator {
    fn name(&self) -> &'static str {
        "try"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        // `try` takes no parameters of its own.
        let _ = ParamsView::new(self.name(), params);
        Ok(ValidatedParams(params.to_vec()))
    }

    fn validate_patterns(&self, pattern_names: &[String]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !pattern_names.iter().any(|n| n == MAIN) {
            errors.push(ValidationError::MissingBranch {
                decorator: self.name().to_string(),
                branch: MAIN.to_string(),
            });
        }
        for name in pattern_names {
            if !ALLOWED.contains(&name.as_str()) {
                errors.push(ValidationError::UnexpectedBranch {
                    decorator: self.name().to_string(),
                    branch: name.clone(),
                });
            }
        }
        errors
    }

    fn pattern_schema(&self) -> PatternSchema {
        PatternSchema {
            allowed_patterns: Some(vec![MAIN, CATCH, FINALLY]),
            required_patterns: vec![MAIN],
            allows_wildcard: false,
            allows_any_identifier: false,
        }
    }

    fn plan(&self, _ctx: &ExecutionContext, _validated: &ValidatedParams, _branches: &[(String, IrNode)]) -> ExecutionStep {
        ExecutionStep::new(0, StepKind::TryCatch, "@try".to_string())
    }

    fn selected_branch_label(&self, _ctx: &ExecutionContext, _validated: &ValidatedParams, branches: &[(String, IrNode)]) -> Option<String> {
        // `main` always runs first; there is no single "selected" branch
        // the way `when` has one, so only flag its presence.
        branch(branches, MAIN).map(|_| MAIN.to_string())
    }

    async fn select_branch(&self, ctx: &ExecutionContext, _validated: &ValidatedParams, branches: &[(String, IrNode)]) -> CommandResult {
        let main = match branch(branches, MAIN) {
            Some(n) => n,
            None => return CommandResult::failure(1, "@try requires a 'main' branch"),
        };
        try_catch::run(ctx, main, branch(branches, CATCH), branch(branches, FINALLY)).await
    }
}
