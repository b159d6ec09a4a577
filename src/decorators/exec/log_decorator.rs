//! `@log(message, level?, plain?)` — writes a line to stderr, honouring the
//! UI quiet flag.

use async_trait::async_trait;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind};

const DEFAULT_LEVEL: &str = "info";
const LEVELS: &[&str] = &["debug", "info", "warn", "error"];

pub struct LogDecorator;

#[async_trait]
impl ExecutionDecorator for LogDecorator {
    fn name(&self) -> &'static str {
        "log"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("message", 0, None)?;
        let level = view.string("level", 1, Some(DEFAULT_LEVEL))?;
        if !LEVELS.contains(&level.as_str()) {
            return Err(ValidationError::OutOfRange {
                decorator: self.name().to_string(),
                param: "level".to_string(),
                message: format!("'{level}' is not one of {LEVELS:?}"),
            });
        }
        view.boolean("plain", 2, false)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, _inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let message = view.string("message", 0, None).unwrap_or_default();
        ExecutionStep::new(0, StepKind::Decorator, format!("@log({message})"))
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, _inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let message = match view.string("message", 0, None) {
            Ok(m) => m,
            Err(e) => return CommandResult::failure(1, e.to_string()),
        };
        let level = view.string("level", 1, Some(DEFAULT_LEVEL)).unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        let plain = view.boolean("plain", 2, false).unwrap_or(false);

        if ctx.ui().quiet {
            return CommandResult::success("");
        }

        let line = if plain || ctx.ui().no_color {
            format!("{message}\n")
        } else {
            format!("[{}] {message}\n", level.to_uppercase())
        };
        ctx.write_stderr(&line);
        CommandResult::success("")
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextOptions, EnvSnapshot, ExecutionContext, UiFlags};
    use crate::decorators::registry::DecoratorRegistry;
    use crate::ir::ParamValue;
    use crate::transport::mock::MockTransport;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn unknown_level_is_rejected() {
        let decorator = LogDecorator;
        let params = vec![
            Parameter::positional(ParamValue::String("hi".into())),
            Parameter::positional(ParamValue::String("critical".into())),
        ];
        assert!(decorator.validate(&params).is_err());
    }

    #[tokio::test]
    async fn quiet_mode_suppresses_the_line() {
        let ctx = ExecutionContext::new(ContextOptions {
            env: Arc::new(EnvSnapshot::capture(Vec::new(), &[], &[])),
            vars: HashMap::new(),
            cwd: "/work".to_string(),
            stdout: Arc::new(Mutex::new(Vec::new())),
            stderr: Arc::new(Mutex::new(Vec::new())),
            stdin: None,
            dry_run: false,
            debug: false,
            ui: UiFlags { quiet: true, ..Default::default() },
            transport: Arc::new(MockTransport::new()),
            registry: Arc::new(DecoratorRegistry::with_builtins()),
            commands: Arc::new(HashMap::new()),
        });
        let decorator = LogDecorator;
        let params = vec![Parameter::positional(ParamValue::String("hidden".into()))];
        let validated = decorator.validate(&params).unwrap();
        let result = decorator.execute(&ctx, &validated, None).await;
        assert!(result.is_success());
    }
}
