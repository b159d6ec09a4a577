//! `@confirm(message?, defaultYes?)` — gates on a yes/no prompt.
//!
//! With `--auto-confirm` set, the prompt is skipped and treated as "yes".
//! Without a readable stdin and without auto-confirm, there is no way to
//! answer the prompt; rather than hang, this fails with exit 1. A user
//! answering "no" interactively is exit 130 by convention.

use async_trait::async_trait;

use crate::command_result::{exit_codes, CommandResult};
use crate::context::ExecutionContext;
use crate::decorators::types::{BlockRequirement, ExecutionDecorator, ParamsView, ValidatedParams};
use crate::errors::ValidationError;
use crate::ir::{IrNode, Parameter};
use crate::planner::types::{ExecutionStep, StepKind};

const DEFAULT_MESSAGE: &str = "Continue?";

pub struct ConfirmDecorator;

fn read_answer(ctx: &ExecutionContext) -> Option<bool> {
    let stdin = ctx.stdin()?;
    let mut buf = [0u8; 1];
    let mut line = String::new();
    loop {
        let mut reader = stdin.lock().unwrap();
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if buf[0] == b'\n' {
                    break;
                }
                line.push(buf[0] as char);
            }
        }
    }
    let answer = line.trim().to_lowercase();
    match answer.as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl ExecutionDecorator for ConfirmDecorator {
    fn name(&self) -> &'static str {
        "confirm"
    }

    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError> {
        let view = ParamsView::new(self.name(), params);
        view.string("message", 0, Some(DEFAULT_MESSAGE))?;
        view.boolean("defaultYes", 1, false)?;
        Ok(ValidatedParams(params.to_vec()))
    }

    fn plan(&self, _ctx: &ExecutionContext, validated: &ValidatedParams, _inner_plan: Option<ExecutionStep>) -> ExecutionStep {
        let view = ParamsView::new(self.name(), &validated.0);
        let message = view.string("message", 0, Some(DEFAULT_MESSAGE)).unwrap_or_else(|_| DEFAULT_MESSAGE.to_string());
        ExecutionStep::new(0, StepKind::Decorator, format!("@confirm({message})"))
    }

    async fn execute(&self, ctx: &ExecutionContext, validated: &ValidatedParams, _inner: Option<&IrNode>) -> CommandResult {
        let view = ParamsView::new(self.name(), &validated.0);
        let message = view.string("message", 0, Some(DEFAULT_MESSAGE)).unwrap_or_else(|_| DEFAULT_MESSAGE.to_string());
        let default_yes = view.boolean("defaultYes", 1, false).unwrap_or(false);

        if ctx.ui().auto_confirm {
            return CommandResult::success("");
        }

        ctx.write_stdout(&format!("{message} "));
        match read_answer(ctx) {
            Some(true) => CommandResult::success(""),
            Some(false) => CommandResult::new(exit_codes::USER_CANCELLED, "", ""),
            None if ctx.stdin().is_none() => CommandResult::failure(
                1,
                "@confirm requires --auto-confirm when stdin is not interactive",
            ),
            None => {
                if default_yes {
                    CommandResult::success("")
                } else {
                    CommandResult::new(exit_codes::USER_CANCELLED, "", "")
                }
            }
        }
    }

    fn requires_block(&self) -> BlockRequirement {
        BlockRequirement::None
    }
}
