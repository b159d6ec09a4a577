//! Decorator Kind Traits
//!
//! Three distinct interfaces, not one hierarchy: the evaluator dispatches
//! by kind discovered at registry lookup, never through a shared base
//! type.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::errors::ValidationError;
use crate::ir::{IrNode, ParamValue, Parameter};
use crate::planner::types::ExecutionStep;
use crate::CommandResult;

/// The result of a decorator's own `Validate`: the params it was given,
/// already checked against its schema. Kept as the checked list itself —
/// decorators re-read it through `ParamsView` rather than duplicating
/// typed fields per decorator.
#[derive(Debug, Clone)]
pub struct ValidatedParams(pub Vec<Parameter>);

/// What block shape an execution decorator expects after it in the
/// surface syntax (informative only — the parser enforces it; decorators
/// report it so tooling/docs can describe decorators uniformly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRequirement {
    None,
    ShellBlock { required: bool },
    PatternBlock { required: bool },
}

/// What a pattern decorator will accept as branch names.
#[derive(Debug, Clone)]
pub struct PatternSchema {
    pub allowed_patterns: Option<Vec<&'static str>>,
    pub required_patterns: Vec<&'static str>,
    pub allows_wildcard: bool,
    pub allows_any_identifier: bool,
}

/// Resolves to a string; used inside shell rendering.
#[async_trait]
pub trait ValueDecorator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError>;
    fn plan(&self, ctx: &ExecutionContext, validated: &ValidatedParams) -> ExecutionStep;
    async fn resolve(&self, ctx: &ExecutionContext, validated: &ValidatedParams) -> Result<String, ValidationError>;
    /// Expensive value decorators may perform I/O during resolution but
    /// must be idempotent within a single render.
    fn is_expensive(&self) -> bool {
        false
    }
}

/// Wraps an execution; the decorator is handed its child node (if any)
/// and may evaluate it zero or more times via `crate::evaluator::evaluate`.
#[async_trait]
pub trait ExecutionDecorator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError>;
    fn plan(
        &self,
        ctx: &ExecutionContext,
        validated: &ValidatedParams,
        inner_plan: Option<ExecutionStep>,
    ) -> ExecutionStep;
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        validated: &ValidatedParams,
        inner: Option<&IrNode>,
    ) -> CommandResult;
    fn requires_block(&self) -> BlockRequirement;
}

/// Dispatches on labelled branches.
#[async_trait]
pub trait PatternDecorator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validates the decorator's own parameters (e.g. `when`'s `env`
    /// parameter); decorators with no parameters accept an empty list.
    fn validate(&self, params: &[Parameter]) -> Result<ValidatedParams, ValidationError>;

    /// Validates the branch names against `pattern_schema()`.
    fn validate_patterns(&self, pattern_names: &[String]) -> Vec<ValidationError>;

    fn pattern_schema(&self) -> PatternSchema;

    fn plan(
        &self,
        ctx: &ExecutionContext,
        validated: &ValidatedParams,
        branches: &[(String, IrNode)],
    ) -> ExecutionStep;

    /// Which branch label would be selected given the frozen context,
    /// so a dry-run plan can mark it without actually evaluating anything.
    /// A pure function of `branches`/context state; never I/O. Default
    /// `None` — decorators that can't determine this statically (or have
    /// no meaningful notion of it) leave every branch unmarked.
    fn selected_branch_label(
        &self,
        _ctx: &ExecutionContext,
        _validated: &ValidatedParams,
        _branches: &[(String, IrNode)],
    ) -> Option<String> {
        None
    }

    async fn select_branch(
        &self,
        ctx: &ExecutionContext,
        validated: &ValidatedParams,
        branches: &[(String, IrNode)],
    ) -> CommandResult;
}

/// Typed parameter extraction over a decorator's parameter list, naming
/// the decorator and parameter in every error.
pub struct ParamsView<'a> {
    decorator: &'static str,
    params: &'a [Parameter],
}

impl<'a> ParamsView<'a> {
    pub fn new(decorator: &'static str, params: &'a [Parameter]) -> Self {
        Self { decorator, params }
    }

    fn named(&self, name: &str) -> Option<&'a Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    fn positional(&self, index: usize) -> Option<&'a Parameter> {
        self.params.iter().filter(|p| p.is_positional()).nth(index)
    }

    fn find(&self, name: &str, index: usize) -> Option<&'a Parameter> {
        self.named(name).or_else(|| self.positional(index))
    }

    fn missing(&self, name: &str) -> ValidationError {
        ValidationError::MissingParameter {
            decorator: self.decorator.to_string(),
            param: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str, value: &ParamValue) -> ValidationError {
        ValidationError::TypeMismatch {
            decorator: self.decorator.to_string(),
            param: name.to_string(),
            expected,
            got: value.type_name().to_string(),
        }
    }

    pub fn string(&self, name: &str, index: usize, default: Option<&str>) -> Result<String, ValidationError> {
        match self.find(name, index) {
            Some(p) => match &p.value {
                ParamValue::String(s) => Ok(s.clone()),
                other => Err(self.mismatch(name, "string", other)),
            },
            None => default.map(|d| d.to_string()).ok_or_else(|| self.missing(name)),
        }
    }

    pub fn identifier(&self, name: &str, index: usize) -> Result<String, ValidationError> {
        match self.find(name, index) {
            Some(p) => match &p.value {
                ParamValue::Identifier(s) => Ok(s.clone()),
                other => Err(self.mismatch(name, "identifier", other)),
            },
            None => Err(self.missing(name)),
        }
    }

    pub fn duration(&self, name: &str, index: usize, default: Option<Duration>) -> Result<Duration, ValidationError> {
        match self.find(name, index) {
            Some(p) => match &p.value {
                ParamValue::Duration(d) => Ok(*d),
                other => Err(self.mismatch(name, "duration", other)),
            },
            None => default.ok_or_else(|| self.missing(name)),
        }
    }

    pub fn integer(&self, name: &str, index: usize, default: Option<i64>) -> Result<i64, ValidationError> {
        match self.find(name, index) {
            Some(p) => match &p.value {
                ParamValue::Integer(i) => Ok(*i),
                other => Err(self.mismatch(name, "integer", other)),
            },
            None => default.ok_or_else(|| self.missing(name)),
        }
    }

    pub fn boolean(&self, name: &str, index: usize, default: bool) -> Result<bool, ValidationError> {
        match self.find(name, index) {
            Some(p) => match &p.value {
                ParamValue::Boolean(b) => Ok(*b),
                other => Err(self.mismatch(name, "boolean", other)),
            },
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_fallback_when_unnamed() {
        let params = vec![Parameter::positional(ParamValue::String("hi".into()))];
        let view = ParamsView::new("shell", &params);
        assert_eq!(view.string("command", 0, None).unwrap(), "hi");
    }

    #[test]
    fn named_overrides_positional_lookup() {
        let params = vec![Parameter::named("message", ParamValue::String("named".into()))];
        let view = ParamsView::new("log", &params);
        assert_eq!(view.string("message", 0, None).unwrap(), "named");
    }

    #[test]
    fn missing_required_is_a_named_error() {
        let params: Vec<Parameter> = vec![];
        let view = ParamsView::new("retry", &params);
        let err = view.duration("delay", 0, None).unwrap_err();
        match err {
            ValidationError::MissingParameter { decorator, param } => {
                assert_eq!(decorator, "retry");
                assert_eq!(param, "delay");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_names_expected_and_got() {
        let params = vec![Parameter::positional(ParamValue::Integer(3))];
        let view = ParamsView::new("shell", &params);
        let err = view.string("command", 0, None).unwrap_err();
        match err {
            ValidationError::TypeMismatch { expected, got, .. } => {
                assert_eq!(expected, "string");
                assert_eq!(got, "integer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
