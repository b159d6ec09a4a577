//! Planner Output Types
//!
//! `ExecutionStep` and `ExecutionPlan`: a side-effect-free
//! description of what a workflow run would do. No Transport calls ever
//! happen while building these.

use std::time::Duration;

use serde::Serialize;

/// The kind of node an `ExecutionStep` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Shell,
    Timeout,
    Parallel,
    Retry,
    Conditional,
    TryCatch,
    Sequence,
    Decorator,
}

/// Timing metadata a decorator's `Plan()` may attach: timeout duration,
/// retry attempts/delay, concurrency limit. All fields optional since
/// most steps don't carry any of them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimingBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
    /// Wall-clock observed on a prior real run, if this plan was annotated
    /// from one; always `None` for a pure dry-run plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_duration: Option<Duration>,
}

/// One node of the dry-run plan tree.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionStep {
    pub id: u64,
    pub kind: StepKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub children: Vec<ExecutionStep>,
    #[serde(skip_serializing_if = "TimingBlock::is_empty")]
    pub timing: TimingBlock,
    /// For pattern decorators: whether this branch is the one that would
    /// actually be selected given the frozen environment.
    #[serde(skip_serializing_if = "is_false")]
    pub selected_branch: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TimingBlock {
    fn is_empty(&self) -> bool {
        self.timeout.is_none()
            && self.retry_attempts.is_none()
            && self.retry_delay.is_none()
            && self.concurrency_limit.is_none()
            && self.observed_duration.is_none()
    }
}

impl ExecutionStep {
    pub fn new(id: u64, kind: StepKind, description: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            description: description.into(),
            command: None,
            children: Vec::new(),
            timing: TimingBlock::default(),
            selected_branch: false,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ExecutionStep>) -> Self {
        self.children = children;
        self
    }

    pub fn with_timing(mut self, timing: TimingBlock) -> Self {
        self.timing = timing;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected_branch = selected;
        self
    }
}

/// A summary of the whole plan, for quick human display without walking
/// the tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSummary {
    pub step_count_by_kind: std::collections::BTreeMap<String, usize>,
    pub decorators_used: std::collections::BTreeSet<String>,
    pub parallel_sections: usize,
    pub has_error_handling: bool,
    pub conditional_branch_count: usize,
}

/// The full dry-run output: a root step list plus the summary.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub root: Vec<ExecutionStep>,
    pub summary: PlanSummary,
}
