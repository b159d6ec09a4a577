//! Planner
//!
//! Walks an `IrNode` tree into an `ExecutionPlan` without ever touching a
//! Transport or a decorator's `execute`/`resolve` — only the pure
//! `validate`/`plan`/`validate_patterns` surface is consulted, so building
//! a plan has zero side effects and two plans built from the same frozen
//! context are byte-identical.

pub mod types;

use crate::context::ExecutionContext;
use crate::errors::ValidationError;
use crate::ir::{ChainOp, DecoratorApply, DecoratorBody, IrNode, ShellNode, ShellPart};

use types::{ExecutionPlan, ExecutionStep, PlanSummary, StepKind};

/// Build the full dry-run plan for `node`.
pub fn build_plan(ctx: &ExecutionContext, node: &IrNode) -> Result<ExecutionPlan, ValidationError> {
    let mut root = build_step(ctx, node)?;
    let mut next_id = 0u64;
    assign_ids(std::slice::from_mut(&mut root), &mut next_id);
    let summary = summarize(&root);
    Ok(ExecutionPlan { root: vec![root], summary })
}

/// Recursively build a step tree with placeholder ids (renumbered by
/// `assign_ids` once the whole tree exists).
fn build_step(ctx: &ExecutionContext, node: &IrNode) -> Result<ExecutionStep, ValidationError> {
    match node {
        IrNode::Shell(shell) => {
            let text = describe_shell(shell);
            Ok(ExecutionStep::new(0, StepKind::Shell, text.clone()).with_command(text))
        }
        IrNode::Chain(links) => {
            let mut children = Vec::with_capacity(links.len());
            for link in links {
                children.push(build_step(ctx, &link.node)?);
            }
            Ok(ExecutionStep::new(0, StepKind::Sequence, describe_chain(links)).with_children(children))
        }
        IrNode::Sequence(nodes) => {
            let mut children = Vec::with_capacity(nodes.len());
            for n in nodes {
                children.push(build_step(ctx, n)?);
            }
            Ok(ExecutionStep::new(0, StepKind::Sequence, "sequence".to_string()).with_children(children))
        }
        IrNode::DecoratorApply(apply) => build_decorator_step(ctx, apply),
        IrNode::ValueRef(value_ref) => Err(ValidationError::ValueResolutionFailed {
            decorator: value_ref.decorator.clone(),
            message: "a ValueRef cannot appear outside a shell node".to_string(),
        }),
    }
}

fn build_decorator_step(ctx: &ExecutionContext, apply: &DecoratorApply) -> Result<ExecutionStep, ValidationError> {
    match &apply.body {
        DecoratorBody::Branches(branches) => {
            let decorator = ctx
                .registry()
                .get_pattern(&apply.name)
                .ok_or_else(|| ValidationError::UnknownDecorator { name: apply.name.clone() })?;
            let validated = decorator.validate(&apply.params)?;
            let names: Vec<String> = branches.iter().map(|(label, _)| label.clone()).collect();
            if let Some(first) = decorator.validate_patterns(&names).into_iter().next() {
                return Err(first);
            }
            let selected = decorator.selected_branch_label(ctx, &validated, branches);
            let mut step = decorator.plan(ctx, &validated, branches);
            let mut children = Vec::with_capacity(branches.len());
            for (label, node) in branches {
                let mut child = build_step(ctx, node)?;
                child.description = format!("{label}: {}", child.description);
                child.selected_branch = selected.as_deref() == Some(label.as_str());
                children.push(child);
            }
            step.children = children;
            Ok(step)
        }
        DecoratorBody::None | DecoratorBody::Single(_) => {
            let decorator = ctx
                .registry()
                .get_execution(&apply.name)
                .ok_or_else(|| ValidationError::UnknownDecorator { name: apply.name.clone() })?;
            let validated = decorator.validate(&apply.params)?;
            let inner_plan = match &apply.body {
                DecoratorBody::Single(node) => Some(build_step(ctx, node)?),
                _ => None,
            };
            Ok(decorator.plan(ctx, &validated, inner_plan))
        }
    }
}

/// Pre-order renumbering: the root of each slice gets the next id before
/// its children do, so a freshly built plan reads top-to-bottom in the
/// order a human would scan it.
fn assign_ids(steps: &mut [ExecutionStep], next_id: &mut u64) {
    for step in steps {
        step.id = *next_id;
        *next_id += 1;
        assign_ids(&mut step.children, next_id);
    }
}

/// Shell text for display, with embedded value decorators rendered as
/// `@name(...)` rather than resolved — resolution may run expensive
/// decorators' `resolve()`, which a dry run never calls.
fn describe_shell(shell: &ShellNode) -> String {
    let mut out = String::new();
    for part in &shell.parts {
        match part {
            ShellPart::Literal(text) => out.push_str(text),
            ShellPart::Value(value_ref) => {
                out.push('@');
                out.push_str(&value_ref.decorator);
                out.push('(');
                out.push_str(
                    &value_ref
                        .params
                        .iter()
                        .map(describe_param)
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                out.push(')');
            }
        }
    }
    out
}

fn describe_param(param: &crate::ir::Parameter) -> String {
    use crate::ir::ParamValue;
    let value = match &param.value {
        ParamValue::String(s) => s.clone(),
        ParamValue::Integer(i) => i.to_string(),
        ParamValue::Float(f) => f.to_string(),
        ParamValue::Boolean(b) => b.to_string(),
        ParamValue::Duration(d) => format!("{d:?}"),
        ParamValue::Identifier(s) => s.clone(),
        ParamValue::Expression(s) => s.clone(),
    };
    if param.name.is_empty() {
        value
    } else {
        format!("{}={value}", param.name)
    }
}

fn describe_chain(links: &[crate::ir::ChainLink]) -> String {
    let ops: Vec<&str> = links
        .iter()
        .filter_map(|l| {
            l.op.map(|op| match op {
                ChainOp::Sequence => ";",
                ChainOp::And => "&&",
                ChainOp::Or => "||",
                ChainOp::Pipe => "|",
            })
        })
        .collect();
    if ops.is_empty() {
        "chain".to_string()
    } else {
        format!("chain ({})", ops.join(" "))
    }
}

fn summarize(root: &ExecutionStep) -> PlanSummary {
    let mut summary = PlanSummary::default();
    walk_summary(root, &mut summary);
    summary
}

fn walk_summary(step: &ExecutionStep, summary: &mut PlanSummary) {
    *summary
        .step_count_by_kind
        .entry(kind_label(step.kind).to_string())
        .or_insert(0) += 1;

    if let Some(name) = decorator_name(step) {
        summary.decorators_used.insert(name);
    }

    match step.kind {
        StepKind::Parallel => summary.parallel_sections += 1,
        StepKind::Conditional => summary.conditional_branch_count += step.children.len(),
        StepKind::TryCatch => summary.has_error_handling = true,
        _ => {}
    }

    for child in &step.children {
        walk_summary(child, summary);
    }
}

fn kind_label(kind: StepKind) -> &'static str {
    match kind {
        StepKind::Shell => "shell",
        StepKind::Timeout => "timeout",
        StepKind::Parallel => "parallel",
        StepKind::Retry => "retry",
        StepKind::Conditional => "conditional",
        StepKind::TryCatch => "try-catch",
        StepKind::Sequence => "sequence",
        StepKind::Decorator => "decorator",
    }
}

fn decorator_name(step: &ExecutionStep) -> Option<String> {
    if !step.description.starts_with('@') {
        return None;
    }
    step.description
        .trim_start_matches('@')
        .split(['(', ':'])
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context;
    use crate::ir::{ChainLink, ParamValue, Parameter, ShellNode};

    fn shell(cmd: &str) -> IrNode {
        IrNode::Shell(ShellNode::literal(cmd))
    }

    #[test]
    fn shell_node_plans_with_no_children() {
        let ctx = test_context();
        let plan = build_plan(&ctx, &shell("echo hi")).unwrap();
        assert_eq!(plan.root.len(), 1);
        assert_eq!(plan.root[0].kind, StepKind::Shell);
        assert!(plan.root[0].children.is_empty());
    }

    #[test]
    fn ids_are_unique_and_preorder() {
        let ctx = test_context();
        let node = IrNode::Sequence(vec![shell("a"), shell("b"), shell("c")]);
        let plan = build_plan(&ctx, &node).unwrap();
        let root = &plan.root[0];
        assert_eq!(root.id, 0);
        let ids: Vec<u64> = root.children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_decorator_fails_to_plan() {
        let ctx = test_context();
        let node = IrNode::DecoratorApply(DecoratorApply {
            name: "nope".to_string(),
            params: vec![],
            body: DecoratorBody::None,
        });
        assert!(build_plan(&ctx, &node).is_err());
    }

    #[test]
    fn when_plan_marks_the_branch_that_would_run() {
        let ctx = test_context();
        let node = IrNode::DecoratorApply(DecoratorApply {
            name: "when".to_string(),
            params: vec![Parameter::positional(ParamValue::String("MISSING_VAR".into()))],
            body: DecoratorBody::Branches(vec![
                ("linux".to_string(), shell("echo linux")),
                ("default".to_string(), shell("echo default")),
            ]),
        });
        let plan = build_plan(&ctx, &node).unwrap();
        let when_step = &plan.root[0];
        assert_eq!(when_step.children.len(), 2);
        assert!(!when_step.children[0].selected_branch);
        assert!(when_step.children[1].selected_branch);
        assert_eq!(plan.summary.conditional_branch_count, 2);
    }

    #[test]
    fn chain_description_lists_its_operators() {
        let node = IrNode::Chain(vec![
            ChainLink { node: shell("a"), op: Some(ChainOp::And) },
            ChainLink { node: shell("b"), op: None },
        ]);
        let ctx = test_context();
        let plan = build_plan(&ctx, &node).unwrap();
        assert!(plan.root[0].description.contains("&&"));
    }
}
