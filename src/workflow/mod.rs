//! Workflow
//!
//! The parsed-and-lowered input the driver operates on: a command table
//! plus variable bindings. Building one from surface
//! syntax is out of scope here — callers hand the driver an
//! already-lowered `Workflow`.

use std::collections::{HashMap, HashSet};

use crate::errors::ValidationError;
use crate::ir::{DecoratorApply, DecoratorBody, IrNode, ParamValue};

/// A command name → IR mapping plus the workflow's `var` bindings.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    pub commands: HashMap<String, IrNode>,
    pub vars: HashMap<String, String>,
}

impl Workflow {
    pub fn new(commands: HashMap<String, IrNode>, vars: HashMap<String, String>) -> Self {
        Self { commands, vars }
    }

    /// DFS over every command's `cmd` cross-references, rejecting on the
    /// first back-edge found with the cycle's path named in the error.
    pub fn validate_acyclic(&self) -> Result<(), ValidationError> {
        let mut visited = HashSet::new();
        let mut in_progress = Vec::new();
        let mut names: Vec<&String> = self.commands.keys().collect();
        names.sort();
        for name in names {
            if !visited.contains(name) {
                self.visit(name, &mut visited, &mut in_progress)?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        in_progress: &mut Vec<String>,
    ) -> Result<(), ValidationError> {
        if let Some(pos) = in_progress.iter().position(|n| n == name) {
            let mut path = in_progress[pos..].to_vec();
            path.push(name.to_string());
            return Err(ValidationError::CyclicCommandReference { path: path.join(" -> ") });
        }
        if visited.contains(name) {
            return Ok(());
        }
        in_progress.push(name.to_string());
        if let Some(node) = self.commands.get(name) {
            for referenced in cmd_references(node) {
                self.visit(&referenced, visited, in_progress)?;
            }
        }
        in_progress.pop();
        visited.insert(name.to_string());
        Ok(())
    }
}

/// Every command name a `@cmd(name)` application inside `node` points at,
/// in declaration order, duplicates included (the DFS dedups via
/// `visited`; callers needing just the set can collect into one).
fn cmd_references(node: &IrNode) -> Vec<String> {
    let mut out = Vec::new();
    collect_cmd_references(node, &mut out);
    out
}

fn collect_cmd_references(node: &IrNode, out: &mut Vec<String>) {
    match node {
        IrNode::Shell(_) | IrNode::ValueRef(_) => {}
        IrNode::Chain(links) => {
            for link in links {
                collect_cmd_references(&link.node, out);
            }
        }
        IrNode::Sequence(nodes) => {
            for n in nodes {
                collect_cmd_references(n, out);
            }
        }
        IrNode::DecoratorApply(apply) => {
            if apply.name == "cmd" {
                if let Some(name) = cmd_target_name(apply) {
                    out.push(name);
                }
            }
            match &apply.body {
                DecoratorBody::Single(inner) => collect_cmd_references(inner, out),
                DecoratorBody::Branches(branches) => {
                    for (_, inner) in branches {
                        collect_cmd_references(inner, out);
                    }
                }
                DecoratorBody::None => {}
            }
        }
    }
}

/// Reads `@cmd`'s `name` parameter directly off the IR, without going
/// through the registry — this runs before a context even exists.
fn cmd_target_name(apply: &DecoratorApply) -> Option<String> {
    apply
        .params
        .iter()
        .find(|p| p.name == "name" || p.is_positional())
        .and_then(|p| match &p.value {
            ParamValue::Identifier(s) => Some(s.clone()),
            _ => None,
        })
}
