//! IR — the typed tree the evaluator and planner consume.

pub mod types;

pub use types::{
    ChainLink, ChainOp, DecoratorApply, DecoratorBody, IrNode, ParamValue, Parameter, ShellNode,
    ShellPart, ValueRef,
};
