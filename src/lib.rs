//! Opal — a decorator-driven command-orchestration engine.
//!
//! This crate is the evaluation core: the IR, the evaluator, the
//! transport abstraction, the concurrency primitives (timeout, retry,
//! parallel, try/catch), the decorator catalog, and the dry-run planner.
//! The surface-syntax parser and CLI front-end are thin callers of this
//! core; `src/main.rs` is one such caller.

pub mod command_result;
pub mod concurrency;
pub mod context;
pub mod decorators;
pub mod driver;
pub mod errors;
pub mod evaluator;
pub mod invariant;
pub mod ir;
pub mod planner;
pub mod transport;
pub mod workflow;

pub use command_result::CommandResult;
