//! Decorators — value, execution, and pattern kinds.

pub mod exec;
pub mod pattern;
pub mod registry;
pub mod types;
pub mod value;

pub use types::{BlockRequirement, ExecutionDecorator, ParamsView, PatternDecorator, PatternSchema, ValidatedParams, ValueDecorator};
