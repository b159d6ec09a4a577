//! Pattern Decorators — dispatch on a set of labelled branches.

mod try_decorator;
mod when_decorator;

pub use try_decorator::TryDecorator;
pub use when_decorator::WhenDecorator;
