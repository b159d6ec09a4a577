//! Value Decorators — resolve to a string, used only inside shell rendering.

mod env_decorator;
mod var_decorator;

pub use env_decorator::EnvDecorator;
pub use var_decorator::VarDecorator;
