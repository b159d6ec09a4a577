//! Decorator Registry
//!
//! A catalog of the three decorator kinds (name → boxed trait object,
//! `get`/`contains`/`names`), split three ways and built explicitly
//! rather than through package-init globals — the driver constructs one
//! and threads it through the context. The explicit-registry choice over
//! a global singleton is recorded in DESIGN.md.
//!
//! Lookups take a read lock; registration takes a write lock, so readers
//! never block each other once the registry is built (in practice it is
//! built once via `with_builtins()` and never mutated after).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::types::{ExecutionDecorator, PatternDecorator, ValueDecorator};

#[derive(Default)]
pub struct DecoratorRegistry {
    value: RwLock<HashMap<&'static str, Arc<dyn ValueDecorator>>>,
    execution: RwLock<HashMap<&'static str, Arc<dyn ExecutionDecorator>>>,
    pattern: RwLock<HashMap<&'static str, Arc<dyn PatternDecorator>>>,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry populated with the built-in value/execution/pattern
    /// decorators.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_value(Arc::new(super::value::VarDecorator));
        registry.register_value(Arc::new(super::value::EnvDecorator));

        registry.register_execution(Arc::new(super::exec::ShellDecorator));
        registry.register_execution(Arc::new(super::exec::CmdDecorator));
        registry.register_execution(Arc::new(super::exec::WorkdirDecorator));
        registry.register_execution(Arc::new(super::exec::TimeoutDecorator));
        registry.register_execution(Arc::new(super::exec::RetryDecorator));
        registry.register_execution(Arc::new(super::exec::ParallelDecorator));
        registry.register_execution(Arc::new(super::exec::ConfirmDecorator));
        registry.register_execution(Arc::new(super::exec::LogDecorator));

        registry.register_pattern(Arc::new(super::pattern::WhenDecorator));
        registry.register_pattern(Arc::new(super::pattern::TryDecorator));

        registry
    }

    pub fn register_value(&self, decorator: Arc<dyn ValueDecorator>) {
        self.value.write().unwrap().insert(decorator.name(), decorator);
    }

    pub fn register_execution(&self, decorator: Arc<dyn ExecutionDecorator>) {
        self.execution.write().unwrap().insert(decorator.name(), decorator);
    }

    pub fn register_pattern(&self, decorator: Arc<dyn PatternDecorator>) {
        self.pattern.write().unwrap().insert(decorator.name(), decorator);
    }

    pub fn get_value(&self, name: &str) -> Option<Arc<dyn ValueDecorator>> {
        self.value.read().unwrap().get(name).cloned()
    }

    pub fn get_execution(&self, name: &str) -> Option<Arc<dyn ExecutionDecorator>> {
        self.execution.read().unwrap().get(name).cloned()
    }

    pub fn get_pattern(&self, name: &str) -> Option<Arc<dyn PatternDecorator>> {
        self.pattern.read().unwrap().get(name).cloned()
    }

    /// True if `name` is registered under any of the three kinds.
    pub fn contains(&self, name: &str) -> bool {
        self.value.read().unwrap().contains_key(name)
            || self.execution.read().unwrap().contains_key(name)
            || self.pattern.read().unwrap().contains_key(name)
    }
}
