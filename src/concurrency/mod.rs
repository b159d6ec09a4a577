//! Concurrency Core
//!
//! The scheduling and cancellation primitives behind `parallel`, `timeout`,
//! `retry`, and `try`/`catch`/`finally`. Decorators in
//! `crate::decorators::exec` are thin adapters over these; the algorithms
//! live here so they can be tested independent of parameter parsing.

pub mod parallel;
pub mod retry;
pub mod timeout;
pub mod try_catch;
