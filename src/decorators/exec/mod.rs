//! Execution Decorators — wrap a child node and control how/whether it runs.

mod cmd_decorator;
mod confirm_decorator;
mod log_decorator;
mod parallel_decorator;
mod retry_decorator;
mod shell_decorator;
mod timeout_decorator;
mod workdir_decorator;

pub use cmd_decorator::CmdDecorator;
pub use confirm_decorator::ConfirmDecorator;
pub use log_decorator::LogDecorator;
pub use parallel_decorator::ParallelDecorator;
pub use retry_decorator::RetryDecorator;
pub use shell_decorator::ShellDecorator;
pub use timeout_decorator::TimeoutDecorator;
pub use workdir_decorator::WorkdirDecorator;
