//! Error Types
//!
//! Four error families, matching the four error kinds in the design notes:
//! validation (pre-execution), transport failure, workflow failure (not an
//! error type at all — just a non-zero `CommandResult`), and contract
//! violations (bugs, never converted to a normal error return).

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Pre-execution validation failures: malformed parameters, unknown
/// decorators, pattern schema violations, cycles, unknown references.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("unknown decorator '@{name}'")]
    UnknownDecorator { name: String },

    #[error("decorator '@{decorator}' is missing required parameter '{param}'")]
    MissingParameter { decorator: String, param: String },

    #[error("decorator '@{decorator}' parameter '{param}' expected {expected}, got {got}")]
    TypeMismatch {
        decorator: String,
        param: String,
        expected: &'static str,
        got: String,
    },

    #[error("decorator '@{decorator}' parameter '{param}' out of range: {message}")]
    OutOfRange {
        decorator: String,
        param: String,
        message: String,
    },

    #[error("pattern decorator '@{decorator}' missing required branch '{branch}'")]
    MissingBranch { decorator: String, branch: String },

    #[error("pattern decorator '@{decorator}' does not allow branch '{branch}'")]
    UnexpectedBranch { decorator: String, branch: String },

    #[error("command graph has a cycle: {path}")]
    CyclicCommandReference { path: String },

    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },

    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },

    #[error("value decorator '@{decorator}' failed to resolve: {message}")]
    ValueResolutionFailed { decorator: String, message: String },
}

/// Transport-level failures. Timeout and cancellation are NOT represented
/// here — they surface as an ordinary `CommandResult` with exit code 124.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("command not found: {argv0}")]
    NotFound { argv0: String },

    #[error("failed to spawn '{argv0}': {message}")]
    SpawnFailed { argv0: String, message: String },

    #[error("io error during {operation}: {message}")]
    Io { operation: String, message: String },
}

/// A violated precondition, postcondition, or invariant. Indicates a bug
/// in the engine, never a recoverable runtime condition. Carries enough
/// context to locate the offending call without a debugger.
#[derive(Debug, Clone)]
pub struct ContractViolation {
    pub component: &'static str,
    pub message: String,
    pub location: &'static Location<'static>,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "contract violation in {} at {}:{}: {}",
            self.component,
            self.location.file(),
            self.location.line(),
            self.message
        )
    }
}

impl std::error::Error for ContractViolation {}

impl ContractViolation {
    #[track_caller]
    pub fn new(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            component,
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Abort the process with a structured report. Contract violations are
    /// bugs; they are never converted into an `Err` a caller could recover
    /// from.
    pub fn abort(self) -> ! {
        eprintln!("{}", self);
        std::process::abort();
    }
}

/// Top-level driver errors: resolving the target command, building
/// the IR, or validating cross-command references can each fail before
/// any execution happens.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("command '{name}' not found; available commands: {available}")]
    CommandNotFound { name: String, available: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
