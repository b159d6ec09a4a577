//! Transport Contract Types

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::context::SharedWriter;
use crate::errors::TransportError;

/// Options for a single `exec` call. The overlay is additive over the
/// transport's own base environment: the base never leaks between
/// transports, the caller supplies only the overlay.
pub struct ExecOpts {
    pub stdin: Vec<u8>,
    pub stdout: SharedWriter,
    pub stderr: SharedWriter,
    pub env_overlay: HashMap<String, String>,
    pub cwd: Option<String>,
    pub cancel: CancellationToken,
}

/// Reserved exit codes transports must use exactly as specified,
/// never repurposed for other meanings.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const TIMEOUT_OR_CANCELLED: i32 = 124;
    pub const NOT_FOUND: i32 = 127;
    pub const USER_CANCELLED: i32 = 130;
}

/// The outcome of a transport `exec` call: an exit code, and an error
/// only when the process never ran at all (spawn failure / not found).
/// A normal non-zero exit is `(code, None)` — not exceptional.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub error: Option<TransportError>,
}

impl ExecOutcome {
    pub fn success(code: i32) -> Self {
        Self { exit_code: code, error: None }
    }

    pub fn cancelled() -> Self {
        Self { exit_code: exit_codes::TIMEOUT_OR_CANCELLED, error: None }
    }

    pub fn not_found(argv0: &str) -> Self {
        Self {
            exit_code: exit_codes::NOT_FOUND,
            error: Some(TransportError::NotFound { argv0: argv0.to_string() }),
        }
    }

    pub fn spawn_failed(argv0: &str, message: impl Into<String>) -> Self {
        Self {
            exit_code: exit_codes::NOT_FOUND,
            error: Some(TransportError::SpawnFailed {
                argv0: argv0.to_string(),
                message: message.into(),
            }),
        }
    }
}
