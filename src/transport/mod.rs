//! Transport
//!
//! The uniform contract isolating local from remote execution.
//! Every concrete transport owns its own base environment; callers only
//! ever supply an overlay, never the base — this is what keeps one
//! transport's environment from leaking into another's.

pub mod local;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::errors::TransportError;
pub use types::{ExecOpts, ExecOutcome};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `argv` (argv[0] is the program, the rest are arguments — never
    /// shell-interpreted by the transport itself). `argv` empty is a
    /// precondition violation, checked by the caller before this is ever
    /// invoked.
    async fn exec(&self, argv: &[String], opts: ExecOpts) -> ExecOutcome;

    /// Copy bytes from `src` to `dst` at the given file mode.
    async fn put(
        &self,
        src: &mut (dyn AsyncRead + Unpin + Send),
        dst: &str,
        mode: u32,
    ) -> Result<(), TransportError>;

    /// Copy bytes from `src` into `dst`.
    async fn get(
        &self,
        src: &str,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), TransportError>;

    /// Release resources. Must be safe to call more than once.
    async fn close(&self) -> Result<(), TransportError>;
}
