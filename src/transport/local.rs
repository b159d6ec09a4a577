//! Local Transport
//!
//! Runs commands as child processes of the current host. Owns a snapshot
//! of the host's own environment as its base; the caller's overlay
//! is merged on top, overlay winning on key collision.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::errors::TransportError;
use crate::invariant;

use super::types::{exit_codes, ExecOpts, ExecOutcome};
use super::Transport;

/// Grace period between SIGTERM and SIGKILL when cancelling a running
/// child.
const KILL_GRACE: Duration = Duration::from_millis(500);

pub struct LocalTransport {
    base_env: HashMap<String, String>,
}

impl LocalTransport {
    /// Capture the host process environment once, at transport
    /// construction — this is the transport's own base, isolated from
    /// any other transport instance.
    pub fn new() -> Self {
        Self {
            base_env: std::env::vars().collect(),
        }
    }

    fn merged_env(&self, overlay: &HashMap<String, String>) -> HashMap<String, String> {
        let mut env = self.base_env.clone();
        env.extend(overlay.clone());
        env
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn exec(&self, argv: &[String], opts: ExecOpts) -> ExecOutcome {
        invariant::precondition("LocalTransport::exec", !argv.is_empty(), "argv must not be empty");

        let env = self.merged_env(&opts.env_overlay);
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &opts.cwd {
            command.current_dir(cwd);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ExecOutcome::not_found(&argv[0]);
            }
            Err(e) => return ExecOutcome::spawn_failed(&argv[0], e.to_string()),
        };

        if let Some(mut stdin) = child.stdin.take() {
            let data = opts.stdin.clone();
            let _ = stdin.write_all(&data).await;
            drop(stdin);
        }

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let pid = child.id();

        tokio::select! {
            status = wait_and_capture(&mut child, &mut stdout_pipe, &mut stderr_pipe, &opts.stdout, &opts.stderr) => {
                status
            }
            _ = opts.cancel.cancelled() => {
                terminate(pid).await;
                let _ = child.wait().await;
                // Drain whatever the process had already written before it
                // was killed so a cancelled step doesn't silently lose
                // output a caller (e.g. `timeout`) is expected to see.
                drain_remaining(&mut stdout_pipe, &opts.stdout).await;
                drain_remaining(&mut stderr_pipe, &opts.stderr).await;
                ExecOutcome::cancelled()
            }
        }
    }

    async fn put(
        &self,
        src: &mut (dyn AsyncRead + Unpin + Send),
        dst: &str,
        mode: u32,
    ) -> Result<(), TransportError> {
        let mut file = tokio::fs::File::create(dst)
            .await
            .map_err(|e| TransportError::Io { operation: "put".into(), message: e.to_string() })?;
        tokio::io::copy(src, &mut file)
            .await
            .map_err(|e| TransportError::Io { operation: "put".into(), message: e.to_string() })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(mode);
            let _ = tokio::fs::set_permissions(dst, perms).await;
        }
        let _ = mode;
        Ok(())
    }

    async fn get(
        &self,
        src: &str,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), TransportError> {
        let mut file = tokio::fs::File::open(src)
            .await
            .map_err(|e| TransportError::Io { operation: "get".into(), message: e.to_string() })?;
        tokio::io::copy(&mut file, dst)
            .await
            .map_err(|e| TransportError::Io { operation: "get".into(), message: e.to_string() })?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        // The local transport holds no persistent resources to release.
        Ok(())
    }
}

async fn drain_remaining<R: AsyncRead + Unpin>(pipe: &mut Option<R>, sink: &crate::context::SharedWriter) {
    if let Some(mut p) = pipe.take() {
        let mut buf = Vec::new();
        let _ = p.read_to_end(&mut buf).await;
        if !buf.is_empty() {
            let mut w = sink.lock().unwrap();
            let _ = std::io::Write::write_all(&mut *w, &buf);
        }
    }
}

async fn wait_and_capture(
    child: &mut tokio::process::Child,
    stdout_pipe: &mut Option<tokio::process::ChildStdout>,
    stderr_pipe: &mut Option<tokio::process::ChildStderr>,
    stdout_sink: &crate::context::SharedWriter,
    stderr_sink: &crate::context::SharedWriter,
) -> ExecOutcome {
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    if let Some(mut pipe) = stdout_pipe.take() {
        let _ = pipe.read_to_end(&mut out_buf).await;
    }
    if let Some(mut pipe) = stderr_pipe.take() {
        let _ = pipe.read_to_end(&mut err_buf).await;
    }
    if !out_buf.is_empty() {
        let mut w = stdout_sink.lock().unwrap();
        let _ = std::io::Write::write_all(&mut *w, &out_buf);
    }
    if !err_buf.is_empty() {
        let mut w = stderr_sink.lock().unwrap();
        let _ = std::io::Write::write_all(&mut *w, &err_buf);
    }

    match child.wait().await {
        Ok(status) => match status.code() {
            Some(code) => ExecOutcome::success(code),
            None => ExecOutcome::success(exit_codes::TIMEOUT_OR_CANCELLED),
        },
        Err(e) => ExecOutcome::spawn_failed("<wait>", e.to_string()),
    }
}

#[cfg(unix)]
async fn terminate(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
        tokio::time::sleep(KILL_GRACE).await;
        unsafe {
            libc::kill(pid as i32, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
async fn terminate(_pid: Option<u32>) {}
