//! Mock Transport
//!
//! A recording, scriptable transport for tests. Exposes a response
//! table keyed by the joined argv, an in-memory file table, and a
//! configurable base environment, so tests can drive the evaluator
//! deterministically without touching a real process boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::TransportError;

use super::types::{ExecOpts, ExecOutcome};
use super::Transport;

/// A scripted response for a given argv-joined key.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockResponse {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: 0, stdout: stdout.into(), stderr: String::new() }
    }

    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: String::new(), stderr: stderr.into() }
    }
}

/// One recorded `exec` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    pub env_overlay: HashMap<String, String>,
    pub cwd: Option<String>,
}

struct MockState {
    responses: HashMap<String, MockResponse>,
    calls: Vec<RecordedCall>,
    files: HashMap<String, Vec<u8>>,
}

/// `base_env` is the transport's own base; it is never touched by
/// `exec`'s overlay, so tests can assert the overlay never leaked into it
/// and vice versa.
pub struct MockTransport {
    base_env: HashMap<String, String>,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_base_env(HashMap::new())
    }

    pub fn with_base_env(base_env: HashMap<String, String>) -> Self {
        Self {
            base_env,
            state: Mutex::new(MockState {
                responses: HashMap::new(),
                calls: Vec::new(),
                files: HashMap::new(),
            }),
        }
    }

    pub fn set_response(&self, argv: &[&str], response: MockResponse) {
        let key = argv.join(" ");
        self.state.lock().unwrap().responses.insert(key, response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn base_env(&self) -> &HashMap<String, String> {
        &self.base_env
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exec(&self, argv: &[String], opts: ExecOpts) -> ExecOutcome {
        crate::invariant::precondition("MockTransport::exec", !argv.is_empty(), "argv must not be empty");

        if opts.cancel.is_cancelled() {
            return ExecOutcome::cancelled();
        }

        let key = argv.join(" ");
        let merged_env: HashMap<String, String> = self
            .base_env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(opts.env_overlay.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        let _ = merged_env; // available to scripted handlers in a fuller implementation

        let response = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RecordedCall {
                argv: argv.to_vec(),
                env_overlay: opts.env_overlay.clone(),
                cwd: opts.cwd.clone(),
            });
            state.responses.get(&key).cloned()
        };

        match response {
            Some(r) => {
                {
                    let mut w = opts.stdout.lock().unwrap();
                    let _ = std::io::Write::write_all(&mut *w, r.stdout.as_bytes());
                }
                {
                    let mut w = opts.stderr.lock().unwrap();
                    let _ = std::io::Write::write_all(&mut *w, r.stderr.as_bytes());
                }
                ExecOutcome::success(r.exit_code)
            }
            None => ExecOutcome::not_found(&argv[0]),
        }
    }

    async fn put(
        &self,
        src: &mut (dyn AsyncRead + Unpin + Send),
        dst: &str,
        _mode: u32,
    ) -> Result<(), TransportError> {
        let mut buf = Vec::new();
        src.read_to_end(&mut buf)
            .await
            .map_err(|e| TransportError::Io { operation: "put".into(), message: e.to_string() })?;
        self.state.lock().unwrap().files.insert(dst.to_string(), buf);
        Ok(())
    }

    async fn get(
        &self,
        src: &str,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), TransportError> {
        let data = self
            .state
            .lock()
            .unwrap()
            .files
            .get(src)
            .cloned()
            .ok_or_else(|| TransportError::Io { operation: "get".into(), message: format!("no such file: {src}") })?;
        dst.write_all(&data)
            .await
            .map_err(|e| TransportError::Io { operation: "get".into(), message: e.to_string() })?;
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
