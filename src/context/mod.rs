//! Execution Context
//!
//! The process-wide frozen snapshot every evaluation step reads from.
//! Contexts are created once per top-level command execution and passed
//! by reference; decorators see them as read-only except through
//! `Derive`, whose overlay is scoped to the child and discarded on return.

pub mod env_snapshot;
pub mod overlay;

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::decorators::registry::DecoratorRegistry;
use crate::invariant;
use crate::ir::IrNode;
use crate::transport::Transport;

pub use env_snapshot::EnvSnapshot;
pub use overlay::Overlay;

/// A shared, lockable sink. Writes are infrequent (debug traces, `log`
/// decorator lines, the driver's final output) so a blocking mutex is the
/// right tool, with writes routed through the context instead of a
/// global stream.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Deterministic facts captured once at construction; never re-queried,
/// so two plans built from the same context are byte-identical.
#[derive(Debug, Clone, Copy)]
pub struct SystemInfo {
    pub num_cpus: usize,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let num_cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self { num_cpus }
    }
}

/// User-interface flags that do not affect evaluation semantics directly
/// but are consulted by specific decorators (`confirm`, `log`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UiFlags {
    pub no_color: bool,
    pub auto_confirm: bool,
    pub quiet: bool,
}

/// The full command table: every command in the workflow, already
/// lowered to IR, so the `cmd` decorator can cross-reference any of them
/// without re-walking the parse tree.
pub type CommandTable = Arc<HashMap<String, Arc<IrNode>>>;

struct ContextInner {
    env: Arc<EnvSnapshot>,
    base_vars: Arc<HashMap<String, String>>,
    overlay: Overlay,
    cwd: Mutex<String>,
    stdout: SharedWriter,
    stderr: SharedWriter,
    stdin: Option<Arc<Mutex<dyn std::io::Read + Send>>>,
    dry_run: bool,
    debug: bool,
    system_info: SystemInfo,
    ui: UiFlags,
    transport: Arc<dyn Transport>,
    registry: Arc<DecoratorRegistry>,
    commands: CommandTable,
    cancel: CancellationToken,
}

/// The execution context. Cheap to clone: it's a reference-counted handle
/// to the shared inner state plus the context's own overlay and cwd.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

/// Everything required to construct a top-level context.
pub struct ContextOptions {
    pub env: Arc<EnvSnapshot>,
    pub vars: HashMap<String, String>,
    pub cwd: String,
    pub stdout: SharedWriter,
    pub stderr: SharedWriter,
    pub stdin: Option<Arc<Mutex<dyn std::io::Read + Send>>>,
    pub dry_run: bool,
    pub debug: bool,
    pub ui: UiFlags,
    pub transport: Arc<dyn Transport>,
    pub registry: Arc<DecoratorRegistry>,
    pub commands: CommandTable,
}

impl ExecutionContext {
    pub fn new(opts: ContextOptions) -> Self {
        let inner = ContextInner {
            env: opts.env,
            base_vars: Arc::new(opts.vars),
            overlay: Overlay::empty(),
            cwd: Mutex::new(opts.cwd),
            stdout: opts.stdout,
            stderr: opts.stderr,
            stdin: opts.stdin,
            dry_run: opts.dry_run,
            debug: opts.debug,
            system_info: SystemInfo::detect(),
            ui: opts.ui,
            transport: opts.transport,
            registry: opts.registry,
            commands: opts.commands,
            cancel: CancellationToken::new(),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn get_env(&self, key: &str) -> Option<String> {
        self.inner.env.get(key).map(|s| s.to_string())
    }

    /// Reads the scoped overlay first, then falls back to the workflow's
    /// `var` bindings.
    pub fn get_var(&self, key: &str) -> Option<String> {
        if let Some(v) = self.inner.overlay.get_var(key) {
            return Some(v);
        }
        self.inner.base_vars.get(key).cloned()
    }

    /// Returns a child context whose overlay additionally shadows the
    /// given variable/env bindings. The parent is unaffected.
    pub fn derive(&self, vars: HashMap<String, String>, env: HashMap<String, String>) -> Self {
        // A derived context inherits the parent's cancellation scope by
        // default; callers that need an independent cancellation domain
        // (e.g. `timeout`) use `derive_with_cancel`.
        let inner = ContextInner {
            env: self.inner.env.clone(),
            base_vars: self.inner.base_vars.clone(),
            overlay: self.inner.overlay.push(vars, env),
            cwd: Mutex::new(self.cwd()),
            stdout: self.inner.stdout.clone(),
            stderr: self.inner.stderr.clone(),
            stdin: self.inner.stdin.clone(),
            dry_run: self.inner.dry_run,
            debug: self.inner.debug,
            system_info: self.inner.system_info,
            ui: self.inner.ui,
            transport: self.inner.transport.clone(),
            registry: self.inner.registry.clone(),
            commands: self.inner.commands.clone(),
            cancel: self.inner.cancel.clone(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Like `derive`, but also forks a child cancellation token so the
    /// caller can cancel the derived context's descendants without
    /// affecting siblings (used by `timeout` and `parallel` fail-immediate).
    pub fn derive_with_cancel(&self) -> (Self, CancellationToken) {
        let child_token = self.inner.cancel.child_token();
        let mut ctx = self.derive(HashMap::new(), HashMap::new());
        let inner = Arc::get_mut(&mut ctx.inner).expect("freshly created Arc has one owner");
        inner.cancel = child_token.clone();
        (ctx, child_token)
    }

    /// Returns a child context with a different working directory.
    pub fn with_cwd(&self, cwd: impl Into<String>) -> Self {
        let ctx = self.derive(HashMap::new(), HashMap::new());
        *ctx.inner.cwd.lock().unwrap() = cwd.into();
        ctx
    }

    pub fn cwd(&self) -> String {
        self.inner.cwd.lock().unwrap().clone()
    }

    pub fn dry_run(&self) -> bool {
        self.inner.dry_run
    }

    pub fn debug(&self) -> bool {
        self.inner.debug
    }

    pub fn ui(&self) -> UiFlags {
        self.inner.ui
    }

    pub fn system_info(&self) -> SystemInfo {
        self.inner.system_info
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    pub fn registry(&self) -> Arc<DecoratorRegistry> {
        self.inner.registry.clone()
    }

    pub fn commands(&self) -> CommandTable {
        self.inner.commands.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn stdin(&self) -> Option<Arc<Mutex<dyn std::io::Read + Send>>> {
        self.inner.stdin.clone()
    }

    /// The env overlay a `Shell` node's transport call should carry,
    /// flattened from every `Derive` layer between here and the root.
    pub fn env_overlay(&self) -> HashMap<String, String> {
        self.inner.overlay.flatten_env()
    }

    /// Write a line to the context's stdout, honouring the quiet flag the
    /// way `log` does.
    pub fn write_stdout(&self, text: &str) {
        invariant::invariant(
            "ExecutionContext",
            !self.inner.ui.quiet || text.is_empty(),
            "write_stdout called while quiet",
        );
        let mut w = self.inner.stdout.lock().unwrap();
        let _ = w.write_all(text.as_bytes());
    }

    /// Write a line to the context's stderr. Debug traces and error
    /// messages always go here, quiet flag notwithstanding.
    pub fn write_stderr(&self, text: &str) {
        let mut w = self.inner.stderr.lock().unwrap();
        let _ = w.write_all(text.as_bytes());
    }

    /// Emit a `[DEBUG] ...` line to stderr if debug mode is enabled.
    pub fn debug_trace(&self, message: &str) {
        if self.inner.debug {
            self.write_stderr(&format!("[DEBUG] {}\n", message));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_context;
    use super::*;

    #[test]
    fn derive_overlay_does_not_leak_upward() {
        let parent = test_context();
        let mut vars = HashMap::new();
        vars.insert("X".to_string(), "child".to_string());
        let child = parent.derive(vars, HashMap::new());
        assert_eq!(child.get_var("X"), Some("child".to_string()));
        assert_eq!(parent.get_var("X"), None);
    }

    #[test]
    fn with_cwd_does_not_affect_parent() {
        let parent = test_context();
        let child = parent.with_cwd("/elsewhere");
        assert_eq!(child.cwd(), "/elsewhere");
        assert_eq!(parent.cwd(), "/work");
    }

    #[test]
    fn get_env_reads_only_snapshot() {
        let ctx = test_context();
        assert_eq!(ctx.get_env("NOPE"), None);
    }
}
