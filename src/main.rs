use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use clap::Parser;

use opal_core::driver::{self, DriverOptions};
use opal_core::ir::{IrNode, ShellNode};
use opal_core::transport::local::LocalTransport;
use opal_core::workflow::Workflow;

/// A thin CLI exercising the driver. The
/// surface-syntax decorator parser is out of scope for this crate, so the
/// given script is run as a single shell step under the target command
/// name — enough to drive the evaluator end to end without a parser.
#[derive(Parser)]
#[command(name = "opal")]
#[command(about = "Decorator-driven command-orchestration runtime")]
#[command(version)]
struct Cli {
    /// Execute the script from a command-line argument.
    #[arg(short = 'c')]
    script: Option<String>,

    /// Command name the given script is registered under.
    #[arg(long = "target", default_value = "main")]
    target: String,

    /// Print the execution plan instead of running anything.
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Emit [DEBUG] traces to stderr.
    #[arg(long = "debug")]
    debug: bool,

    #[arg(long = "no-color")]
    no_color: bool,

    /// Skip `@confirm` prompts, answering as if the user said yes.
    #[arg(long = "auto-confirm")]
    auto_confirm: bool,

    #[arg(long = "quiet")]
    quiet: bool,

    /// Working directory for shell steps.
    #[arg(long = "cwd")]
    cwd: Option<String>,

    /// Script file to execute.
    #[arg()]
    script_file: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let script = if let Some(s) = cli.script {
        s
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error: cannot read script file: {file}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("Error: no script provided. Use -c 'script', a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    let mut commands = HashMap::new();
    commands.insert(cli.target.clone(), IrNode::Shell(ShellNode::literal(script)));
    let workflow = Workflow::new(commands, HashMap::new());

    let cwd = cli.cwd.unwrap_or_else(|| {
        std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "/".to_string())
    });

    let options = DriverOptions {
        target: cli.target,
        dry_run: cli.dry_run,
        debug: cli.debug,
        no_color: cli.no_color,
        auto_confirm: cli.auto_confirm,
        quiet: cli.quiet,
        cwd,
        stdout: Arc::new(Mutex::new(std::io::stdout())),
        stderr: Arc::new(Mutex::new(std::io::stderr())),
        stdin: None,
        transport: Arc::new(LocalTransport::new()),
        blocked_env_names: Vec::new(),
        blocked_env_prefixes: Vec::new(),
    };

    match driver::run(workflow, options).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
