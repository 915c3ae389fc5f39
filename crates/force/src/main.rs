//! The `force` command-line interface.
//!
//! ```bash
//! force translate hello.force -o hello.py   # write target source
//! force run hello.force                     # translate and execute
//! force run hello.force --json --timeout 5  # machine-readable result
//! force check hello.force                   # validate without running
//! force builtins                            # list the runtime library
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use force::{CancelToken, ExecutionResult, ForceConfig, RunError};

/// Exit code for I/O and usage problems.
const EXIT_USAGE: u8 = 4;

#[derive(Parser)]
#[command(
    name = "force",
    version = env!("CARGO_PKG_VERSION"),
    about = "Translate and run Force programs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a Force file into target source
    Translate {
        file: PathBuf,
        /// Write the target source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate and execute a Force file
    Run {
        file: PathBuf,
        /// Print the target source before running it
        #[arg(long)]
        show_target: bool,
        /// Report the result as JSON
        #[arg(long)]
        json: bool,
        /// Stop the program after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Check that a Force file translates and parses
    Check { file: PathBuf },

    /// List the runtime library built-ins
    Builtins {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match dispatch(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// `FORCE_LOG` overrides the default filter.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("FORCE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("force=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the exit code for program failures; `Err` is an I/O or config problem.
fn dispatch(command: Commands) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = ForceConfig::load(&cwd)?;

    match command {
        Commands::Translate { file, output } => {
            let source = read_source(&file)?;
            let target = match force::translate_configured(&source, &config) {
                Ok(target) => target,
                Err(e) => return Ok(report_error(&RunError::from(e))),
            };
            match output {
                Some(path) => std::fs::write(&path, target)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => print!("{target}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            file,
            show_target,
            json,
            timeout,
        } => {
            let source = read_source(&file)?;
            if show_target {
                if let Ok(target) = force::translate_configured(&source, &config) {
                    eprintln!("--- target ---\n{target}--- end target ---");
                }
            }
            let cancel = timeout
                .or(config.execution.timeout_secs)
                .map(|secs| start_timer(Duration::from_secs(secs)));
            let result = force::run_with_cancel(&source, &config, cancel);
            Ok(report_run(result, json))
        }
        Commands::Check { file } => {
            let source = read_source(&file)?;
            let checked = force::translate_configured(&source, &config)
                .map_err(RunError::from)
                .and_then(|target| {
                    force_runtime::sandbox::precheck(&target)?;
                    force_runtime::target::parse(&target).map_err(|e| {
                        force::ExecutionError::Parse {
                            line: e.line,
                            message: e.message,
                        }
                    })?;
                    Ok(())
                });
            match checked {
                Ok(()) => {
                    println!("{}: ok", file.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_error(&e)),
            }
        }
        Commands::Builtins { json } => {
            list_builtins(json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Cancel the returned token once `limit` has passed.
fn start_timer(limit: Duration) -> CancelToken {
    let token = CancelToken::new();
    let timer = token.clone();
    std::thread::spawn(move || {
        std::thread::sleep(limit);
        tracing::debug!(?limit, "timeout reached");
        timer.cancel();
    });
    token
}

fn report_run(result: Result<ExecutionResult, RunError>, json: bool) -> ExitCode {
    match (result, json) {
        (Ok(result), false) => {
            print!("{}", result.output);
            ExitCode::SUCCESS
        }
        (Ok(result), true) => {
            let report = serde_json::json!({
                "ok": true,
                "output": result.output,
                "result": result.result,
                "truncated": result.truncated,
            });
            println!("{report:#}");
            ExitCode::SUCCESS
        }
        (Err(e), false) => {
            if let RunError::Execution(exec) = &e {
                print!("{}", exec.output());
            }
            report_error(&e)
        }
        (Err(e), true) => {
            let output = match &e {
                RunError::Execution(exec) => exec.output(),
                _ => "",
            };
            let report = serde_json::json!({
                "ok": false,
                "kind": e.kind(),
                "message": e.to_string(),
                "line": e.line(),
                "output": output,
            });
            println!("{report:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn report_error(e: &RunError) -> ExitCode {
    eprintln!("error: {e}");
    ExitCode::from(exit_code(e))
}

fn exit_code(e: &RunError) -> u8 {
    u8::try_from(e.exit_code()).unwrap_or(1)
}

fn list_builtins(json: bool) -> anyhow::Result<()> {
    let registry = force::registry();
    if json {
        let entries: Vec<_> = registry
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "category": f.category,
                    "signature": f.signature,
                    "summary": f.summary,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    let mut category = "";
    for f in registry.iter() {
        if f.category != category {
            category = f.category;
            println!("{category}:");
        }
        println!("  {:<52} {}", f.signature, f.summary);
    }
    Ok(())
}
