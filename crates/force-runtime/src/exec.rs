//! The execution boundary: pre-check, parse, and run on a worker thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::context::{CallContext, Output};
use crate::error::ExecutionError;
use crate::interp::Interpreter;
use crate::library::files::FileAccess;
use crate::sandbox;
use crate::target;

/// Worker stack size. Deep but bounded recursion needs room.
const WORKER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Shared flag that asks a running program to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Bytes of printed output kept before truncation.
    pub max_output_bytes: usize,
    pub max_call_depth: usize,
    /// Confine file built-ins to this directory.
    pub file_root: Option<PathBuf>,
    pub cancel: Option<CancelToken>,
    /// Seed for `midichlorians`; entropy when unset.
    pub random_seed: Option<u64>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_output_bytes: 5000,
            max_call_depth: 200,
            file_root: None,
            cancel: None,
            random_seed: None,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub output: String,
    /// Value of the last top-level expression statement.
    pub result: Option<serde_json::Value>,
    pub truncated: bool,
}

/// Run target source in a fresh namespace.
pub fn execute(target: &str, options: &ExecutionOptions) -> Result<ExecutionResult, ExecutionError> {
    sandbox::precheck(target)?;
    tracing::debug!(bytes = target.len(), "executing target source");

    let outcome = std::thread::scope(|s| {
        std::thread::Builder::new()
            .name("force-exec".into())
            .stack_size(WORKER_STACK_BYTES)
            .spawn_scoped(s, || run_worker(target, options))
            .map_err(|e| ExecutionError::Crashed(format!("failed to start worker: {e}")))?
            .join()
            .map_err(|panic| ExecutionError::Crashed(panic_message(panic.as_ref())))
    })?;
    let result = outcome?;
    tracing::debug!(
        output_bytes = result.output.len(),
        truncated = result.truncated,
        "execution finished"
    );
    Ok(result)
}

fn run_worker(target: &str, options: &ExecutionOptions) -> Result<ExecutionResult, ExecutionError> {
    let program = target::parse(target).map_err(|e| ExecutionError::Parse {
        line: e.line,
        message: e.message,
    })?;

    let files = match &options.file_root {
        Some(root) => FileAccess::confined_to(root),
        None => FileAccess::default(),
    };
    let ctx = CallContext::new(
        Output::new(options.max_output_bytes),
        files,
        options.random_seed,
    );
    let mut interp = Interpreter::new(ctx, options.max_call_depth, options.cancel.clone());
    let value = interp.run(&program);
    let (output, truncated) = interp.ctx.output.finish();

    match value {
        Ok(value) => Ok(ExecutionResult {
            output,
            result: value.map(|v| v.to_json().unwrap_or_else(|_| serde_json::Value::String(v.to_string()))),
            truncated,
        }),
        Err(error) => {
            tracing::debug!(kind = %error.kind, line = ?error.line, "program raised");
            Err(ExecutionError::Runtime { error, output })
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
