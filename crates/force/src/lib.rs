//! Translate and run Force programs.
//!
//! This crate ties the two halves together: [`force_syntax`] turns Force
//! source into target source, and [`force_runtime`] executes it. The `force`
//! binary is a thin CLI over [`run`] and [`translate`].
//!
//! ```
//! use force::{ForceConfig, run};
//!
//! let result = run("holocron x = 5\nrespond x\n", &ForceConfig::default()).unwrap();
//! assert_eq!(result.output, "5\n");
//! ```

pub mod config;

pub use config::{ConfigError, ForceConfig};
pub use force_runtime::{
    CancelToken, ExecutionError, ExecutionOptions, ExecutionResult, RuntimeError,
    RuntimeErrorKind, builtin_names, execute, registry,
};
pub use force_syntax::{SecurityPolicy, SecurityRejection, TranslationError, translate, translate_with};

/// Why [`run`] failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RunError {
    /// Process exit code: 1 runtime error, 2 translation error, 3 security
    /// rejection, 4 configuration problem.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Translation(e) if e.is_security() => 3,
            Self::Translation(_) => 2,
            Self::Execution(ExecutionError::Rejected { .. }) => 3,
            Self::Execution(ExecutionError::Parse { .. }) => 2,
            Self::Execution(_) => 1,
            Self::Config(_) => 4,
        }
    }

    /// Stable short name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Translation(e) => e.kind(),
            Self::Execution(e) => e.kind(),
            Self::Config(_) => "Config",
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Translation(e) => e.line(),
            Self::Execution(e) => e.line(),
            Self::Config(_) => None,
        }
    }
}

/// Translate Force source under the configured policy.
pub fn translate_configured(source: &str, config: &ForceConfig) -> Result<String, TranslationError> {
    translate_with(source, &config.security_policy())
}

/// Translate and execute Force source.
pub fn run(source: &str, config: &ForceConfig) -> Result<ExecutionResult, RunError> {
    run_with_cancel(source, config, None)
}

/// [`run`] with a token that stops the program when cancelled.
pub fn run_with_cancel(
    source: &str,
    config: &ForceConfig,
    cancel: Option<CancelToken>,
) -> Result<ExecutionResult, RunError> {
    let target = translate_configured(source, config)?;
    let options = ExecutionOptions {
        cancel,
        ..config.execution_options()
    };
    Ok(execute(&target, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = ForceConfig::default();
        let code = |source: &str| run(source, &config).unwrap_err().exit_code();
        assert_eq!(code("respond 1 / 0\n"), 1);
        assert_eq!(code("respond \"open\n"), 2);
        assert_eq!(code("holocron x = eval(\"1\")\n"), 3);
    }

    #[test]
    fn test_configured_policy_applies() {
        let mut config = ForceConfig::default();
        config.security.forbidden.push("sith".into());
        let err = run("holocron sith = 1\n", &config).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
