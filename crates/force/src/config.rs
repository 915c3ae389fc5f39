//! Configuration for force.
//!
//! Loads config from:
//! 1. Global: ~/.config/force/config.toml
//! 2. Per-project: .force/config.toml (overrides global)
//!
//! Example config.toml:
//! ```toml
//! [security]
//! max_source_bytes = 20000
//! forbidden = ["sith"]
//!
//! [execution]
//! max_output_bytes = 10000
//! timeout_secs = 5
//! file_root = "data"
//! ```

use std::path::{Path, PathBuf};

use force_runtime::ExecutionOptions;
use force_syntax::SecurityPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Limits applied before translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityConfig {
    pub max_source_bytes: usize,
    pub max_nesting_depth: usize,
    /// Identifiers refused in addition to the built-in list.
    pub forbidden: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let policy = SecurityPolicy::default();
        Self {
            max_source_bytes: policy.max_source_bytes,
            max_nesting_depth: policy.max_nesting_depth,
            forbidden: policy.forbidden,
        }
    }
}

/// Limits applied while a program runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionConfig {
    pub max_output_bytes: usize,
    pub max_call_depth: usize,
    /// Wall-clock limit; unlimited when unset.
    pub timeout_secs: Option<u64>,
    /// Directory the file built-ins are confined to.
    pub file_root: Option<PathBuf>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let options = ExecutionOptions::default();
        Self {
            max_output_bytes: options.max_output_bytes,
            max_call_depth: options.max_call_depth,
            timeout_secs: None,
            file_root: None,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForceConfig {
    pub security: SecurityConfig,
    pub execution: ExecutionConfig,
}

// On-disk shape. Every field is optional so a file only overrides what it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    security: SecurityFile,
    execution: ExecutionFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SecurityFile {
    max_source_bytes: Option<usize>,
    max_nesting_depth: Option<usize>,
    forbidden: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ExecutionFile {
    max_output_bytes: Option<usize>,
    max_call_depth: Option<usize>,
    timeout_secs: Option<u64>,
    file_root: Option<PathBuf>,
}

impl ForceConfig {
    /// Load configuration for a project.
    ///
    /// Loads global config from ~/.config/force/config.toml, then merges
    /// per-project config from .force/config.toml. Missing files are skipped.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::load_file(&global_path)? {
                config.merge(global, global_path.parent().unwrap_or(Path::new(".")));
            }
        }

        let project_dir = root.join(".force");
        if let Some(project) = Self::load_file(&project_dir.join("config.toml"))? {
            // Project-relative paths resolve against the project root.
            config.merge(project, root);
        }

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("force").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Fields set in `file` override this config.
    fn merge(&mut self, file: ConfigFile, base: &Path) {
        let ConfigFile {
            security,
            execution,
        } = file;
        if let Some(v) = security.max_source_bytes {
            self.security.max_source_bytes = v;
        }
        if let Some(v) = security.max_nesting_depth {
            self.security.max_nesting_depth = v;
        }
        if let Some(v) = security.forbidden {
            self.security.forbidden = v;
        }
        if let Some(v) = execution.max_output_bytes {
            self.execution.max_output_bytes = v;
        }
        if let Some(v) = execution.max_call_depth {
            self.execution.max_call_depth = v;
        }
        if let Some(v) = execution.timeout_secs {
            self.execution.timeout_secs = Some(v);
        }
        if let Some(v) = execution.file_root {
            self.execution.file_root = Some(base.join(v));
        }
    }

    pub fn security_policy(&self) -> SecurityPolicy {
        SecurityPolicy {
            max_source_bytes: self.security.max_source_bytes,
            max_nesting_depth: self.security.max_nesting_depth,
            forbidden: self.security.forbidden.clone(),
        }
    }

    /// Execution options without a cancel token.
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            max_output_bytes: self.execution.max_output_bytes,
            max_call_depth: self.execution.max_call_depth,
            file_root: self.execution.file_root.clone(),
            ..ExecutionOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_project_config(dir: &TempDir, content: &str) {
        let force_dir = dir.path().join(".force");
        std::fs::create_dir_all(&force_dir).unwrap();
        let mut file = std::fs::File::create(force_dir.join("config.toml")).unwrap();
        writeln!(file, "{content}").unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = ForceConfig::default();
        assert_eq!(config.security.max_source_bytes, 10_000);
        assert_eq!(config.security.max_nesting_depth, 15);
        assert_eq!(config.execution.max_output_bytes, 5000);
        assert_eq!(config.execution.max_call_depth, 200);
        assert_eq!(config.execution.timeout_secs, None);
    }

    #[test]
    fn test_partial_project_config() {
        let dir = TempDir::new().unwrap();
        write_project_config(
            &dir,
            r#"
[execution]
timeout_secs = 3
file_root = "data"
"#,
        );
        let config = ForceConfig::load(dir.path()).unwrap();
        assert_eq!(config.execution.timeout_secs, Some(3));
        assert_eq!(config.execution.file_root, Some(dir.path().join("data")));
        // Unset fields keep their defaults.
        assert_eq!(config.execution.max_output_bytes, 5000);
        assert_eq!(config.security.max_nesting_depth, 15);
    }

    #[test]
    fn test_security_overrides() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "[security]\nmax_source_bytes = 50\nforbidden = [\"sith\"]");
        let config = ForceConfig::load(dir.path()).unwrap();
        let policy = config.security_policy();
        assert_eq!(policy.max_source_bytes, 50);
        assert_eq!(policy.forbidden, vec!["sith".to_string()]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_project_config(&dir, "[execution]\nmax_ouput_bytes = 1");
        let err = ForceConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
