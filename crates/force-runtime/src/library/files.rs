//! File reading and writing, optionally confined to a directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::str_arg;
use crate::context::CallContext;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "holocron_archive",
        signature: "holocron_archive(path) -> str",
        summary: "Read a whole text file",
        category: "files",
        arity: Arity::Fixed(1),
        call: holocron_archive,
    },
    RuntimeFunction {
        name: "imperial_database",
        signature: "imperial_database(path, text) -> bool",
        summary: "Write (overwrite) a text file; returns True",
        category: "files",
        arity: Arity::Fixed(2),
        call: imperial_database,
    },
];

/// Where file built-ins may reach.
#[derive(Debug, Clone, Default)]
pub struct FileAccess {
    /// When set, paths must be relative and stay below this directory.
    root: Option<PathBuf>,
}

impl FileAccess {
    pub fn confined_to(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Map a program-supplied path to a host path.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, RuntimeError> {
        if path.is_empty() {
            return Err(RuntimeError::invalid("empty file path"));
        }
        let Some(root) = &self.root else {
            return Ok(PathBuf::from(path));
        };
        let requested = Path::new(path);
        for component in requested.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(denied(path, "parent directory references are not allowed"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(denied(path, "absolute paths are not allowed"));
                }
            }
        }
        Ok(root.join(requested))
    }
}

fn denied(path: &str, reason: &str) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::PermissionDenied,
        format!("access to '{path}' denied: {reason}"),
    )
}

fn io_error(path: &str, err: io::Error) -> RuntimeError {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => RuntimeErrorKind::FileNotFound,
        io::ErrorKind::PermissionDenied => RuntimeErrorKind::PermissionDenied,
        _ => RuntimeErrorKind::Io,
    };
    RuntimeError::new(kind, format!("{path}: {err}"))
}

fn holocron_archive(ctx: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = str_arg("holocron_archive", args, 0)?;
    let resolved = ctx.files.resolve(path)?;
    tracing::debug!(path = %resolved.display(), "reading file");
    std::fs::read_to_string(&resolved)
        .map(Value::str)
        .map_err(|e| io_error(path, e))
}

fn imperial_database(ctx: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = str_arg("imperial_database", args, 0)?;
    let text = str_arg("imperial_database", args, 1)?;
    let resolved = ctx.files.resolve(path)?;
    tracing::debug!(path = %resolved.display(), bytes = text.len(), "writing file");
    std::fs::write(&resolved, text)
        .map(|()| Value::Bool(true))
        .map_err(|e| io_error(path, e))
}
