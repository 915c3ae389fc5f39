//! Runtime and execution errors.

use std::fmt;

/// Class of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum RuntimeErrorKind {
    ArgumentCount,
    ArgumentType,
    InvalidArgument,
    DivisionByZero,
    MissingKey,
    IndexOutOfRange,
    FileNotFound,
    PermissionDenied,
    Io,
    UndefinedName,
    MissingAttribute,
    Overflow,
    RecursionLimit,
    Cancelled,
}

impl RuntimeErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ArgumentCount => "ArgumentCount",
            Self::ArgumentType => "ArgumentType",
            Self::InvalidArgument => "InvalidArgument",
            Self::DivisionByZero => "DivisionByZero",
            Self::MissingKey => "MissingKey",
            Self::IndexOutOfRange => "IndexOutOfRange",
            Self::FileNotFound => "FileNotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::Io => "Io",
            Self::UndefinedName => "UndefinedName",
            Self::MissingAttribute => "MissingAttribute",
            Self::Overflow => "Overflow",
            Self::RecursionLimit => "RecursionLimit",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether an `except` clause in the program may intercept this kind.
    pub fn is_catchable(self) -> bool {
        !matches!(self, Self::RecursionLimit | Self::Cancelled)
    }

    /// Whether an `except <name>` clause intercepts this kind.
    pub fn matches_handler(self, name: &str) -> bool {
        if !self.is_catchable() {
            return false;
        }
        match name {
            "Exception" | "BaseException" => true,
            "TypeError" => matches!(self, Self::ArgumentCount | Self::ArgumentType),
            "ValueError" => self == Self::InvalidArgument,
            "ZeroDivisionError" | "ArithmeticError" => {
                matches!(self, Self::DivisionByZero | Self::Overflow)
            }
            "OverflowError" => self == Self::Overflow,
            "KeyError" => self == Self::MissingKey,
            "IndexError" => self == Self::IndexOutOfRange,
            "LookupError" => matches!(self, Self::MissingKey | Self::IndexOutOfRange),
            "FileNotFoundError" => self == Self::FileNotFound,
            "PermissionError" => self == Self::PermissionDenied,
            "OSError" | "IOError" => {
                matches!(self, Self::Io | Self::FileNotFound | Self::PermissionDenied)
            }
            "NameError" => self == Self::UndefinedName,
            "AttributeError" => self == Self::MissingAttribute,
            _ => false,
        }
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure raised while a translated program runs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[error("{kind}: {message}{}", .line.map(|l| format!(" (line {l})")).unwrap_or_default())]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    /// Target source line of the statement that failed.
    pub line: Option<usize>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    /// Attach a line unless one is already recorded.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }

    pub fn argument_count(name: &str, expected: impl fmt::Display, got: usize) -> Self {
        Self::new(
            RuntimeErrorKind::ArgumentCount,
            format!("{name}() takes {expected} arguments ({got} given)"),
        )
    }

    pub fn argument_type(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::ArgumentType, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::InvalidArgument, message)
    }

    pub fn division_by_zero() -> Self {
        Self::new(RuntimeErrorKind::DivisionByZero, "division by zero")
    }

    pub fn overflow() -> Self {
        Self::new(RuntimeErrorKind::Overflow, "integer overflow")
    }

    pub fn undefined(name: &str) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedName,
            format!("name '{name}' is not defined"),
        )
    }

    pub fn missing_attribute(type_name: &str, attr: &str) -> Self {
        Self::new(
            RuntimeErrorKind::MissingAttribute,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }
}

/// Why [`execute`](crate::execute) did not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// The static pre-check refused the program before it ran.
    #[error("rejected: {reason}")]
    Rejected { reason: String, line: Option<usize> },

    /// The target source is not valid.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The program raised an error that it did not handle.
    #[error("{error}")]
    Runtime {
        error: RuntimeError,
        /// Output printed before the failure.
        output: String,
    },

    /// The worker running the program failed unexpectedly.
    #[error("execution crashed: {0}")]
    Crashed(String),
}

impl ExecutionError {
    /// Stable short name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "Rejected",
            Self::Parse { .. } => "ParseError",
            Self::Runtime { error, .. } => error.kind.name(),
            Self::Crashed(_) => "Crashed",
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Rejected { line, .. } => *line,
            Self::Parse { line, .. } => Some(*line),
            Self::Runtime { error, .. } => error.line,
            Self::Crashed(_) => None,
        }
    }

    /// Output printed before the failure, if any.
    pub fn output(&self) -> &str {
        match self {
            Self::Runtime { output, .. } => output,
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_line() {
        let err = RuntimeError::division_by_zero().at_line(3);
        assert_eq!(err.to_string(), "DivisionByZero: division by zero (line 3)");
        // The innermost line wins.
        assert_eq!(err.at_line(9).line, Some(3));
    }

    #[test]
    fn test_handler_matching() {
        assert!(RuntimeErrorKind::MissingKey.matches_handler("KeyError"));
        assert!(RuntimeErrorKind::MissingKey.matches_handler("Exception"));
        assert!(!RuntimeErrorKind::MissingKey.matches_handler("IndexError"));
        assert!(!RuntimeErrorKind::RecursionLimit.matches_handler("Exception"));
        assert!(!RuntimeErrorKind::Cancelled.matches_handler("BaseException"));
    }
}
