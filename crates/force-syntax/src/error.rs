//! Errors produced while translating Force source.

use crate::lexer::Token;

/// Error that can occur when translating Force source into target source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// Unterminated comment or string literal.
    #[error("lex error on line {line}: {message}")]
    Lex { line: usize, message: String },

    /// A recognized construct is malformed or a keyword is misused.
    #[error("construct error at {line}:{column}: {message}")]
    Construct {
        line: usize,
        column: usize,
        message: String,
    },

    /// Delimiters do not balance.
    #[error("structure error at {line}:{column}: {message}")]
    Structure {
        line: usize,
        column: usize,
        message: String,
    },

    /// The source was refused by the security policy before translation.
    #[error("rejected by security policy: {0}")]
    Security(#[from] SecurityRejection),
}

impl TranslationError {
    pub(crate) fn construct(token: &Token<'_>, message: impl Into<String>) -> Self {
        Self::Construct {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    pub(crate) fn structure(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Structure {
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether this is a policy rejection rather than a syntax problem.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Best-available source line for the error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lex { line, .. } | Self::Construct { line, .. } | Self::Structure { line, .. } => {
                Some(*line)
            }
            Self::Security(rejection) => rejection.line(),
        }
    }

    /// Stable short name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "LexError",
            Self::Construct { .. } => "ConstructError",
            Self::Structure { .. } => "StructureError",
            Self::Security(_) => "SecurityRejection",
        }
    }
}

/// Why the security policy refused a source program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityRejection {
    #[error("forbidden token `{token}` on line {line}")]
    ForbiddenToken { token: String, line: usize },

    #[error("source is {size} bytes, limit is {limit}")]
    SourceTooLarge { size: usize, limit: usize },

    #[error("nesting depth {depth} on line {line} exceeds limit {limit}")]
    NestingTooDeep {
        depth: usize,
        limit: usize,
        line: usize,
    },
}

impl SecurityRejection {
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::ForbiddenToken { line, .. } | Self::NestingTooDeep { line, .. } => Some(*line),
            Self::SourceTooLarge { .. } => None,
        }
    }
}
