//! The indentation-based target language: tokenizer, syntax tree and parser.

pub mod ir;
pub mod lexer;
pub mod parser;

pub use parser::parse;

/// Malformed target source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}
