//! Comment removal and whitespace normalization.

use crate::error::TranslationError;
use crate::lexer::{self, TokenKind};

/// Strip comments, normalize line endings and trim trailing whitespace.
///
/// Line numbers survive: a block comment spanning several lines leaves its
/// newlines behind.
pub fn preprocess(text: &str) -> Result<String, TranslationError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let tokens = lexer::lex(&normalized)?;

    let mut stripped = String::with_capacity(normalized.len());
    for token in &tokens {
        match token.kind {
            TokenKind::LineComment => {}
            TokenKind::BlockComment => {
                stripped.extend(token.text.chars().filter(|&c| c == '\n'));
            }
            _ => stripped.push_str(token.text),
        }
    }

    let mut output = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        output.push_str(line.trim_end());
        output.push('\n');
    }
    Ok(output)
}
