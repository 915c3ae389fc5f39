//! Static pre-check run on raw source before any translation stage.
//!
//! The executed program only ever sees an allow-listed namespace, but source
//! that reaches for host capabilities is refused up front so it never gets as
//! far as the execution boundary.

use crate::error::{SecurityRejection, TranslationError};
use crate::lexer::{self, Token, TokenKind};

/// Names refused wherever they appear as identifiers.
pub const FORBIDDEN_ANYWHERE: &[&str] = &["transmission", "import"];

/// Names refused when called.
pub const FORBIDDEN_CALLS: &[&str] = &[
    "exec",
    "eval",
    "compile",
    "open",
    "file",
    "input",
    "sense_input",
    "globals",
    "locals",
    "vars",
    "getattr",
    "setattr",
    "delattr",
    "breakpoint",
    "exit",
    "quit",
    "help",
    "dir",
];

/// Limits applied before translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub max_source_bytes: usize,
    pub max_nesting_depth: usize,
    /// Additional identifiers refused anywhere in the source.
    pub forbidden: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_source_bytes: 10_000,
            max_nesting_depth: 15,
            forbidden: Vec::new(),
        }
    }
}

impl SecurityPolicy {
    fn forbids_anywhere(&self, name: &str) -> bool {
        name.starts_with("__")
            || FORBIDDEN_ANYWHERE.contains(&name)
            || self.forbidden.iter().any(|f| f == name)
    }
}

/// Refuse source that is too large, nests too deeply, or names a host
/// capability. Identifiers inside strings and comments are ignored.
pub fn check(source: &str, policy: &SecurityPolicy) -> Result<(), TranslationError> {
    if source.len() > policy.max_source_bytes {
        return Err(SecurityRejection::SourceTooLarge {
            size: source.len(),
            limit: policy.max_source_bytes,
        }
        .into());
    }

    let tokens = lexer::lex(source)?;
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Ident => check_identifier(&tokens, i, policy)?,
            TokenKind::Punct if token.text == "{" => {
                depth += 1;
                if depth > policy.max_nesting_depth {
                    return Err(SecurityRejection::NestingTooDeep {
                        depth,
                        limit: policy.max_nesting_depth,
                        line: token.line,
                    }
                    .into());
                }
            }
            TokenKind::Punct if token.text == "}" => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn check_identifier(
    tokens: &[Token<'_>],
    index: usize,
    policy: &SecurityPolicy,
) -> Result<(), TranslationError> {
    let token = &tokens[index];
    let forbidden = policy.forbids_anywhere(token.text)
        || (FORBIDDEN_CALLS.contains(&token.text)
            && !follows_dot(tokens, index)
            && lexer::next_significant(tokens, index).is_some_and(|n| tokens[n].is_punct("(")));
    if forbidden {
        tracing::debug!(token = token.text, line = token.line, "forbidden token");
        return Err(SecurityRejection::ForbiddenToken {
            token: token.text.to_string(),
            line: token.line,
        }
        .into());
    }
    Ok(())
}

fn follows_dot(tokens: &[Token<'_>], index: usize) -> bool {
    lexer::prev_significant(tokens, index).is_some_and(|p| tokens[p].is_punct("."))
}
