//! Translation of Force source into indentation-based target source.
//!
//! Force is a brace-delimited scripting syntax with themed keywords
//! (`holocron`, `sense`, `ability`, `datapad`, ...). Translation runs a fixed
//! sequence of text stages, each working on a lossless token stream so string
//! literals are never touched by accident.
//!
//! # Architecture
//!
//! ```text
//! source ─> security ─> preprocess ─> constructs ─> keywords ─> blocks ─> target
//!           (policy)    (comments)    (datapad,     (sense →    ({ → :,
//!                                      train, ...)   if, ...)    indent)
//! ```
//!
//! Construct rewriting must run before keyword mapping: data-literal keys are
//! quoted there, so a key that looks like a keyword is never substituted, and
//! literal braces are no longer attached to a keyword the block restructurer
//! would read as a control header.
//!
//! # Example
//!
//! ```
//! let target = force_syntax::translate("holocron x = 5\nrespond x\n").unwrap();
//! assert_eq!(target, "x = 5\nprint(x)\n");
//! ```

pub mod blocks;
pub mod constructs;
pub mod error;
pub mod keywords;
pub mod lexer;
pub mod preprocess;
pub mod security;

pub use blocks::restructure_blocks;
pub use constructs::{CONSTRUCT_RULES, ConstructKind, ConstructRule, rewrite_constructs};
pub use error::{SecurityRejection, TranslationError};
pub use keywords::{KEYWORD_MAP, KeywordEntry, check_reserved, map_keywords};
pub use preprocess::preprocess;
pub use security::SecurityPolicy;

/// A translation pipeline bound to a security policy and rule tables.
///
/// The tables are process-wide statics; a translator only borrows them.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'p> {
    policy: &'p SecurityPolicy,
    constructs: &'static [ConstructRule],
    keywords: &'static [KeywordEntry],
}

impl<'p> Translator<'p> {
    pub fn new(policy: &'p SecurityPolicy) -> Self {
        Self {
            policy,
            constructs: CONSTRUCT_RULES,
            keywords: KEYWORD_MAP,
        }
    }

    /// Run every stage over `source`.
    pub fn translate(&self, source: &str) -> Result<String, TranslationError> {
        security::check(source, self.policy)?;

        let text = preprocess(source)?;
        tracing::debug!(bytes = text.len(), "preprocessed");

        check_reserved(&text)?;
        let text = constructs::rewrite_constructs_with(&text, self.constructs)?;
        tracing::debug!(bytes = text.len(), "constructs rewritten");

        let text = keywords::map_keywords_with(&text, self.keywords)?;
        tracing::debug!(bytes = text.len(), "keywords mapped");

        let text = restructure_blocks(&text)?;
        tracing::debug!(bytes = text.len(), lines = text.lines().count(), "blocks restructured");
        Ok(text)
    }
}

/// Translate with the default security policy.
pub fn translate(source: &str) -> Result<String, TranslationError> {
    translate_with(source, &SecurityPolicy::default())
}

/// Translate with an explicit security policy.
pub fn translate_with(source: &str, policy: &SecurityPolicy) -> Result<String, TranslationError> {
    Translator::new(policy).translate(source)
}
