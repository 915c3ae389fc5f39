//! Whole-token substitution of themed keywords.

use std::collections::HashSet;

use crate::error::TranslationError;
use crate::lexer::{self, Token, TokenKind};

/// Where a keyword may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Variable or constant declaration marker, dropped from the output.
    Declaration,
    /// First token of a statement.
    StatementHead,
    /// Anywhere an expression may appear.
    Anywhere,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordEntry {
    /// Token sequence, whitespace between tokens ignored.
    pub themed: &'static [&'static str],
    pub target: &'static str,
    pub placement: Placement,
}

const fn entry(
    themed: &'static [&'static str],
    target: &'static str,
    placement: Placement,
) -> KeywordEntry {
    KeywordEntry {
        themed,
        target,
        placement,
    }
}

/// Keyword table. Multi-token entries come first.
pub static KEYWORD_MAP: &[KeywordEntry] = &[
    entry(&["else", "sense"], "elif", Placement::StatementHead),
    entry(&["holocron"], "", Placement::Declaration),
    entry(&["kyber"], "", Placement::Declaration),
    entry(&["sense"], "if", Placement::StatementHead),
    entry(&["meditate"], "while", Placement::StatementHead),
    entry(&["ability"], "def", Placement::StatementHead),
    entry(&["order"], "class", Placement::StatementHead),
    entry(&["try_use_force"], "try", Placement::StatementHead),
    entry(&["catch_disturbance"], "except", Placement::StatementHead),
    entry(&["finally_balance"], "finally", Placement::StatementHead),
    entry(&["true"], "True", Placement::Anywhere),
    entry(&["false"], "False", Placement::Anywhere),
    entry(&["null"], "None", Placement::Anywhere),
    entry(&["&&"], "and", Placement::Anywhere),
    entry(&["||"], "or", Placement::Anywhere),
    entry(&["!"], "not", Placement::Anywhere),
];

/// Themed words that only make sense as constructs. Reaching the keyword
/// mapper means the construct rewriter did not recognize them.
const CONSTRUCT_WORDS: &[&str] = &["respond", "initiate"];

/// Words of the target language that may not be used as identifiers.
pub const RESERVED_TARGET_WORDS: &[&str] = &[
    "def", "class", "if", "elif", "while", "for", "try", "except", "finally", "lambda", "pass",
    "global", "yield", "del", "raise", "with", "as", "is", "async", "await", "nonlocal", "assert",
    "and", "or", "not", "in", "from", "True", "False", "None",
];

/// Statement words shared by both languages. They are reserved only where a
/// name is bound.
pub const RESERVED_STATEMENT_WORDS: &[&str] = &["return", "break", "continue"];

const BINDING_HEADS: &[&str] = &["holocron", "kyber", "ability", "order"];

const ASSIGNMENT_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "++", "--"];

/// Reject source that uses a reserved word of the target as an identifier.
/// Bare keys of literals are exempt.
pub fn check_reserved(text: &str) -> Result<(), TranslationError> {
    let tokens = lexer::lex(text)?;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Ident {
            continue;
        }
        let reserved = if RESERVED_TARGET_WORDS.contains(&token.text) {
            !is_literal_key(&tokens, i)
        } else {
            RESERVED_STATEMENT_WORDS.contains(&token.text) && is_binding(&tokens, i)
        };
        if !reserved {
            continue;
        }
        return Err(TranslationError::construct(
            token,
            format!("`{}` is reserved and cannot be used as a name", token.text),
        ));
    }
    Ok(())
}

fn is_binding(tokens: &[Token<'_>], index: usize) -> bool {
    let declared = lexer::prev_significant(tokens, index)
        .is_some_and(|p| BINDING_HEADS.contains(&tokens[p].text));
    let assigned = lexer::next_significant(tokens, index)
        .is_some_and(|n| tokens[n].kind == TokenKind::Punct && ASSIGNMENT_OPS.contains(&tokens[n].text));
    declared || assigned
}

fn is_literal_key(tokens: &[Token<'_>], index: usize) -> bool {
    let before = lexer::prev_significant(tokens, index)
        .is_some_and(|p| tokens[p].is_punct("{") || tokens[p].is_punct(","));
    let after = lexer::next_significant(tokens, index).is_some_and(|n| tokens[n].is_punct(":"));
    before && after
}

/// Replace themed keywords in `text` using [`KEYWORD_MAP`].
pub fn map_keywords(text: &str) -> Result<String, TranslationError> {
    map_keywords_with(text, KEYWORD_MAP)
}

/// Replace themed keywords using an explicit table.
pub fn map_keywords_with(
    text: &str,
    table: &'static [KeywordEntry],
) -> Result<String, TranslationError> {
    let tokens = lexer::lex(text)?;
    let mut mapper = Mapper {
        tokens: &tokens,
        constants: HashSet::new(),
    };
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let significant = matches!(token.kind, TokenKind::Ident | TokenKind::Punct);
        if !significant || (token.kind == TokenKind::Ident && lexer::is_label(&tokens, i)) {
            out.push_str(token.text);
            i += 1;
            continue;
        }

        if let Some((entry, last)) = mapper.match_entry(table, i) {
            i = mapper.apply(entry, i, last, &mut out)?;
            continue;
        }

        if token.kind == TokenKind::Ident {
            if CONSTRUCT_WORDS.contains(&token.text) {
                return Err(TranslationError::construct(
                    token,
                    format!("`{}` must start a statement", token.text),
                ));
            }
            mapper.check_constant_assignment(i)?;
        }
        out.push_str(token.text);
        i += 1;
    }
    Ok(out)
}

struct Mapper<'s, 't> {
    tokens: &'t [Token<'s>],
    /// Names declared with `kyber`.
    constants: HashSet<&'s str>,
}

impl<'s> Mapper<'s, '_> {
    /// First table entry whose token sequence starts at `index`, together with
    /// the index of its last token.
    fn match_entry(
        &self,
        table: &'static [KeywordEntry],
        index: usize,
    ) -> Option<(&'static KeywordEntry, usize)> {
        let token = &self.tokens[index];
        'entries: for entry in table {
            let Some((first, rest)) = entry.themed.split_first() else {
                continue;
            };
            if token.text != *first {
                continue;
            }
            let mut last = index;
            for word in rest {
                match lexer::next_significant(self.tokens, last) {
                    Some(n) if self.tokens[n].text == *word => last = n,
                    _ => continue 'entries,
                }
            }
            return Some((entry, last));
        }
        None
    }

    fn apply(
        &mut self,
        entry: &KeywordEntry,
        index: usize,
        last: usize,
        out: &mut String,
    ) -> Result<usize, TranslationError> {
        let tokens = self.tokens;
        let token = &tokens[index];
        match entry.placement {
            Placement::Declaration => self.declaration(index),
            Placement::StatementHead => {
                if !lexer::at_statement_head(tokens, index) {
                    return Err(TranslationError::construct(
                        token,
                        format!("`{}` can only start a statement", token.text),
                    ));
                }
                out.push_str(entry.target);
                Ok(last + 1)
            }
            Placement::Anywhere => {
                if token.kind == TokenKind::Punct {
                    out.push(' ');
                    out.push_str(entry.target);
                    out.push(' ');
                } else {
                    out.push_str(entry.target);
                }
                Ok(last + 1)
            }
        }
    }

    /// Drop a declaration keyword and the whitespace after it.
    fn declaration(&mut self, index: usize) -> Result<usize, TranslationError> {
        let tokens = self.tokens;
        let token = &tokens[index];
        if !lexer::at_statement_head(tokens, index) {
            return Err(TranslationError::construct(
                token,
                format!("`{}` can only start a statement", token.text),
            ));
        }
        let name = lexer::next_significant(tokens, index)
            .map(|n| &tokens[n])
            .filter(|t| t.kind == TokenKind::Ident)
            .ok_or_else(|| {
                TranslationError::construct(token, format!("`{}` must name a variable", token.text))
            })?;
        if self.constants.contains(name.text) {
            return Err(TranslationError::construct(
                name,
                format!("constant `{}` cannot be redeclared", name.text),
            ));
        }
        if token.text == "kyber" {
            self.constants.insert(name.text);
        }
        let mut next = index + 1;
        while next < tokens.len() && tokens[next].kind == TokenKind::Space {
            next += 1;
        }
        Ok(next)
    }

    fn check_constant_assignment(&self, index: usize) -> Result<(), TranslationError> {
        let token = &self.tokens[index];
        if !self.constants.contains(token.text) || !lexer::at_statement_head(self.tokens, index) {
            return Ok(());
        }
        let assigns = lexer::next_significant(self.tokens, index).is_some_and(|n| {
            let next = &self.tokens[n];
            next.kind == TokenKind::Punct && ASSIGNMENT_OPS.contains(&next.text)
        });
        if assigns {
            return Err(TranslationError::construct(
                token,
                format!("constant `{}` cannot be reassigned", token.text),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(text: &str) -> String {
        map_keywords(text).unwrap()
    }

    #[test]
    fn test_declarations_removed() {
        assert_eq!(map("holocron x = 5\nkyber PI = 3.14"), "x = 5\nPI = 3.14");
    }

    #[test]
    fn test_control_keywords() {
        assert_eq!(
            map("sense (x > 5) {\n} else sense (x > 2) {\n} else {\n}"),
            "if (x > 5) {\n} elif (x > 2) {\n} else {\n}"
        );
        assert_eq!(map("meditate (x < 10) {"), "while (x < 10) {");
        assert_eq!(map("ability greet(name) {"), "def greet(name) {");
        assert_eq!(map("order Jedi {"), "class Jedi {");
        assert_eq!(
            map("try_use_force {\n} catch_disturbance {\n} finally_balance {\n}"),
            "try {\n} except {\n} finally {\n}"
        );
    }

    #[test]
    fn test_literals_and_operators() {
        assert_eq!(
            map("x = true && !done || null"),
            "x = True  and   not done  or  None"
        );
        assert_eq!(map("x != y"), "x != y");
    }

    #[test]
    fn test_boundary_safe() {
        assert_eq!(
            map("holocron sensei = holocrons + ordered"),
            "sensei = holocrons + ordered"
        );
    }

    #[test]
    fn test_labels_untouched() {
        assert_eq!(map("x.sense(y)"), "x.sense(y)");
        assert_eq!(map("ability order() {"), "def order() {");
    }

    #[test]
    fn test_misplaced_keyword_rejected() {
        let err = map_keywords("x = sense").unwrap_err();
        assert_eq!(err.kind(), "ConstructError");
        assert!(map_keywords("y = 1 + holocron").is_err());
        assert!(map_keywords("f(respond)").is_err());
    }

    #[test]
    fn test_constant_reassignment() {
        let err = map_keywords("kyber PI = 3.14\nPI = 3").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(map_keywords("kyber PI = 3.14\nholocron PI = 3").is_err());
        assert!(map_keywords("kyber N = 1\nN += 1").is_err());
        map_keywords("kyber N = 1\nholocron m = N + 1\nsense (N == 1) {}").unwrap();
    }

    #[test]
    fn test_reserved_words() {
        let err = check_reserved("holocron class = 1").unwrap_err();
        assert_eq!(err.kind(), "ConstructError");
        assert!(check_reserved("lambda x").is_err());
        check_reserved("x = datapad {class: 1, \"for\": 2}").unwrap();
        check_reserved("holocron classic = 1").unwrap();
    }

    #[test]
    fn test_target_operator_words_reserved() {
        for source in ["holocron and = 1", "holocron from = 1", "None = 2", "respond not", "x = a in b"] {
            let err = check_reserved(source).unwrap_err();
            assert_eq!(err.kind(), "ConstructError", "{source}");
        }
        check_reserved("holocron ok = true && !false || null").unwrap();
        check_reserved("holocron d = datapad {from: 1, in: 2}").unwrap();
    }

    #[test]
    fn test_statement_words_reserved_as_names() {
        for source in ["holocron return = 1", "break = 2", "ability continue() {}", "kyber break = 3"] {
            assert!(check_reserved(source).is_err(), "{source}");
        }
        check_reserved("meditate (true) {\n    break\n}").unwrap();
        check_reserved("ability f() {\n    return 1\n}").unwrap();
        check_reserved("continue").unwrap();
    }
}
