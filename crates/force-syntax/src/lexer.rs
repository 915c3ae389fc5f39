//! Lossless tokenizer shared by every text stage.
//!
//! Concatenating the text of every token reproduces the input exactly, so a
//! stage can rewrite the tokens it cares about and pass the rest through.
//! String literals are single tokens, which keeps braces, comment markers and
//! keywords inside strings out of reach of the later stages.

use crate::error::TranslationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Punct,
    Space,
    Newline,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// 1-based line of the first character.
    pub line: usize,
    /// 1-based column of the first character.
    pub column: usize,
}

impl Token<'_> {
    /// Anything except whitespace, newlines and comments.
    pub fn is_significant(&self) -> bool {
        !matches!(
            self.kind,
            TokenKind::Space | TokenKind::Newline | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }
}

/// Operators longer than one character, longest first.
const MULTI_CHAR_PUNCT: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "++", "--", "**",
];

/// Split `text` into tokens.
pub fn lex(text: &str) -> Result<Vec<Token<'_>>, TranslationError> {
    let mut lexer = Lexer {
        text,
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    while lexer.pos < text.len() {
        tokens.push(lexer.next_token()?);
    }
    Ok(tokens)
}

/// Join token texts back into a string.
pub fn render(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect()
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, TranslationError> {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let rest = self.rest();

        let kind = match self.peek() {
            Some('\n') => {
                self.bump();
                TokenKind::Newline
            }
            Some(c) if c.is_whitespace() => {
                self.bump_while(|c| c != '\n' && c.is_whitespace());
                TokenKind::Space
            }
            _ if rest.starts_with("//") => {
                self.bump_while(|c| c != '\n');
                TokenKind::LineComment
            }
            _ if rest.starts_with("/*") => {
                match rest[2..].find("*/") {
                    Some(end) => {
                        let stop = self.pos + 2 + end + 2;
                        while self.pos < stop {
                            self.bump();
                        }
                    }
                    None => {
                        return Err(TranslationError::Lex {
                            line,
                            message: "unterminated block comment".into(),
                        });
                    }
                }
                TokenKind::BlockComment
            }
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                loop {
                    match self.bump() {
                        Some('\\') => {
                            if self.peek().is_some_and(|c| c != '\n') {
                                self.bump();
                            }
                        }
                        Some(c) if c == quote => break,
                        Some('\n') | None => {
                            return Err(TranslationError::Lex {
                                line,
                                message: "unterminated string literal".into(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                TokenKind::Str
            }
            Some(c) if c.is_ascii_digit() => {
                self.bump_while(|c| c.is_ascii_digit() || c == '_');
                let rest = self.rest();
                let mut chars = rest.chars();
                if chars.next() == Some('.') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                    self.bump_while(|c| c.is_ascii_digit() || c == '_');
                }
                let rest = self.rest();
                let mut chars = rest.chars();
                if matches!(chars.next(), Some('e' | 'E')) {
                    let next = chars.next();
                    let exponent_follows = match next {
                        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
                        Some(c) => c.is_ascii_digit(),
                        None => false,
                    };
                    if exponent_follows {
                        self.bump();
                        if matches!(self.peek(), Some('+' | '-')) {
                            self.bump();
                        }
                        self.bump_while(|c| c.is_ascii_digit());
                    }
                }
                TokenKind::Number
            }
            Some(c) if c == '_' || c.is_alphabetic() => {
                self.bump_while(|c| c == '_' || c.is_alphanumeric());
                TokenKind::Ident
            }
            Some(_) => {
                match MULTI_CHAR_PUNCT.iter().find(|op| rest.starts_with(**op)) {
                    Some(op) => {
                        for _ in 0..op.len() {
                            self.bump();
                        }
                    }
                    None => {
                        self.bump();
                    }
                }
                TokenKind::Punct
            }
            None => unreachable!("next_token called at end of input"),
        };

        Ok(Token {
            kind,
            text: &self.text[start..self.pos],
            line,
            column,
        })
    }
}

/// Index of the next significant token after `index`.
pub fn next_significant(tokens: &[Token<'_>], index: usize) -> Option<usize> {
    (index + 1..tokens.len()).find(|&i| tokens[i].is_significant())
}

/// Index of the previous significant token before `index`.
pub fn prev_significant(tokens: &[Token<'_>], index: usize) -> Option<usize> {
    (0..index).rev().find(|&i| tokens[i].is_significant())
}

/// Whether the token at `index` begins a statement: it is the first token of
/// its line or follows `;`, `{` or `}`.
pub fn at_statement_head(tokens: &[Token<'_>], index: usize) -> bool {
    let prev = (0..index)
        .rev()
        .find(|&i| !matches!(tokens[i].kind, TokenKind::Space | TokenKind::BlockComment));
    match prev {
        None => true,
        Some(i) => {
            let token = &tokens[i];
            matches!(token.kind, TokenKind::Newline | TokenKind::LineComment)
                || token.is_punct(";")
                || token.is_punct("{")
                || token.is_punct("}")
        }
    }
}

/// Identifiers that name the thing they follow rather than act as keywords.
const LABEL_INTRODUCERS: &[&str] = &["ability", "def", "order", "class"];

/// Whether the identifier at `index` is a label: an attribute name after `.`
/// or a function/class name after its declaration keyword.
pub fn is_label(tokens: &[Token<'_>], index: usize) -> bool {
    match prev_significant(tokens, index) {
        Some(i) => {
            let token = &tokens[i];
            token.is_punct(".")
                || (token.kind == TokenKind::Ident && LABEL_INTRODUCERS.contains(&token.text))
        }
        None => false,
    }
}

/// Find the delimiter closing the one at `open`, counting only the same pair.
pub fn find_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let opener = tokens[open].text;
    let closer = match opener {
        "{" => "}",
        "[" => "]",
        "(" => ")",
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        if token.text == opener {
            depth += 1;
        } else if token.text == closer {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split `tokens[start..end]` at `separator` tokens that sit outside any
/// bracket. Returns half-open index ranges; an all-whitespace range yields
/// nothing.
pub fn split_top_level(
    tokens: &[Token<'_>],
    start: usize,
    end: usize,
    separator: &str,
) -> Vec<(usize, usize)> {
    if !tokens[start..end].iter().any(Token::is_significant) {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut part_start = start;
    for i in start..end {
        let token = &tokens[i];
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            text if text == separator && depth == 0 => {
                parts.push((part_start, i));
                part_start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((part_start, end));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(TokenKind, &str)> {
        lex(text)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_lossless() {
        let source = "holocron x = datapad { a: \"//not a comment\" } // trailing\n/* block\n */ y";
        let tokens = lex(source).unwrap();
        assert_eq!(render(&tokens), source);
    }

    #[test]
    fn test_comment_marker_inside_string() {
        let tokens = kinds("respond \"a // b\"");
        assert_eq!(tokens.last(), Some(&(TokenKind::Str, "\"a // b\"")));
        assert!(!tokens.iter().any(|(k, _)| *k == TokenKind::LineComment));
    }

    #[test]
    fn test_multi_char_operators() {
        let tokens: Vec<_> = kinds("i++ && j != 2")
            .into_iter()
            .filter(|(k, _)| *k == TokenKind::Punct)
            .map(|(_, t)| t)
            .collect();
        assert_eq!(tokens, vec!["++", "&&", "!="]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("3.14")[0], (TokenKind::Number, "3.14"));
        assert_eq!(kinds("1e5")[0], (TokenKind::Number, "1e5"));
        // Method call on an integer literal keeps the dot separate.
        assert_eq!(kinds("1.x")[0], (TokenKind::Number, "1"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("x = \"open\ny").unwrap_err();
        assert_eq!(
            err,
            TranslationError::Lex {
                line: 1,
                message: "unterminated string literal".into()
            }
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = lex("a\n/* never closed").unwrap_err();
        assert!(matches!(err, TranslationError::Lex { line: 2, .. }));
    }

    #[test]
    fn test_positions() {
        let tokens = lex("a\n  bc").unwrap();
        let bc = tokens.iter().find(|t| t.text == "bc").unwrap();
        assert_eq!((bc.line, bc.column), (2, 3));
    }

    #[test]
    fn test_statement_head_and_labels() {
        let tokens = lex("x.sense\nability respond() { sense }").unwrap();
        let idx = |text: &str, nth: usize| {
            tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| t.text == text)
                .nth(nth)
                .map(|(i, _)| i)
                .unwrap()
        };
        assert!(is_label(&tokens, idx("sense", 0)));
        assert!(is_label(&tokens, idx("respond", 0)));
        assert!(at_statement_head(&tokens, idx("ability", 0)));
        assert!(at_statement_head(&tokens, idx("sense", 1)));
        assert!(!at_statement_head(&tokens, idx("respond", 0)));
    }

    #[test]
    fn test_split_top_level() {
        let tokens = lex("(a, f(b, c), [d, e])").unwrap();
        let close = find_close(&tokens, 0).unwrap();
        let parts = split_top_level(&tokens, 1, close, ",");
        let texts: Vec<String> = parts
            .iter()
            .map(|&(s, e)| render(&tokens[s..e]).trim().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "f(b, c)", "[d, e]"]);
    }
}
