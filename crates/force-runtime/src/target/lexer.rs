//! Indentation-aware tokenizer for target source.

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub tok: Tok,
    pub line: usize,
}

const OPERATORS: &[&str] = &[
    "**=", "//=", "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "+", "-", "*",
    "/", "%", "<", ">", "=", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";",
];

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, SyntaxError> {
    Tokenizer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        depth: 0,
        indents: vec![0],
        out: Vec::new(),
    }
    .run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    /// Open bracket count; newlines inside brackets are not significant.
    depth: usize,
    indents: Vec<usize>,
    out: Vec<Spanned>,
}

impl Tokenizer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: message.into(),
        }
    }

    fn push(&mut self, tok: Tok) {
        self.out.push(Spanned {
            tok,
            line: self.line,
        });
    }

    fn run(mut self) -> Result<Vec<Spanned>, SyntaxError> {
        let mut at_line_start = true;
        while self.pos < self.chars.len() {
            if at_line_start && self.depth == 0 {
                if self.indentation()? {
                    continue;
                }
                at_line_start = false;
            }
            let Some(c) = self.peek() else { break };
            match c {
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        self.push(Tok::Newline);
                        at_line_start = true;
                    }
                    self.line += 1;
                }
                ' ' | '\t' | '\r' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                c if c == '_' || c.is_alphabetic() => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| c == '_' || c.is_alphanumeric()) {
                        self.pos += 1;
                    }
                    let name: String = self.chars[start..self.pos].iter().collect();
                    self.push(Tok::Name(name));
                }
                _ => self.operator()?,
            }
        }

        if !matches!(
            self.out.last().map(|s| &s.tok),
            None | Some(Tok::Newline) | Some(Tok::Dedent)
        ) {
            self.push(Tok::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(self.out)
    }

    /// Measure indentation at the start of a line. Returns `true` when the
    /// line is blank or a comment and was consumed entirely.
    fn indentation(&mut self) -> Result<bool, SyntaxError> {
        let mut width = 0;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => return Err(self.error("tabs are not allowed in indentation")),
                Some('\r') => {}
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek() {
            None => return Ok(true),
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.pos += 1;
                    self.line += 1;
                }
                return Ok(true);
            }
            _ => {}
        }

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(Tok::Indent);
        } else {
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(Tok::Dedent);
            }
            if width != self.indents.last().copied().unwrap_or(0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        Ok(false)
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn string(&mut self, quote: char) -> Result<(), SyntaxError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string literal"));
            };
            self.pos += 1;
            match c {
                '\n' => return Err(self.error("unterminated string literal")),
                c if c == quote => break,
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(self.error("unterminated string literal"));
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        '\n' => self.line += 1,
                        'x' => value.push(self.hex_escape(2)?),
                        'u' => value.push(self.hex_escape(4)?),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                c => value.push(c),
            }
        }
        self.push(Tok::Str(value));
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, SyntaxError> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(self.error("truncated escape sequence"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid escape sequence \\{hex}")))
    }

    fn number(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut is_float = false;
        let digits = |t: &mut Self| {
            while t.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                t.pos += 1;
            }
        };
        digits(self);
        if self.peek() == Some('.') && self.peek_at(1).is_none_or(|c| !c.is_alphabetic() && c != '_')
        {
            is_float = true;
            self.pos += 1;
            digits(self);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-')) as usize;
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                digits(self);
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        let tok = if is_float {
            Tok::Float(
                text.parse()
                    .map_err(|_| self.error(format!("invalid number '{text}'")))?,
            )
        } else {
            Tok::Int(
                text.parse()
                    .map_err(|_| self.error(format!("integer literal '{text}' is too large")))?,
            )
        };
        self.push(tok);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), SyntaxError> {
        let rest: String = self.chars[self.pos..self.chars.len().min(self.pos + 3)]
            .iter()
            .collect();
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            return Err(self.error(format!(
                "unexpected character '{}'",
                self.peek().unwrap_or_default()
            )));
        };
        self.pos += op.chars().count();
        match *op {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.push(Tok::Op(op));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|s| s.tok).collect()
    }

    #[test]
    fn test_indentation() {
        let t = toks("if x:\n    y = 1\nz\n");
        assert_eq!(
            t,
            vec![
                Tok::Name("if".into()),
                Tok::Name("x".into()),
                Tok::Op(":"),
                Tok::Newline,
                Tok::Indent,
                Tok::Name("y".into()),
                Tok::Op("="),
                Tok::Int(1),
                Tok::Newline,
                Tok::Dedent,
                Tok::Name("z".into()),
                Tok::Newline,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn test_dedent_at_eof() {
        let t = toks("def f():\n    return 1");
        assert_eq!(&t[t.len() - 3..], &[Tok::Newline, Tok::Dedent, Tok::Eof]);
    }

    #[test]
    fn test_brackets_join_lines() {
        let t = toks("x = [1,\n  2]\n");
        assert!(!t.contains(&Tok::Indent));
        assert_eq!(t.iter().filter(|t| **t == Tok::Newline).count(), 1);
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(toks("3.5")[0], Tok::Float(3.5));
        assert_eq!(toks("1e3")[0], Tok::Float(1000.0));
        assert_eq!(toks("1_000")[0], Tok::Int(1000));
        assert_eq!(toks("'a\\n\"b'")[0], Tok::Str("a\n\"b".into()));
        // `1.real` style attribute access is not a float.
        assert_eq!(toks("x.y")[1], Tok::Op("."));
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("if x:\n\ty").is_err());
        assert!(tokenize("x = 'open").is_err());
        assert!(tokenize("if x:\n    y\n  z\n").is_err());
        assert!(tokenize("x = 99999999999999999999").is_err());
        assert!(tokenize("x = $").is_err());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let t = toks("x = 1  # note\n\n   # indented comment\ny = 2\n");
        assert!(!t.contains(&Tok::Indent));
    }
}
