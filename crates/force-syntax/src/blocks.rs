//! Brace-to-indentation restructuring.
//!
//! Every opening delimiter pushes a [`Frame`]. A `{` becomes a control block
//! only when it closes the header of a control statement; everything else is a
//! literal delimiter and leaves indentation alone. Newlines inside literal,
//! parenthesis and bracket frames are folded so a multi-line literal is emitted
//! as one expression.

use crate::error::TranslationError;
use crate::lexer::{self, Token, TokenKind};

/// Statement keywords whose `{` opens an indented block.
pub const CONTROL_HEADS: &[&str] = &[
    "if", "elif", "else", "while", "for", "def", "class", "try", "except", "finally",
];

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Control,
    Data,
    Paren,
    Bracket,
}

impl BlockKind {
    fn closer(self) -> &'static str {
        match self {
            Self::Control | Self::Data => "}",
            Self::Paren => ")",
            Self::Bracket => "]",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub kind: BlockKind,
    pub line: usize,
    pub column: usize,
    /// A control block that has emitted at least one statement.
    pub has_body: bool,
}

/// Convert brace blocks in `text` into indented blocks.
pub fn restructure_blocks(text: &str) -> Result<String, TranslationError> {
    let tokens = lexer::lex(text)?;
    BlockWriter::emit(&tokens)
}

/// Emits tokens as indentation-structured lines.
pub struct BlockWriter<'s> {
    output: String,
    indent: usize,
    line: String,
    stack: Vec<Frame>,
    /// First significant token of the current statement.
    head: Option<&'s str>,
    /// Previous significant token of the current statement.
    prev: Option<Token<'s>>,
    pending_space: bool,
}

impl<'s> BlockWriter<'s> {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
            line: String::new(),
            stack: Vec::new(),
            head: None,
            prev: None,
            pending_space: false,
        }
    }

    pub fn emit(tokens: &[Token<'s>]) -> Result<String, TranslationError> {
        let mut writer = Self::new();
        for (i, token) in tokens.iter().enumerate() {
            writer.write_token(tokens, i, *token)?;
        }
        writer.flush_line();
        if let Some(frame) = writer.stack.last() {
            return Err(TranslationError::structure(
                frame.line,
                frame.column,
                format!("`{}` is never closed", opener(frame.kind)),
            ));
        }
        Ok(writer.output)
    }

    fn in_expression(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|f| f.kind != BlockKind::Control)
    }

    fn write_token(
        &mut self,
        tokens: &[Token<'s>],
        index: usize,
        token: Token<'s>,
    ) -> Result<(), TranslationError> {
        match token.kind {
            TokenKind::LineComment | TokenKind::BlockComment => Ok(()),
            TokenKind::Space => {
                self.pending_space = true;
                Ok(())
            }
            TokenKind::Newline => {
                if self.in_expression() || self.header_continues(tokens, index) {
                    self.pending_space = true;
                } else {
                    self.flush_line();
                }
                Ok(())
            }
            TokenKind::Punct => self.write_punct(token),
            _ => {
                self.push_text(token);
                Ok(())
            }
        }
    }

    /// A control header followed by `{` on the next line.
    fn header_continues(&self, tokens: &[Token<'s>], index: usize) -> bool {
        self.head.is_some_and(|h| CONTROL_HEADS.contains(&h))
            && lexer::next_significant(tokens, index).is_some_and(|n| tokens[n].is_punct("{"))
    }

    fn write_punct(&mut self, token: Token<'s>) -> Result<(), TranslationError> {
        match token.text {
            ";" if !self.in_expression() => {
                self.flush_line();
                Ok(())
            }
            "{" if self.opens_control_block() => {
                self.line.push(':');
                self.flush_line();
                self.indent += 1;
                self.stack.push(Frame {
                    kind: BlockKind::Control,
                    line: token.line,
                    column: token.column,
                    has_body: false,
                });
                Ok(())
            }
            "{" | "(" | "[" => {
                let kind = match token.text {
                    "{" => BlockKind::Data,
                    "(" => BlockKind::Paren,
                    _ => BlockKind::Bracket,
                };
                self.push_text(token);
                self.stack.push(Frame {
                    kind,
                    line: token.line,
                    column: token.column,
                    has_body: false,
                });
                Ok(())
            }
            "}" | ")" | "]" => self.close(token),
            _ => {
                self.push_text(token);
                Ok(())
            }
        }
    }

    fn opens_control_block(&self) -> bool {
        if self.in_expression() {
            return false;
        }
        if !self.head.is_some_and(|h| CONTROL_HEADS.contains(&h)) {
            return false;
        }
        match self.prev {
            None => false,
            Some(prev) if prev.kind == TokenKind::Punct => matches!(prev.text, ")" | "]"),
            Some(prev) => prev.text != "return",
        }
    }

    fn close(&mut self, token: Token<'s>) -> Result<(), TranslationError> {
        let Some(&frame) = self.stack.last() else {
            return Err(TranslationError::structure(
                token.line,
                token.column,
                format!("unmatched `{}`", token.text),
            ));
        };
        if frame.kind.closer() != token.text {
            return Err(TranslationError::structure(
                token.line,
                token.column,
                format!(
                    "expected `{}` to close `{}` from line {}, found `{}`",
                    frame.kind.closer(),
                    opener(frame.kind),
                    frame.line,
                    token.text
                ),
            ));
        }
        if frame.kind == BlockKind::Control {
            // The last statement belongs to this block, so flush before popping.
            self.flush_line();
            let has_body = self.stack.pop().is_some_and(|f| f.has_body);
            if !has_body {
                self.write_line("pass");
            }
            self.indent -= 1;
        } else {
            self.stack.pop();
            self.pending_space = false;
            self.push_text(token);
        }
        Ok(())
    }

    fn push_text(&mut self, token: Token<'s>) {
        if self.pending_space && !self.line.is_empty() {
            let after_open = self.line.ends_with(['(', '[', '{']);
            let before_close = matches!(token.text, ")" | "]" | "}");
            if !after_open && !before_close {
                self.line.push(' ');
            }
        }
        self.pending_space = false;
        if self.head.is_none() {
            self.head = Some(token.text);
        }
        self.prev = Some(token);
        self.line.push_str(token.text);
    }

    fn flush_line(&mut self) {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.write_line(&line);
        }
        self.head = None;
        self.prev = None;
        self.pending_space = false;
    }

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(line);
        self.output.push('\n');
        if let Some(frame) = self.stack.last_mut() {
            if frame.kind == BlockKind::Control {
                frame.has_body = true;
            }
        }
    }
}

fn opener(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Control | BlockKind::Data => "{",
        BlockKind::Paren => "(",
        BlockKind::Bracket => "[",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restructure(text: &str) -> String {
        restructure_blocks(text).unwrap()
    }

    #[test]
    fn test_control_blocks_indent() {
        assert_eq!(
            restructure("if (x > 5) {\n    print(\"big\")\n} else {\n    print(\"small\")\n}\n"),
            "if (x > 5):\n    print(\"big\")\nelse:\n    print(\"small\")\n"
        );
    }

    #[test]
    fn test_nested_control() {
        assert_eq!(
            restructure("class Jedi {\ndef __init__(self, name) {\nself.name = name\n}\n}"),
            "class Jedi:\n    def __init__(self, name):\n        self.name = name\n"
        );
    }

    #[test]
    fn test_data_literal_inline() {
        assert_eq!(
            restructure("data = {\n  \"a\": 1,\n  \"b\": {\"c\": [1,\n 2]}\n}\nprint(data)"),
            "data = {\"a\": 1, \"b\": {\"c\": [1, 2]}}\nprint(data)\n"
        );
    }

    #[test]
    fn test_data_literal_inside_control() {
        assert_eq!(
            restructure("def f() {\nreturn {\"k\": 1}\n}"),
            "def f():\n    return {\"k\": 1}\n"
        );
    }

    #[test]
    fn test_empty_block_gets_pass() {
        assert_eq!(restructure("class Empty {}"), "class Empty:\n    pass\n");
        assert_eq!(
            restructure("while (x) {\n}\nprint(1)"),
            "while (x):\n    pass\nprint(1)\n"
        );
    }

    #[test]
    fn test_semicolons_and_one_line_blocks() {
        assert_eq!(
            restructure("i = 0; while (i < 3) { print(i) ; i += 1 }"),
            "i = 0\nwhile (i < 3):\n    print(i)\n    i += 1\n"
        );
    }

    #[test]
    fn test_one_line_block_has_no_pass() {
        assert_eq!(
            restructure("if (x) { print(\"a\") }\nprint(\"b\")"),
            "if (x):\n    print(\"a\")\nprint(\"b\")\n"
        );
        assert_eq!(
            restructure("def f() { if (x) { return 1 } }"),
            "def f():\n    if (x):\n        return 1\n"
        );
    }

    #[test]
    fn test_header_with_brace_on_next_line() {
        assert_eq!(
            restructure("if (x)\n{\nprint(x)\n}"),
            "if (x):\n    print(x)\n"
        );
    }

    #[test]
    fn test_space_collapse() {
        assert_eq!(restructure("x  =  f(  a,  b  )"), "x = f(a, b)\n");
    }

    #[test]
    fn test_unmatched_close() {
        let err = restructure_blocks("x = 1\n}").unwrap_err();
        assert_eq!(
            err,
            TranslationError::Structure {
                line: 2,
                column: 1,
                message: "unmatched `}`".into()
            }
        );
    }

    #[test]
    fn test_mismatched_close() {
        let err = restructure_blocks("x = f(a]").unwrap_err();
        assert_eq!(err.kind(), "StructureError");
    }

    #[test]
    fn test_unclosed_at_eof() {
        let err = restructure_blocks("if (x) {\nprint(1)\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_brace_balance_preserved() {
        let source = "def f() {\nd = {\"a\": {\"b\": 1}}\nif (d) {\nprint(d)\n}\n}";
        let out = restructure(source);
        let data_braces = |s: &str| s.matches('{').count() - s.matches('}').count();
        assert_eq!(data_braces(&out), 0);
        assert_eq!(out.matches('{').count(), 2);
    }
}
