//! Recursive-descent parser producing the target syntax tree.

use std::rc::Rc;

use super::SyntaxError;
use super::ir::*;
use super::lexer::{Spanned, Tok, tokenize};

const KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "def", "class", "return", "break", "continue", "pass",
    "try", "except", "finally", "and", "or", "not", "in", "is", "True", "False", "None", "import",
    "from", "lambda", "global", "nonlocal", "del", "yield", "raise", "with", "as", "assert",
    "async", "await",
];

/// Deepest nesting of expressions and blocks the parser accepts.
const MAX_NESTING: usize = 100;

/// Parse target source into a [`Program`].
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        loop_depth: 0,
        function_depth: 0,
        nesting: 0,
    };
    let mut body = Vec::new();
    while !parser.at(&Tok::Eof) {
        parser.statement(&mut body)?;
    }
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    loop_depth: usize,
    function_depth: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, tok: &Tok) -> bool {
        self.peek() == tok
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if *o == op)
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == word)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        let found = match self.peek() {
            Tok::Name(n) => format!("'{n}'"),
            Tok::Int(i) => i.to_string(),
            Tok::Float(f) => f.to_string(),
            Tok::Str(_) => "string".to_string(),
            Tok::Op(o) => format!("'{o}'"),
            Tok::Newline => "end of line".to_string(),
            Tok::Indent => "indent".to_string(),
            Tok::Dedent => "dedent".to_string(),
            Tok::Eof => "end of input".to_string(),
        };
        self.error(format!("expected {wanted}, found {found}"))
    }

    fn expect_op(&mut self, op: &str) -> Result<(), SyntaxError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{op}'")))
        }
    }

    fn expect_name(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Tok::Name(n) if !KEYWORDS.contains(&n.as_str()) => {
                let n = n.clone();
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn expect_newline(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::Eof | Tok::Dedent => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), SyntaxError> {
        let line = self.line();
        let keyword = match self.peek() {
            Tok::Name(n) => n.clone(),
            Tok::Indent => return Err(self.error("unexpected indent")),
            _ => String::new(),
        };
        let kind = match keyword.as_str() {
            "if" => self.if_statement()?,
            "while" => self.while_statement()?,
            "for" => self.for_statement()?,
            "def" => self.function_def()?,
            "class" => self.class_def()?,
            "try" => self.try_statement()?,
            _ => return self.simple_statements(out),
        };
        out.push(Stmt::new(line, kind));
        Ok(())
    }

    fn simple_statements(&mut self, out: &mut Vec<Stmt>) -> Result<(), SyntaxError> {
        loop {
            let line = self.line();
            let kind = self.simple_statement()?;
            out.push(Stmt::new(line, kind));
            if !self.eat_op(";") {
                break;
            }
            if matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
        }
        self.expect_newline()
    }

    fn simple_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        if let Tok::Name(word) = self.peek().clone() {
            match word.as_str() {
                "pass" => {
                    self.advance();
                    return Ok(StmtKind::Pass);
                }
                "break" | "continue" => {
                    if self.loop_depth == 0 {
                        return Err(self.error(format!("'{word}' outside loop")));
                    }
                    let is_break = word == "break";
                    self.advance();
                    return Ok(if is_break {
                        StmtKind::Break
                    } else {
                        StmtKind::Continue
                    });
                }
                "return" => {
                    if self.function_depth == 0 {
                        return Err(self.error("'return' outside function"));
                    }
                    self.advance();
                    if matches!(self.peek(), Tok::Newline | Tok::Eof | Tok::Dedent)
                        || self.at_op(";")
                    {
                        return Ok(StmtKind::Return(None));
                    }
                    return Ok(StmtKind::Return(Some(self.expression_list()?)));
                }
                "import" | "from" | "global" | "nonlocal" | "del" | "yield" | "raise"
                | "with" | "assert" | "lambda" | "async" | "await" => {
                    return Err(self.error(format!("'{word}' is not supported")));
                }
                "elif" | "else" | "except" | "finally" => {
                    return Err(self.error(format!("'{word}' without a matching block")));
                }
                _ => {}
            }
        }

        let expr = self.expression_list()?;
        if self.eat_op("=") {
            let target = self.to_target(expr)?;
            let value = self.expression_list()?;
            if self.at_op("=") {
                return Err(self.error("chained assignment is not supported"));
            }
            return Ok(StmtKind::Assign { target, value });
        }
        let aug = match self.peek() {
            Tok::Op("+=") => Some(BinaryOp::Add),
            Tok::Op("-=") => Some(BinaryOp::Sub),
            Tok::Op("*=") => Some(BinaryOp::Mul),
            Tok::Op("/=") => Some(BinaryOp::Div),
            Tok::Op("//=") => Some(BinaryOp::FloorDiv),
            Tok::Op("%=") => Some(BinaryOp::Mod),
            Tok::Op("**=") => Some(BinaryOp::Pow),
            _ => None,
        };
        if let Some(op) = aug {
            self.advance();
            let target = self.to_target(expr)?;
            if matches!(target, Target::Tuple(_)) {
                return Err(self.error("augmented assignment needs a single target"));
            }
            let value = self.expression_list()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }
        Ok(StmtKind::Expr(expr))
    }

    fn to_target(&self, expr: Expr) -> Result<Target, SyntaxError> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Attribute { object, name } => Ok(Target::Attribute {
                object: *object,
                name,
            }),
            Expr::Subscript { object, index } => Ok(Target::Subscript {
                object: *object,
                index: *index,
            }),
            Expr::Tuple(items) | Expr::List(items) => Ok(Target::Tuple(
                items
                    .into_iter()
                    .map(|e| self.to_target(e))
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(self.error("cannot assign to expression")),
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("too many nested expressions or blocks"));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// `:` followed by an inline statement list or an indented block.
    fn block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect_op(":")?;
        let mut body = Vec::new();
        if !self.at(&Tok::Newline) {
            self.simple_statements(&mut body)?;
            return Ok(body);
        }
        self.advance();
        if !self.at(&Tok::Indent) {
            return Err(self.unexpected("an indented block"));
        }
        self.advance();
        while !self.at(&Tok::Dedent) && !self.at(&Tok::Eof) {
            self.statement(&mut body)?;
        }
        if self.at(&Tok::Dedent) {
            self.advance();
        }
        Ok(body)
    }

    fn loop_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.loop_depth += 1;
        let body = self.block();
        self.loop_depth -= 1;
        body
    }

    fn if_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let mut branches = vec![(self.expression()?, self.block()?)];
        let mut orelse = Vec::new();
        loop {
            if self.eat_keyword("elif") {
                branches.push((self.expression()?, self.block()?));
            } else if self.eat_keyword("else") {
                orelse = self.block()?;
                break;
            } else {
                break;
            }
        }
        Ok(StmtKind::If { branches, orelse })
    }

    fn while_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let test = self.expression()?;
        let body = self.loop_block()?;
        if self.at_keyword("else") {
            return Err(self.error("'else' after a loop is not supported"));
        }
        Ok(StmtKind::While { test, body })
    }

    fn for_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let mut names = vec![self.for_target()?];
        while self.eat_op(",") {
            if self.at_keyword("in") {
                break;
            }
            names.push(self.for_target()?);
        }
        let target = if names.len() == 1 {
            names.remove(0)
        } else {
            Target::Tuple(names)
        };
        if !self.eat_keyword("in") {
            return Err(self.unexpected("'in'"));
        }
        let iter = self.expression_list()?;
        let body = self.loop_block()?;
        if self.at_keyword("else") {
            return Err(self.error("'else' after a loop is not supported"));
        }
        Ok(StmtKind::For { target, iter, body })
    }

    fn for_target(&mut self) -> Result<Target, SyntaxError> {
        if self.eat_op("(") {
            let mut names = vec![self.for_target()?];
            while self.eat_op(",") {
                if self.at_op(")") {
                    break;
                }
                names.push(self.for_target()?);
            }
            self.expect_op(")")?;
            return Ok(Target::Tuple(names));
        }
        Ok(Target::Name(self.expect_name()?))
    }

    fn function_def(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let name = self.expect_name()?;
        self.expect_op("(")?;
        let mut params: Vec<Param> = Vec::new();
        while !self.at_op(")") {
            let param = self.expect_name()?;
            if params.iter().any(|p| p.name == param) {
                return Err(self.error(format!("duplicate parameter '{param}'")));
            }
            let default = if self.eat_op("=") {
                Some(self.expression()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error("parameter without a default follows one with a default"));
                }
                None
            };
            params.push(Param {
                name: param,
                default,
            });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;

        let saved_loops = std::mem::take(&mut self.loop_depth);
        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        self.loop_depth = saved_loops;

        Ok(StmtKind::FunctionDef(Rc::new(FunctionDef {
            name,
            params,
            body: body?,
        })))
    }

    fn class_def(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let name = self.expect_name()?;
        let mut base = None;
        if self.eat_op("(") {
            if !self.at_op(")") {
                base = Some(self.expression()?);
            }
            self.expect_op(")")?;
        }
        let saved_loops = std::mem::take(&mut self.loop_depth);
        let body = self.block();
        self.loop_depth = saved_loops;
        Ok(StmtKind::ClassDef {
            name,
            base,
            body: body?,
        })
    }

    fn try_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        self.advance();
        let body = self.block()?;
        let mut handlers = Vec::new();
        while self.eat_keyword("except") {
            let mut type_name = None;
            let mut binding = None;
            if !self.at_op(":") {
                type_name = Some(self.expect_name()?);
                if self.eat_keyword("as") {
                    binding = Some(self.expect_name()?);
                }
            }
            let handler_body = self.block()?;
            handlers.push(Handler {
                type_name,
                binding,
                body: handler_body,
            });
        }
        let finally = if self.eat_keyword("finally") {
            self.block()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finally.is_empty() {
            return Err(self.unexpected("'except' or 'finally'"));
        }
        Ok(StmtKind::Try {
            body,
            handlers,
            finally,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// makes a tuple.
    fn expression_list(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.expression()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.ends_expression_list() {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn ends_expression_list(&self) -> bool {
        matches!(self.peek(), Tok::Newline | Tok::Eof | Tok::Dedent)
            || matches!(self.peek(), Tok::Op(o) if matches!(*o, "=" | ")" | "]" | "}" | ":" | ";"))
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let value = self.or_test()?;
        if !self.at_keyword("if") {
            return Ok(value);
        }
        self.advance();
        let test = self.or_test()?;
        if !self.eat_keyword("else") {
            return Err(self.unexpected("'else'"));
        }
        let orelse = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(value),
            orelse: Box::new(orelse),
        })
    }

    fn or_test(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.and_test()?;
        while self.eat_keyword("or") {
            let right = self.and_test()?;
            left = Expr::Logical {
                left: Box::new(left),
                and: false,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.not_test()?;
        while self.eat_keyword("and") {
            let right = self.not_test()?;
            left = Expr::Logical {
                left: Box::new(left),
                and: true,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_keyword("not") {
            let operand = self.nested(Self::not_test)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let next_is = |word: &str| matches!(self.peek_at(1), Tok::Name(m) if m == word);
        let (op, width) = match self.peek() {
            Tok::Op("==") => (CompareOp::Eq, 1),
            Tok::Op("!=") => (CompareOp::Ne, 1),
            Tok::Op("<") => (CompareOp::Lt, 1),
            Tok::Op("<=") => (CompareOp::Le, 1),
            Tok::Op(">") => (CompareOp::Gt, 1),
            Tok::Op(">=") => (CompareOp::Ge, 1),
            Tok::Name(n) if n == "in" => (CompareOp::In, 1),
            Tok::Name(n) if n == "not" && next_is("in") => (CompareOp::NotIn, 2),
            Tok::Name(n) if n == "is" && next_is("not") => (CompareOp::IsNot, 2),
            Tok::Name(n) if n == "is" => (CompareOp::Is, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            rest,
        })
    }

    fn arith(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinaryOp::Add,
                Tok::Op("-") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            left = Expr::binary(left, op, self.term()?);
        }
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinaryOp::Mul,
                Tok::Op("/") => BinaryOp::Div,
                Tok::Op("//") => BinaryOp::FloorDiv,
                Tok::Op("%") => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            left = Expr::binary(left, op, self.factor()?);
        }
    }

    fn factor(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.peek() {
            Tok::Op("-") => UnaryOp::Neg,
            Tok::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.nested(Self::factor)?;
        // Negative literals stay constants.
        Ok(match (op, operand) {
            (UnaryOp::Neg, Expr::Int(i)) => Expr::Int(-i),
            (UnaryOp::Neg, Expr::Float(f)) => Expr::Float(-f),
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.postfix()?;
        if self.eat_op("**") {
            let exponent = self.factor()?;
            return Ok(Expr::binary(base, BinaryOp::Pow, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("(") {
                let args = self.call_args()?;
                expr = Expr::call(expr, args);
            } else if self.eat_op("[") {
                expr = self.subscript(expr)?;
            } else if self.eat_op(".") {
                let name = match self.advance() {
                    Tok::Name(n) => n,
                    _ => return Err(self.error("expected attribute name after '.'")),
                };
                expr = Expr::attribute(expr, name);
            } else {
                return Ok(expr);
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            if matches!(self.peek(), Tok::Name(_)) && matches!(self.peek_at(1), Tok::Op("=")) {
                return Err(self.error("keyword arguments are not supported"));
            }
            if self.at_op("*") || self.at_op("**") {
                return Err(self.error("argument unpacking is not supported"));
            }
            args.push(self.expression()?);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(args)
    }

    fn subscript(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        let start = if self.at_op(":") {
            None
        } else {
            Some(self.expression_list()?)
        };
        if self.eat_op("]") {
            let Some(index) = start else {
                return Err(self.error("empty subscript"));
            };
            return Ok(Expr::Subscript {
                object: Box::new(object),
                index: Box::new(index),
            });
        }
        self.expect_op(":")?;
        let bound = |p: &mut Self| -> Result<Option<Box<Expr>>, SyntaxError> {
            if p.at_op(":") || p.at_op("]") {
                Ok(None)
            } else {
                Ok(Some(Box::new(p.expression()?)))
            }
        };
        let stop = bound(self)?;
        let step = if self.eat_op(":") { bound(self)? } else { None };
        self.expect_op("]")?;
        Ok(Expr::Slice {
            object: Box::new(object),
            start: start.map(Box::new),
            stop,
            step,
        })
    }

    fn atom(&mut self) -> Result<Expr, SyntaxError> {
        let line = self.line();
        match self.advance() {
            Tok::Int(i) => Ok(Expr::Int(i)),
            Tok::Float(f) => Ok(Expr::Float(f)),
            Tok::Str(s) => {
                let mut value = s;
                while let Tok::Str(next) = self.peek() {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::string(&value))
            }
            Tok::Name(n) => match n.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                "None" => Ok(Expr::None),
                word if KEYWORDS.contains(&word) => Err(SyntaxError {
                    line,
                    message: format!("unexpected keyword '{word}'"),
                }),
                _ => Ok(Expr::Name(n)),
            },
            Tok::Op("(") => {
                if self.eat_op(")") {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let inner = self.expression_list()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Tok::Op("[") => {
                let mut items = Vec::new();
                while !self.at_op("]") {
                    items.push(self.expression()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Ok(Expr::List(items))
            }
            Tok::Op("{") => self.brace_literal(),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn brace_literal(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_op("}") {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.expression()?;
        if self.eat_op(":") {
            let mut pairs = vec![(first, self.expression()?)];
            while self.eat_op(",") {
                if self.at_op("}") {
                    break;
                }
                let key = self.expression()?;
                self.expect_op(":")?;
                pairs.push((key, self.expression()?));
            }
            self.expect_op("}")?;
            return Ok(Expr::Dict(pairs));
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            items.push(self.expression()?);
        }
        self.expect_op("}")?;
        Ok(Expr::Set(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmts(source: &str) -> Vec<StmtKind> {
        parse(source)
            .unwrap()
            .body
            .into_iter()
            .map(|s| s.kind)
            .collect()
    }

    fn expr(source: &str) -> Expr {
        match stmts(source).remove(0) {
            StmtKind::Expr(e) => e,
            other => panic!("not an expression: {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::binary(
                Expr::Int(1),
                BinaryOp::Add,
                Expr::binary(Expr::Int(2), BinaryOp::Mul, Expr::Int(3))
            )
        );
        // `**` binds tighter than unary minus on its left.
        assert!(matches!(expr("-2 ** 2"), Expr::Unary { op: UnaryOp::Neg, .. }));
        assert_eq!(expr("-1"), Expr::Int(-1));
    }

    #[test]
    fn test_assignment_forms() {
        let s = stmts("a = 1\nb.c = 2\nd[0] = 3\nx, y = y, x\ni += 1\n");
        assert!(matches!(&s[0], StmtKind::Assign { target: Target::Name(n), .. } if n == "a"));
        assert!(matches!(&s[1], StmtKind::Assign { target: Target::Attribute { .. }, .. }));
        assert!(matches!(&s[2], StmtKind::Assign { target: Target::Subscript { .. }, .. }));
        assert!(matches!(&s[3], StmtKind::Assign { target: Target::Tuple(t), value: Expr::Tuple(_) } if t.len() == 2));
        assert!(matches!(&s[4], StmtKind::AugAssign { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_compound_statements() {
        let source = "\
def f(a, b=2):
    for i in range(a):
        if i > b:
            break
        elif i == 1:
            continue
        else:
            pass
    return a

class Jedi(Base):
    def __init__(self, name):
        self.name = name

try:
    x = 1 / 0
except ZeroDivisionError as e:
    print(e)
finally:
    print('done')
";
        let s = stmts(source);
        assert_eq!(s.len(), 3);
        let StmtKind::FunctionDef(def) = &s[0] else {
            panic!("expected def")
        };
        assert_eq!(def.params[1].default, Some(Expr::Int(2)));
        assert!(matches!(&s[1], StmtKind::ClassDef { base: Some(_), .. }));
        let StmtKind::Try { handlers, finally, .. } = &s[2] else {
            panic!("expected try")
        };
        assert_eq!(handlers[0].type_name.as_deref(), Some("ZeroDivisionError"));
        assert_eq!(handlers[0].binding.as_deref(), Some("e"));
        assert_eq!(finally.len(), 1);
    }

    #[test]
    fn test_literals() {
        assert!(matches!(expr("{}"), Expr::Dict(p) if p.is_empty()));
        assert!(matches!(expr("{'a': 1, 'b': 2,}"), Expr::Dict(p) if p.len() == 2));
        assert!(matches!(expr("{1, 2}"), Expr::Set(s) if s.len() == 2));
        assert!(matches!(expr("(1,)"), Expr::Tuple(t) if t.len() == 1));
        assert_eq!(expr("'a' 'b'"), Expr::string("ab"));
        assert!(matches!(expr("x[1:]"), Expr::Slice { stop: None, .. }));
        assert!(matches!(expr("x[::-1]"), Expr::Slice { start: None, step: Some(_), .. }));
    }

    #[test]
    fn test_comparisons() {
        let Expr::Compare { rest, .. } = expr("1 < x <= 3") else {
            panic!("expected comparison")
        };
        assert_eq!(rest.len(), 2);
        let Expr::Compare { rest, .. } = expr("a not in b") else {
            panic!("expected comparison")
        };
        assert_eq!(rest[0].0, CompareOp::NotIn);
        assert!(matches!(expr("a if c else b"), Expr::Conditional { .. }));
    }

    #[test]
    fn test_semicolons() {
        assert_eq!(stmts("a = 1; b = 2;\n").len(), 2);
    }

    #[test]
    fn test_rejections() {
        let err = parse("break\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(parse("return 1\n").is_err());
        assert!(parse("import os\n").is_err());
        assert!(parse("f(x=1)\n").is_err());
        assert!(parse("if x:\ny\n").is_err());
        assert!(parse("1 = x\n").is_err());
        assert!(parse("def f():\n    while x:\n        pass\n    break\n").is_err());
        let deep = format!("x = {}1{}\n", "(".repeat(500), ")".repeat(500));
        assert!(parse(&deep).is_err());
        assert!(parse(&format!("x = {}1\n", "-".repeat(500))).is_err());
    }
}
