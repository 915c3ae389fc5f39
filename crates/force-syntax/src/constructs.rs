//! Rewriting of constructs that keyword substitution cannot express.
//!
//! Runs before keyword mapping. Data literals are rewritten here so that their
//! keys are quoted (and therefore never mistaken for keywords) and so that the
//! block restructurer sees their braces as plain literal delimiters.

use std::collections::HashMap;

use crate::error::TranslationError;
use crate::lexer::{self, Token, TokenKind};

/// Recognized constructs, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    /// `datapad { key: value, ... }`
    DataLiteral,
    /// `squadron[...]` and `rebellion[...]`
    SequenceLiteral,
    /// `train (init; cond; step) { ... }`
    TypedLoop,
    /// `new Type(args)`
    Instantiation,
    /// `hologram_text("template", args...)`
    Format,
    /// `jedi_mind_trick(cond, a, b)`
    Ternary,
    /// `force_switch(value, cases[, default])`
    Switch,
    /// `respond <expr>`
    Output,
    /// `initiate(...)`
    Constructor,
    /// `catch_disturbance (name) {`
    ExceptionBinding,
}

#[derive(Debug, Clone, Copy)]
pub struct ConstructRule {
    pub kind: ConstructKind,
    pub keyword: &'static str,
    /// Only matches as the first token of a statement.
    pub statement_head: bool,
}

const fn rule(kind: ConstructKind, keyword: &'static str, statement_head: bool) -> ConstructRule {
    ConstructRule {
        kind,
        keyword,
        statement_head,
    }
}

/// Rule table, in priority order.
pub static CONSTRUCT_RULES: &[ConstructRule] = &[
    rule(ConstructKind::DataLiteral, "datapad", false),
    rule(ConstructKind::SequenceLiteral, "squadron", false),
    rule(ConstructKind::SequenceLiteral, "rebellion", false),
    rule(ConstructKind::TypedLoop, "train", true),
    rule(ConstructKind::Instantiation, "new", false),
    rule(ConstructKind::Format, "hologram_text", false),
    rule(ConstructKind::Ternary, "jedi_mind_trick", false),
    rule(ConstructKind::Switch, "force_switch", false),
    rule(ConstructKind::Output, "respond", true),
    rule(ConstructKind::Constructor, "initiate", false),
    rule(ConstructKind::ExceptionBinding, "catch_disturbance", true),
];

/// Rewrite every recognized construct in `text`.
pub fn rewrite_constructs(text: &str) -> Result<String, TranslationError> {
    rewrite_constructs_with(text, CONSTRUCT_RULES)
}

/// Rewrite using an explicit rule table.
pub fn rewrite_constructs_with(
    text: &str,
    rules: &'static [ConstructRule],
) -> Result<String, TranslationError> {
    let tokens = lexer::lex(text)?;
    let mut rewriter = Rewriter {
        tokens: &tokens,
        rules,
        inserts: HashMap::new(),
    };
    rewriter.rewrite_range(0, tokens.len(), Context::Code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Code,
    /// Inside a data literal. Keyed literals quote bare keys.
    Literal { keyed: bool },
}

struct Rewriter<'s, 't> {
    tokens: &'t [Token<'s>],
    rules: &'static [ConstructRule],
    /// Text emitted before the token at the given index.
    inserts: HashMap<usize, String>,
}

impl<'s, 't> Rewriter<'s, 't> {
    fn rewrite_range(
        &mut self,
        start: usize,
        end: usize,
        context: Context,
    ) -> Result<String, TranslationError> {
        let mut out = String::new();
        let mut i = start;
        while i < end {
            if let Some(text) = self.inserts.remove(&i) {
                out.push_str(&text);
            }
            let token = self.tokens[i];

            if let Context::Literal { keyed } = context {
                if keyed && self.is_bare_key(start, i) {
                    out.push('"');
                    out.push_str(token.text);
                    out.push('"');
                    i += 1;
                    continue;
                }
                if token.is_punct("{") || token.is_punct("[") {
                    i = self.rewrite_nested_literal(i, &mut out)?;
                    continue;
                }
            }

            if token.kind == TokenKind::Ident {
                if let Some(rule) = self.match_rule(i) {
                    tracing::trace!(?rule.kind, line = token.line, "construct");
                    if let Some(next) = self.apply(rule.kind, i, end, &mut out)? {
                        i = next;
                        continue;
                    }
                }
            }

            out.push_str(token.text);
            i += 1;
        }
        Ok(out)
    }

    fn match_rule(&self, index: usize) -> Option<&'static ConstructRule> {
        let token = &self.tokens[index];
        let rule = self.rules.iter().find(|r| r.keyword == token.text)?;
        if rule.kind == ConstructKind::Constructor && self.follows_ability(index) {
            return Some(rule);
        }
        if lexer::is_label(self.tokens, index) {
            return None;
        }
        if rule.statement_head && !lexer::at_statement_head(self.tokens, index) {
            return None;
        }
        Some(rule)
    }

    /// Apply a rule at `index`. Returns the index to resume scanning from, or
    /// `None` when the token should be emitted unchanged.
    fn apply(
        &mut self,
        kind: ConstructKind,
        index: usize,
        end: usize,
        out: &mut String,
    ) -> Result<Option<usize>, TranslationError> {
        match kind {
            ConstructKind::DataLiteral => self.data_literal(index, out).map(Some),
            ConstructKind::SequenceLiteral => self.sequence_literal(index, out).map(Some),
            ConstructKind::TypedLoop => self.typed_loop(index, out),
            ConstructKind::Instantiation => self.instantiation(index).map(Some),
            ConstructKind::Format => self.format(index, out),
            ConstructKind::Ternary => self.check_arity(index, 3..=3).map(|_| None),
            ConstructKind::Switch => self.check_arity(index, 2..=3).map(|_| None),
            ConstructKind::Output => self.output(index, end, out).map(Some),
            ConstructKind::Constructor => Ok(self.constructor(index, out)),
            ConstructKind::ExceptionBinding => Ok(self.exception_binding(index, out)),
        }
    }

    fn next(&self, index: usize) -> Option<usize> {
        lexer::next_significant(self.tokens, index)
    }

    fn next_is(&self, index: usize, punct: &str) -> Option<usize> {
        self.next(index).filter(|&n| self.tokens[n].is_punct(punct))
    }

    fn follows_ability(&self, index: usize) -> bool {
        lexer::prev_significant(self.tokens, index)
            .is_some_and(|p| self.tokens[p].is_ident("ability"))
    }

    fn close_of(&self, open: usize, what: &str) -> Result<usize, TranslationError> {
        lexer::find_close(self.tokens, open).ok_or_else(|| {
            TranslationError::construct(&self.tokens[open], format!("unclosed {what}"))
        })
    }

    /// A bare identifier directly followed by `:` at the top of a keyed literal.
    fn is_bare_key(&self, start: usize, index: usize) -> bool {
        if self.tokens[index].kind != TokenKind::Ident {
            return false;
        }
        let prev_ok = match lexer::prev_significant(self.tokens, index) {
            Some(p) if p >= start => self.tokens[p].is_punct(","),
            _ => true,
        };
        prev_ok && self.next_is(index, ":").is_some()
    }

    fn rewrite_nested_literal(
        &mut self,
        open: usize,
        out: &mut String,
    ) -> Result<usize, TranslationError> {
        let close = self.close_of(open, "literal")?;
        let keyed = self.tokens[open].is_punct("{");
        let inner = self.rewrite_range(open + 1, close, Context::Literal { keyed })?;
        out.push_str(self.tokens[open].text);
        out.push_str(&inner);
        out.push_str(self.tokens[close].text);
        Ok(close + 1)
    }

    fn data_literal(&mut self, index: usize, out: &mut String) -> Result<usize, TranslationError> {
        let open = self.next_is(index, "{").ok_or_else(|| {
            TranslationError::construct(&self.tokens[index], "`datapad` must be followed by `{`")
        })?;
        let close = self.close_of(open, "`datapad` literal")?;
        let inner = self.rewrite_range(open + 1, close, Context::Literal { keyed: true })?;
        out.push('{');
        out.push_str(&inner);
        out.push('}');
        Ok(close + 1)
    }

    fn sequence_literal(
        &mut self,
        index: usize,
        out: &mut String,
    ) -> Result<usize, TranslationError> {
        let keyword = self.tokens[index].text;
        let open = self.next_is(index, "[").ok_or_else(|| {
            TranslationError::construct(
                &self.tokens[index],
                format!("`{keyword}` must be followed by `[`"),
            )
        })?;
        let close = self.close_of(open, &format!("`{keyword}` literal"))?;
        let inner = self.rewrite_range(open + 1, close, Context::Literal { keyed: false })?;
        if keyword == "rebellion" {
            out.push_str("set([");
            out.push_str(&inner);
            out.push_str("])");
        } else {
            out.push('[');
            out.push_str(&inner);
            out.push(']');
        }
        Ok(close + 1)
    }

    fn typed_loop(
        &mut self,
        index: usize,
        out: &mut String,
    ) -> Result<Option<usize>, TranslationError> {
        let Some(open) = self.next_is(index, "(") else {
            return Ok(None);
        };
        let Some(close) = lexer::find_close(self.tokens, open) else {
            return Ok(None);
        };
        let Some(body) = self.next_is(close, "{") else {
            return Ok(None);
        };

        let clauses = lexer::split_top_level(self.tokens, open + 1, close, ";");
        let [init, cond, step] = clauses[..] else {
            return Err(TranslationError::construct(
                &self.tokens[index],
                format!("loop header needs 3 clauses, found {}", clauses.len()),
            ));
        };

        let body_close = self.close_of(body, "loop body")?;
        if let Some(header) = self.counted_header(init, cond, step, body, body_close) {
            out.push_str(&header);
            out.push(' ');
            return Ok(Some(body));
        }

        let condition = self.rewrite_range(cond.0, cond.1, Context::Code)?;
        if condition.trim().is_empty() {
            return Err(TranslationError::construct(
                &self.tokens[index],
                "loop header is missing its condition",
            ));
        }

        let init = self.rewrite_range(init.0, init.1, Context::Code)?;
        let step = self.step_statement(step)?;
        if !init.trim().is_empty() {
            out.push_str(init.trim());
            out.push_str("; ");
        }
        out.push_str("while (");
        out.push_str(condition.trim());
        out.push_str(") ");
        if !step.is_empty() {
            // The step runs before every `continue` of this loop and after the body.
            for c in self.own_continues(body, body_close) {
                self.inserts.entry(c).or_default().push_str(&format!("{step}; "));
            }
            self.inserts
                .entry(body_close)
                .or_default()
                .push_str(&format!("; {step} "));
        }
        Ok(Some(body))
    }

    /// Recognize `[holocron] i = <int>; i <op> <int>; <step of i>` and produce a
    /// `for i in range(...)` header. Only used when the result cannot differ
    /// from the `while` form: the body never assigns `i` and nothing after the
    /// loop reads it.
    fn counted_header(
        &self,
        init: (usize, usize),
        cond: (usize, usize),
        step: (usize, usize),
        body: usize,
        body_close: usize,
    ) -> Option<String> {
        let significant = |(s, e): (usize, usize)| -> Vec<usize> {
            (s..e).filter(|&i| self.tokens[i].is_significant()).collect()
        };
        let init_idx = significant(init);
        let cond_idx = significant(cond);
        let step_idx = significant(step);

        // init
        let at = usize::from(
            init_idx
                .first()
                .is_some_and(|&i| self.tokens[i].is_ident("holocron")),
        );
        let (&var, &eq) = (init_idx.get(at)?, init_idx.get(at + 1)?);
        if self.tokens[var].kind != TokenKind::Ident || !self.tokens[eq].is_punct("=") {
            return None;
        }
        let name = self.tokens[var].text;
        let start = self.int_literal(&init_idx[at + 2..])?;

        // cond
        let (&cvar, &cop) = (cond_idx.first()?, cond_idx.get(1)?);
        if !self.tokens[cvar].is_ident(name) || self.tokens[cop].kind != TokenKind::Punct {
            return None;
        }
        let limit = self.int_literal(&cond_idx[2..])?;
        let (ascending, bound) = match self.tokens[cop].text {
            "<" => (true, limit),
            "<=" => (true, limit.checked_add(1)?),
            ">" => (false, limit),
            ">=" => (false, limit.checked_sub(1)?),
            _ => return None,
        };

        // step
        let amount = self.step_amount(name, &step_idx)?;
        if amount == 0 || (amount > 0) != ascending {
            return None;
        }

        if self.assigns_in(name, body + 1, body_close) || self.mentioned_after(name, body_close) {
            return None;
        }
        Some(format!("for {name} in range({start}, {bound}, {amount})"))
    }

    /// An integer literal, optionally negated, spanning exactly `idx`.
    fn int_literal(&self, idx: &[usize]) -> Option<i64> {
        let parse = |i: usize| -> Option<i64> {
            let token = &self.tokens[i];
            if token.kind != TokenKind::Number {
                return None;
            }
            token.text.replace('_', "").parse().ok()
        };
        match idx {
            [n] => parse(*n),
            [minus, n] if self.tokens[*minus].is_punct("-") => parse(*n).map(|v| -v),
            _ => None,
        }
    }

    /// Whether any statement in `start..end` may assign `name`.
    fn assigns_in(&self, name: &str, start: usize, end: usize) -> bool {
        (start..end).any(|i| {
            if !self.tokens[i].is_ident(name) || lexer::is_label(self.tokens, i) {
                return false;
            }
            let prev = lexer::prev_significant(self.tokens, i).map(|p| &self.tokens[p]);
            if prev.is_some_and(|p| {
                p.is_punct("++") || p.is_punct("--") || p.is_ident("holocron") || p.is_ident("kyber")
            }) {
                return true;
            }
            let Some(n) = self.next(i) else {
                return false;
            };
            let op = self.tokens[n];
            if op.kind != TokenKind::Punct {
                return false;
            }
            // `**=` lexes as two adjacent tokens.
            let split_compound =
                op.text == "**" && self.tokens.get(n + 1).is_some_and(|t| t.is_punct("="));
            let unpacking = op.text == "," && lexer::at_statement_head(self.tokens, i);
            matches!(op.text, "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "++" | "--")
                || split_compound
                || unpacking
        })
    }

    /// Whether `name` is used anywhere after `index`.
    fn mentioned_after(&self, name: &str, index: usize) -> bool {
        (index + 1..self.tokens.len())
            .any(|i| self.tokens[i].is_ident(name) && !lexer::is_label(self.tokens, i))
    }

    /// `continue` statements that belong to the loop whose body spans
    /// `body..body_close`, skipping nested loops and functions.
    fn own_continues(&self, body: usize, body_close: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut i = body + 1;
        while i < body_close {
            let token = &self.tokens[i];
            if token.kind == TokenKind::Ident && !lexer::is_label(self.tokens, i) {
                match token.text {
                    "continue" => found.push(i),
                    "train" | "meditate" | "ability" => {
                        if let Some(end) = self.block_end(i, body_close) {
                            i = end + 1;
                            continue;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        found
    }

    /// Closing brace of the block introduced by the keyword at `index`.
    fn block_end(&self, index: usize, limit: usize) -> Option<usize> {
        let mut at = index;
        if let Some(open) = self.next_is(index, "(") {
            at = lexer::find_close(self.tokens, open)?;
        }
        let open = (at + 1..limit).find(|&n| self.tokens[n].is_punct("{"))?;
        lexer::find_close(self.tokens, open)
    }

    /// Signed step of a canonical increment of `name`, if the clause is one.
    fn step_amount(&self, name: &str, idx: &[usize]) -> Option<i64> {
        let t = |n: usize| idx.get(n).map(|&i| &self.tokens[i]);
        let literal = |n: usize| -> Option<i64> {
            let token = t(n)?;
            if token.kind != TokenKind::Number {
                return None;
            }
            token.text.replace('_', "").parse().ok()
        };
        if !t(0)?.is_ident(name) {
            return None;
        }
        let op = t(1)?;
        match (op.text, idx.len()) {
            ("++", 2) => Some(1),
            ("--", 2) => Some(-1),
            ("+=", 3) => literal(2),
            ("-=", 3) => literal(2).map(|k| -k),
            ("=", 5) if t(2)?.is_ident(name) => match t(3)?.text {
                "+" => literal(4),
                "-" => literal(4).map(|k| -k),
                _ => None,
            },
            _ => None,
        }
    }

    fn step_statement(&mut self, (start, end): (usize, usize)) -> Result<String, TranslationError> {
        let idx: Vec<usize> = (start..end)
            .filter(|&i| self.tokens[i].is_significant())
            .collect();
        if let [var, op] = idx[..] {
            if self.tokens[var].kind == TokenKind::Ident {
                match self.tokens[op].text {
                    "++" => return Ok(format!("{} += 1", self.tokens[var].text)),
                    "--" => return Ok(format!("{} -= 1", self.tokens[var].text)),
                    _ => {}
                }
            }
        }
        Ok(self.rewrite_range(start, end, Context::Code)?.trim().to_string())
    }

    fn instantiation(&self, index: usize) -> Result<usize, TranslationError> {
        let name = self
            .next(index)
            .filter(|&n| self.tokens[n].kind == TokenKind::Ident);
        match name {
            Some(n) if self.next_is(n, "(").is_some() => Ok(n),
            _ => Err(TranslationError::construct(
                &self.tokens[index],
                "`new` must be followed by a type name and `(`",
            )),
        }
    }

    fn call_args(&self, index: usize) -> Option<(usize, usize, Vec<(usize, usize)>)> {
        let open = self.next_is(index, "(")?;
        let close = lexer::find_close(self.tokens, open)?;
        let args = lexer::split_top_level(self.tokens, open + 1, close, ",");
        Some((open, close, args))
    }

    fn check_arity(
        &self,
        index: usize,
        expected: std::ops::RangeInclusive<usize>,
    ) -> Result<(), TranslationError> {
        let Some((_, _, args)) = self.call_args(index) else {
            return Ok(());
        };
        if expected.contains(&args.len()) {
            return Ok(());
        }
        let token = &self.tokens[index];
        let wanted = if expected.start() == expected.end() {
            expected.start().to_string()
        } else {
            format!("{} to {}", expected.start(), expected.end())
        };
        Err(TranslationError::construct(
            token,
            format!(
                "`{}` takes {wanted} arguments, found {}",
                token.text,
                args.len()
            ),
        ))
    }

    fn format(
        &mut self,
        index: usize,
        out: &mut String,
    ) -> Result<Option<usize>, TranslationError> {
        let Some((_, close, args)) = self.call_args(index) else {
            return Ok(None);
        };
        let Some(&(first_start, first_end)) = args.first() else {
            return Err(TranslationError::construct(
                &self.tokens[index],
                "`hologram_text` needs a template argument",
            ));
        };
        let template: Vec<usize> = (first_start..first_end)
            .filter(|&i| self.tokens[i].is_significant())
            .collect();
        let [template] = template[..] else {
            return Ok(None);
        };
        if self.tokens[template].kind != TokenKind::Str {
            return Ok(None);
        }
        let rest = if args.len() > 1 {
            self.rewrite_range(first_end + 1, close, Context::Code)?
        } else {
            String::new()
        };
        out.push_str(self.tokens[template].text);
        out.push_str(".format(");
        out.push_str(rest.trim());
        out.push(')');
        Ok(Some(close + 1))
    }

    fn output(&mut self, index: usize, end: usize, out: &mut String) -> Result<usize, TranslationError> {
        let mut depth = 0usize;
        let mut stop = index + 1;
        while stop < end {
            let token = &self.tokens[stop];
            match token.kind {
                TokenKind::Newline if depth == 0 => break,
                TokenKind::Punct => match token.text {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" if depth == 0 => break,
                    ")" | "]" | "}" => depth -= 1,
                    ";" if depth == 0 => break,
                    _ => {}
                },
                _ => {}
            }
            stop += 1;
        }
        let expr = self.rewrite_range(index + 1, stop, Context::Code)?;
        out.push_str("print(");
        out.push_str(expr.trim());
        out.push(')');
        Ok(stop)
    }

    fn constructor(&self, index: usize, out: &mut String) -> Option<usize> {
        self.next_is(index, "(")?;
        if self.follows_ability(index) {
            out.push_str("__init__");
        } else if lexer::at_statement_head(self.tokens, index) {
            out.push_str("def __init__");
        } else {
            return None;
        }
        Some(index + 1)
    }

    fn exception_binding(&self, index: usize, out: &mut String) -> Option<usize> {
        let open = self.next_is(index, "(")?;
        let name = self.next(open)?;
        let close = self.next_is(name, ")")?;
        let body = self.next_is(close, "{")?;
        if self.tokens[name].kind != TokenKind::Ident {
            return None;
        }
        out.push_str("except Exception as ");
        out.push_str(self.tokens[name].text);
        out.push(' ');
        Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(text: &str) -> String {
        rewrite_constructs(text).unwrap()
    }

    #[test]
    fn test_datapad_quotes_bare_keys() {
        assert_eq!(
            rewrite("holocron data = datapad { name: 'Luke', \"age\": 20 }"),
            "holocron data = { \"name\": 'Luke', \"age\": 20 }"
        );
    }

    #[test]
    fn test_datapad_keyword_keys_stay_labels() {
        assert_eq!(
            rewrite("x = datapad {sense: 1, order: 2,}"),
            "x = {\"sense\": 1, \"order\": 2,}"
        );
    }

    #[test]
    fn test_datapad_nested() {
        assert_eq!(
            rewrite("x = datapad {a: {b: datapad {c: 1}}, d: [e]}"),
            "x = {\"a\": {\"b\": {\"c\": 1}}, \"d\": [e]}"
        );
    }

    #[test]
    fn test_datapad_value_identifiers_untouched() {
        assert_eq!(
            rewrite("x = datapad {a: b, c: f(d)}"),
            "x = {\"a\": b, \"c\": f(d)}"
        );
    }

    #[test]
    fn test_datapad_unclosed() {
        let err = rewrite_constructs("x = datapad {a: 1\nrespond x\n").unwrap_err();
        assert_eq!(err.kind(), "ConstructError");
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            rewrite("m = squadron[\"Tatooine\", \"Death Star\"]"),
            "m = [\"Tatooine\", \"Death Star\"]"
        );
        assert_eq!(rewrite("s = rebellion[1, 2]"), "s = set([1, 2])");
        assert_eq!(rewrite("e = squadron[]"), "e = []");
    }

    #[test]
    fn test_counted_loop() {
        assert_eq!(
            rewrite("train (holocron i = 0; i < 10; i = i + 1) {\n  respond i\n}"),
            "for i in range(0, 10, 1) {\n  print(i)\n}"
        );
        assert_eq!(rewrite("train (i = 1; i <= 5; i++) { }"), "for i in range(1, 6, 1) { }");
        assert_eq!(rewrite("train (i = 0; i <= 4; i += 2) { }"), "for i in range(0, 5, 2) { }");
        assert_eq!(rewrite("train (i = 10; i > -1; i--) { }"), "for i in range(10, -1, -1) { }");
    }

    #[test]
    fn test_computed_bound_is_rechecked() {
        assert_eq!(
            rewrite("train (holocron i = 0; i < len(missions); i = i + 1) { }"),
            "holocron i = 0; while (i < len(missions)) { ; i = i + 1 }"
        );
    }

    #[test]
    fn test_compound_condition_becomes_while() {
        assert_eq!(
            rewrite("train (holocron i = 0; i < 5 && i != 3; i++) {\n  respond i\n}"),
            "holocron i = 0; while (i < 5 && i != 3) {\n  print(i)\n; i += 1 }"
        );
    }

    #[test]
    fn test_counter_assigned_in_body_becomes_while() {
        assert_eq!(
            rewrite("train (i = 0; i < 6; i++) { i = i + 1 }"),
            "i = 0; while (i < 6) { i = i + 1 ; i += 1 }"
        );
        assert_eq!(
            rewrite("train (i = 0; i < 6; i++) { i **= 2 }"),
            "i = 0; while (i < 6) { i **= 2 ; i += 1 }"
        );
    }

    #[test]
    fn test_counter_read_after_loop_becomes_while() {
        assert_eq!(
            rewrite("train (i = 0; i < 3; i++) { }\nrespond i"),
            "i = 0; while (i < 3) { ; i += 1 }\nprint(i)"
        );
        // Attribute names are not the counter.
        assert_eq!(
            rewrite("train (i = 0; i < 3; i++) { }\nrespond p.i"),
            "for i in range(0, 3, 1) { }\nprint(p.i)"
        );
    }

    #[test]
    fn test_general_loop_becomes_while() {
        assert_eq!(
            rewrite("train (i = 1; i < 100; i = i * 2) {\n  respond i\n}"),
            "i = 1; while (i < 100) {\n  print(i)\n; i = i * 2 }"
        );
    }

    #[test]
    fn test_direction_mismatch_becomes_while() {
        assert_eq!(
            rewrite("train (i = 0; i < 3; i--) { }"),
            "i = 0; while (i < 3) { ; i -= 1 }"
        );
    }

    #[test]
    fn test_continue_runs_the_step() {
        assert_eq!(
            rewrite("train (i = 0; i < n; i++) { sense (i == 2) { continue } }"),
            "i = 0; while (i < n) { sense (i == 2) { i += 1; continue } ; i += 1 }"
        );
    }

    #[test]
    fn test_nested_loop_continue_keeps_its_own_step() {
        assert_eq!(
            rewrite("train (i = 0; i < n; i++) { train (j = 0; j < m; j++) { continue } }"),
            "i = 0; while (i < n) { j = 0; while (j < m) { j += 1; continue ; j += 1 } ; i += 1 }"
        );
    }

    #[test]
    fn test_loop_clause_count() {
        let err = rewrite_constructs("train (i = 0; i < 3) {}").unwrap_err();
        assert_eq!(err.kind(), "ConstructError");
    }

    #[test]
    fn test_train_method_is_identifier() {
        assert_eq!(rewrite("jedi.train()"), "jedi.train()");
        assert_eq!(rewrite("ability train(self) {"), "ability train(self) {");
    }

    #[test]
    fn test_new() {
        assert_eq!(rewrite("j = new Jedi(\"Luke\")"), "j = Jedi(\"Luke\")");
        assert!(rewrite_constructs("j = new 5").is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(
            rewrite("respond hologram_text(\"{} is {}\", name, 5)"),
            "print(\"{} is {}\".format(name, 5))"
        );
        assert_eq!(rewrite("hologram_text(t, a)"), "hologram_text(t, a)");
        assert!(rewrite_constructs("hologram_text()").is_err());
    }

    #[test]
    fn test_ternary_and_switch_arity() {
        assert_eq!(
            rewrite("x = jedi_mind_trick(a > 1, \"y\", \"n\")"),
            "x = jedi_mind_trick(a > 1, \"y\", \"n\")"
        );
        assert!(rewrite_constructs("x = jedi_mind_trick(a, b)").is_err());
        assert!(rewrite_constructs("x = force_switch(v)").is_err());
        rewrite_constructs("x = force_switch(v, cases, 0)").unwrap();
    }

    #[test]
    fn test_respond() {
        assert_eq!(
            rewrite("respond \"Hello, \" + name\nrespond x; y = 1"),
            "print(\"Hello, \" + name)\nprint(x); y = 1"
        );
        assert_eq!(rewrite("{ respond a }"), "{ print(a)}");
        assert_eq!(
            rewrite("respond f(a,\n  b)\n"),
            "print(f(a,\n  b))\n"
        );
    }

    #[test]
    fn test_initiate() {
        assert_eq!(
            rewrite("order Jedi {\n  initiate(self, name) {"),
            "order Jedi {\n  def __init__(self, name) {"
        );
        assert_eq!(
            rewrite("ability initiate(self) {"),
            "ability __init__(self) {"
        );
    }

    #[test]
    fn test_catch_binding() {
        assert_eq!(
            rewrite("} catch_disturbance (err) {"),
            "} except Exception as err {"
        );
        assert_eq!(
            rewrite("} catch_disturbance {"),
            "} catch_disturbance {"
        );
    }
}
