//! Static pre-check of target source before it runs.

use crate::error::ExecutionError;
use crate::target::lexer::{Tok, tokenize};

/// Host facilities a program may never name.
pub const FORBIDDEN_NAMES: &[&str] = &[
    "exec",
    "eval",
    "compile",
    "open",
    "input",
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

/// Reject imports, dunder names other than `__init__`, and calls of
/// forbidden host names. Source that does not tokenize passes; the parser
/// reports it.
pub fn precheck(source: &str) -> Result<(), ExecutionError> {
    let Ok(tokens) = tokenize(source) else {
        return Ok(());
    };
    let mut after_dot = false;
    for (i, spanned) in tokens.iter().enumerate() {
        let called = tokens.get(i + 1).is_some_and(|next| next.tok == Tok::Op("("));
        let reject = |reason: String| ExecutionError::Rejected {
            reason,
            line: Some(spanned.line),
        };
        match &spanned.tok {
            Tok::Name(name) if name == "import" || name == "from" => {
                return Err(reject("module imports are not allowed".into()));
            }
            Tok::Name(name) if name.starts_with("__") && name != "__init__" => {
                return Err(reject(format!("access to '{name}' is not allowed")));
            }
            Tok::Name(name) if called && !after_dot && FORBIDDEN_NAMES.contains(&name.as_str()) => {
                return Err(reject(format!("use of '{name}' is not allowed")));
            }
            _ => {}
        }
        after_dot = spanned.tok == Tok::Op(".");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(source: &str) -> Option<usize> {
        match precheck(source) {
            Err(ExecutionError::Rejected { line, .. }) => line,
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(()) => None,
        }
    }

    #[test]
    fn test_rejections() {
        assert_eq!(rejected("import os\n"), Some(1));
        assert_eq!(rejected("x = 1\nfrom os import path\n"), Some(2));
        assert_eq!(rejected("x = ().__class__\n"), Some(1));
        assert_eq!(rejected("eval('1')\n"), Some(1));
        assert_eq!(rejected("x = 1\ny = open ('f')\n"), Some(2));
    }

    #[test]
    fn test_allowed() {
        assert_eq!(rejected("class A:\n    def __init__(self):\n        pass\n"), None);
        assert_eq!(rejected("s = 'import os'\n"), None);
        assert_eq!(rejected("droid.open()\n"), None);
        assert_eq!(rejected("input = 5\nprint(input)\n"), None);
        assert_eq!(rejected("x = 'unterminated\n"), None);
    }
}
