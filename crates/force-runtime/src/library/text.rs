//! Text processing: protocol droid operations, templates and patterns.

use regex::Regex;

use super::{str_arg, unknown_operation};
use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::{Value, format_float};

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "protocol_droid",
        signature: "protocol_droid(operation, text, args...) -> str | list",
        summary: "Text transformation: uppercase, lowercase, capitalize, title, reverse, length, strip, replace, words",
        category: "text",
        arity: Arity::Variadic { min: 2 },
        call: protocol_droid,
    },
    RuntimeFunction {
        name: "hologram_text",
        signature: "hologram_text(template, args...) -> str",
        summary: "Positional template substitution with {} and {n} fields",
        category: "text",
        arity: Arity::Variadic { min: 1 },
        call: hologram_text,
    },
    RuntimeFunction {
        name: "force_pattern",
        signature: "force_pattern(operation, pattern, text[, replacement]) -> str | list | None",
        summary: "Regular expressions: match, search, findall, replace",
        category: "text",
        arity: Arity::Range(3, 4),
        call: force_pattern,
    },
];

const DROID_OPS: &[&str] = &[
    "uppercase",
    "lowercase",
    "capitalize",
    "title",
    "reverse",
    "length",
    "strip",
    "replace",
    "words",
];

fn protocol_droid(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "protocol_droid";
    let op = str_arg(NAME, args, 0)?;
    let text = str_arg(NAME, args, 1)?;
    let extra = &args[2..];
    let expected = if op == "replace" { 2 } else { 0 };
    if DROID_OPS.contains(&op) && extra.len() != expected {
        return Err(RuntimeError::argument_count(
            &format!("{NAME}('{op}')"),
            expected + 2,
            args.len(),
        ));
    }
    Ok(match op {
        "uppercase" => Value::str(text.to_uppercase()),
        "lowercase" => Value::str(text.to_lowercase()),
        "capitalize" => Value::str(capitalize(text)),
        "title" => Value::str(title(text)),
        "reverse" => Value::str(text.chars().rev().collect::<String>()),
        "length" => Value::str(text.chars().count().to_string()),
        "strip" => Value::str(text.trim()),
        "replace" => {
            let from = str_arg(NAME, args, 2)?;
            let to = str_arg(NAME, args, 3)?;
            Value::str(text.replace(from, to))
        }
        "words" => Value::list(text.split_whitespace().map(Value::str).collect()),
        other => return Err(unknown_operation(NAME, other, DROID_OPS)),
    })
}

/// First character upper case, the rest lower case.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper case after every non-letter, lower case elsewhere.
pub fn title(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for c in text.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

fn hologram_text(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let template = str_arg("hologram_text", args, 0)?;
    format_template(template, &args[1..]).map(Value::str)
}

/// Substitute `{}`, `{n}` and `{:spec}` fields. `{{` and `}}` are literal
/// braces.
pub fn format_template(template: &str, args: &[Value]) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut auto_index = 0;
    let mut manual = false;
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(RuntimeError::invalid("single '}' encountered in format string")),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(RuntimeError::invalid(
                                "single '{' encountered in format string",
                            ));
                        }
                    }
                }
                let (key, spec) = field.split_once(':').unwrap_or((&field, ""));
                let index = if key.is_empty() {
                    if manual {
                        return Err(RuntimeError::invalid(
                            "cannot switch from manual field numbering to automatic",
                        ));
                    }
                    auto_index += 1;
                    auto_index - 1
                } else {
                    manual = true;
                    key.parse::<usize>().map_err(|_| {
                        RuntimeError::invalid(format!("unsupported format field '{{{key}}}'"))
                    })?
                };
                let value = args.get(index).ok_or_else(|| {
                    RuntimeError::new(
                        crate::error::RuntimeErrorKind::IndexOutOfRange,
                        format!("replacement index {index} out of range for {} arguments", args.len()),
                    )
                })?;
                out.push_str(&apply_spec(value, spec)?);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// `[[fill]align][width][,][.precision][type]` with types `s d f %`.
fn apply_spec(value: &Value, spec: &str) -> Result<String, RuntimeError> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let invalid = || RuntimeError::invalid(format!("invalid format specifier '{spec}'"));
    let chars: Vec<char> = spec.chars().collect();
    let mut pos = 0;
    let mut fill = ' ';
    let mut align = None;
    if chars.len() >= 2 && matches!(chars[1], '<' | '>' | '^') {
        fill = chars[0];
        align = Some(chars[1]);
        pos = 2;
    } else if matches!(chars.first(), Some('<' | '>' | '^')) {
        align = Some(chars[0]);
        pos = 1;
    }
    let mut zero_pad = false;
    if chars.get(pos) == Some(&'0') {
        zero_pad = true;
        pos += 1;
    }
    let width_start = pos;
    while chars.get(pos).is_some_and(char::is_ascii_digit) {
        pos += 1;
    }
    let width: usize = if pos > width_start {
        chars[width_start..pos]
            .iter()
            .collect::<String>()
            .parse()
            .map_err(|_| invalid())?
    } else {
        0
    };
    let grouping = chars.get(pos) == Some(&',');
    if grouping {
        pos += 1;
    }
    let mut precision = None;
    if chars.get(pos) == Some(&'.') {
        pos += 1;
        let start = pos;
        while chars.get(pos).is_some_and(char::is_ascii_digit) {
            pos += 1;
        }
        if pos == start {
            return Err(invalid());
        }
        precision = Some(
            chars[start..pos]
                .iter()
                .collect::<String>()
                .parse::<usize>()
                .map_err(|_| invalid())?,
        );
    }
    let kind = chars.get(pos).copied();
    if pos + kind.is_some() as usize != chars.len() {
        return Err(invalid());
    }

    let number = value.as_num().filter(|_| !matches!(value, Value::Bool(_)));
    let body = match (kind, number) {
        (Some('f' | 'F'), Some(n)) => format!("{:.*}", precision.unwrap_or(6), n.as_f64()),
        (Some('%'), Some(n)) => format!("{:.*}%", precision.unwrap_or(6), n.as_f64() * 100.0),
        (Some('d'), Some(crate::value::Num::Int(i))) => i.to_string(),
        (None, Some(n)) if precision.is_some() => {
            format!("{:.*}", precision.unwrap_or(0), n.as_f64())
        }
        (None | Some('s'), _) if kind.is_some() || number.is_none() => {
            let text = value.to_string();
            match precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        (None, Some(crate::value::Num::Float(f))) => format_float(f),
        (None, Some(crate::value::Num::Int(i))) => i.to_string(),
        _ => {
            return Err(RuntimeError::invalid(format!(
                "unknown format code '{}' for object of type '{}'",
                kind.unwrap_or('s'),
                value.type_name()
            )));
        }
    };
    let body = if grouping { group_thousands(&body) } else { body };

    let len = body.chars().count();
    if len >= width {
        return Ok(body);
    }
    let pad = width - len;
    if zero_pad && align.is_none() && number.is_some() {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", body.as_str()),
        };
        return Ok(format!("{sign}{}{digits}", "0".repeat(pad)));
    }
    let default_align = if number.is_some() { '>' } else { '<' };
    let padding = |n: usize| fill.to_string().repeat(n);
    Ok(match align.unwrap_or(default_align) {
        '>' => format!("{}{body}", padding(pad)),
        '^' => format!("{}{body}{}", padding(pad / 2), padding(pad - pad / 2)),
        _ => format!("{body}{}", padding(pad)),
    })
}

fn group_thousands(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac) = match rest.find(['.', '%']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}{frac}")
}

const PATTERN_OPS: &[&str] = &["match", "search", "findall", "replace"];

fn force_pattern(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "force_pattern";
    let op = str_arg(NAME, args, 0)?;
    let pattern = str_arg(NAME, args, 1)?;
    let text = str_arg(NAME, args, 2)?;
    if !PATTERN_OPS.contains(&op) {
        return Err(unknown_operation(NAME, op, PATTERN_OPS));
    }
    if (op == "replace") != (args.len() == 4) {
        let expected = if op == "replace" { 4 } else { 3 };
        return Err(RuntimeError::argument_count(
            &format!("{NAME}('{op}')"),
            expected,
            args.len(),
        ));
    }
    let regex = Regex::new(pattern)
        .map_err(|e| RuntimeError::invalid(format!("invalid pattern '{pattern}': {e}")))?;
    Ok(match op {
        "match" => regex
            .find(text)
            .filter(|m| m.start() == 0)
            .map_or(Value::None, |m| Value::str(m.as_str())),
        "search" => regex.find(text).map_or(Value::None, |m| Value::str(m.as_str())),
        "findall" => Value::list(
            regex
                .captures_iter(text)
                .map(|caps| {
                    let group = |i: usize| Value::str(caps.get(i).map_or("", |m| m.as_str()));
                    match caps.len() {
                        1 => group(0),
                        2 => group(1),
                        n => Value::tuple((1..n).map(group).collect()),
                    }
                })
                .collect(),
        ),
        _ => {
            let replacement = python_replacement(str_arg(NAME, args, 3)?);
            Value::str(regex.replace_all(text, replacement.as_str()).into_owned())
        }
    })
}

/// Translate `\1` group references to the `${1}` form and escape `$`.
fn python_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().is_some_and(char::is_ascii_digit) => {
                let mut group = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    group.push(d);
                    chars.next();
                }
                out.push_str(&format!("${{{group}}}"));
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::str(text)
    }

    fn droid(args: &[Value]) -> Result<Value, RuntimeError> {
        protocol_droid(&mut CallContext::detached(), args)
    }

    #[test]
    fn test_protocol_droid() {
        let code = s("There is no emotion");
        assert_eq!(droid(&[s("uppercase"), code.clone()]).unwrap(), s("THERE IS NO EMOTION"));
        assert_eq!(droid(&[s("reverse"), s("abc")]).unwrap(), s("cba"));
        assert_eq!(droid(&[s("length"), code.clone()]).unwrap(), s("19"));
        assert_eq!(droid(&[s("title"), s("a new hope")]).unwrap(), s("A New Hope"));
        assert_eq!(droid(&[s("capitalize"), s("hELLO")]).unwrap(), s("Hello"));
        assert_eq!(
            droid(&[s("replace"), code.clone(), s("emotion"), s("chaos")]).unwrap(),
            s("There is no chaos")
        );
        assert_eq!(droid(&[s("words"), s(" a  b ")]).unwrap().to_string(), "['a', 'b']");
        assert!(droid(&[s("explode"), code.clone()]).is_err());
        assert!(droid(&[s("replace"), code]).is_err());
    }

    #[test]
    fn test_format_template() {
        let args = [s("Luke"), Value::Int(3)];
        assert_eq!(format_template("{} has {} ships", &args).unwrap(), "Luke has 3 ships");
        assert_eq!(format_template("{1} {0}", &args).unwrap(), "3 Luke");
        assert_eq!(format_template("{{{}}}", &args).unwrap(), "{Luke}");
        assert_eq!(format_template("{:.2f}", &[Value::Float(3.14159)]).unwrap(), "3.14");
        assert_eq!(format_template("[{:>5}]", &[Value::Int(42)]).unwrap(), "[   42]");
        assert_eq!(format_template("[{:<4}]", &[s("ab")]).unwrap(), "[ab  ]");
        assert_eq!(format_template("{:03d}", &[Value::Int(7)]).unwrap(), "007");
        assert_eq!(format_template("{:,}", &[Value::Int(1234567)]).unwrap(), "1,234,567");
        assert!(format_template("{} {}", &[s("one")]).is_err());
        assert!(format_template("{", &[]).is_err());
        assert!(format_template("{:d}", &[s("x")]).is_err());
    }

    #[test]
    fn test_force_pattern() {
        let call = |args: &[Value]| force_pattern(&mut CallContext::detached(), args);
        let text = s("The Force will be with you, always.");
        assert_eq!(call(&[s("match"), s("The"), text.clone()]).unwrap(), s("The"));
        assert_eq!(call(&[s("match"), s("Force"), text.clone()]).unwrap(), Value::None);
        assert_eq!(call(&[s("search"), s("F\\w+"), text.clone()]).unwrap(), s("Force"));
        let words = call(&[s("findall"), s("\\w+"), text.clone()]).unwrap();
        assert_eq!(words.to_string(), "['The', 'Force', 'will', 'be', 'with', 'you', 'always']");
        assert_eq!(
            call(&[s("replace"), s("(\\w+)@(\\w+)"), s("luke@tatooine"), s("\\2:\\1 $")]).unwrap(),
            s("tatooine:luke $")
        );
        let err = call(&[s("search"), s("("), text]).unwrap_err();
        assert_eq!(err.kind, crate::error::RuntimeErrorKind::InvalidArgument);
    }
}
