//! JSON conversion of program data.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

use super::{str_arg, unknown_operation};
use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[RuntimeFunction {
    name: "data_stream",
    signature: "data_stream(operation, value) -> str | value",
    summary: "JSON: stringify, pretty (two-space indent), parse",
    category: "json",
    arity: Arity::Fixed(2),
    call: data_stream,
}];

const JSON_OPS: &[&str] = &["stringify", "pretty", "parse"];

fn data_stream(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let op = str_arg("data_stream", args, 0)?;
    match op {
        "stringify" => stringify(&args[1]).map(Value::str),
        "pretty" => pretty(&args[1]).map(Value::str),
        "parse" => parse(str_arg("data_stream", args, 1)?),
        other => Err(unknown_operation("data_stream", other, JSON_OPS)),
    }
}

/// Single-line JSON with `", "` and `": "` separators.
pub fn stringify(value: &Value) -> Result<String, RuntimeError> {
    write_json(value, SpacedFormatter)
}

pub fn pretty(value: &Value) -> Result<String, RuntimeError> {
    write_json(value, PrettyFormatter::with_indent(b"  "))
}

pub fn parse(text: &str) -> Result<Value, RuntimeError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|json| Value::from_json(&json))
        .map_err(|e| RuntimeError::invalid(format!("invalid JSON: {e}")))
}

fn write_json<F: Formatter>(value: &Value, formatter: F) -> Result<String, RuntimeError> {
    let json = value.to_json()?;
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    json.serialize(&mut serializer)
        .map_err(|e| RuntimeError::invalid(format!("cannot serialize: {e}")))?;
    String::from_utf8(buf).map_err(|e| RuntimeError::invalid(e.to_string()))
}

/// Compact output with a space after each separator.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;

    fn sample() -> Value {
        let dict: Dict = [
            (Value::str("name"), Value::str("Luke")),
            (Value::str("rank"), Value::str("Jedi")),
            (
                Value::str("stats"),
                Value::list(vec![Value::Int(1), Value::Float(2.5), Value::None]),
            ),
        ]
        .into_iter()
        .collect();
        Value::dict(dict)
    }

    #[test]
    fn test_stringify_separators() {
        assert_eq!(
            stringify(&sample()).unwrap(),
            r#"{"name": "Luke", "rank": "Jedi", "stats": [1, 2.5, null]}"#
        );
    }

    #[test]
    fn test_pretty() {
        let text = pretty(&Value::list(vec![Value::Int(1)])).unwrap();
        assert_eq!(text, "[\n  1\n]");
    }

    #[test]
    fn test_parse_round_trip() {
        let value = sample();
        assert_eq!(parse(&stringify(&value).unwrap()).unwrap(), value);
        assert_eq!(parse(&pretty(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn test_scalar_and_text_round_trips() {
        let cases = [
            (Value::Bool(true), "true"),
            (Value::Bool(false), "false"),
            (Value::None, "null"),
            (Value::Float(1.0), "1.0"),
            (Value::Float(-0.25), "-0.25"),
            (Value::Int(-9_007_199_254_740_993), "-9007199254740993"),
            (Value::str(""), r#""""#),
            (Value::str("tab\tquote\"back\\slash\nline"), r#""tab\tquote\"back\\slash\nline""#),
            (Value::str("\u{1}bell"), r#""\u0001bell""#),
            (Value::str("héllo ✓ 🚀"), "\"héllo ✓ 🚀\""),
        ];
        for (value, text) in cases {
            assert_eq!(stringify(&value).unwrap(), text);
            let back = parse(text).unwrap();
            assert_eq!(back, value, "{text}");
            // 1.0 must stay a float, not collapse to an integer.
            assert_eq!(back.type_name(), value.type_name(), "{text}");
        }
    }

    #[test]
    fn test_nested_round_trip() {
        let mut value = Value::list(vec![Value::Int(7)]);
        for depth in 0..20 {
            let dict: Dict = [
                (Value::str(format!("level{depth}")), value),
                (Value::str("empty"), Value::list(Vec::new())),
            ]
            .into_iter()
            .collect();
            value = Value::list(vec![Value::dict(dict)]);
        }
        let text = stringify(&value).unwrap();
        assert_eq!(parse(&text).unwrap(), value);
        assert_eq!(parse(&pretty(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn test_parse_keeps_key_order_and_unicode_escapes() {
        let value = parse(r#"{"z": 1, "a": "\u00e9\ud83d\ude80"}"#).unwrap();
        assert_eq!(stringify(&value).unwrap(), "{\"z\": 1, \"a\": \"é🚀\"}");
    }

    #[test]
    fn test_errors() {
        assert!(parse("{bad").is_err());
        let set = Value::set(vec![Value::Int(1)]).unwrap();
        // Sets serialize as arrays, ranges not at all.
        assert_eq!(stringify(&set).unwrap(), "[1]");
        let err = stringify(&Value::Range { start: 0, stop: 1, step: 1 }).unwrap_err();
        assert_eq!(err.kind, crate::error::RuntimeErrorKind::ArgumentType);
    }
}
