//! Allow-listed primitives of the target language.
//!
//! Only these names, the runtime library and the program's own definitions
//! resolve at run time. Everything else is an undefined name.

use std::cmp::Ordering;

use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::interp::methods::sort_values;
use crate::interp::ops::{binary_op, collect_items, compare_values, iterate};
use crate::registry::{Arity, RuntimeFunction};
use crate::target::ir::BinaryOp;
use crate::value::{Dict, Num, Value, range_len};

macro_rules! primitive {
    ($name:literal, $signature:literal, $arity:expr, $call:path) => {
        RuntimeFunction {
            name: $name,
            signature: $signature,
            summary: "",
            category: "primitive",
            arity: $arity,
            call: $call,
        }
    };
}

pub static PRIMITIVES: &[RuntimeFunction] = &[
    primitive!("print", "print(values...)", Arity::Variadic { min: 0 }, print),
    primitive!("len", "len(x) -> int", Arity::Fixed(1), len),
    primitive!("str", "str([x]) -> str", Arity::Range(0, 1), to_str),
    primitive!("int", "int([x]) -> int", Arity::Range(0, 1), to_int),
    primitive!("float", "float([x]) -> float", Arity::Range(0, 1), to_float),
    primitive!("bool", "bool([x]) -> bool", Arity::Range(0, 1), to_bool),
    primitive!("list", "list([iterable]) -> list", Arity::Range(0, 1), to_list),
    primitive!("dict", "dict([pairs]) -> dict", Arity::Range(0, 1), to_dict),
    primitive!("tuple", "tuple([iterable]) -> tuple", Arity::Range(0, 1), to_tuple),
    primitive!("set", "set([iterable]) -> set", Arity::Range(0, 1), to_set),
    primitive!("range", "range([start,] stop[, step]) -> range", Arity::Range(1, 3), range),
    primitive!("abs", "abs(x) -> number", Arity::Fixed(1), abs),
    primitive!("min", "min(iterable | values...) -> value", Arity::Variadic { min: 1 }, min),
    primitive!("max", "max(iterable | values...) -> value", Arity::Variadic { min: 1 }, max),
    primitive!("sum", "sum(iterable[, start]) -> number", Arity::Range(1, 2), sum),
    primitive!("round", "round(x[, digits]) -> number", Arity::Range(1, 2), round),
    primitive!("sorted", "sorted(iterable) -> list", Arity::Fixed(1), sorted),
    primitive!("enumerate", "enumerate(iterable[, start]) -> list", Arity::Range(1, 2), enumerate),
    primitive!("zip", "zip(iterables...) -> list", Arity::Variadic { min: 0 }, zip),
];

/// Look up an allow-listed primitive.
pub fn lookup(name: &str) -> Option<&'static RuntimeFunction> {
    PRIMITIVES.iter().find(|p| p.name == name)
}

fn print(ctx: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let line = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
    ctx.output.write(&line);
    ctx.output.write("\n");
    Ok(Value::None)
}

fn len(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) | Value::Set(items) | Value::Stack(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(dict) => dict.borrow().len(),
        Value::Queue(items) => items.borrow().len(),
        range @ Value::Range { .. } => range_len(range),
        other => {
            return Err(RuntimeError::argument_type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(n as i64))
}

fn to_str(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(match args.first() {
        Some(Value::Str(s)) => Value::Str(s.clone()),
        Some(v) => Value::str(v.to_string()),
        None => Value::str(""),
    })
}

fn float_to_int(f: f64) -> Result<i64, RuntimeError> {
    if f.is_nan() {
        return Err(RuntimeError::invalid("cannot convert float NaN to integer"));
    }
    let truncated = f.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(RuntimeError::overflow());
    }
    Ok(truncated as i64)
}

fn to_int(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let Some(value) = args.first() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Str(s) => {
            let cleaned = s.trim().replace('_', "");
            cleaned.parse::<i64>().map(Value::Int).map_err(|_| {
                RuntimeError::invalid(format!("invalid literal for int() with base 10: {}", value.repr()))
            })
        }
        other => match other.as_num() {
            Some(Num::Int(i)) => Ok(Value::Int(i)),
            Some(Num::Float(f)) => float_to_int(f).map(Value::Int),
            None => Err(RuntimeError::argument_type(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

fn to_float(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let Some(value) = args.first() else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Str(s) => {
            let text = s.trim().to_ascii_lowercase();
            let parsed = match text.trim_start_matches(['+', '-']) {
                "inf" | "infinity" | "nan" => text.replace("infinity", "inf").parse::<f64>(),
                _ => text.replace('_', "").parse::<f64>(),
            };
            parsed.map(Value::Float).map_err(|_| {
                RuntimeError::invalid(format!("could not convert string to float: {}", value.repr()))
            })
        }
        other => other
            .as_num()
            .map(|n| Value::Float(n.as_f64()))
            .ok_or_else(|| {
                RuntimeError::argument_type(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))
            }),
    }
}

fn to_bool(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(args.first().is_some_and(Value::truthy)))
}

fn items_or_empty(args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    match args.first() {
        Some(iterable) => collect_items(iterable),
        None => Ok(Vec::new()),
    }
}

fn to_list(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::list(items_or_empty(args)?))
}

fn to_tuple(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::tuple(items_or_empty(args)?))
}

fn to_set(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Value::set(items_or_empty(args)?)
}

fn to_dict(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut dict = Dict::new();
    match args.first() {
        None => {}
        Some(Value::Dict(source)) => dict = source.borrow().clone(),
        Some(pairs) => {
            for (i, pair) in collect_items(pairs)?.into_iter().enumerate() {
                let items = collect_items(&pair)?;
                let [key, value]: [Value; 2] = items.try_into().map_err(|items: Vec<Value>| {
                    RuntimeError::invalid(format!(
                        "dictionary update sequence element #{i} has length {}; 2 is required",
                        items.len()
                    ))
                })?;
                dict.insert(key, value)?;
            }
        }
    }
    Ok(Value::dict(dict))
}

fn range(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut bounds = [0i64, 0, 1];
    for (i, arg) in args.iter().enumerate() {
        let Some(Num::Int(n)) = arg.as_num() else {
            return Err(RuntimeError::argument_type(format!(
                "'{}' object cannot be interpreted as an integer",
                arg.type_name()
            )));
        };
        bounds[i] = n;
    }
    let (start, stop, step) = match args.len() {
        1 => (0, bounds[0], 1),
        _ => (bounds[0], bounds[1], bounds[2]),
    };
    if step == 0 {
        return Err(RuntimeError::invalid("range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

fn abs(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0].as_num() {
        Some(Num::Int(i)) => i.checked_abs().map(Value::Int).ok_or_else(RuntimeError::overflow),
        Some(Num::Float(f)) => Ok(Value::Float(f.abs())),
        None => Err(RuntimeError::argument_type(format!(
            "bad operand type for abs(): '{}'",
            args[0].type_name()
        ))),
    }
}

fn extreme(name: &str, args: &[Value], keep: Ordering) -> Result<Value, RuntimeError> {
    let candidates = if args.len() == 1 {
        collect_items(&args[0])?
    } else {
        args.to_vec()
    };
    let mut best: Option<Value> = None;
    for candidate in candidates {
        best = Some(match best {
            Some(current) if compare_values(&candidate, &current)? != keep => current,
            _ => candidate,
        });
    }
    best.ok_or_else(|| RuntimeError::invalid(format!("{name}() arg is an empty sequence")))
}

fn min(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    extreme("min", args, Ordering::Less)
}

fn max(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    extreme("max", args, Ordering::Greater)
}

fn sum(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    if matches!(total, Value::Str(_)) {
        return Err(RuntimeError::argument_type(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    for item in iterate(&args[0])? {
        total = binary_op(BinaryOp::Add, &total, &item)?;
    }
    Ok(total)
}

fn round(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let number = args[0].as_num().ok_or_else(|| {
        RuntimeError::argument_type(format!(
            "type {} doesn't define __round__ method",
            args[0].type_name()
        ))
    })?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(d) => match d.as_num() {
            Some(Num::Int(d)) => Some(d),
            _ => {
                return Err(RuntimeError::argument_type(format!(
                    "'{}' object cannot be interpreted as an integer",
                    d.type_name()
                )));
            }
        },
    };
    match (number, digits) {
        (Num::Int(i), _) => Ok(Value::Int(i)),
        (Num::Float(f), None) => float_to_int(f.round_ties_even()).map(Value::Int),
        (Num::Float(f), Some(d)) => {
            let scale = 10f64.powi(d.clamp(-308, 308) as i32);
            let scaled = f * scale;
            if !scaled.is_finite() {
                return Ok(Value::Float(f));
            }
            Ok(Value::Float(scaled.round_ties_even() / scale))
        }
    }
}

fn sorted(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut items = collect_items(&args[0])?;
    sort_values(&mut items)?;
    Ok(Value::list(items))
}

fn enumerate(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let start = match args.get(1).map(Value::as_num) {
        None => 0,
        Some(Some(Num::Int(i))) => i,
        Some(_) => {
            return Err(RuntimeError::argument_type("enumerate() start must be an integer"));
        }
    };
    let mut pairs = Vec::new();
    for (offset, item) in collect_items(&args[0])?.into_iter().enumerate() {
        let index = start
            .checked_add(offset as i64)
            .ok_or_else(RuntimeError::overflow)?;
        pairs.push(Value::tuple(vec![Value::Int(index), item]));
    }
    Ok(Value::list(pairs))
}

fn zip(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let columns = args.iter().map(collect_items).collect::<Result<Vec<_>, _>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    Ok(Value::list(
        (0..rows)
            .map(|row| Value::tuple(columns.iter().map(|col| col[row].clone()).collect()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let primitive = lookup(name).expect("primitive exists");
        primitive.invoke(&mut CallContext::detached(), args)
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().map(|&i| Value::Int(i)).collect())
    }

    #[test]
    fn test_print_writes_output() {
        let mut ctx = CallContext::detached();
        print(&mut ctx, &[Value::str("Hello"), Value::Int(3), Value::None]).unwrap();
        assert_eq!(ctx.output.as_str(), "Hello 3 None\n");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", &[Value::str(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call("int", &[Value::Float(-3.9)]).unwrap(), Value::Int(-3));
        assert_eq!(call("float", &[Value::str("2.5")]).unwrap(), Value::Float(2.5));
        assert_eq!(call("str", &[Value::Float(2.0)]).unwrap(), Value::str("2.0"));
        assert_eq!(call("bool", &[Value::list(vec![])]).unwrap(), Value::Bool(false));
        let err = call("int", &[Value::str("abc")]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidArgument);
        assert_eq!(err.message, "invalid literal for int() with base 10: 'abc'");
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(call("sum", &[ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(call("max", &[ints(&[4, 9, 2])]).unwrap(), Value::Int(9));
        assert_eq!(call("min", &[Value::Int(4), Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(call("len", &[Value::str("héllo")]).unwrap(), Value::Int(5));
        assert!(call("max", &[ints(&[])]).is_err());
        assert_eq!(call("sorted", &[ints(&[3, 1, 2])]).unwrap(), ints(&[1, 2, 3]));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(call("round", &[Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(call("round", &[Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(
            call("round", &[Value::Float(3.14159), Value::Int(2)]).unwrap(),
            Value::Float(3.14)
        );
    }

    #[test]
    fn test_range_and_pairs() {
        assert_eq!(
            call("range", &[Value::Int(2), Value::Int(8), Value::Int(3)]).unwrap(),
            Value::Range { start: 2, stop: 8, step: 3 }
        );
        assert!(call("range", &[Value::Int(1), Value::Int(2), Value::Int(0)]).is_err());
        let pairs = call("enumerate", &[Value::list(vec![Value::str("a")]), Value::Int(1)]).unwrap();
        assert_eq!(pairs.to_string(), "[(1, 'a')]");
        let zipped = call("zip", &[ints(&[1, 2, 3]), Value::str("ab")]).unwrap();
        assert_eq!(zipped.to_string(), "[(1, 'a'), (2, 'b')]");
        let dict = call("dict", &[zipped]).unwrap();
        assert_eq!(dict.to_string(), "{1: 'a', 2: 'b'}");
    }

    #[test]
    fn test_arity_is_checked() {
        let err = call("len", &[]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentCount);
    }
}
