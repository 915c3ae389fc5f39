//! Methods of built-in value types.

use std::cmp::Ordering;

use super::ops::{collect_items, compare_values};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::library::collections::{queue_method, stack_method};
use crate::library::text::{capitalize, format_template, title};
use crate::value::{Dict, Num, Value};

const STR_METHODS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "join", "replace", "format",
    "startswith", "endswith", "find", "count", "title", "capitalize", "isdigit", "isalpha",
    "isupper", "islower",
];
const LIST_METHODS: &[&str] = &[
    "append", "pop", "insert", "remove", "index", "count", "reverse", "sort", "extend", "copy",
    "clear",
];
const TUPLE_METHODS: &[&str] = &["index", "count"];
const DICT_METHODS: &[&str] = &[
    "keys", "values", "items", "get", "pop", "update", "copy", "clear", "setdefault",
];
const SET_METHODS: &[&str] = &["add", "remove", "discard", "clear", "copy"];
const STACK_METHODS: &[&str] = &["push", "pop", "peek", "size", "is_empty"];
const QUEUE_METHODS: &[&str] = &["enqueue", "dequeue", "front", "size", "is_empty"];

/// Whether `receiver` has a built-in method called `name`.
pub fn has_method(receiver: &Value, name: &str) -> bool {
    let table = match receiver {
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::Stack(_) => STACK_METHODS,
        Value::Queue(_) => QUEUE_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

fn arity(method: &str, args: &[Value], min: usize, max: usize) -> Result<(), RuntimeError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    };
    Err(RuntimeError::argument_count(method, expected, args.len()))
}

fn str_of<'a>(method: &str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(RuntimeError::argument_type(format!(
            "{method}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

fn int_of(method: &str, value: &Value) -> Result<i64, RuntimeError> {
    match value.as_num() {
        Some(Num::Int(i)) => Ok(i),
        _ => Err(RuntimeError::argument_type(format!(
            "{method}() argument must be an integer, not {}",
            value.type_name()
        ))),
    }
}

/// Call a built-in method. The receiver must pass [`has_method`].
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    match receiver {
        Value::Str(s) => str_method(s, name, args),
        Value::List(_) => list_method(receiver, name, args),
        Value::Tuple(items) => sequence_method(items, name, args),
        Value::Dict(_) => dict_method(receiver, name, args),
        Value::Set(_) => set_method(receiver, name, args),
        Value::Stack(stack) => stack_method(stack, name, args)
            .unwrap_or_else(|| Err(RuntimeError::missing_attribute("stack", name))),
        Value::Queue(queue) => queue_method(queue, name, args)
            .unwrap_or_else(|| Err(RuntimeError::missing_attribute("queue", name))),
        other => Err(RuntimeError::missing_attribute(&other.type_name(), name)),
    }
}

fn str_method(s: &str, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let method = format!("str.{name}");
    let method = method.as_str();
    let fixed = |n| arity(method, args, n, n);
    Ok(match name {
        "upper" | "lower" | "title" | "capitalize" | "isdigit" | "isalpha" | "isupper"
        | "islower" => {
            fixed(0)?;
            match name {
                "upper" => Value::str(s.to_uppercase()),
                "lower" => Value::str(s.to_lowercase()),
                "title" => Value::str(title(s)),
                "capitalize" => Value::str(capitalize(s)),
                "isdigit" => Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
                "isalpha" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)),
                "isupper" => Value::Bool(
                    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_lowercase),
                ),
                _ => Value::Bool(
                    s.chars().any(char::is_alphabetic) && !s.chars().any(char::is_uppercase),
                ),
            }
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(method, args, 0, 1)?;
            let chars: Option<Vec<char>> = match args.first() {
                None | Some(Value::None) => None,
                Some(v) => Some(str_of(method, v)?.chars().collect()),
            };
            let pattern = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            Value::str(match name {
                "strip" => s.trim_matches(pattern),
                "lstrip" => s.trim_start_matches(pattern),
                _ => s.trim_end_matches(pattern),
            })
        }
        "split" => {
            arity(method, args, 0, 1)?;
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::None) => s.split_whitespace().map(Value::str).collect(),
                Some(sep) => {
                    let sep = str_of(method, sep)?;
                    if sep.is_empty() {
                        return Err(RuntimeError::invalid("empty separator"));
                    }
                    s.split(sep).map(Value::str).collect()
                }
            };
            Value::list(parts)
        }
        "join" => {
            fixed(1)?;
            let mut pieces = Vec::new();
            for (i, item) in collect_items(&args[0])?.iter().enumerate() {
                match item {
                    Value::Str(p) => pieces.push(p.to_string()),
                    other => {
                        return Err(RuntimeError::argument_type(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )));
                    }
                }
            }
            Value::str(pieces.join(s))
        }
        "replace" => {
            fixed(2)?;
            Value::str(s.replace(str_of(method, &args[0])?, str_of(method, &args[1])?))
        }
        "format" => Value::str(format_template(s, args)?),
        "startswith" | "endswith" => {
            fixed(1)?;
            let affix = str_of(method, &args[0])?;
            Value::Bool(if name == "startswith" {
                s.starts_with(affix)
            } else {
                s.ends_with(affix)
            })
        }
        "find" => {
            fixed(1)?;
            let needle = str_of(method, &args[0])?;
            Value::Int(match s.find(needle) {
                Some(byte) => s[..byte].chars().count() as i64,
                None => -1,
            })
        }
        "count" => {
            fixed(1)?;
            let needle = str_of(method, &args[0])?;
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Value::Int(count as i64)
        }
        _ => return Err(RuntimeError::missing_attribute("str", name)),
    })
}

fn position(items: &[Value], target: &Value, type_name: &str) -> Result<usize, RuntimeError> {
    items.iter().position(|v| v == target).ok_or_else(|| {
        RuntimeError::invalid(format!("{type_name}.index(x): x not in {type_name}"))
    })
}

fn sequence_method(items: &[Value], name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let method = format!("tuple.{name}");
    arity(&method, args, 1, 1)?;
    match name {
        "index" => Ok(Value::Int(position(items, &args[0], "tuple")? as i64)),
        "count" => Ok(Value::Int(items.iter().filter(|v| **v == args[0]).count() as i64)),
        _ => Err(RuntimeError::missing_attribute("tuple", name)),
    }
}

/// Sort in place with the value order, reporting the first incomparable pair.
pub fn sort_values(items: &mut [Value]) -> Result<(), RuntimeError> {
    let mut failure = None;
    items.sort_by(|a, b| {
        compare_values(a, b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    failure.map_or(Ok(()), Err)
}

fn list_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::List(list) = receiver else {
        return Err(RuntimeError::missing_attribute(&receiver.type_name(), name));
    };
    let method = format!("list.{name}");
    let method = method.as_str();
    // Arguments are collected before borrowing, so `a.extend(a)` works.
    let extension = if name == "extend" {
        arity(method, args, 1, 1)?;
        Some(collect_items(&args[0])?)
    } else {
        None
    };
    let mut items = list.borrow_mut();
    Ok(match name {
        "append" => {
            arity(method, args, 1, 1)?;
            items.push(args[0].clone());
            Value::None
        }
        "extend" => {
            items.extend(extension.unwrap_or_default());
            Value::None
        }
        "pop" => {
            arity(method, args, 0, 1)?;
            if items.is_empty() {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::IndexOutOfRange,
                    "pop from empty list",
                ));
            }
            let len = items.len() as i64;
            let index = match args.first() {
                Some(i) => int_of(method, i)?,
                None => len - 1,
            };
            let resolved = if index < 0 { index + len } else { index };
            if !(0..len).contains(&resolved) {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::IndexOutOfRange,
                    "pop index out of range",
                ));
            }
            items.remove(resolved as usize)
        }
        "insert" => {
            arity(method, args, 2, 2)?;
            let len = items.len() as i64;
            let index = int_of(method, &args[0])?;
            let resolved = (if index < 0 { index + len } else { index }).clamp(0, len);
            items.insert(resolved as usize, args[1].clone());
            Value::None
        }
        "remove" => {
            arity(method, args, 1, 1)?;
            let index = items.iter().position(|v| *v == args[0]).ok_or_else(|| {
                RuntimeError::invalid("list.remove(x): x not in list")
            })?;
            items.remove(index);
            Value::None
        }
        "index" => {
            arity(method, args, 1, 1)?;
            Value::Int(position(&items, &args[0], "list")? as i64)
        }
        "count" => {
            arity(method, args, 1, 1)?;
            Value::Int(items.iter().filter(|v| **v == args[0]).count() as i64)
        }
        "reverse" => {
            arity(method, args, 0, 0)?;
            items.reverse();
            Value::None
        }
        "sort" => {
            arity(method, args, 0, 0)?;
            sort_values(&mut items)?;
            Value::None
        }
        "copy" => {
            arity(method, args, 0, 0)?;
            Value::list(items.clone())
        }
        "clear" => {
            arity(method, args, 0, 0)?;
            items.clear();
            Value::None
        }
        _ => return Err(RuntimeError::missing_attribute("list", name)),
    })
}

fn dict_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Dict(dict) = receiver else {
        return Err(RuntimeError::missing_attribute(&receiver.type_name(), name));
    };
    let method = format!("dict.{name}");
    let method = method.as_str();
    if name == "update" {
        arity(method, args, 1, 1)?;
        let Value::Dict(other) = &args[0] else {
            return Err(RuntimeError::argument_type(format!(
                "dict.update() argument must be a dict, not {}",
                args[0].type_name()
            )));
        };
        let pairs: Vec<(Value, Value)> = other.borrow().iter().cloned().collect();
        let mut target = dict.borrow_mut();
        for (k, v) in pairs {
            target.insert(k, v)?;
        }
        return Ok(Value::None);
    }
    let mut dict = dict.borrow_mut();
    Ok(match name {
        "keys" | "values" | "items" | "copy" | "clear" => {
            arity(method, args, 0, 0)?;
            match name {
                "keys" => Value::list(dict.keys().cloned().collect()),
                "values" => Value::list(dict.values().cloned().collect()),
                "items" => Value::list(
                    dict.iter()
                        .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                        .collect(),
                ),
                "copy" => Value::dict(dict.clone()),
                _ => {
                    *dict = Dict::new();
                    Value::None
                }
            }
        }
        "get" => {
            arity(method, args, 1, 2)?;
            args[0].check_hashable()?;
            dict.get(&args[0])
                .cloned()
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None))
        }
        "pop" => {
            arity(method, args, 1, 2)?;
            args[0].check_hashable()?;
            match (dict.remove(&args[0]), args.get(1)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(RuntimeError::new(RuntimeErrorKind::MissingKey, args[0].repr()));
                }
            }
        }
        "setdefault" => {
            arity(method, args, 1, 2)?;
            match dict.get(&args[0]) {
                Some(existing) => existing.clone(),
                None => {
                    let value = args.get(1).cloned().unwrap_or(Value::None);
                    dict.insert(args[0].clone(), value.clone())?;
                    value
                }
            }
        }
        _ => return Err(RuntimeError::missing_attribute("dict", name)),
    })
}

fn set_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Set(set) = receiver else {
        return Err(RuntimeError::missing_attribute(&receiver.type_name(), name));
    };
    let method = format!("set.{name}");
    let method = method.as_str();
    if name == "copy" {
        arity(method, args, 0, 0)?;
        return Value::set(set.borrow().clone());
    }
    let mut items = set.borrow_mut();
    Ok(match name {
        "clear" => {
            arity(method, args, 0, 0)?;
            items.clear();
            Value::None
        }
        "add" | "remove" | "discard" => {
            arity(method, args, 1, 1)?;
            args[0].check_hashable()?;
            let found = items.iter().position(|v| *v == args[0]);
            match (name, found) {
                ("add", None) => items.push(args[0].clone()),
                ("remove" | "discard", Some(i)) => {
                    items.remove(i);
                }
                ("remove", None) => {
                    return Err(RuntimeError::new(RuntimeErrorKind::MissingKey, args[0].repr()));
                }
                _ => {}
            }
            Value::None
        }
        _ => return Err(RuntimeError::missing_attribute("set", name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::str(text)
    }

    #[test]
    fn test_string_methods() {
        let text = s("  The Force  ");
        assert_eq!(call_method(&text, "strip", &[]).unwrap(), s("The Force"));
        assert_eq!(
            call_method(&s("a,b,c"), "split", &[s(",")]).unwrap().to_string(),
            "['a', 'b', 'c']"
        );
        assert_eq!(
            call_method(&s("-"), "join", &[Value::list(vec![s("x"), s("y")])]).unwrap(),
            s("x-y")
        );
        assert_eq!(call_method(&s("héllo"), "find", &[s("l")]).unwrap(), Value::Int(2));
        assert_eq!(
            call_method(&s("{} of {}"), "format", &[Value::Int(1), Value::Int(2)]).unwrap(),
            s("1 of 2")
        );
        assert!(call_method(&s("-"), "join", &[Value::list(vec![Value::Int(1)])]).is_err());
        assert!(call_method(&s("x"), "upper", &[s("extra")]).is_err());
    }

    #[test]
    fn test_list_methods() {
        let list = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        call_method(&list, "sort", &[]).unwrap();
        assert_eq!(list.to_string(), "[1, 2, 3]");
        assert_eq!(call_method(&list, "pop", &[Value::Int(0)]).unwrap(), Value::Int(1));
        call_method(&list, "extend", &[list.clone()]).unwrap();
        assert_eq!(list.to_string(), "[2, 3, 2, 3]");
        let err = call_method(&list, "remove", &[Value::Int(9)]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidArgument);
        let mixed = Value::list(vec![Value::Int(1), s("a")]);
        assert!(call_method(&mixed, "sort", &[]).is_err());
    }

    #[test]
    fn test_dict_methods() {
        let dict = Value::dict(Dict::new());
        call_method(&dict, "setdefault", &[s("a"), Value::Int(1)]).unwrap();
        assert_eq!(call_method(&dict, "get", &[s("a")]).unwrap(), Value::Int(1));
        assert_eq!(call_method(&dict, "get", &[s("b"), Value::Int(0)]).unwrap(), Value::Int(0));
        assert_eq!(call_method(&dict, "items", &[]).unwrap().to_string(), "[('a', 1)]");
        let err = call_method(&dict, "pop", &[s("zzz")]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::MissingKey);
    }

    #[test]
    fn test_set_methods() {
        let set = Value::set(vec![Value::Int(1)]).unwrap();
        call_method(&set, "add", &[Value::Int(1)]).unwrap();
        call_method(&set, "add", &[Value::Int(2)]).unwrap();
        assert_eq!(set.to_string(), "{1, 2}");
        call_method(&set, "discard", &[Value::Int(9)]).unwrap();
        assert!(call_method(&set, "remove", &[Value::Int(9)]).is_err());
    }

    #[test]
    fn test_method_tables() {
        assert!(has_method(&s(""), "upper"));
        assert!(!has_method(&s(""), "push"));
        assert!(has_method(&Value::Stack(Default::default()), "push"));
        assert!(!has_method(&Value::Int(1), "upper"));
    }
}
