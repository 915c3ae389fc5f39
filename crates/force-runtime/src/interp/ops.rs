//! Operators, iteration, indexing and slicing over runtime values.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::target::ir::{BinaryOp, CompareOp, UnaryOp};
use crate::value::{Num, Value, range_len};

/// Largest string or list a repetition or a materialized range may build.
pub const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Iterator over anything a `for` loop accepts.
pub enum ValueIter {
    Range { next: i64, stop: i64, step: i64 },
    Items(std::vec::IntoIter<Value>),
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Range { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let current = *next;
                // Past the end on overflow.
                *next = next.checked_add(*step).unwrap_or(*stop);
                Some(Value::Int(current))
            }
            ValueIter::Items(items) => items.next(),
        }
    }
}

pub fn iterate(value: &Value) -> Result<ValueIter, RuntimeError> {
    let items = match value {
        Value::Range { start, stop, step } => {
            return Ok(ValueIter::Range {
                next: *start,
                stop: *stop,
                step: *step,
            });
        }
        Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
        Value::List(items) | Value::Set(items) | Value::Stack(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Queue(items) => items.borrow().iter().cloned().collect(),
        Value::Dict(dict) => dict.borrow().keys().cloned().collect(),
        other => {
            return Err(RuntimeError::argument_type(format!(
                "'{}' object is not iterable",
                other.type_name()
            )));
        }
    };
    Ok(ValueIter::Items(Vec::into_iter(items)))
}

/// All items of an iterable, materialized.
pub fn collect_items(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    if range_len(value) > MAX_SEQUENCE_LEN {
        return Err(RuntimeError::new(
            RuntimeErrorKind::Overflow,
            "range is too large to materialize",
        ));
    }
    Ok(iterate(value)?.collect())
}

fn type_mismatch(symbol: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::argument_type(format!(
        "unsupported operand type(s) for {symbol}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

pub fn unary_op(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.truthy()));
    }
    let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
    match (op, operand.as_num()) {
        (UnaryOp::Neg, Some(Num::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(RuntimeError::overflow),
        (UnaryOp::Neg, Some(Num::Float(f))) => Ok(Value::Float(-f)),
        (_, Some(Num::Int(i))) => Ok(Value::Int(i)),
        (_, Some(Num::Float(f))) => Ok(Value::Float(f)),
        _ => Err(RuntimeError::argument_type(format!(
            "bad operand type for unary {symbol}: '{}'",
            operand.type_name()
        ))),
    }
}

pub fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_num(), right.as_num()) {
        return numeric(op, a, b);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Sub, Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            let items = a.borrow().iter().filter(|v| !b.contains(v)).cloned().collect();
            Ok(Value::Set(Rc::new(std::cell::RefCell::new(items))))
        }
        (BinaryOp::Mul, seq, Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), seq)
            if matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_)) =>
        {
            repeat(seq, *n)
        }
        _ => Err(type_mismatch(op.symbol(), left, right)),
    }
}

fn repeat(seq: &Value, times: i64) -> Result<Value, RuntimeError> {
    let times = times.max(0) as usize;
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    };
    if len.saturating_mul(times) > MAX_SEQUENCE_LEN {
        return Err(RuntimeError::new(
            RuntimeErrorKind::Overflow,
            "repeated sequence is too large",
        ));
    }
    Ok(match seq {
        Value::Str(s) => Value::str(s.repeat(times)),
        Value::List(items) => {
            let items = items.borrow();
            Value::list((0..times).flat_map(|_| items.iter().cloned()).collect())
        }
        Value::Tuple(items) => Value::tuple((0..times).flat_map(|_| items.iter().cloned()).collect()),
        other => other.clone(),
    })
}

fn numeric(op: BinaryOp, a: Num, b: Num) -> Result<Value, RuntimeError> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        return int_op(op, x, y);
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let value = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            let r = x % y;
            if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            let result = x.powf(y);
            if result.is_nan() && !x.is_nan() && !y.is_nan() {
                return Err(RuntimeError::invalid("negative number cannot be raised to a fractional power"));
            }
            result
        }
    };
    Ok(Value::Float(value))
}

fn int_op(op: BinaryOp, x: i64, y: i64) -> Result<Value, RuntimeError> {
    let checked = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        BinaryOp::Div => {
            if y == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinaryOp::FloorDiv | BinaryOp::Mod => {
            if y == 0 {
                return Err(RuntimeError::division_by_zero());
            }
            let (q, r) = (x.checked_div(y), x.checked_rem(y));
            match (q, r) {
                (Some(q), Some(r)) => {
                    // Floor toward negative infinity.
                    let adjust = r != 0 && (r < 0) != (y < 0);
                    if op == BinaryOp::FloorDiv {
                        Some(if adjust { q - 1 } else { q })
                    } else {
                        Some(if adjust { r + y } else { r })
                    }
                }
                _ => None,
            }
        }
        BinaryOp::Pow => {
            if y < 0 {
                if x == 0 {
                    return Err(RuntimeError::division_by_zero());
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            u32::try_from(y).ok().and_then(|exp| x.checked_pow(exp))
        }
    };
    checked.map(Value::Int).ok_or_else(RuntimeError::overflow)
}

/// Total order used by `<`, `sorted`, `min` and `max`.
pub fn compare_values(left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_num(), right.as_num()) {
        return Ok(match (a, b) {
            (Num::Int(x), Num::Int(y)) => x.cmp(&y),
            (x, y) => x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal),
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => compare_sequences(&a.borrow(), &b.borrow()),
        (Value::Tuple(a), Value::Tuple(b)) => compare_sequences(a, b),
        _ => Err(RuntimeError::argument_type(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Result<Ordering, RuntimeError> {
    for (x, y) in a.iter().zip(b) {
        if x != y {
            return compare_values(x, y);
        }
    }
    Ok(a.len().cmp(&b.len()))
}

fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b))
        | (Value::Set(a), Value::Set(b))
        | (Value::Stack(a), Value::Stack(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(_), _) | (_, Value::Bool(_)) => false,
        _ => std::mem::discriminant(left) == std::mem::discriminant(right) && left == right,
    }
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    Ok(match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Lt => compare_values(left, right)? == Ordering::Less,
        CompareOp::Le => compare_values(left, right)? != Ordering::Greater,
        CompareOp::Gt => compare_values(left, right)? == Ordering::Greater,
        CompareOp::Ge => compare_values(left, right)? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
        CompareOp::Is => identical(left, right),
        CompareOp::IsNot => !identical(left, right),
    })
}

pub fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(RuntimeError::argument_type(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Dict(dict) => Ok(dict.borrow().contains_key(item)),
        Value::Range { start, stop, step } => Ok(match item.as_num() {
            Some(Num::Int(i)) => {
                let in_bounds = if *step > 0 {
                    *start <= i && i < *stop
                } else {
                    *stop < i && i <= *start
                };
                in_bounds && (i - start) % step == 0
            }
            _ => false,
        }),
        other => Ok(iterate(other)?.any(|v| v == *item)),
    }
}

fn index_of(len: usize, index: &Value, what: &str) -> Result<usize, RuntimeError> {
    let Some(Num::Int(i)) = index.as_num() else {
        return Err(RuntimeError::argument_type(format!(
            "{what} indices must be integers, not {}",
            index.type_name()
        )));
    };
    let len = len as i64;
    let resolved = if i < 0 { i + len } else { i };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(RuntimeError::new(
            RuntimeErrorKind::IndexOutOfRange,
            format!("{what} index out of range"),
        ))
    }
}

fn missing_key(key: &Value) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::MissingKey, key.repr())
}

pub fn get_item(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            Ok(items[index_of(items.len(), index, "list")?].clone())
        }
        Value::Tuple(items) => Ok(items[index_of(items.len(), index, "tuple")?].clone()),
        Value::Str(s) => {
            let count = s.chars().count();
            let i = index_of(count, index, "string")?;
            Ok(Value::str(s.chars().nth(i).map(String::from).unwrap_or_default()))
        }
        Value::Range { start, step, .. } => {
            let i = index_of(crate::value::range_len(object), index, "range object")?;
            Ok(Value::Int(start + step * i as i64))
        }
        Value::Dict(dict) => {
            index.check_hashable()?;
            dict.borrow().get(index).cloned().ok_or_else(|| missing_key(index))
        }
        other => Err(RuntimeError::argument_type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

pub fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = index_of(items.len(), index, "list assignment")?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(dict) => dict.borrow_mut().insert(index.clone(), value),
        other => Err(RuntimeError::argument_type(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

fn slice_bound(value: Option<&Value>) -> Result<Option<i64>, RuntimeError> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(v) => match v.as_num() {
            Some(Num::Int(i)) => Ok(Some(i)),
            _ => Err(RuntimeError::argument_type(
                "slice indices must be integers or None",
            )),
        },
    }
}

/// Positions selected by `[start:stop:step]` over a sequence of `len` items.
pub fn slice_indices(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, RuntimeError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::invalid("slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };
    let (start, stop) = if step > 0 {
        (
            start.map_or(0, |s| clamp(s, 0, len)),
            stop.map_or(len, |s| clamp(s, 0, len)),
        )
    } else {
        (
            start.map_or(len - 1, |s| clamp(s, -1, len - 1)),
            stop.map_or(-1, |s| clamp(s, -1, len - 1)),
        )
    };
    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        indices.push(i as usize);
        i += step;
    }
    Ok(indices)
}

pub fn slice(
    object: &Value,
    start: Option<&Value>,
    stop: Option<&Value>,
    step: Option<&Value>,
) -> Result<Value, RuntimeError> {
    let (start, stop, step) = (slice_bound(start)?, slice_bound(stop)?, slice_bound(step)?);
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let picked = slice_indices(items.len(), start, stop, step)?;
            Ok(Value::list(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let picked = slice_indices(items.len(), start, stop, step)?;
            Ok(Value::tuple(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), start, stop, step)?;
            Ok(Value::str(picked.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        other => Err(RuntimeError::argument_type(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn test_python_division() {
        assert_eq!(binary_op(BinaryOp::FloorDiv, &int(-7), &int(2)).unwrap(), int(-4));
        assert_eq!(binary_op(BinaryOp::Mod, &int(-7), &int(2)).unwrap(), int(1));
        assert_eq!(binary_op(BinaryOp::Mod, &int(7), &int(-2)).unwrap(), int(-1));
        assert_eq!(binary_op(BinaryOp::Div, &int(1), &int(4)).unwrap(), Value::Float(0.25));
        assert_eq!(
            binary_op(BinaryOp::Mod, &Value::Float(-1.5), &int(1)).unwrap(),
            Value::Float(0.5)
        );
        let err = binary_op(BinaryOp::FloorDiv, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
    }

    #[test]
    fn test_overflow_and_power() {
        let err = binary_op(BinaryOp::Mul, &int(i64::MAX), &int(2)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Overflow);
        assert_eq!(binary_op(BinaryOp::Pow, &int(2), &int(-1)).unwrap(), Value::Float(0.5));
        assert_eq!(binary_op(BinaryOp::Pow, &int(3), &int(4)).unwrap(), int(81));
    }

    #[test]
    fn test_sequences() {
        let s = Value::str("ab");
        assert_eq!(binary_op(BinaryOp::Mul, &s, &int(3)).unwrap(), Value::str("ababab"));
        assert_eq!(
            binary_op(BinaryOp::Add, &s, &Value::str("c")).unwrap(),
            Value::str("abc")
        );
        let err = binary_op(BinaryOp::Add, &s, &int(1)).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +: 'str' and 'int'");
    }

    #[test]
    fn test_comparisons() {
        assert!(compare(CompareOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(CompareOp::Lt, &Value::str("a"), &Value::str("b")).unwrap());
        assert!(compare(CompareOp::In, &Value::str("or"), &Value::str("Force")).unwrap());
        assert!(compare(CompareOp::Is, &Value::None, &Value::None).unwrap());
        assert!(compare(CompareOp::Lt, &Value::str("a"), &int(1)).is_err());
        let range = Value::Range { start: 0, stop: 10, step: 2 };
        assert!(contains(&range, &int(4)).unwrap());
        assert!(!contains(&range, &int(5)).unwrap());
    }

    #[test]
    fn test_indexing() {
        let list = Value::list(vec![int(1), int(2), int(3)]);
        assert_eq!(get_item(&list, &int(-1)).unwrap(), int(3));
        let err = get_item(&list, &int(3)).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
        set_item(&list, &int(0), int(9)).unwrap();
        assert_eq!(list.to_string(), "[9, 2, 3]");
        let dict = Value::dict(Default::default());
        let err = get_item(&dict, &Value::str("x")).unwrap_err();
        assert_eq!((err.kind, err.message.as_str()), (RuntimeErrorKind::MissingKey, "'x'"));
    }

    #[test]
    fn test_slices() {
        assert_eq!(slice_indices(5, Some(1), Some(3), None).unwrap(), vec![1, 2]);
        assert_eq!(slice_indices(5, None, None, Some(-1)).unwrap(), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice_indices(5, Some(-2), None, None).unwrap(), vec![3, 4]);
        assert_eq!(slice_indices(3, Some(10), None, None).unwrap(), Vec::<usize>::new());
        assert!(slice_indices(3, None, None, Some(0)).is_err());
        let text = Value::str("Skywalker");
        assert_eq!(slice(&text, None, Some(&int(3)), None).unwrap(), Value::str("Sky"));
    }

    #[test]
    fn test_large_range_is_not_materialized() {
        let huge = Value::Range { start: 0, stop: 11_000_000, step: 1 };
        let err = collect_items(&huge).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::Overflow);
        let widest = Value::Range { start: i64::MIN, stop: i64::MAX, step: 1 };
        assert_eq!(collect_items(&widest).unwrap_err().kind, RuntimeErrorKind::Overflow);
        // Lazy iteration is still allowed.
        assert_eq!(iterate(&huge).unwrap().nth(3), Some(int(3)));
        let fits = Value::Range { start: 0, stop: 30, step: 10 };
        assert_eq!(collect_items(&fits).unwrap(), vec![int(0), int(10), int(20)]);
    }

    #[test]
    fn test_range_iteration() {
        let range = Value::Range { start: 5, stop: 0, step: -2 };
        let items: Vec<_> = iterate(&range).unwrap().collect();
        assert_eq!(items, vec![int(5), int(3), int(1)]);
    }
}
