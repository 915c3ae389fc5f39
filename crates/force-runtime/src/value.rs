//! Runtime values of executed programs.
//!
//! Values are reference counted and single-threaded. Mutable containers share
//! their storage, so `b = a; b.append(1)` is visible through `a`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::interp::objects::{Class, Function, Instance};
use crate::registry::RuntimeFunction;

/// Containers nested deeper than this are rendered as `...`.
const MAX_RENDER_DEPTH: usize = 64;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<Dict>>),
    /// Insertion-ordered set of hashable values.
    Set(Rc<RefCell<Vec<Value>>>),
    Range {
        start: i64,
        stop: i64,
        step: i64,
    },
    Stack(Rc<RefCell<Vec<Value>>>),
    Queue(Rc<RefCell<VecDeque<Value>>>),
    Builtin(&'static RuntimeFunction),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    /// A user-defined method bound to its receiver.
    BoundMethod {
        receiver: Rc<Instance>,
        function: Rc<Function>,
    },
    /// A method of a built-in type, looked up but not yet called.
    NativeMethod {
        receiver: Box<Value>,
        name: Rc<str>,
    },
}

/// Insertion-ordered mapping.
#[derive(Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace. The key must be hashable.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), RuntimeError> {
        key.check_hashable()?;
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(Value, Value)> for Dict {
    /// Builds without hashability checks; callers pass string or numeric keys.
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            match dict.position(&k) {
                Some(i) => dict.entries[i].1 = v,
                None => dict.entries.push((k, v)),
            }
        }
        dict
    }
}

/// Numeric view used by arithmetic and comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn dict(dict: Dict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    /// Set from arbitrary values, dropping duplicates.
    pub fn set(items: Vec<Value>) -> Result<Self, RuntimeError> {
        let mut unique: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            item.check_hashable()?;
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Ok(Value::Set(Rc::new(RefCell::new(unique))))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "str".into(),
            Value::List(_) => "list".into(),
            Value::Tuple(_) => "tuple".into(),
            Value::Dict(_) => "dict".into(),
            Value::Set(_) => "set".into(),
            Value::Range { .. } => "range".into(),
            Value::Stack(_) => "stack".into(),
            Value::Queue(_) => "queue".into(),
            Value::Builtin(_) | Value::NativeMethod { .. } => "builtin_function_or_method".into(),
            Value::Function(_) => "function".into(),
            Value::BoundMethod { .. } => "method".into(),
            Value::Class(_) => "type".into(),
            Value::Instance(instance) => instance.class.name.clone(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Set(items) | Value::Stack(items) => {
                !items.borrow().is_empty()
            }
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Queue(q) => !q.borrow().is_empty(),
            Value::Range { .. } => range_len(self) > 0,
            _ => true,
        }
    }

    pub fn as_num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(*b as i64)),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::Stack(_)
            | Value::Queue(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    pub fn check_hashable(&self) -> Result<(), RuntimeError> {
        if self.is_hashable() {
            Ok(())
        } else {
            Err(RuntimeError::argument_type(format!(
                "unhashable type: '{}'",
                self.type_name()
            )))
        }
    }

    /// Quoted, unambiguous rendering (`repr`).
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, true, 0);
        out
    }

    fn render(&self, out: &mut String, quoted: bool, depth: usize) {
        if depth > MAX_RENDER_DEPTH {
            out.push_str("...");
            return;
        }
        let items = |out: &mut String, values: &mut dyn Iterator<Item = &Value>| {
            for (i, v) in values.enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                v.render(out, true, depth + 1);
            }
        };
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) if quoted => out.push_str(&quote_str(s)),
            Value::Str(s) => out.push_str(s),
            Value::List(list) => {
                out.push('[');
                items(out, &mut list.borrow().iter());
                out.push(']');
            }
            Value::Tuple(tuple) => {
                out.push('(');
                items(out, &mut tuple.iter());
                if tuple.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Dict(dict) => {
                out.push('{');
                for (i, (k, v)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.render(out, true, depth + 1);
                    out.push_str(": ");
                    v.render(out, true, depth + 1);
                }
                out.push('}');
            }
            Value::Set(set) => {
                let set = set.borrow();
                if set.is_empty() {
                    out.push_str("set()");
                } else {
                    out.push('{');
                    items(out, &mut set.iter());
                    out.push('}');
                }
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    out.push_str(&format!("range({start}, {stop})"));
                } else {
                    out.push_str(&format!("range({start}, {stop}, {step})"));
                }
            }
            Value::Stack(stack) => {
                out.push_str("stack_tower([");
                items(out, &mut stack.borrow().iter());
                out.push_str("])");
            }
            Value::Queue(queue) => {
                out.push_str("queue_line([");
                items(out, &mut queue.borrow().iter());
                out.push_str("])");
            }
            Value::Builtin(f) => out.push_str(&format!("<built-in function {}>", f.name)),
            Value::NativeMethod { receiver, name } => out.push_str(&format!(
                "<built-in method {name} of {} object>",
                receiver.type_name()
            )),
            Value::Function(f) => out.push_str(&format!("<function {}>", f.def.name)),
            Value::BoundMethod { receiver, function } => out.push_str(&format!(
                "<bound method {}.{}>",
                receiver.class.name, function.def.name
            )),
            Value::Class(class) => out.push_str(&format!("<class '{}'>", class.name)),
            Value::Instance(instance) => {
                out.push_str(&format!("<{} object>", instance.class.name))
            }
        }
    }

    /// Convert to JSON data. Mappings need string, numeric, boolean or null
    /// keys, which are stringified the way the `data_stream` built-in does.
    pub fn to_json(&self) -> Result<serde_json::Value, RuntimeError> {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> Result<serde_json::Value, RuntimeError> {
        use serde_json::Value as Json;
        if depth > MAX_RENDER_DEPTH {
            return Err(RuntimeError::invalid("value is nested too deeply to serialize"));
        }
        let array = |items: &mut dyn Iterator<Item = &Value>| -> Result<Json, RuntimeError> {
            items
                .map(|v| v.to_json_at(depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        };
        Ok(match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .ok_or_else(|| RuntimeError::invalid(format!("cannot serialize {f}")))?,
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(items) | Value::Set(items) | Value::Stack(items) => {
                array(&mut items.borrow().iter())?
            }
            Value::Tuple(items) => array(&mut items.iter())?,
            Value::Queue(items) => array(&mut items.borrow().iter())?,
            Value::Dict(dict) => {
                let mut map = serde_json::Map::new();
                for (k, v) in dict.borrow().iter() {
                    let key = match k {
                        Value::Str(s) => s.to_string(),
                        Value::None => "null".to_string(),
                        Value::Bool(b) => b.to_string(),
                        Value::Int(_) | Value::Float(_) => k.repr(),
                        other => {
                            return Err(RuntimeError::argument_type(format!(
                                "keys must be str, int, float, bool or None, not {}",
                                other.type_name()
                            )));
                        }
                    };
                    map.insert(key, v.to_json_at(depth + 1)?);
                }
                Json::Object(map)
            }
            other => {
                return Err(RuntimeError::argument_type(format!(
                    "Object of type {} is not JSON serializable",
                    other.type_name()
                )));
            }
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::str(s.as_str()),
            Json::Array(items) => Value::list(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::dict(
                map.iter()
                    .map(|(k, v)| (Value::str(k.as_str()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    /// Plain rendering (`str`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(&mut out, false, 0);
        f.write_str(&out)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_num(), other.as_num()) {
            return match (a, b) {
                (Num::Int(x), Num::Int(y)) => x == y,
                (x, y) => x.as_f64() == y.as_f64(),
            };
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Value::Set(a), Value::Set(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (
                Value::Range {
                    start: s1,
                    stop: e1,
                    step: t1,
                },
                Value::Range {
                    start: s2,
                    stop: e2,
                    step: t2,
                },
            ) => s1 == s2 && e1 == e2 && t1 == t2,
            (Value::Stack(a), Value::Stack(b)) => Rc::ptr_eq(a, b),
            (Value::Queue(a), Value::Queue(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (
                Value::BoundMethod {
                    receiver: r1,
                    function: f1,
                },
                Value::BoundMethod {
                    receiver: r2,
                    function: f2,
                },
            ) => Rc::ptr_eq(r1, r2) && Rc::ptr_eq(f1, f2),
            _ => false,
        }
    }
}

/// Number of items a range yields.
pub fn range_len(value: &Value) -> usize {
    let Value::Range { start, stop, step } = *value else {
        return 0;
    };
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    len as usize
}

/// Render a float the way the target language prints it: integral values
/// keep a `.0`, very large and very small magnitudes use exponent form.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.into();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.into();
    }
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..16).contains(&exponent) {
        let plain = value.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

/// Quote a string the way `repr` does: single quotes unless the text
/// contains a single quote and no double quote.
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
