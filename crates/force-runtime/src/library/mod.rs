//! The runtime library: themed built-ins available to every program.

pub mod collections;
pub mod control;
pub mod crypto;
pub mod files;
pub mod json;
pub mod math;
pub mod text;
pub mod time;

use crate::error::RuntimeError;
use crate::registry::RuntimeFunction;
use crate::value::{Num, Value};

/// Function tables in registry order.
pub fn tables() -> [&'static [RuntimeFunction]; 8] {
    [
        collections::FUNCTIONS,
        text::FUNCTIONS,
        time::FUNCTIONS,
        json::FUNCTIONS,
        crypto::FUNCTIONS,
        math::FUNCTIONS,
        control::FUNCTIONS,
        files::FUNCTIONS,
    ]
}

// Argument helpers. `index` is zero-based; messages count from one.

pub(crate) fn str_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, RuntimeError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(RuntimeError::argument_type(format!(
            "{name}() argument {} must be str, not {}",
            index + 1,
            other.type_name()
        ))),
        None => Err(RuntimeError::argument_count(name, index + 1, args.len())),
    }
}

pub(crate) fn num_arg(name: &str, args: &[Value], index: usize) -> Result<Num, RuntimeError> {
    match args.get(index) {
        Some(value) => value.as_num().ok_or_else(|| {
            RuntimeError::argument_type(format!(
                "{name}() argument {} must be a number, not {}",
                index + 1,
                value.type_name()
            ))
        }),
        None => Err(RuntimeError::argument_count(name, index + 1, args.len())),
    }
}

pub(crate) fn int_arg(name: &str, args: &[Value], index: usize) -> Result<i64, RuntimeError> {
    match num_arg(name, args, index)? {
        Num::Int(i) => Ok(i),
        Num::Float(_) => Err(RuntimeError::argument_type(format!(
            "{name}() argument {} must be an integer",
            index + 1
        ))),
    }
}

/// Error for an operation name a dispatching built-in does not know.
pub(crate) fn unknown_operation(name: &str, op: &str, known: &[&str]) -> RuntimeError {
    RuntimeError::invalid(format!(
        "{name}() does not support operation '{op}' (expected one of: {})",
        known.join(", ")
    ))
}
