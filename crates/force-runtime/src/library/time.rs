//! Wall-clock access.

use chrono::{Local, Utc};

use super::{str_arg, unknown_operation};
use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[RuntimeFunction {
    name: "galactic_time",
    signature: "galactic_time(operation) -> str | int",
    summary: "Current local time: now, date, time, or Unix timestamp",
    category: "time",
    arity: Arity::Fixed(1),
    call: galactic_time,
}];

const TIME_OPS: &[&str] = &["now", "date", "time", "timestamp"];

fn galactic_time(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let op = str_arg("galactic_time", args, 0)?;
    let now = Local::now();
    Ok(match op {
        "now" => Value::str(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        "date" => Value::str(now.format("%Y-%m-%d").to_string()),
        "time" => Value::str(now.format("%H:%M:%S").to_string()),
        "timestamp" => Value::Int(Utc::now().timestamp()),
        other => return Err(unknown_operation("galactic_time", other, TIME_OPS)),
    })
}
