//! Stacks, queues and fixed formations.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::context::CallContext;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::interp::ops::collect_items;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "stack_tower",
        signature: "stack_tower([items]) -> stack",
        summary: "Last-in first-out stack, optionally seeded (last item on top)",
        category: "collections",
        arity: Arity::Range(0, 1),
        call: stack_tower,
    },
    RuntimeFunction {
        name: "queue_line",
        signature: "queue_line([items]) -> queue",
        summary: "First-in first-out queue, optionally seeded (first item in front)",
        category: "collections",
        arity: Arity::Range(0, 1),
        call: queue_line,
    },
    RuntimeFunction {
        name: "fleet_formation",
        signature: "fleet_formation(items...) -> tuple",
        summary: "Immutable tuple of the arguments",
        category: "collections",
        arity: Arity::Variadic { min: 0 },
        call: fleet_formation,
    },
];

fn seed(args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    match args.first() {
        None | Some(Value::None) => Ok(Vec::new()),
        Some(items) => collect_items(items),
    }
}

fn stack_tower(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Stack(Rc::new(RefCell::new(seed(args)?))))
}

fn queue_line(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Queue(Rc::new(RefCell::new(VecDeque::from(seed(args)?)))))
}

fn fleet_formation(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::tuple(args.to_vec()))
}

fn expect_args(type_name: &str, method: &str, args: &[Value], count: usize) -> Result<(), RuntimeError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(RuntimeError::argument_count(
            &format!("{type_name}.{method}"),
            count,
            args.len(),
        ))
    }
}

/// Methods of a stack. `pop` on an empty stack fails; `peek` yields `None`.
pub fn stack_method(
    stack: &RefCell<Vec<Value>>,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let arity = match method {
        "push" => 1,
        "pop" | "peek" | "size" | "is_empty" => 0,
        _ => return None,
    };
    Some(expect_args("stack", method, args, arity).and_then(|()| {
        let mut items = stack.borrow_mut();
        Ok(match method {
            "push" => {
                items.push(args[0].clone());
                Value::None
            }
            "pop" => items.pop().ok_or_else(|| {
                RuntimeError::new(RuntimeErrorKind::IndexOutOfRange, "pop from empty stack")
            })?,
            "peek" => items.last().cloned().unwrap_or(Value::None),
            "size" => Value::Int(items.len() as i64),
            _ => Value::Bool(items.is_empty()),
        })
    }))
}

/// Methods of a queue. `dequeue` on an empty queue fails; `front` yields `None`.
pub fn queue_method(
    queue: &RefCell<VecDeque<Value>>,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let arity = match method {
        "enqueue" => 1,
        "dequeue" | "front" | "size" | "is_empty" => 0,
        _ => return None,
    };
    Some(expect_args("queue", method, args, arity).and_then(|()| {
        let mut items = queue.borrow_mut();
        Ok(match method {
            "enqueue" => {
                items.push_back(args[0].clone());
                Value::None
            }
            "dequeue" => items.pop_front().ok_or_else(|| {
                RuntimeError::new(RuntimeErrorKind::IndexOutOfRange, "dequeue from empty queue")
            })?,
            "front" => items.front().cloned().unwrap_or(Value::None),
            "size" => Value::Int(items.len() as i64),
            _ => Value::Bool(items.is_empty()),
        })
    }))
}
