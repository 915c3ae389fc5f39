//! Arithmetic helpers, distance and randomness.

use rand::Rng;

use super::{int_arg, num_arg, str_arg, unknown_operation};
use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::interp::ops::binary_op;
use crate::registry::{Arity, RuntimeFunction};
use crate::target::ir::BinaryOp;
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "force_calculate",
        signature: "force_calculate(operation, a[, b]) -> number",
        summary: "add, subtract, multiply, divide, modulo, power, sqrt",
        category: "math",
        arity: Arity::Range(2, 3),
        call: force_calculate,
    },
    RuntimeFunction {
        name: "lightsaber_distance",
        signature: "lightsaber_distance(x1, y1, x2, y2) -> float",
        summary: "Euclidean distance between two points",
        category: "math",
        arity: Arity::Fixed(4),
        call: lightsaber_distance,
    },
    RuntimeFunction {
        name: "midichlorians",
        signature: "midichlorians([min,] [max]) -> float | int",
        summary: "Random float in [0, 1), or random int in [0, max] or [min, max]",
        category: "math",
        arity: Arity::Range(0, 2),
        call: midichlorians,
    },
];

const CALC_OPS: &[&str] = &[
    "add", "subtract", "multiply", "divide", "modulo", "power", "sqrt",
];

fn force_calculate(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "force_calculate";
    let op = str_arg(NAME, args, 0)?;
    let binary = match op {
        "add" => BinaryOp::Add,
        "subtract" => BinaryOp::Sub,
        "multiply" => BinaryOp::Mul,
        "divide" => BinaryOp::Div,
        "modulo" => BinaryOp::Mod,
        "power" => BinaryOp::Pow,
        "sqrt" => {
            if args.len() != 2 {
                return Err(RuntimeError::argument_count("force_calculate('sqrt')", 2, args.len()));
            }
            let x = num_arg(NAME, args, 1)?.as_f64();
            if x < 0.0 {
                return Err(RuntimeError::invalid("math domain error"));
            }
            return Ok(Value::Float(x.sqrt()));
        }
        other => return Err(unknown_operation(NAME, other, CALC_OPS)),
    };
    if args.len() != 3 {
        return Err(RuntimeError::argument_count(&format!("{NAME}('{op}')"), 3, args.len()));
    }
    num_arg(NAME, args, 1)?;
    num_arg(NAME, args, 2)?;
    binary_op(binary, &args[1], &args[2])
}

fn lightsaber_distance(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let coord = |i| num_arg("lightsaber_distance", args, i).map(|n| n.as_f64());
    let (dx, dy) = (coord(2)? - coord(0)?, coord(3)? - coord(1)?);
    Ok(Value::Float(dx.hypot(dy)))
}

fn midichlorians(ctx: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let (low, high) = match args.len() {
        0 => return Ok(Value::Float(ctx.rng.r#gen::<f64>())),
        1 => (0, int_arg("midichlorians", args, 0)?),
        _ => (int_arg("midichlorians", args, 0)?, int_arg("midichlorians", args, 1)?),
    };
    if low > high {
        return Err(RuntimeError::invalid(format!(
            "empty range for midichlorians({low}, {high})"
        )));
    }
    Ok(Value::Int(ctx.rng.gen_range(low..=high)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;

    fn calc(op: &str, operands: &[Value]) -> Result<Value, RuntimeError> {
        let mut args = vec![Value::str(op)];
        args.extend_from_slice(operands);
        force_calculate(&mut CallContext::detached(), &args)
    }

    #[test]
    fn test_calculate() {
        assert_eq!(calc("add", &[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
        assert_eq!(calc("divide", &[Value::Int(7), Value::Int(2)]).unwrap(), Value::Float(3.5));
        assert_eq!(calc("modulo", &[Value::Int(-7), Value::Int(3)]).unwrap(), Value::Int(2));
        assert_eq!(calc("power", &[Value::Int(2), Value::Int(10)]).unwrap(), Value::Int(1024));
        assert_eq!(calc("sqrt", &[Value::Int(16)]).unwrap(), Value::Float(4.0));
    }

    #[test]
    fn test_calculate_errors() {
        let err = calc("divide", &[Value::Int(1), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
        let err = calc("sqrt", &[Value::Int(-1)]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidArgument);
        let err = calc("add", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentCount);
        let err = calc("add", &[Value::str("1"), Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentType);
    }

    #[test]
    fn test_distance() {
        let args = [Value::Int(0), Value::Int(0), Value::Int(3), Value::Int(4)];
        let d = lightsaber_distance(&mut CallContext::detached(), &args).unwrap();
        assert_eq!(d, Value::Float(5.0));
    }

    #[test]
    fn test_midichlorians_bounds() {
        let mut ctx = CallContext::detached();
        for _ in 0..50 {
            let Value::Int(n) = midichlorians(&mut ctx, &[Value::Int(1000), Value::Int(1005)]).unwrap()
            else {
                panic!("expected int");
            };
            assert!((1000..=1005).contains(&n));
            let Value::Float(f) = midichlorians(&mut ctx, &[]).unwrap() else {
                panic!("expected float");
            };
            assert!((0.0..1.0).contains(&f));
        }
        assert!(midichlorians(&mut ctx, &[Value::Int(5), Value::Int(1)]).is_err());
    }
}
