//! Expression-level control flow.

use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::registry::{Arity, RuntimeFunction};
use crate::value::Value;

pub static FUNCTIONS: &[RuntimeFunction] = &[
    RuntimeFunction {
        name: "jedi_mind_trick",
        signature: "jedi_mind_trick(condition, if_true, if_false) -> value",
        summary: "Ternary choice; both branches are evaluated before the call",
        category: "control",
        arity: Arity::Fixed(3),
        call: jedi_mind_trick,
    },
    RuntimeFunction {
        name: "force_switch",
        signature: "force_switch(value, cases[, default]) -> value",
        summary: "Look `value` up in the `cases` dict, falling back to `default` (None)",
        category: "control",
        arity: Arity::Range(2, 3),
        call: force_switch,
    },
];

fn jedi_mind_trick(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let chosen = if args[0].truthy() { &args[1] } else { &args[2] };
    Ok(chosen.clone())
}

fn force_switch(_: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
    let Value::Dict(cases) = &args[1] else {
        return Err(RuntimeError::argument_type(format!(
            "force_switch() cases must be a dict, not {}",
            args[1].type_name()
        )));
    };
    args[0].check_hashable()?;
    let default = args.get(2).cloned().unwrap_or(Value::None);
    Ok(cases.borrow().get(&args[0]).cloned().unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;

    fn cases() -> Value {
        Value::dict(
            [
                (Value::str("jedi"), Value::str("Light Side")),
                (Value::str("sith"), Value::str("Dark Side")),
                (Value::Int(1), Value::str("one")),
            ]
            .into_iter()
            .collect::<Dict>(),
        )
    }

    fn switch(args: &[Value]) -> Result<Value, RuntimeError> {
        force_switch(&mut CallContext::detached(), args)
    }

    #[test]
    fn test_switch() {
        assert_eq!(
            switch(&[Value::str("jedi"), cases(), Value::str("Unknown")]).unwrap(),
            Value::str("Light Side")
        );
        assert_eq!(
            switch(&[Value::str("droid"), cases(), Value::str("Unknown")]).unwrap(),
            Value::str("Unknown")
        );
        assert_eq!(switch(&[Value::str("droid"), cases()]).unwrap(), Value::None);
        // Numeric keys compare by value.
        assert_eq!(switch(&[Value::Float(1.0), cases()]).unwrap(), Value::str("one"));
        assert!(switch(&[Value::str("x"), Value::list(vec![])]).is_err());
    }

    #[test]
    fn test_mind_trick() {
        let mut ctx = CallContext::detached();
        let pick = |cond| jedi_mind_trick(&mut CallContext::detached(), &[cond, Value::Int(1), Value::Int(2)]);
        assert_eq!(pick(Value::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(pick(Value::str("")).unwrap(), Value::Int(2));
        assert!(jedi_mind_trick(&mut ctx, &[Value::None, Value::None, Value::None]).is_ok());
    }
}
