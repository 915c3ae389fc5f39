//! Registry of runtime library functions.
//!
//! Each library module declares a static `FUNCTIONS` table. The registry
//! collects those tables once and indexes them by the themed name programs
//! call them by.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::context::CallContext;
use crate::error::RuntimeError;
use crate::library;
use crate::value::Value;

/// Signature of every built-in implementation.
pub type BuiltinFn = fn(&mut CallContext, &[Value]) -> Result<Value, RuntimeError>;

/// Number of arguments a built-in accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Fixed(usize),
    /// Inclusive bounds.
    Range(usize, usize),
    /// At least `min`.
    Variadic { min: usize },
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&count),
            Arity::Variadic { min } => count >= min,
        }
    }

    pub fn check(self, name: &str, count: usize) -> Result<(), RuntimeError> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(RuntimeError::argument_count(name, self, count))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::Variadic { min } => write!(f, "at least {min}"),
        }
    }
}

/// Descriptor of a callable built-in.
pub struct RuntimeFunction {
    /// Name programs call it by (e.g. `stack_tower`).
    pub name: &'static str,
    /// Call shape, e.g. `force_hash(algorithm, text) -> str`.
    pub signature: &'static str,
    pub summary: &'static str,
    /// Grouping tag (e.g. "collections", "text", "math").
    pub category: &'static str,
    pub arity: Arity,
    pub call: BuiltinFn,
}

impl RuntimeFunction {
    /// Check arity, then run the implementation.
    pub fn invoke(&self, ctx: &mut CallContext, args: &[Value]) -> Result<Value, RuntimeError> {
        self.arity.check(self.name, args.len())?;
        tracing::trace!(builtin = self.name, args = args.len(), "calling built-in");
        (self.call)(ctx, args)
    }
}

impl fmt::Debug for RuntimeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeFunction")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

pub struct Registry {
    functions: Vec<&'static RuntimeFunction>,
    index: HashMap<&'static str, &'static RuntimeFunction>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&'static RuntimeFunction> {
        self.index.get(name).copied()
    }

    /// Functions in declaration order, grouped by category.
    pub fn iter(&self) -> impl Iterator<Item = &'static RuntimeFunction> + '_ {
        self.functions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The runtime library registry.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let functions: Vec<&'static RuntimeFunction> =
            library::tables().into_iter().flatten().collect();
        let index = functions.iter().map(|f| (f.name, *f)).collect();
        Registry { functions, index }
    })
}

/// Look up a runtime library function by name.
pub fn lookup(name: &str) -> Option<&'static RuntimeFunction> {
    registry().get(name)
}

/// Names of all runtime library functions.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    registry().iter().map(|f| f.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("stack_tower").map(|f| f.category), Some("collections"));
        assert!(lookup("print").is_none());
        assert!(lookup("nonexistent").is_none());
    }

    #[test]
    fn test_names_unique() {
        let names: Vec<_> = builtin_names().collect();
        assert_eq!(names.len(), registry().len());
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_every_themed_builtin_registered() {
        for name in [
            "stack_tower",
            "queue_line",
            "fleet_formation",
            "protocol_droid",
            "hologram_text",
            "force_pattern",
            "galactic_time",
            "data_stream",
            "force_encrypt",
            "force_hash",
            "force_calculate",
            "lightsaber_distance",
            "midichlorians",
            "jedi_mind_trick",
            "force_switch",
            "holocron_archive",
            "imperial_database",
        ] {
            assert!(lookup(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Range(2, 3).accepts(3));
        assert!(!Arity::Range(2, 3).accepts(1));
        assert!(Arity::Variadic { min: 1 }.accepts(9));
        let err = Arity::Fixed(2).check("f", 3).unwrap_err();
        assert_eq!(err.message, "f() takes 2 arguments (3 given)");
    }
}
