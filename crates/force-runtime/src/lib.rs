//! Runtime library and sandboxed execution for translated Force programs.
//!
//! Translated programs are indentation-based target source. [`execute`] runs
//! one in a fresh namespace:
//!
//! ```text
//! target ─> sandbox::precheck ─> target::parse ─> Interpreter::run ─> ExecutionResult
//!           (imports, dunders,    (Program IR)     (worker thread,
//!            host names)                            bounded output)
//! ```
//!
//! The namespace holds the themed built-ins of the [`registry()`] plus a small
//! allow-list of primitives (`print`, `len`, `range`, ...). Nothing else of
//! the host is reachable.
//!
//! ```
//! use force_runtime::{ExecutionOptions, execute};
//!
//! let result = execute(
//!     "s = stack_tower([1, 2])\ns.push(3)\nprint(s.size())\n",
//!     &ExecutionOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(result.output, "3\n");
//! ```

pub mod context;
pub mod error;
pub mod exec;
pub mod interp;
pub mod library;
pub mod primitives;
pub mod registry;
pub mod sandbox;
pub mod target;
pub mod value;

pub use error::{ExecutionError, RuntimeError, RuntimeErrorKind};
pub use exec::{CancelToken, ExecutionOptions, ExecutionResult, execute};
pub use registry::{RuntimeFunction, builtin_names, lookup, registry};
pub use value::Value;
