//! jexpr core crate.
//!
//! Expressions are plain JSON: `["$id", arg, ...]`, where every argument is
//! itself a literal or a nested expression. They are evaluated against a data
//! context to produce a derived value, synchronously or asynchronously.
//!
//! Layers:
//!
//! - `runtime`: errors, runtime mode, and the scope/context model.
//! - `types`: parameter shape descriptors (`TypeSpec`) and value classification.
//! - `compiler`: turns a handler plus its `TypeSpec`s into sync and async
//!   interpreters made of pre-built resolver closures.
//! - `engine`: the immutable interpreter registry and its builder.
//! - `evaluator`: recognition, dispatch and the diagnostic wrapper.
//! - `builtins`: `$value`, `$literal` and `$evaluate`.
//!
//! The critical design rule is that one handler definition behaves the same in
//! both modes: the async backend only changes *when* parameters resolve
//! (concurrently, joined before the handler runs), never *what* they resolve to.
//!
//! ```
//! use jexpr_core::{Context, InterpreterSpec, Registry, TypeSpec};
//! use serde_json::json;
//!
//! let registry = Registry::builder()
//!     .register(
//!         "$mathSum",
//!         InterpreterSpec::new(
//!             |params, _| {
//!                 let sum = params[0].as_i64().unwrap_or(0) + params[1].as_i64().unwrap_or(0);
//!                 Ok(json!(sum).into())
//!             },
//!             vec![TypeSpec::number(), TypeSpec::number()],
//!         ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let ctx = Context::new(registry, json!(10));
//! assert_eq!(ctx.evaluate(&json!(["$mathSum", 5])).unwrap(), json!(15));
//! assert_eq!(ctx.evaluate(&json!(["$mathSum", ["$value"]])).unwrap(), json!(20));
//! ```

pub mod builtins;
pub mod compiler;
pub mod engine;
pub mod evaluator;
pub mod runtime;
pub mod types;

pub use builtins::current_value_expr;
pub use compiler::{
    Arg, AsyncInterpreter, AsyncResolver, Handler, HandlerResult, InterpreterSpec, Outcome,
    SyncInterpreter, SyncResolver,
};
pub use engine::{Definition, Interpreter, Registry, RegistryBuilder};
pub use evaluator::{
    evaluate, evaluate_async, evaluate_typed, evaluate_typed_async, is_expression,
    looks_like_expression,
};
pub use runtime::{Context, ErrorKind, EvalError, EvalMode, EvalResult, RuntimeMode, Scope, get_path};
pub use types::{TypeSpec, ValueType};
