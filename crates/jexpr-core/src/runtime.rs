//! Errors, runtime configuration and the scope/context model.
//!
//! A [`Context`] pairs the shared, read-only [`Registry`] with one [`Scope`].
//! Contexts are cheap to clone; entering a sub-evaluation that changes the
//! current value creates a child scope instead of mutating the current one.

use crate::engine::Registry;
use crate::evaluator;
use crate::types::{TypeSpec, ValueType};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub type EvalResult = Result<Value, EvalError>;

/// Scope key for the current value.
pub const VALUE_KEY: &str = "$$VALUE";
/// Scope key that ascends to the enclosing scope.
pub const PARENT_SCOPE_KEY: &str = "$$PARENT_SCOPE";
/// Loop-local: index of the current element.
pub const INDEX_KEY: &str = "$$INDEX";
/// Loop-local: the container being iterated.
pub const ARRAY_KEY: &str = "$$ARRAY";
/// Loop-local: reduce accumulator.
pub const ACC_KEY: &str = "$$ACC";
/// Loop-local: left operand of a paired comparison.
pub const LEFT_KEY: &str = "$$LEFT";
/// Loop-local: right operand of a paired comparison.
pub const RIGHT_KEY: &str = "$$RIGHT";

const SCOPE_SIGIL: &str = "$$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TypeMismatch,
    ModeUnsupported,
    InvalidTypeSpec,
    Handler,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "JEXPR_E_TYPE_MISMATCH",
            ErrorKind::ModeUnsupported => "JEXPR_E_MODE_UNSUPPORTED",
            ErrorKind::InvalidTypeSpec => "JEXPR_E_INVALID_TYPE_SPEC",
            ErrorKind::Handler => "JEXPR_E_HANDLER",
        }
    }
}

/// Structured evaluation error.
///
/// `id` names the interpreter the failure surfaced in, when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{}: {}{}", .kind.code(), .message, display_id(.id))]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub id: Option<String>,
}

fn display_id(id: &Option<String>) -> String {
    id.as_ref().map(|id| format!(" (in {id})")).unwrap_or_default()
}

impl EvalError {
    /// Handler-level failure.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Handler, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            id: None,
        }
    }

    pub fn type_mismatch(expected: &TypeSpec, value: &Value) -> Self {
        Self::with_kind(
            ErrorKind::TypeMismatch,
            format!(
                "expected {expected}, got {} {}",
                ValueType::of(value),
                preview(value)
            ),
        )
    }

    pub fn invalid_type_spec(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidTypeSpec, msg)
    }

    pub fn mode_unsupported(id: &str, mode: EvalMode) -> Self {
        Self {
            kind: ErrorKind::ModeUnsupported,
            message: format!("interpreter `{id}` does not support {mode} evaluation"),
            id: Some(id.to_string()),
        }
    }

    /// Tag with the interpreter id unless an inner interpreter already did.
    pub fn within(mut self, id: &str) -> Self {
        if self.id.is_none() {
            self.id = Some(id.to_string());
        }
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

fn preview(value: &Value) -> String {
    const MAX: usize = 80;
    let text = value.to_string();
    if text.chars().count() <= MAX {
        return text;
    }
    let mut cut: String = text.chars().take(MAX).collect();
    cut.push('…');
    cut
}

/// Calling convention an interpreter is invoked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    Sync,
    Async,
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvalMode::Sync => "sync",
            EvalMode::Async => "async",
        })
    }
}

/// Production vs. development behavior. Only gates the diagnostic wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    Production,
    Development,
}

impl RuntimeMode {
    pub const ENV_VAR: &'static str = "JEXPR_RUNTIME_MODE";

    /// Read `JEXPR_RUNTIME_MODE`, falling back to the build profile default.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(RuntimeMode::Production),
            "development" | "dev" => Some(RuntimeMode::Development),
            _ => None,
        }
    }

    pub fn diagnostics(self) -> bool {
        self == RuntimeMode::Development
    }
}

impl Default for RuntimeMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            RuntimeMode::Development
        } else {
            RuntimeMode::Production
        }
    }
}

/// One link of the lexical scope chain.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub value: Value,
    pub parent: Option<Arc<Scope>>,
    /// Loop-local slots, keyed by their full `$$NAME`.
    pub bindings: Map<String, Value>,
}

impl Scope {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            parent: None,
            bindings: Map::new(),
        }
    }

    pub fn child(parent: Arc<Scope>, value: Value, bindings: Map<String, Value>) -> Self {
        Self {
            value,
            parent: Some(parent),
            bindings,
        }
    }

    pub fn binding(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key)
    }

    /// Resolve a path against this scope.
    ///
    /// `$$VALUE.a.b` and `a.b` both read from the current value; `$$PARENT_SCOPE`
    /// moves one link up; any other `$$NAME` head reads a loop-local binding.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let mut scope = self;
        let mut path = path;
        loop {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, rest),
                None => (path, ""),
            };
            if !head.starts_with(SCOPE_SIGIL) {
                return lookup(&scope.value, path).cloned();
            }
            match head {
                PARENT_SCOPE_KEY => {
                    scope = scope.parent.as_deref()?;
                    if rest.is_empty() {
                        return Some(scope.value.clone());
                    }
                    path = rest;
                }
                VALUE_KEY => return lookup(&scope.value, rest).cloned(),
                key => return lookup(scope.binding(key)?, rest).cloned(),
            }
        }
    }
}

/// Read a dot path out of a value; numeric segments index arrays.
pub fn get_path(root: &Value, path: &str) -> Option<Value> {
    lookup(root, path).cloned()
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut current = root;
    for part in path.split('.') {
        match current {
            Value::Object(obj) => current = obj.get(part)?,
            Value::Array(arr) => {
                let idx = part.parse::<usize>().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Registry plus scope, threaded through an evaluation tree.
#[derive(Clone)]
pub struct Context {
    registry: Arc<Registry>,
    scope: Arc<Scope>,
}

impl Context {
    pub fn new(registry: Arc<Registry>, value: Value) -> Self {
        Self {
            registry,
            scope: Arc::new(Scope::new(value)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn value(&self) -> &Value {
        &self.scope.value
    }

    /// Child context focused on `value`, with this scope as parent.
    pub fn with_value(&self, value: Value) -> Self {
        self.with_scope(value, Map::new())
    }

    /// Child context with loop-local bindings (`$$INDEX`, `$$ACC`, ...).
    pub fn with_scope(&self, value: Value, bindings: Map<String, Value>) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            scope: Arc::new(Scope::child(Arc::clone(&self.scope), value, bindings)),
        }
    }

    /// `None` is the current value itself.
    pub fn resolve(&self, path: Option<&str>) -> Option<Value> {
        match path {
            None => Some(self.scope.value.clone()),
            Some(path) => self.scope.resolve(path),
        }
    }

    pub fn evaluate(&self, node: &Value) -> EvalResult {
        evaluator::evaluate(self, node)
    }

    pub fn evaluate_typed(&self, spec: &TypeSpec, node: &Value) -> EvalResult {
        evaluator::evaluate_typed(spec, self, node)
    }

    pub fn evaluate_async(&self, node: &Value) -> BoxFuture<'static, EvalResult> {
        evaluator::evaluate_async(self, node)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("interpreters", &self.registry.len())
            .field("scope", &self.scope)
            .finish()
    }
}
