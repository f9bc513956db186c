//! Compile interpreter definitions into executable resolvers.
//!
//! Each [`TypeSpec`] is walked exactly once, when an interpreter is compiled,
//! producing a tree of resolver closures. At evaluation time a resolver is a
//! direct function call: no spec matching, no string dispatch.
//!
//! There are two backends built from the same spec and handler:
//!
//! - sync: resolvers run left to right on the caller's stack;
//! - async: sibling resolvers (parameters, sequence elements, record values)
//!   are fanned out and joined in order, failing on the first error.

use crate::builtins::current_value_expr;
use crate::evaluator::{eval_owned, evaluate};
use crate::runtime::{Context, EvalError, EvalMode, EvalResult};
use crate::types::TypeSpec;
use futures::FutureExt;
use futures::future::{self, BoxFuture, try_join_all};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Sync parameter resolver: raw argument in, validated value out.
pub type SyncResolver = Arc<dyn Fn(&Context, &Value) -> EvalResult + Send + Sync>;
/// Async parameter resolver.
pub type AsyncResolver = Arc<dyn Fn(Context, Value) -> BoxFuture<'static, EvalResult> + Send + Sync>;

/// Executable sync form of an interpreter: `(context, raw args)`.
pub type SyncInterpreter = Arc<dyn Fn(&Context, &[Value]) -> EvalResult + Send + Sync>;
/// Executable async form of an interpreter.
pub type AsyncInterpreter =
    Arc<dyn Fn(Context, Vec<Value>) -> BoxFuture<'static, EvalResult> + Send + Sync>;

/// Handler shared by both backends: resolved params plus the calling context.
pub type Handler = Arc<dyn Fn(&[Value], &Context) -> HandlerResult + Send + Sync>;
pub type HandlerResult = Result<Outcome, EvalError>;

/// What a handler hands back to the backend that called it.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Finished result; returned as-is.
    Value(Value),
    /// Evaluate `expr` against the context in the caller's mode and return that.
    Eval(Context, Value),
}

impl Outcome {
    pub fn eval(ctx: Context, expr: Value) -> Self {
        Outcome::Eval(ctx, expr)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

/// Positional argument as seen at an interpreter call site.
///
/// `Missing` means the caller did not pass the position at all; an explicit
/// `null` is `Present(Value::Null)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    Missing,
    Present(&'a Value),
}

impl<'a> Arg<'a> {
    pub fn at(args: &'a [Value], index: usize) -> Self {
        args.get(index).map_or(Arg::Missing, Arg::Present)
    }
}

static NULL: Value = Value::Null;

/// Declarative interpreter: handler, one spec per parameter, and the position
/// that receives the current scope value when omitted.
#[derive(Clone)]
pub struct InterpreterSpec {
    handler: Handler,
    type_specs: Vec<TypeSpec>,
    default_param: Option<usize>,
}

impl InterpreterSpec {
    /// Defaults the last parameter to the current scope value.
    pub fn new<F>(handler: F, type_specs: Vec<TypeSpec>) -> Self
    where
        F: Fn(&[Value], &Context) -> HandlerResult + Send + Sync + 'static,
    {
        let default_param = type_specs.len().checked_sub(1);
        Self {
            handler: Arc::new(handler),
            type_specs,
            default_param,
        }
    }

    pub fn default_param(mut self, index: usize) -> Self {
        self.default_param = Some(index);
        self
    }

    pub fn no_default_param(mut self) -> Self {
        self.default_param = None;
        self
    }

    /// Position that receives the current scope value when omitted.
    pub fn default_index(&self) -> Option<usize> {
        self.default_param
    }

    pub fn type_specs(&self) -> &[TypeSpec] {
        &self.type_specs
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if let Some(index) = self.default_param
            && index >= self.type_specs.len()
        {
            return Err(EvalError::invalid_type_spec(format!(
                "default param index {index} out of range for {} params",
                self.type_specs.len()
            )));
        }
        self.type_specs.iter().try_for_each(TypeSpec::validate)
    }

    pub fn compile_sync(&self) -> Result<SyncInterpreter, EvalError> {
        self.validate()?;
        let resolvers: Vec<SyncResolver> = self.type_specs.iter().map(compile_sync_resolver).collect();
        let handler = Arc::clone(&self.handler);
        let default_param = self.default_param;
        let current = current_value_expr();
        Ok(Arc::new(move |ctx: &Context, args: &[Value]| {
            let mut params = Vec::with_capacity(resolvers.len());
            for (index, resolver) in resolvers.iter().enumerate() {
                let raw = match Arg::at(args, index) {
                    Arg::Present(raw) => raw,
                    Arg::Missing if default_param == Some(index) => &current,
                    Arg::Missing => &NULL,
                };
                params.push(resolver(ctx, raw)?);
            }
            finish_sync(handler(&params, ctx)?)
        }))
    }

    pub fn compile_async(&self) -> Result<AsyncInterpreter, EvalError> {
        self.validate()?;
        let resolvers: Arc<[AsyncResolver]> =
            self.type_specs.iter().map(compile_async_resolver).collect();
        let handler = Arc::clone(&self.handler);
        let default_param = self.default_param;
        Ok(Arc::new(move |ctx: Context, args: Vec<Value>| {
            let resolvers = Arc::clone(&resolvers);
            let handler = Arc::clone(&handler);
            async move {
                let mut args = args.into_iter();
                let pending = resolvers.iter().enumerate().map(|(index, resolver)| {
                    let raw = match args.next() {
                        Some(raw) => raw,
                        None if default_param == Some(index) => current_value_expr(),
                        None => Value::Null,
                    };
                    resolver(ctx.clone(), raw)
                });
                let params = try_join_all(pending).await?;
                let outcome = handler(&params, &ctx)?;
                finish_async(outcome).await
            }
            .boxed()
        }))
    }
}

/// Raw-function shortcut: every argument is evaluated, nothing is validated,
/// and omitted arguments are not substituted.
pub fn raw_sync(handler: Handler) -> SyncInterpreter {
    Arc::new(move |ctx: &Context, args: &[Value]| {
        let params = args
            .iter()
            .map(|arg| evaluate(ctx, arg))
            .collect::<Result<Vec<_>, _>>()?;
        finish_sync(handler(&params, ctx)?)
    })
}

pub fn raw_async(handler: Handler) -> AsyncInterpreter {
    Arc::new(move |ctx: Context, args: Vec<Value>| {
        let handler = Arc::clone(&handler);
        async move {
            let params =
                try_join_all(args.into_iter().map(|arg| eval_owned(ctx.clone(), arg))).await?;
            let outcome = handler(&params, &ctx)?;
            finish_async(outcome).await
        }
        .boxed()
    })
}

/// Stand-in for a mode an interpreter declared it cannot run in.
pub fn unsupported_sync(id: &str) -> SyncInterpreter {
    let id = id.to_string();
    Arc::new(move |_: &Context, _: &[Value]| -> EvalResult {
        Err(EvalError::mode_unsupported(&id, EvalMode::Sync))
    })
}

pub fn unsupported_async(id: &str) -> AsyncInterpreter {
    let id = id.to_string();
    Arc::new(move |_: Context, _: Vec<Value>| -> BoxFuture<'static, EvalResult> {
        future::ready(Err(EvalError::mode_unsupported(&id, EvalMode::Async))).boxed()
    })
}

fn finish_sync(outcome: Outcome) -> EvalResult {
    match outcome {
        Outcome::Value(value) => Ok(value),
        Outcome::Eval(ctx, expr) => evaluate(&ctx, &expr),
    }
}

async fn finish_async(outcome: Outcome) -> EvalResult {
    match outcome {
        Outcome::Value(value) => Ok(value),
        Outcome::Eval(ctx, expr) => eval_owned(ctx, expr).await,
    }
}

fn expect_array(spec: &TypeSpec, value: Value, arity: Option<usize>) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Array(items) if arity.is_none_or(|n| n == items.len()) => Ok(items),
        other => Err(EvalError::type_mismatch(spec, &other)),
    }
}

fn expect_object(spec: &TypeSpec, value: Value) -> Result<Map<String, Value>, EvalError> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(EvalError::type_mismatch(spec, &other)),
    }
}

// === Sync backend ===

pub fn compile_sync_resolver(spec: &TypeSpec) -> SyncResolver {
    match spec {
        TypeSpec::Any {
            delay_evaluation: true,
        } => sync_passthrough(),
        TypeSpec::Any { .. } => sync_any(),
        TypeSpec::Single(_) | TypeSpec::OneOf(_) | TypeSpec::Enum(_) => sync_scalar(spec),
        TypeSpec::Tuple(items) => sync_tuple(spec, items),
        TypeSpec::SequenceOf(item) => sync_sequence_of(spec, item),
        TypeSpec::Record(fields) => sync_record(spec, fields.iter()),
        TypeSpec::RecordOf(item) => sync_record_of(spec, item),
    }
}

fn sync_passthrough() -> SyncResolver {
    Arc::new(|_: &Context, raw: &Value| -> EvalResult { Ok(raw.clone()) })
}

fn sync_any() -> SyncResolver {
    Arc::new(|ctx: &Context, raw: &Value| evaluate(ctx, raw))
}

fn sync_scalar(spec: &TypeSpec) -> SyncResolver {
    let spec = spec.clone();
    Arc::new(move |ctx: &Context, raw: &Value| spec.check(evaluate(ctx, raw)?))
}

fn sync_tuple(spec: &TypeSpec, items: &[TypeSpec]) -> SyncResolver {
    let spec = spec.clone();
    let resolvers: Vec<SyncResolver> = items.iter().map(compile_sync_resolver).collect();
    Arc::new(move |ctx: &Context, raw: &Value| {
        let items = expect_array(&spec, evaluate(ctx, raw)?, Some(resolvers.len()))?;
        let resolved = items
            .iter()
            .zip(&resolvers)
            .map(|(item, resolver)| resolver(ctx, item))
            .collect::<Result<Vec<_>, _>>()?;
        spec.check(Value::Array(resolved))
    })
}

fn sync_sequence_of(spec: &TypeSpec, item: &TypeSpec) -> SyncResolver {
    let spec = spec.clone();
    let resolver = compile_sync_resolver(item);
    Arc::new(move |ctx: &Context, raw: &Value| {
        let items = expect_array(&spec, evaluate(ctx, raw)?, None)?;
        let resolved = items
            .iter()
            .map(|item| resolver(ctx, item))
            .collect::<Result<Vec<_>, _>>()?;
        spec.check(Value::Array(resolved))
    })
}

fn sync_record<'a>(
    spec: &TypeSpec,
    fields: impl Iterator<Item = (&'a String, &'a TypeSpec)>,
) -> SyncResolver {
    let spec = spec.clone();
    let resolvers: Vec<(String, SyncResolver)> = fields
        .map(|(key, field)| (key.clone(), compile_sync_resolver(field)))
        .collect();
    Arc::new(move |ctx: &Context, raw: &Value| {
        let mut obj = expect_object(&spec, evaluate(ctx, raw)?)?;
        for (key, resolver) in &resolvers {
            let present = obj.get(key);
            let resolved = resolver(ctx, present.unwrap_or(&NULL))?;
            if present.is_some() || !resolved.is_null() {
                obj.insert(key.clone(), resolved);
            }
        }
        spec.check(Value::Object(obj))
    })
}

fn sync_record_of(spec: &TypeSpec, item: &TypeSpec) -> SyncResolver {
    let spec = spec.clone();
    let resolver = compile_sync_resolver(item);
    Arc::new(move |ctx: &Context, raw: &Value| {
        let obj = expect_object(&spec, evaluate(ctx, raw)?)?;
        let resolved = obj
            .into_iter()
            .map(|(key, value)| resolver(ctx, &value).map(|resolved| (key, resolved)))
            .collect::<Result<Map<_, _>, _>>()?;
        spec.check(Value::Object(resolved))
    })
}

// === Async backend ===

pub fn compile_async_resolver(spec: &TypeSpec) -> AsyncResolver {
    match spec {
        TypeSpec::Any {
            delay_evaluation: true,
        } => async_passthrough(),
        TypeSpec::Any { .. } => async_any(),
        TypeSpec::Single(_) | TypeSpec::OneOf(_) | TypeSpec::Enum(_) => async_scalar(spec),
        TypeSpec::Tuple(items) => async_tuple(spec, items),
        TypeSpec::SequenceOf(item) => async_sequence_of(spec, item),
        TypeSpec::Record(fields) => async_record(spec, fields.iter()),
        TypeSpec::RecordOf(item) => async_record_of(spec, item),
    }
}

fn async_passthrough() -> AsyncResolver {
    Arc::new(|_: Context, raw: Value| -> BoxFuture<'static, EvalResult> {
        future::ready(Ok(raw)).boxed()
    })
}

fn async_any() -> AsyncResolver {
    Arc::new(eval_owned)
}

fn async_scalar(spec: &TypeSpec) -> AsyncResolver {
    let spec = Arc::new(spec.clone());
    Arc::new(move |ctx: Context, raw: Value| {
        let spec = Arc::clone(&spec);
        async move { spec.check(eval_owned(ctx, raw).await?) }.boxed()
    })
}

fn async_tuple(spec: &TypeSpec, items: &[TypeSpec]) -> AsyncResolver {
    let spec = Arc::new(spec.clone());
    let resolvers: Arc<[AsyncResolver]> = items.iter().map(compile_async_resolver).collect();
    Arc::new(move |ctx: Context, raw: Value| {
        let spec = Arc::clone(&spec);
        let resolvers = Arc::clone(&resolvers);
        async move {
            let evaluated = eval_owned(ctx.clone(), raw).await?;
            let items = expect_array(&spec, evaluated, Some(resolvers.len()))?;
            let pending = items
                .into_iter()
                .zip(resolvers.iter())
                .map(|(item, resolver)| resolver(ctx.clone(), item));
            let resolved = try_join_all(pending).await?;
            spec.check(Value::Array(resolved))
        }
        .boxed()
    })
}

fn async_sequence_of(spec: &TypeSpec, item: &TypeSpec) -> AsyncResolver {
    let spec = Arc::new(spec.clone());
    let resolver = compile_async_resolver(item);
    Arc::new(move |ctx: Context, raw: Value| {
        let spec = Arc::clone(&spec);
        let resolver = Arc::clone(&resolver);
        async move {
            let evaluated = eval_owned(ctx.clone(), raw).await?;
            let items = expect_array(&spec, evaluated, None)?;
            let resolved =
                try_join_all(items.into_iter().map(|item| resolver(ctx.clone(), item))).await?;
            spec.check(Value::Array(resolved))
        }
        .boxed()
    })
}

fn async_record<'a>(
    spec: &TypeSpec,
    fields: impl Iterator<Item = (&'a String, &'a TypeSpec)>,
) -> AsyncResolver {
    let spec = Arc::new(spec.clone());
    let resolvers: Arc<[(String, AsyncResolver)]> = fields
        .map(|(key, field)| (key.clone(), compile_async_resolver(field)))
        .collect();
    Arc::new(move |ctx: Context, raw: Value| {
        let spec = Arc::clone(&spec);
        let resolvers = Arc::clone(&resolvers);
        async move {
            let evaluated = eval_owned(ctx.clone(), raw).await?;
            let mut obj = expect_object(&spec, evaluated)?;
            let pending = resolvers.iter().map(|(key, resolver)| {
                let present = obj.get(key).cloned();
                let is_present = present.is_some();
                let resolving = resolver(ctx.clone(), present.unwrap_or(Value::Null));
                async move { resolving.await.map(|value| (is_present, value)) }
            });
            let resolved = try_join_all(pending).await?;
            for ((key, _), (is_present, value)) in resolvers.iter().zip(resolved) {
                if is_present || !value.is_null() {
                    obj.insert(key.clone(), value);
                }
            }
            spec.check(Value::Object(obj))
        }
        .boxed()
    })
}

fn async_record_of(spec: &TypeSpec, item: &TypeSpec) -> AsyncResolver {
    let spec = Arc::new(spec.clone());
    let resolver = compile_async_resolver(item);
    Arc::new(move |ctx: Context, raw: Value| {
        let spec = Arc::clone(&spec);
        let resolver = Arc::clone(&resolver);
        async move {
            let evaluated = eval_owned(ctx.clone(), raw).await?;
            let obj = expect_object(&spec, evaluated)?;
            let (keys, values): (Vec<String>, Vec<Value>) = obj.into_iter().unzip();
            let resolved =
                try_join_all(values.into_iter().map(|value| resolver(ctx.clone(), value))).await?;
            spec.check(Value::Object(keys.into_iter().zip(resolved).collect()))
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Definition, Registry};
    use crate::runtime::ErrorKind;
    use crate::types::ValueType;
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::Mutex;

    fn registry() -> Arc<Registry> {
        Registry::builder()
            .register(
                "$double",
                InterpreterSpec::new(
                    |params, _| Ok(json!(params[0].as_i64().unwrap_or(0) * 2).into()),
                    vec![TypeSpec::number()],
                ),
            )
            .register("$echo", Definition::raw(|params, _| Ok(json!(params).into())))
            .build()
            .expect("registry")
    }

    fn ctx(value: Value) -> Context {
        Context::new(registry(), value)
    }

    fn resolve_both(spec: &TypeSpec, ctx: &Context, raw: Value) -> (EvalResult, EvalResult) {
        let sync = compile_sync_resolver(spec)(ctx, &raw);
        let async_ = block_on(compile_async_resolver(spec)(ctx.clone(), raw));
        (sync, async_)
    }

    #[test]
    fn tuple_enforces_arity() {
        let spec = TypeSpec::tuple([TypeSpec::string(), TypeSpec::number()]);
        let ctx = ctx(Value::Null);
        for bad in [json!(["a"]), json!(["a", 1, 2]), json!("a")] {
            let (sync, async_) = resolve_both(&spec, &ctx, bad);
            assert_eq!(sync.unwrap_err().kind, ErrorKind::TypeMismatch);
            assert_eq!(async_.unwrap_err().kind, ErrorKind::TypeMismatch);
        }
        let (sync, async_) = resolve_both(&spec, &ctx, json!(["a", 1]));
        assert_eq!(sync.unwrap(), json!(["a", 1]));
        assert_eq!(async_.unwrap(), json!(["a", 1]));
    }

    #[test]
    fn tuple_elements_are_evaluated_positionally() {
        let spec = TypeSpec::tuple([TypeSpec::string(), TypeSpec::number()]);
        let (sync, async_) = resolve_both(&spec, &ctx(json!(4)), json!(["a", ["$double"]]));
        assert_eq!(sync.unwrap(), json!(["a", 8]));
        assert_eq!(async_.unwrap(), json!(["a", 8]));
    }

    #[test]
    fn sequence_must_be_homogeneous() {
        let spec = TypeSpec::sequence_of(TypeSpec::number());
        let ctx = ctx(Value::Null);
        let (sync, async_) = resolve_both(&spec, &ctx, json!([1, 2, "3"]));
        assert_eq!(sync.unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(async_.unwrap_err().kind, ErrorKind::TypeMismatch);
        let (sync, async_) = resolve_both(&spec, &ctx, json!([1, 2, 3]));
        assert_eq!(sync.unwrap(), json!([1, 2, 3]));
        assert_eq!(async_.unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn sequence_resolves_nested_expressions_in_order() {
        let spec = TypeSpec::sequence_of(TypeSpec::number());
        let raw = json!([["$double", 1], 5, ["$double", 3]]);
        let (sync, async_) = resolve_both(&spec, &ctx(Value::Null), raw);
        assert_eq!(sync.unwrap(), json!([2, 5, 6]));
        assert_eq!(async_.unwrap(), json!([2, 5, 6]));
    }

    #[test]
    fn record_resolves_declared_fields_and_keeps_extras() {
        let spec = TypeSpec::record([
            ("count", TypeSpec::number()),
            ("label", TypeSpec::one_of([ValueType::String, ValueType::Null])),
        ]);
        let raw = json!({"count": ["$double", 21], "extra": ["$double", 1]});
        let (sync, async_) = resolve_both(&spec, &ctx(Value::Null), raw);
        let expected = json!({"count": 42, "extra": ["$double", 1]});
        assert_eq!(sync.unwrap(), expected);
        assert_eq!(async_.unwrap(), expected);
    }

    #[test]
    fn record_rejects_missing_required_field() {
        let spec = TypeSpec::record([("count", TypeSpec::number())]);
        let (sync, async_) = resolve_both(&spec, &ctx(Value::Null), json!({"other": 1}));
        assert_eq!(sync.unwrap_err().kind, ErrorKind::TypeMismatch);
        assert_eq!(async_.unwrap_err().kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn record_of_applies_one_resolver_to_every_value() {
        let spec = TypeSpec::record_of(TypeSpec::number());
        let ctx = ctx(Value::Null);
        let (sync, async_) = resolve_both(&spec, &ctx, json!({"a": ["$double", 2], "b": 1}));
        assert_eq!(sync.unwrap(), json!({"a": 4, "b": 1}));
        assert_eq!(async_.unwrap(), json!({"a": 4, "b": 1}));
        let (sync, _) = resolve_both(&spec, &ctx, json!({"a": "x"}));
        assert_eq!(sync.unwrap_err().kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn enum_validates_evaluated_value() {
        let spec = TypeSpec::enumeration([json!("asc"), json!("desc")]);
        let (sync, async_) = resolve_both(&spec, &ctx(Value::Null), json!("asc"));
        assert_eq!(sync.unwrap(), json!("asc"));
        assert_eq!(async_.unwrap(), json!("asc"));
        let (sync, _) = resolve_both(&spec, &ctx(Value::Null), json!("up"));
        let err = sync.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert!(err.message.contains(r#"{"enum":["asc","desc"]}"#), "{}", err.message);
    }

    #[test]
    fn delayed_any_passes_raw_expression_through() {
        let raw = json!(["$double", 2]);
        let (sync, async_) = resolve_both(&TypeSpec::delayed(), &ctx(Value::Null), raw.clone());
        assert_eq!(sync.unwrap(), raw);
        assert_eq!(async_.unwrap(), raw);
        let (sync, async_) = resolve_both(&TypeSpec::any(), &ctx(Value::Null), raw);
        assert_eq!(sync.unwrap(), json!(4));
        assert_eq!(async_.unwrap(), json!(4));
    }

    #[test]
    fn sync_params_resolve_left_to_right() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let registry = Registry::builder()
            .register(
                "$note",
                Definition::raw(move |params, _| {
                    log.lock().unwrap().push(params[0].clone());
                    Ok(params[0].clone().into())
                }),
            )
            .register(
                "$pair",
                InterpreterSpec::new(
                    |params, _| Ok(json!(params).into()),
                    vec![TypeSpec::any(), TypeSpec::any()],
                ),
            )
            .build()
            .unwrap();
        let ctx = Context::new(registry, Value::Null);
        let out = ctx
            .evaluate(&json!(["$pair", ["$note", "first"], ["$note", "second"]]))
            .unwrap();
        assert_eq!(out, json!(["first", "second"]));
        assert_eq!(*seen.lock().unwrap(), vec![json!("first"), json!("second")]);
    }

    #[test]
    fn first_failing_param_wins_in_sync_mode() {
        let spec = InterpreterSpec::new(
            |_, _| Ok(Value::Null.into()),
            vec![TypeSpec::number(), TypeSpec::string()],
        );
        let interpreter = spec.compile_sync().unwrap();
        let err = interpreter(&ctx(Value::Null), &[json!("x"), json!(1)]).unwrap_err();
        assert!(err.message.starts_with("expected \"number\""), "{}", err.message);
    }

    #[test]
    fn missing_non_default_param_resolves_as_null() {
        let spec = InterpreterSpec::new(
            |params, _| Ok(json!(params).into()),
            vec![TypeSpec::one_of([ValueType::Null, ValueType::Number]), TypeSpec::any()],
        );
        let ctx = ctx(json!(7));
        let out = spec.compile_sync().unwrap()(&ctx, &[]).unwrap();
        assert_eq!(out, json!([null, 7]));
        let out = block_on(spec.compile_async().unwrap()(ctx, vec![])).unwrap();
        assert_eq!(out, json!([null, 7]));
    }

    #[test]
    fn explicit_null_is_not_substituted() {
        let spec = InterpreterSpec::new(|params, _| Ok(params[0].clone().into()), vec![TypeSpec::any()]);
        let ctx = ctx(json!("scope"));
        let interpreter = spec.compile_sync().unwrap();
        assert_eq!(interpreter(&ctx, &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(interpreter(&ctx, &[]).unwrap(), json!("scope"));
    }

    #[test]
    fn default_param_index_is_validated() {
        let spec = InterpreterSpec::new(|_, _| Ok(Value::Null.into()), vec![TypeSpec::any()])
            .default_param(3);
        let err = spec.compile_sync().err().expect("invalid");
        assert_eq!(err.kind, ErrorKind::InvalidTypeSpec);
        let err = spec.compile_async().err().expect("invalid");
        assert_eq!(err.kind, ErrorKind::InvalidTypeSpec);
    }

    #[test]
    fn raw_functions_evaluate_without_substitution() {
        let ctx = ctx(json!(3));
        assert_eq!(ctx.evaluate(&json!(["$echo"])).unwrap(), json!([]));
        assert_eq!(
            ctx.evaluate(&json!(["$echo", ["$double", 1], "x"])).unwrap(),
            json!([2, "x"])
        );
        let out = block_on(ctx.evaluate_async(&json!(["$echo", ["$double", 5]]))).unwrap();
        assert_eq!(out, json!([10]));
    }
}
