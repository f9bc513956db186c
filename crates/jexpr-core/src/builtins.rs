//! Scope-access interpreters the engine itself depends on.
//!
//! Default-param substitution rewrites an omitted argument to
//! [`current_value_expr`], so `$value` has to be present in any registry that
//! relies on defaults. `RegistryBuilder::new` registers these for you.

use crate::compiler::{HandlerResult, InterpreterSpec, Outcome};
use crate::engine::Definition;
use crate::runtime::Context;
use crate::types::{TypeSpec, ValueType};
use serde_json::{Value, json};

pub const VALUE: &str = "$value";
pub const LITERAL: &str = "$literal";
pub const EVALUATE: &str = "$evaluate";

/// `["$value", null]`: the current scope value.
pub fn current_value_expr() -> Value {
    json!([VALUE, null])
}

pub fn core_definitions() -> Vec<(&'static str, Definition)> {
    vec![
        (VALUE, value_interpreter().into()),
        (LITERAL, literal_interpreter().into()),
        (EVALUATE, evaluate_interpreter().into()),
    ]
}

/// `["$value", path?, default?]`
fn value_interpreter() -> InterpreterSpec {
    InterpreterSpec::new(
        op_value,
        vec![
            TypeSpec::one_of([ValueType::String, ValueType::Null]),
            TypeSpec::delayed(),
        ],
    )
    .no_default_param()
}

fn op_value(params: &[Value], ctx: &Context) -> HandlerResult {
    let path = params.first().and_then(Value::as_str);
    match ctx.resolve(path) {
        Some(value) => Ok(value.into()),
        // default is only evaluated on a miss, against the caller's context
        None => {
            let default = params.get(1).cloned().unwrap_or(Value::Null);
            Ok(Outcome::eval(ctx.clone(), default))
        }
    }
}

/// `["$literal", value]`
fn literal_interpreter() -> InterpreterSpec {
    InterpreterSpec::new(
        |params, _| Ok(params.first().cloned().unwrap_or(Value::Null).into()),
        vec![TypeSpec::delayed()],
    )
    .no_default_param()
}

/// `["$evaluate", expression, scopeValue = $$VALUE]`
fn evaluate_interpreter() -> InterpreterSpec {
    InterpreterSpec::new(op_evaluate, vec![TypeSpec::delayed(), TypeSpec::any()])
}

fn op_evaluate(params: &[Value], ctx: &Context) -> HandlerResult {
    let expr = params.first().cloned().unwrap_or(Value::Null);
    let scope_value = params.get(1).cloned().unwrap_or(Value::Null);
    Ok(Outcome::eval(ctx.with_value(scope_value), expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Registry;
    use crate::runtime::{ARRAY_KEY, EvalResult, INDEX_KEY};
    use futures::executor::block_on;
    use serde_json::Map;

    fn ctx(value: Value) -> Context {
        let registry = Registry::builder()
            .register(
                "$fail",
                Definition::raw(|_, _| Err(crate::runtime::EvalError::new("should not run"))),
            )
            .build()
            .unwrap();
        Context::new(registry, value)
    }

    fn both(ctx: &Context, expr: Value) -> EvalResult {
        let sync = ctx.evaluate(&expr);
        let async_ = block_on(ctx.evaluate_async(&expr));
        assert_eq!(sync, async_, "{expr}");
        sync
    }

    #[test]
    fn value_reads_paths() {
        let ctx = ctx(json!({"user": {"name": "Ada", "langs": ["en", "fr"]}}));
        assert_eq!(both(&ctx, json!(["$value", "user.name"])).unwrap(), json!("Ada"));
        assert_eq!(both(&ctx, json!(["$value", "user.langs.1"])).unwrap(), json!("fr"));
        assert_eq!(both(&ctx, json!(["$value", "user.age"])).unwrap(), Value::Null);
        assert_eq!(both(&ctx, json!(["$value"])).unwrap(), *ctx.value());
        assert_eq!(both(&ctx, current_value_expr()).unwrap(), *ctx.value());
    }

    #[test]
    fn value_path_may_be_an_expression() {
        let ctx = ctx(json!({"key": "b", "b": 2}));
        assert_eq!(both(&ctx, json!(["$value", ["$value", "key"]])).unwrap(), json!(2));
        let err = ctx.evaluate(&json!(["$value", 3])).unwrap_err();
        assert_eq!(err.kind, crate::runtime::ErrorKind::TypeMismatch);
    }

    #[test]
    fn value_default_is_lazy() {
        let ctx = ctx(json!({"a": 1}));
        assert_eq!(both(&ctx, json!(["$value", "a", ["$fail"]])).unwrap(), json!(1));
        assert_eq!(both(&ctx, json!(["$value", "z", ["$value", "a"]])).unwrap(), json!(1));
        assert!(ctx.evaluate(&json!(["$value", "z", ["$fail"]])).is_err());
    }

    #[test]
    fn literal_returns_argument_unevaluated() {
        let ctx = ctx(json!(1));
        assert_eq!(
            both(&ctx, json!(["$literal", ["$value"]])).unwrap(),
            json!(["$value"])
        );
        assert_eq!(both(&ctx, json!(["$literal"])).unwrap(), Value::Null);
    }

    #[test]
    fn evaluate_focuses_a_child_scope() {
        let ctx = ctx(json!({"outer": true, "inner": {"x": 5}}));
        let expr = json!(["$evaluate", ["$value", "x"], ["$value", "inner"]]);
        assert_eq!(both(&ctx, expr).unwrap(), json!(5));
        let expr = json!(["$evaluate", ["$value", "$$PARENT_SCOPE.outer"], 42]);
        assert_eq!(both(&ctx, expr).unwrap(), json!(true));
        let expr = json!(["$evaluate", ["$value", "inner.x"]]);
        assert_eq!(both(&ctx, expr).unwrap(), json!(5));
    }

    #[test]
    fn value_reads_loop_bindings() {
        let ctx = ctx(json!(["a", "b"]));
        let mut bindings = Map::new();
        bindings.insert(INDEX_KEY.to_string(), json!(1));
        bindings.insert(ARRAY_KEY.to_string(), ctx.value().clone());
        let item = ctx.with_scope(json!("b"), bindings);
        assert_eq!(both(&item, json!(["$value", "$$INDEX"])).unwrap(), json!(1));
        assert_eq!(both(&item, json!(["$value", "$$ARRAY.0"])).unwrap(), json!("a"));
        assert_eq!(both(&item, json!(["$value"])).unwrap(), json!("b"));
        assert_eq!(
            both(&item, json!(["$value", "$$PARENT_SCOPE.$$VALUE"])).unwrap(),
            json!(["a", "b"])
        );
    }
}
