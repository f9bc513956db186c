//! Expression recognition and dispatch.
//!
//! An array is an expression only when its first element names an
//! interpreter in the active registry. Everything else, including arrays and
//! objects that merely look like data, is a literal and comes back unchanged.
//! Arguments are handed to the interpreter raw; resolving them is the
//! interpreter's own job.

use crate::engine::Registry;
use crate::runtime::{Context, EvalResult};
use crate::types::TypeSpec;
use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;

/// Prefix every expression identifier carries.
pub const SIGIL: char = '$';

/// True iff `candidate` is `[id, ...]` with `id` registered.
pub fn is_expression(registry: &Registry, candidate: &Value) -> bool {
    expression_id(candidate).is_some_and(|id| registry.contains(id))
}

/// Registry-independent heuristic: `["$something", ...]`.
///
/// Only feeds diagnostics; never changes what `evaluate` returns.
pub fn looks_like_expression(candidate: &Value) -> bool {
    expression_id(candidate).is_some_and(|id| id.starts_with(SIGIL))
}

fn expression_id(candidate: &Value) -> Option<&str> {
    candidate.as_array()?.first()?.as_str()
}

/// Evaluate synchronously.
pub fn evaluate(ctx: &Context, node: &Value) -> EvalResult {
    let registry = ctx.registry();
    if registry.diagnostics() {
        warn_if_unregistered(registry, node);
    }
    let Value::Array(items) = node else {
        return Ok(node.clone());
    };
    let Some((id, interpreter)) = items
        .first()
        .and_then(Value::as_str)
        .and_then(|id| registry.get(id).map(|interpreter| (id, interpreter)))
    else {
        return Ok(node.clone());
    };
    (interpreter.sync)(ctx, &items[1..]).map_err(|err| err.within(id))
}

/// Evaluate asynchronously. The returned future owns its inputs.
pub fn evaluate_async(ctx: &Context, node: &Value) -> BoxFuture<'static, EvalResult> {
    eval_owned(ctx.clone(), node.clone())
}

pub(crate) fn eval_owned(ctx: Context, node: Value) -> BoxFuture<'static, EvalResult> {
    let registry = ctx.registry();
    if registry.diagnostics() {
        warn_if_unregistered(registry, &node);
    }
    let Some((id, interpreter)) = expression_id(&node).and_then(|id| {
        registry
            .get(id)
            .map(|interpreter| (id.to_string(), interpreter.async_.clone()))
    }) else {
        return future::ready(Ok(node)).boxed();
    };
    let args = match node {
        Value::Array(mut items) => items.split_off(1),
        _ => Vec::new(),
    };
    let pending = interpreter(ctx, args);
    async move { pending.await.map_err(|err| err.within(&id)) }.boxed()
}

/// Evaluate, then require the result to satisfy `spec`.
pub fn evaluate_typed(spec: &TypeSpec, ctx: &Context, node: &Value) -> EvalResult {
    spec.check(evaluate(ctx, node)?)
}

pub fn evaluate_typed_async(
    spec: &TypeSpec,
    ctx: &Context,
    node: &Value,
) -> BoxFuture<'static, EvalResult> {
    let spec = spec.clone();
    let pending = evaluate_async(ctx, node);
    async move { spec.check(pending.await?) }.boxed()
}

fn warn_if_unregistered(registry: &Registry, node: &Value) {
    if let Some(id) = expression_id(node)
        && id.starts_with(SIGIL)
        && !registry.contains(id)
    {
        tracing::warn!(
            identifier = id,
            "`{id}` looks like an expression but is not a registered interpreter; evaluating as literal"
        );
    }
}
