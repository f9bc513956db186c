//! Evaluate a JSON document `{ "value": <data>, "expression": <expr> }` in both
//! modes and print the results.
//!
//! Usage: cargo run -p jexpr-core --example run_expr -- crates/jexpr-core/examples/order.json
//!
//! Set `JEXPR_RUNTIME_MODE=development` and `RUST_LOG=warn` to see warnings
//! for identifiers that look like expressions but are not registered.

use jexpr_core::{Context, HandlerResult, InterpreterSpec, Outcome, Registry, TypeSpec};
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn math_sum(params: &[Value], _ctx: &Context) -> HandlerResult {
    let total = params[0].as_f64().unwrap_or(0.0) + params[1].as_f64().unwrap_or(0.0);
    Ok(json!(total).into())
}

fn math_mult(params: &[Value], _ctx: &Context) -> HandlerResult {
    let product = params[0].as_f64().unwrap_or(0.0) * params[1].as_f64().unwrap_or(0.0);
    Ok(json!(product).into())
}

fn op_if(params: &[Value], ctx: &Context) -> HandlerResult {
    let branch = if params[0].as_bool().unwrap_or(false) {
        &params[1]
    } else {
        &params[2]
    };
    Ok(Outcome::eval(ctx.clone(), branch.clone()))
}

fn op_gt(params: &[Value], _ctx: &Context) -> HandlerResult {
    let gt = params[1].as_f64().unwrap_or(0.0) > params[0].as_f64().unwrap_or(0.0);
    Ok(Value::Bool(gt).into())
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("Usage: run_expr <path.json>");
            eprintln!("  e.g. cargo run -p jexpr-core --example run_expr -- crates/jexpr-core/examples/order.json");
            process::exit(1);
        }
    };
    let src = fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("read {}: {}", path, e);
        process::exit(1);
    });
    let doc: Value = serde_json::from_str(&src).unwrap_or_else(|e| {
        eprintln!("parse {}: {}", path, e);
        process::exit(1);
    });

    let registry = Registry::builder()
        .register(
            "$mathSum",
            InterpreterSpec::new(math_sum, vec![TypeSpec::number(), TypeSpec::number()]),
        )
        .register(
            "$mathMult",
            InterpreterSpec::new(math_mult, vec![TypeSpec::number(), TypeSpec::number()]),
        )
        .register(
            "$gt",
            InterpreterSpec::new(op_gt, vec![TypeSpec::number(), TypeSpec::number()]),
        )
        .register(
            "$if",
            InterpreterSpec::new(
                op_if,
                vec![TypeSpec::boolean(), TypeSpec::delayed(), TypeSpec::delayed()],
            )
            .no_default_param(),
        )
        .build()
        .unwrap_or_else(|e| {
            eprintln!("registry: {e}");
            process::exit(1);
        });

    let ctx = Context::new(registry, doc.get("value").cloned().unwrap_or(Value::Null));
    let expr = doc.get("expression").cloned().unwrap_or(Value::Null);

    let sync = ctx.evaluate(&expr).unwrap_or_else(|e| {
        eprintln!("sync {}: {}", path, e);
        process::exit(1);
    });
    let async_ = futures::executor::block_on(ctx.evaluate_async(&expr)).unwrap_or_else(|e| {
        eprintln!("async {}: {}", path, e);
        process::exit(1);
    });
    println!("sync:  {}", serde_json::to_string_pretty(&sync).unwrap_or_default());
    println!("async: {}", serde_json::to_string_pretty(&async_).unwrap_or_default());
}
