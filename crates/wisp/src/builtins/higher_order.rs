//! Builtins that call back into user code: `apply map filter reduce`.
//!
//! These need the live [`Context`] to drive the trampoline (`call::apply`),
//! so they are [`CtxBuiltin`]s rather than plain [`Builtin`]s (§4.E step 3
//! `needs-ctx`) — a var bound to one of these is resolved by the analyzer to
//! a [`crate::node::Node::NeedsCtx`] instead of an ordinary `var-value`.

use crate::{
    call,
    env::Context,
    exception::RunResult,
    interpreter::interpret_body,
    value::{Callable, CtxBuiltin, Value},
};

use super::{arity_err, sequences::as_items, type_err};

fn as_callable(v: &Value) -> RunResult<&Callable> {
    match v {
        Value::Fn(c) => Ok(c),
        other => Err(type_err("a function", other)),
    }
}

/// `(apply f a b [c d ...])`: the last argument supplies the trailing
/// positional arguments, the ones before it are prepended as-is.
fn apply(ctx: &Context, args: &[Value]) -> RunResult<Value> {
    let [f, rest @ ..] = args else { return Err(arity_err("apply", args.len())) };
    let callable = as_callable(f)?;
    let Some((last, front)) = rest.split_last() else { return Err(arity_err("apply", args.len())) };
    let mut call_args: Vec<Value> = front.to_vec();
    call_args.extend(as_items(last)?);
    call::apply(ctx, callable, &call_args, &interpret_body)
}

fn map(ctx: &Context, args: &[Value]) -> RunResult<Value> {
    let [f, coll] = args else { return Err(arity_err("map", args.len())) };
    let callable = as_callable(f)?;
    let mut out = Vec::new();
    for item in as_items(coll)? {
        out.push(call::apply(ctx, callable, &[item], &interpret_body)?);
    }
    Ok(Value::List(crate::value::PList::from_vec(out)))
}

fn filter(ctx: &Context, args: &[Value]) -> RunResult<Value> {
    let [f, coll] = args else { return Err(arity_err("filter", args.len())) };
    let callable = as_callable(f)?;
    let mut out = Vec::new();
    for item in as_items(coll)? {
        if call::apply(ctx, callable, std::slice::from_ref(&item), &interpret_body)?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::List(crate::value::PList::from_vec(out)))
}

fn reduce(ctx: &Context, args: &[Value]) -> RunResult<Value> {
    let (f, init, coll) = match args {
        [f, coll] => {
            let items = as_items(coll)?;
            let Some((first, rest)) = items.split_first() else {
                return Ok(Value::Nil);
            };
            return fold(ctx, as_callable(f)?, first.clone(), rest);
        }
        [f, init, coll] => (f, init.clone(), coll),
        _ => return Err(arity_err("reduce", args.len())),
    };
    let items = as_items(coll)?;
    fold(ctx, as_callable(f)?, init, &items)
}

fn fold(ctx: &Context, callable: &Callable, init: Value, rest: &[Value]) -> RunResult<Value> {
    let mut acc = init;
    for item in rest {
        acc = call::apply(ctx, callable, &[acc, item.clone()], &interpret_body)?;
    }
    Ok(acc)
}

macro_rules! ctx_builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: CtxBuiltin = CtxBuiltin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

ctx_builtin!(APPLY, "apply", 2, None, apply);
ctx_builtin!(MAP, "map", 2, Some(2), map);
ctx_builtin!(FILTER, "filter", 2, Some(2), filter);
ctx_builtin!(REDUCE, "reduce", 2, Some(3), reduce);

pub static CTX_BUILTINS: &[&CtxBuiltin] = &[&APPLY, &MAP, &FILTER, &REDUCE];
