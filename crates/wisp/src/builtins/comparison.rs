//! Ordering and equality builtins: `< > <= >= = not=`.

use crate::{
    exception::RunResult,
    value::{Builtin, Value},
};

use super::{arity_err, type_err};

fn as_f64(v: &Value) -> RunResult<f64> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(type_err("number", other)),
    }
}

fn chain(args: &[Value], name: &str, ok: impl Fn(f64, f64) -> bool) -> RunResult<Value> {
    if args.len() < 2 {
        return Err(arity_err(name, args.len()));
    }
    for pair in args.windows(2) {
        if !ok(as_f64(&pair[0])?, as_f64(&pair[1])?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn lt(args: &[Value]) -> RunResult<Value> {
    chain(args, "<", |a, b| a < b)
}

fn gt(args: &[Value]) -> RunResult<Value> {
    chain(args, ">", |a, b| a > b)
}

fn le(args: &[Value]) -> RunResult<Value> {
    chain(args, "<=", |a, b| a <= b)
}

fn ge(args: &[Value]) -> RunResult<Value> {
    chain(args, ">=", |a, b| a >= b)
}

fn eq(args: &[Value]) -> RunResult<Value> {
    if args.len() < 2 {
        return Err(arity_err("=", args.len()));
    }
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn not_eq(args: &[Value]) -> RunResult<Value> {
    match eq(args)? {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => unreachable!("eq only returns booleans"),
    }
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: 2, max_arity: None, func: $func };
    };
}

builtin!(LT, "<", lt);
builtin!(GT, ">", gt);
builtin!(LE, "<=", le);
builtin!(GE, ">=", ge);
builtin!(EQ, "=", eq);
builtin!(NOT_EQ, "not=", not_eq);

pub static BUILTINS: &[&Builtin] = &[&LT, &GT, &LE, &GE, &EQ, &NOT_EQ];
