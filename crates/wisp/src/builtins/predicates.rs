//! Type and shape predicates, plus logical `not`.

use crate::value::{Builtin, Callable, Value};
use crate::exception::RunResult;

use super::arity_err;

fn one<'a>(args: &'a [Value], name: &str) -> RunResult<&'a Value> {
    match args {
        [a] => Ok(a),
        _ => Err(arity_err(name, args.len())),
    }
}

fn not(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(!one(args, "not")?.is_truthy()))
}

fn is_nil(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "nil?")?, Value::Nil)))
}

fn is_true(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "true?")?, Value::Bool(true))))
}

fn is_false(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "false?")?, Value::Bool(false))))
}

fn is_number(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "number?")?, Value::Int(_) | Value::Float(_))))
}

fn is_integer(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "integer?")?, Value::Int(_))))
}

fn is_float(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "float?")?, Value::Float(_))))
}

fn is_string(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "string?")?, Value::Str(_))))
}

fn is_symbol(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "symbol?")?, Value::Symbol(_))))
}

fn is_keyword(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "keyword?")?, Value::Keyword(_))))
}

fn is_list(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "list?")?, Value::List(_))))
}

fn is_vector(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "vector?")?, Value::Vector(_))))
}

fn is_map(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "map?")?, Value::Map(_))))
}

fn is_set(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "set?")?, Value::Set(_))))
}

fn is_fn(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "fn?")?, Value::Fn(Callable::Closure(_) | Callable::Builtin(_) | Callable::CtxBuiltin(_)))))
}

fn is_seq(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Bool(matches!(one(args, "seq?")?, Value::List(_) | Value::Lazy(_))))
}

fn is_even(args: &[Value]) -> RunResult<Value> {
    match one(args, "even?")? {
        Value::Int(n) => Ok(Value::Bool(n % 2 == 0)),
        other => Err(super::type_err("integer", other)),
    }
}

fn is_odd(args: &[Value]) -> RunResult<Value> {
    match one(args, "odd?")? {
        Value::Int(n) => Ok(Value::Bool(n % 2 != 0)),
        other => Err(super::type_err("integer", other)),
    }
}

fn is_zero(args: &[Value]) -> RunResult<Value> {
    match one(args, "zero?")? {
        Value::Int(n) => Ok(Value::Bool(*n == 0)),
        Value::Float(f) => Ok(Value::Bool(*f == 0.0)),
        other => Err(super::type_err("number", other)),
    }
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: 1, max_arity: Some(1), func: $func };
    };
}

builtin!(NOT, "not", not);
builtin!(IS_NIL, "nil?", is_nil);
builtin!(IS_TRUE, "true?", is_true);
builtin!(IS_FALSE, "false?", is_false);
builtin!(IS_NUMBER, "number?", is_number);
builtin!(IS_INTEGER, "integer?", is_integer);
builtin!(IS_FLOAT, "float?", is_float);
builtin!(IS_STRING, "string?", is_string);
builtin!(IS_SYMBOL, "symbol?", is_symbol);
builtin!(IS_KEYWORD, "keyword?", is_keyword);
builtin!(IS_LIST, "list?", is_list);
builtin!(IS_VECTOR, "vector?", is_vector);
builtin!(IS_MAP, "map?", is_map);
builtin!(IS_SET, "set?", is_set);
builtin!(IS_FN, "fn?", is_fn);
builtin!(IS_SEQ, "seq?", is_seq);
builtin!(IS_EVEN, "even?", is_even);
builtin!(IS_ODD, "odd?", is_odd);
builtin!(IS_ZERO, "zero?", is_zero);

pub static BUILTINS: &[&Builtin] = &[
    &NOT, &IS_NIL, &IS_TRUE, &IS_FALSE, &IS_NUMBER, &IS_INTEGER, &IS_FLOAT, &IS_STRING, &IS_SYMBOL, &IS_KEYWORD,
    &IS_LIST, &IS_VECTOR, &IS_MAP, &IS_SET, &IS_FN, &IS_SEQ, &IS_EVEN, &IS_ODD, &IS_ZERO,
];
