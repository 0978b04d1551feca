//! Numeric builtins: `+ - * /`, `mod`, `inc`/`dec`, `min`/`max`, `abs`.

use crate::{
    exception::{Exception, RunResult},
    value::{Builtin, Value},
};

use super::{arity_err, type_err};

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(v: &Value) -> RunResult<Num> {
    match v {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(type_err("number", other)),
    }
}

impl Num {
    fn to_value(self) -> Value {
        match self {
            Self::Int(n) => Value::Int(n),
            Self::Float(f) => Value::Float(f),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }
}

/// Applies an int-int and a float-float combinator, promoting to float the
/// instant either side isn't an int.
fn combine(a: Num, b: Num, int_op: impl Fn(i64, i64) -> i64, float_op: impl Fn(f64, f64) -> f64) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Num::Int(int_op(x, y)),
        _ => Num::Float(float_op(a.to_f64(), b.to_f64())),
    }
}

fn fold(args: &[Value], identity: Num, int_op: impl Fn(i64, i64) -> i64 + Copy, float_op: impl Fn(f64, f64) -> f64 + Copy) -> RunResult<Value> {
    let mut acc = identity;
    for a in args {
        acc = combine(acc, as_num(a)?, int_op, float_op);
    }
    Ok(acc.to_value())
}

fn plus(args: &[Value]) -> RunResult<Value> {
    fold(args, Num::Int(0), |a, b| a + b, |a, b| a + b)
}

fn minus(args: &[Value]) -> RunResult<Value> {
    match args {
        [] => Err(arity_err("-", 0)),
        [single] => {
            let n = as_num(single)?;
            Ok(match n {
                Num::Int(x) => Value::Int(-x),
                Num::Float(x) => Value::Float(-x),
            })
        }
        [first, rest @ ..] => fold(rest, as_num(first)?, |a, b| a - b, |a, b| a - b),
    }
}

fn times(args: &[Value]) -> RunResult<Value> {
    fold(args, Num::Int(1), |a, b| a * b, |a, b| a * b)
}

fn divide(args: &[Value]) -> RunResult<Value> {
    let acc = match args {
        [] => return Err(arity_err("/", 0)),
        [single] => div_two(Num::Int(1), as_num(single)?)?,
        [first, rest @ ..] => {
            let mut acc = as_num(first)?;
            for a in rest {
                acc = div_two(acc, as_num(a)?)?;
            }
            acc
        }
    };
    Ok(acc.to_value())
}

fn div_two(a: Num, b: Num) -> RunResult<Num> {
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        if y == 0 {
            return Err(Exception::new("ArithmeticError", "Division by zero").into());
        }
        if x % y == 0 {
            return Ok(Num::Int(x / y));
        }
    }
    let y = b.to_f64();
    if y == 0.0 {
        return Err(Exception::new("ArithmeticError", "Division by zero").into());
    }
    Ok(Num::Float(a.to_f64() / y))
}

fn modulo(args: &[Value]) -> RunResult<Value> {
    let [a, b] = args else { return Err(arity_err("mod", args.len())) };
    match (as_num(a)?, as_num(b)?) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(Exception::new("ArithmeticError", "Division by zero").into());
            }
            Ok(Value::Int(x.rem_euclid(y)))
        }
        (x, y) => Ok(Value::Float(x.to_f64().rem_euclid(y.to_f64()))),
    }
}

fn inc(args: &[Value]) -> RunResult<Value> {
    let [a] = args else { return Err(arity_err("inc", args.len())) };
    Ok(match as_num(a)? {
        Num::Int(n) => Value::Int(n + 1),
        Num::Float(f) => Value::Float(f + 1.0),
    })
}

fn dec(args: &[Value]) -> RunResult<Value> {
    let [a] = args else { return Err(arity_err("dec", args.len())) };
    Ok(match as_num(a)? {
        Num::Int(n) => Value::Int(n - 1),
        Num::Float(f) => Value::Float(f - 1.0),
    })
}

fn abs(args: &[Value]) -> RunResult<Value> {
    let [a] = args else { return Err(arity_err("abs", args.len())) };
    Ok(match as_num(a)? {
        Num::Int(n) => Value::Int(n.abs()),
        Num::Float(f) => Value::Float(f.abs()),
    })
}

fn min(args: &[Value]) -> RunResult<Value> {
    let [first, rest @ ..] = args else { return Err(arity_err("min", 0)) };
    let mut best = as_num(first)?;
    for a in rest {
        let n = as_num(a)?;
        if n.to_f64() < best.to_f64() {
            best = n;
        }
    }
    Ok(best.to_value())
}

fn max(args: &[Value]) -> RunResult<Value> {
    let [first, rest @ ..] = args else { return Err(arity_err("max", 0)) };
    let mut best = as_num(first)?;
    for a in rest {
        let n = as_num(a)?;
        if n.to_f64() > best.to_f64() {
            best = n;
        }
    }
    Ok(best.to_value())
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(PLUS, "+", 0, None, plus);
builtin!(MINUS, "-", 1, None, minus);
builtin!(TIMES, "*", 0, None, times);
builtin!(DIVIDE, "/", 1, None, divide);
builtin!(MOD, "mod", 2, Some(2), modulo);
builtin!(INC, "inc", 1, Some(1), inc);
builtin!(DEC, "dec", 1, Some(1), dec);
builtin!(ABS, "abs", 1, Some(1), abs);
builtin!(MIN, "min", 1, None, min);
builtin!(MAX, "max", 1, None, max);

pub static BUILTINS: &[&Builtin] = &[&PLUS, &MINUS, &TIMES, &DIVIDE, &MOD, &INC, &DEC, &ABS, &MIN, &MAX];
