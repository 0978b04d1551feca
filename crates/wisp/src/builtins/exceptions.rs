//! `ex-info ex-message ex-data ex-cause` — the user-facing wrapper around a
//! [`Exception`](crate::exception::Exception), round-tripped through `throw`/`catch`
//! (§4.F `throw`/`catch`, §8 scenario 5).

use std::rc::Rc;

use crate::{
    exception::{Exception, ExceptionObject, RunResult},
    value::{Builtin, Value},
};

use super::type_err;

fn as_exception<'a>(v: &'a Value, who: &str) -> RunResult<&'a Rc<Exception>> {
    match v {
        Value::Host(h) => h.as_any().downcast_ref::<ExceptionObject>().map(|e| &e.0).ok_or_else(|| type_err("an Exception", v)),
        other => {
            let _ = who;
            Err(type_err("an Exception", other))
        }
    }
}

fn ex_info(args: &[Value]) -> RunResult<Value> {
    let (message, data) = match args {
        [Value::Str(msg)] => (msg.to_string(), Value::Nil),
        [Value::Str(msg), data] => (msg.to_string(), data.clone()),
        _ => return Err(super::arity_err("ex-info", args.len())),
    };
    let exc = Exception::new("ExceptionInfo", message).with_data(data);
    Ok(Value::Host(Rc::new(ExceptionObject(Rc::new(exc)))))
}

fn ex_message(args: &[Value]) -> RunResult<Value> {
    let [v] = args else { return Err(super::arity_err("ex-message", args.len())) };
    Ok(Value::Str(Rc::clone(&as_exception(v, "ex-message")?.message)))
}

fn ex_data(args: &[Value]) -> RunResult<Value> {
    let [v] = args else { return Err(super::arity_err("ex-data", args.len())) };
    Ok(as_exception(v, "ex-data")?.data.clone())
}

fn ex_cause(args: &[Value]) -> RunResult<Value> {
    let [v] = args else { return Err(super::arity_err("ex-cause", args.len())) };
    Ok(match &as_exception(v, "ex-cause")?.cause {
        Some(cause) => Value::Host(Rc::new(ExceptionObject(Rc::clone(cause)))),
        None => Value::Nil,
    })
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(EX_INFO, "ex-info", 1, Some(2), ex_info);
builtin!(EX_MESSAGE, "ex-message", 1, Some(1), ex_message);
builtin!(EX_DATA, "ex-data", 1, Some(1), ex_data);
builtin!(EX_CAUSE, "ex-cause", 1, Some(1), ex_cause);

pub static BUILTINS: &[&Builtin] = &[&EX_INFO, &EX_MESSAGE, &EX_DATA, &EX_CAUSE];
