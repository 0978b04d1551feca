//! String builtins: `str subs upper-case lower-case trim split join str-contains?`.

use std::rc::Rc;

use crate::{exception::RunResult, value::{Builtin, PList, Value}};

use super::{arity_err, type_err};

fn as_str<'a>(v: &'a Value, name: &str) -> RunResult<&'a str> {
    match v {
        Value::Str(s) => Ok(s),
        other => {
            let _ = name;
            Err(type_err("a string", other))
        }
    }
}

/// `(str & args)`: concatenates the display form of every argument,
/// `nil` contributing nothing (Clojure's convention, not Rust's `None`-as-"None").
fn str_fn(args: &[Value]) -> RunResult<Value> {
    let mut out = String::new();
    for a in args {
        if !matches!(a, Value::Nil) {
            out.push_str(&a.to_string());
        }
    }
    Ok(Value::Str(Rc::from(out)))
}

fn subs(args: &[Value]) -> RunResult<Value> {
    let (s, start, end) = match args {
        [s, Value::Int(start)] => (as_str(s, "subs")?, *start, None),
        [s, Value::Int(start), Value::Int(end)] => (as_str(s, "subs")?, *start, Some(*end)),
        _ => return Err(arity_err("subs", args.len())),
    };
    let chars: Vec<char> = s.chars().collect();
    let start = usize::try_from(start).map_err(|_| bad_index(start))?;
    let end = match end {
        Some(e) => usize::try_from(e).map_err(|_| bad_index(e))?,
        None => chars.len(),
    };
    if start > end || end > chars.len() {
        return Err(bad_index(end as i64));
    }
    Ok(Value::Str(Rc::from(chars[start..end].iter().collect::<String>())))
}

fn bad_index(n: i64) -> crate::exception::RunError {
    crate::exception::Exception::new("IndexOutOfBoundsException", format!("index {n} out of bounds")).into()
}

fn upper_case(args: &[Value]) -> RunResult<Value> {
    let [s] = args else { return Err(arity_err("upper-case", args.len())) };
    Ok(Value::Str(Rc::from(as_str(s, "upper-case")?.to_uppercase())))
}

fn lower_case(args: &[Value]) -> RunResult<Value> {
    let [s] = args else { return Err(arity_err("lower-case", args.len())) };
    Ok(Value::Str(Rc::from(as_str(s, "lower-case")?.to_lowercase())))
}

fn trim(args: &[Value]) -> RunResult<Value> {
    let [s] = args else { return Err(arity_err("trim", args.len())) };
    Ok(Value::Str(Rc::from(as_str(s, "trim")?.trim())))
}

fn split(args: &[Value]) -> RunResult<Value> {
    let [s, sep] = args else { return Err(arity_err("split", args.len())) };
    let s = as_str(s, "split")?;
    let sep = as_str(sep, "split")?;
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::Str(Rc::from(c.to_string()))).collect()
    } else {
        s.split(sep).map(|p| Value::Str(Rc::from(p))).collect()
    };
    Ok(Value::List(PList::from_vec(parts)))
}

fn join(args: &[Value]) -> RunResult<Value> {
    let (sep, coll) = match args {
        [coll] => (String::new(), coll),
        [sep, coll] => (as_str(sep, "join")?.to_owned(), coll),
        _ => return Err(arity_err("join", args.len())),
    };
    let items = super::sequences::as_items(coll)?;
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    Ok(Value::Str(Rc::from(parts.join(&sep))))
}

fn str_contains(args: &[Value]) -> RunResult<Value> {
    let [s, needle] = args else { return Err(arity_err("str-contains?", args.len())) };
    Ok(Value::Bool(as_str(s, "str-contains?")?.contains(as_str(needle, "str-contains?")?)))
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(STR, "str", 0, None, str_fn);
builtin!(SUBS, "subs", 2, Some(3), subs);
builtin!(UPPER_CASE, "upper-case", 1, Some(1), upper_case);
builtin!(LOWER_CASE, "lower-case", 1, Some(1), lower_case);
builtin!(TRIM, "trim", 1, Some(1), trim);
builtin!(SPLIT, "split", 2, Some(2), split);
builtin!(JOIN, "join", 1, Some(2), join);
builtin!(STR_CONTAINS, "str-contains?", 2, Some(2), str_contains);

pub static BUILTINS: &[&Builtin] = &[&STR, &SUBS, &UPPER_CASE, &LOWER_CASE, &TRIM, &SPLIT, &JOIN, &STR_CONTAINS];
