//! Sequence operations: `first rest cons conj count nth get assoc dissoc
//! contains? seq reverse concat take drop empty?`.
//!
//! `seq`/`concat`/`list`/`vec` are load-bearing beyond user code: the
//! analyzer's quasiquote expansion (`analyzer.rs`) compiles `` `(a ~@b c)``
//! down to calls on exactly these names.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::{
    exception::RunResult,
    value::{Builtin, PList, Value},
};

use super::{arity_err, type_err};

/// Borrows a value as an ordered sequence of elements, if it is one.
pub(crate) fn as_items(v: &Value) -> RunResult<Vec<Value>> {
    match v {
        Value::Nil => Ok(Vec::new()),
        Value::List(l) => Ok(l.iter().cloned().collect()),
        Value::Vector(v) => Ok(v.as_ref().clone()),
        Value::Set(s) => Ok(s.iter().cloned().collect()),
        Value::Map(m) => Ok(m.iter().map(|(k, v)| Value::Vector(Rc::new(vec![k.clone(), v.clone()]))).collect()),
        Value::Str(s) => Ok(s.chars().map(Value::Char).collect()),
        other => Err(type_err("a sequence", other)),
    }
}

fn first(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("first", args.len())) };
    Ok(as_items(coll)?.first().cloned().unwrap_or(Value::Nil))
}

fn rest(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("rest", args.len())) };
    let items = as_items(coll)?;
    Ok(Value::List(PList::from_vec(items.into_iter().skip(1).collect())))
}

fn cons(args: &[Value]) -> RunResult<Value> {
    let [head, coll] = args else { return Err(arity_err("cons", args.len())) };
    let items = as_items(coll)?;
    let mut out = vec![head.clone()];
    out.extend(items);
    Ok(Value::List(PList::from_vec(out)))
}

/// `conj` grows the collection the way each kind naturally grows: a list at
/// the front, a vector at the back, a set/map by insertion.
fn conj(args: &[Value]) -> RunResult<Value> {
    let [coll, rest @ ..] = args else { return Err(arity_err("conj", args.len())) };
    let mut acc = coll.clone();
    for item in rest {
        acc = conj_one(&acc, item)?;
    }
    Ok(acc)
}

pub(crate) fn conj_one(coll: &Value, item: &Value) -> RunResult<Value> {
    match coll {
        Value::Nil => Ok(Value::List(PList::from_vec(vec![item.clone()]))),
        Value::List(l) => Ok(Value::List(l.cons(item.clone()))),
        Value::Vector(v) => {
            let mut out = v.as_ref().clone();
            out.push(item.clone());
            Ok(Value::Vector(Rc::new(out)))
        }
        Value::Set(s) => {
            let mut out = s.as_ref().clone();
            out.insert(item.clone());
            Ok(Value::Set(Rc::new(out)))
        }
        Value::Map(m) => {
            let Value::Vector(kv) = item else { return Err(type_err("a [key value] pair", item)) };
            let [k, v] = kv.as_slice() else { return Err(type_err("a [key value] pair", item)) };
            let mut out = m.as_ref().clone();
            out.insert(k.clone(), v.clone());
            Ok(Value::Map(Rc::new(out)))
        }
        other => Err(type_err("a collection", other)),
    }
}

fn count(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("count", args.len())) };
    Ok(Value::Int(as_items(coll)?.len() as i64))
}

fn nth(args: &[Value]) -> RunResult<Value> {
    match args {
        [coll, Value::Int(n)] => {
            let items = as_items(coll)?;
            let idx = usize::try_from(*n).ok();
            idx.and_then(|i| items.get(i).cloned())
                .ok_or_else(|| crate::exception::Exception::new("IndexOutOfBoundsException", format!("index {n} out of bounds")).into())
        }
        [coll, Value::Int(n), default] => {
            let items = as_items(coll)?;
            let idx = usize::try_from(*n).ok();
            Ok(idx.and_then(|i| items.get(i).cloned()).unwrap_or_else(|| default.clone()))
        }
        _ => Err(arity_err("nth", args.len())),
    }
}

fn get(args: &[Value]) -> RunResult<Value> {
    let (coll, key, default) = match args {
        [coll, key] => (coll, key, Value::Nil),
        [coll, key, default] => (coll, key, default.clone()),
        _ => return Err(arity_err("get", args.len())),
    };
    Ok(match coll {
        Value::Map(m) => m.get(key).cloned().unwrap_or(default),
        Value::Vector(v) => match key {
            Value::Int(n) => usize::try_from(*n).ok().and_then(|i| v.get(i)).cloned().unwrap_or(default),
            _ => default,
        },
        Value::Set(s) => {
            if s.contains(key) {
                key.clone()
            } else {
                default
            }
        }
        Value::Nil => default,
        other => return Err(type_err("a collection", other)),
    })
}

fn assoc(args: &[Value]) -> RunResult<Value> {
    let [coll, rest @ ..] = args else { return Err(arity_err("assoc", args.len())) };
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(arity_err("assoc", args.len()));
    }
    match coll {
        Value::Map(m) => {
            let mut out = m.as_ref().clone();
            for pair in rest.chunks(2) {
                out.insert(pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(Rc::new(out)))
        }
        Value::Nil => {
            let mut out: IndexMap<Value, Value> = IndexMap::new();
            for pair in rest.chunks(2) {
                out.insert(pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(Rc::new(out)))
        }
        Value::Vector(v) => {
            let mut out = v.as_ref().clone();
            for pair in rest.chunks(2) {
                let Value::Int(n) = pair[0] else { return Err(type_err("an integer index", &pair[0])) };
                let idx = usize::try_from(n).map_err(|_| crate::exception::Exception::new("IndexOutOfBoundsException", format!("index {n} out of bounds")))?;
                if idx > out.len() {
                    return Err(crate::exception::Exception::new("IndexOutOfBoundsException", format!("index {idx} out of bounds")).into());
                }
                if idx == out.len() {
                    out.push(pair[1].clone());
                } else {
                    out[idx] = pair[1].clone();
                }
            }
            Ok(Value::Vector(Rc::new(out)))
        }
        other => Err(type_err("a map or vector", other)),
    }
}

fn dissoc(args: &[Value]) -> RunResult<Value> {
    let [coll, keys @ ..] = args else { return Err(arity_err("dissoc", args.len())) };
    match coll {
        Value::Map(m) => {
            let mut out = m.as_ref().clone();
            for k in keys {
                out.shift_remove(k);
            }
            Ok(Value::Map(Rc::new(out)))
        }
        Value::Nil => Ok(Value::Nil),
        other => Err(type_err("a map", other)),
    }
}

fn contains(args: &[Value]) -> RunResult<Value> {
    let [coll, key] = args else { return Err(arity_err("contains?", args.len())) };
    Ok(Value::Bool(match coll {
        Value::Map(m) => m.contains_key(key),
        Value::Set(s) => s.contains(key),
        Value::Vector(v) => matches!(key, Value::Int(n) if usize::try_from(*n).is_ok_and(|i| i < v.len())),
        Value::Nil => false,
        other => return Err(type_err("a collection", other)),
    }))
}

fn seq(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("seq", args.len())) };
    let items = as_items(coll)?;
    if items.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(Value::List(PList::from_vec(items)))
    }
}

fn is_empty(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("empty?", args.len())) };
    Ok(Value::Bool(as_items(coll)?.is_empty()))
}

fn reverse(args: &[Value]) -> RunResult<Value> {
    let [coll] = args else { return Err(arity_err("reverse", args.len())) };
    let mut items = as_items(coll)?;
    items.reverse();
    Ok(Value::List(PList::from_vec(items)))
}

/// Variadic: flattens every argument's items into one list. Shared with the
/// analyzer's quasiquote expansion of `unquote-splicing`.
fn concat(args: &[Value]) -> RunResult<Value> {
    let mut out = Vec::new();
    for a in args {
        out.extend(as_items(a)?);
    }
    Ok(Value::List(PList::from_vec(out)))
}

fn take(args: &[Value]) -> RunResult<Value> {
    let [Value::Int(n), coll] = args else { return Err(arity_err("take", args.len())) };
    let n = usize::try_from(*n).unwrap_or(0);
    Ok(Value::List(PList::from_vec(as_items(coll)?.into_iter().take(n).collect())))
}

fn drop(args: &[Value]) -> RunResult<Value> {
    let [Value::Int(n), coll] = args else { return Err(arity_err("drop", args.len())) };
    let n = usize::try_from(*n).unwrap_or(0);
    Ok(Value::List(PList::from_vec(as_items(coll)?.into_iter().skip(n).collect())))
}

fn keys(args: &[Value]) -> RunResult<Value> {
    let [Value::Map(m)] = args else { return Err(type_err("a map", args.first().unwrap_or(&Value::Nil))) };
    Ok(Value::List(PList::from_vec(m.keys().cloned().collect())))
}

fn vals(args: &[Value]) -> RunResult<Value> {
    let [Value::Map(m)] = args else { return Err(type_err("a map", args.first().unwrap_or(&Value::Nil))) };
    Ok(Value::List(PList::from_vec(m.values().cloned().collect())))
}

// `IndexSet` is only reachable through `conj_one`'s `Value::Set` arm above;
// imported here so that arm's `.clone()` on `IndexSet<Value>` type-checks
// without the caller needing to name it.
#[allow(dead_code)]
type _KeepIndexSetImportLive = IndexSet<Value>;

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(FIRST, "first", 1, Some(1), first);
builtin!(REST, "rest", 1, Some(1), rest);
builtin!(CONS, "cons", 2, Some(2), cons);
builtin!(CONJ, "conj", 1, None, conj);
builtin!(COUNT, "count", 1, Some(1), count);
builtin!(NTH, "nth", 2, Some(3), nth);
builtin!(GET, "get", 2, Some(3), get);
builtin!(ASSOC, "assoc", 3, None, assoc);
builtin!(DISSOC, "dissoc", 1, None, dissoc);
builtin!(CONTAINS, "contains?", 2, Some(2), contains);
builtin!(SEQ, "seq", 1, Some(1), seq);
builtin!(EMPTY, "empty?", 1, Some(1), is_empty);
builtin!(REVERSE, "reverse", 1, Some(1), reverse);
builtin!(CONCAT, "concat", 0, None, concat);
builtin!(TAKE, "take", 2, Some(2), take);
builtin!(DROP, "drop", 2, Some(2), drop);
builtin!(KEYS, "keys", 1, Some(1), keys);
builtin!(VALS, "vals", 1, Some(1), vals);

pub static BUILTINS: &[&Builtin] = &[
    &FIRST, &REST, &CONS, &CONJ, &COUNT, &NTH, &GET, &ASSOC, &DISSOC, &CONTAINS, &SEQ, &EMPTY, &REVERSE, &CONCAT,
    &TAKE, &DROP, &KEYS, &VALS,
];
