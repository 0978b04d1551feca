//! Collection constructors: `list vec hash-map hash-set into merge`.
//!
//! `list` and `vec` are the other two names the analyzer's quasiquote
//! expansion compiles down to (alongside `seq`/`concat` in `sequences.rs`).

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::{
    exception::RunResult,
    value::{Builtin, PList, Value},
};

use super::{
    sequences::{as_items, conj_one},
    type_err,
};

fn list(args: &[Value]) -> RunResult<Value> {
    Ok(Value::List(PList::from_vec(args.to_vec())))
}

fn vec(args: &[Value]) -> RunResult<Value> {
    Ok(Value::Vector(Rc::new(args.to_vec())))
}

fn hash_map(args: &[Value]) -> RunResult<Value> {
    if args.len() % 2 != 0 {
        return Err(super::arity_err("hash-map", args.len()));
    }
    let mut out = IndexMap::new();
    for pair in args.chunks(2) {
        out.insert(pair[0].clone(), pair[1].clone());
    }
    Ok(Value::Map(Rc::new(out)))
}

fn hash_set(args: &[Value]) -> RunResult<Value> {
    let mut out = IndexSet::new();
    for a in args {
        out.insert(a.clone());
    }
    Ok(Value::Set(Rc::new(out)))
}

/// Pours every element of `from` into `to` via `conj`, in iteration order.
fn into(args: &[Value]) -> RunResult<Value> {
    let [to, from] = args else { return Err(super::arity_err("into", args.len())) };
    let mut acc = to.clone();
    for item in as_items(from)? {
        acc = conj_one(&acc, &item)?;
    }
    Ok(acc)
}

/// Merges any number of maps left to right; later keys win.
fn merge(args: &[Value]) -> RunResult<Value> {
    let mut out: IndexMap<Value, Value> = IndexMap::new();
    for a in args {
        match a {
            Value::Nil => {}
            Value::Map(m) => {
                for (k, v) in m.iter() {
                    out.insert(k.clone(), v.clone());
                }
            }
            other => return Err(type_err("a map", other)),
        }
    }
    Ok(Value::Map(Rc::new(out)))
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(LIST, "list", 0, None, list);
builtin!(VEC, "vec", 0, None, vec);
builtin!(HASH_MAP, "hash-map", 0, None, hash_map);
builtin!(HASH_SET, "hash-set", 0, None, hash_set);
builtin!(INTO, "into", 2, Some(2), into);
builtin!(MERGE, "merge", 0, None, merge);

pub static BUILTINS: &[&Builtin] = &[&LIST, &VEC, &HASH_MAP, &HASH_SET, &INTO, &MERGE];
