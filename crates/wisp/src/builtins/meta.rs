//! Metadata builtins: `meta with-meta`.
//!
//! Only `Symbol` and `Var` carry a `Meta` sidecar in this core (`value.rs`,
//! `var.rs`) — every other value kind has nothing to report and `meta`
//! answers `nil` for it.

use std::rc::Rc;

use crate::{
    exception::RunResult,
    meta::Meta,
    value::{Builtin, Value},
};

fn meta_to_value(meta: &Meta) -> Value {
    match meta.as_map() {
        Some(map) if !map.is_empty() => {
            Value::Map(Rc::new(map.iter().map(|(k, v)| (Value::Keyword(k.clone()), v.clone())).collect()))
        }
        _ => Value::Nil,
    }
}

fn value_to_meta(value: &Value) -> RunResult<Meta> {
    match value {
        Value::Nil => Ok(Meta::none()),
        Value::Map(map) => {
            let mut meta = Meta::none();
            for (k, v) in map.iter() {
                let Value::Keyword(kw) = k else {
                    return Err(super::type_err("a keyword-keyed map", k));
                };
                meta = meta.with(kw.clone(), v.clone());
            }
            Ok(meta)
        }
        other => Err(super::type_err("a map", other)),
    }
}

fn meta(args: &[Value]) -> RunResult<Value> {
    let [target] = args else { return Err(super::arity_err("meta", args.len())) };
    match target {
        Value::Symbol(sym) => Ok(meta_to_value(&sym.meta)),
        Value::Var(var) => Ok(meta_to_value(&var.meta())),
        _ => Ok(Value::Nil),
    }
}

fn with_meta(args: &[Value]) -> RunResult<Value> {
    let [target, new_meta] = args else { return Err(super::arity_err("with-meta", args.len())) };
    let new_meta = value_to_meta(new_meta)?;
    match target {
        Value::Symbol(sym) => Ok(Value::Symbol(sym.with_meta(new_meta))),
        Value::Var(var) => {
            var.set_meta(new_meta);
            Ok(target.clone())
        }
        other => Err(super::type_err("a symbol or var", other)),
    }
}

macro_rules! builtin {
    ($ident:ident, $name:literal, $min:expr, $max:expr, $func:ident) => {
        static $ident: Builtin = Builtin { name: $name, min_arity: $min, max_arity: $max, func: $func };
    };
}

builtin!(META, "meta", 1, Some(1), meta);
builtin!(WITH_META, "with-meta", 2, Some(2), with_meta);

pub static BUILTINS: &[&Builtin] = &[&META, &WITH_META];
