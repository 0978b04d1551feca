//! `require` driver (§4.J).
//!
//! Loads a namespace's source through `ctx.state.load_fn`, reads and
//! evaluates every top-level form against it, then wires the requesting
//! namespace's aliases/refers. A namespace already present in the store is
//! never reloaded — `require` is idempotent per §3 invariant ("a namespace
//! already loaded is not evaluated a second time"). A failed load rolls the
//! partially-built namespace back so a later `require` can retry cleanly.

use std::rc::Rc;

use crate::{
    analyzer, env::Context, exception::{Exception, RunResult}, interpreter, reader, value::Value,
};

/// `(require 'ns-name)`, `(require '(ns-name :as alias))`,
/// `(require '(ns-name :refer [sym ...]))`, `(require '(ns-name :refer :all))`.
pub fn require(ctx: &Context, specs: &[Value]) -> RunResult<()> {
    for spec in specs {
        require_one(ctx, spec)?;
    }
    Ok(())
}

fn require_one(ctx: &Context, spec: &Value) -> RunResult<()> {
    let items: Vec<Value> = match spec {
        Value::Symbol(_) => vec![spec.clone()],
        Value::List(l) => l.iter().cloned().collect(),
        Value::Vector(v) => v.iter().cloned().collect(),
        _ => return Err(Exception::new("SyntaxError", "require expects a symbol or a libspec list").into()),
    };
    let Some(Value::Symbol(ns_sym)) = items.first() else {
        return Err(Exception::new("SyntaxError", "a require libspec must start with a namespace symbol").into());
    };
    let ns_name: Rc<str> = Rc::from(ns_sym.to_string());

    let mut alias: Option<Rc<str>> = None;
    let mut refer_all = false;
    let mut refer_syms: Vec<Rc<str>> = Vec::new();
    let mut reload = false;

    let opts = &items[1..];
    let mut i = 0;
    while i < opts.len() {
        let Value::Keyword(kw) = &opts[i] else {
            i += 1;
            continue;
        };
        // `:reload`, `:reload-all`, `:verbose` are flags (no trailing value);
        // every other recognized option takes one (§4.J).
        match kw.name.as_ref() {
            "reload" | "reload-all" | "verbose" => {
                reload = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        let Some(value) = opts.get(i + 1) else {
            i += 1;
            continue;
        };
        match kw.name.as_ref() {
            "as" => {
                if let Value::Symbol(a) = value {
                    alias = Some(Rc::clone(&a.name));
                }
            }
            "refer" => match value {
                Value::Keyword(k) if k.name.as_ref() == "all" => refer_all = true,
                Value::Vector(syms) => {
                    for s in syms.iter() {
                        if let Value::Symbol(sym) = s {
                            refer_syms.push(Rc::clone(&sym.name));
                        }
                    }
                }
                _ => {
                    return Err(Exception::new("SyntaxError", ":refer value must be a sequential collection of symbols").into());
                }
            },
            _ => {}
        }
        i += 2;
    }

    let already_loaded = ctx.namespaces().borrow().contains(&ns_name);
    if reload || !already_loaded {
        load_namespace(ctx, &ns_name)?;
    }

    let namespaces = ctx.namespaces();
    let requiring_ns = namespaces.borrow_mut().get_or_create(&ctx.current_ns_name());

    if let Some(alias_name) = alias {
        requiring_ns.borrow_mut().add_alias(alias_name, Rc::clone(&ns_name));
    }
    if refer_all {
        requiring_ns.borrow_mut().refer_exclude(&ns_name, Vec::new());
    } else if !refer_syms.is_empty() {
        let Some(target_ns) = namespaces.borrow().get(&ns_name) else {
            return Err(Exception::new("ResolutionError", format!("No such namespace: {ns_name}")).into());
        };
        for sym in &refer_syms {
            let Some(var) = target_ns.borrow().get_var(sym) else {
                return Err(Exception::new("ResolutionError", format!("{sym} does not exist")).into());
            };
            requiring_ns.borrow_mut().import_var(Rc::clone(sym), var);
        }
    }
    Ok(())
}

/// Reads and evaluates `ns_name`'s source top to bottom, with the current
/// namespace switched to it for the duration (so top-level `def`s land in
/// the right place). Any failure removes the partially-built namespace
/// (§4.J step 3 rollback) so a subsequent `require` sees a clean slate.
fn load_namespace(ctx: &Context, ns_name: &Rc<str>) -> RunResult<()> {
    let Some(load_fn) = ctx.state.load_fn.as_ref() else {
        return Err(Exception::new("ResolutionError", format!("Could not require {ns_name}.")).into());
    };
    let Some(loaded) = load_fn(ns_name) else {
        return Err(Exception::new("ResolutionError", format!("Could not require {ns_name}.")).into());
    };

    let namespaces = ctx.namespaces();
    namespaces.borrow_mut().get_or_create(ns_name);

    let saved_ns = ctx.current_ns_name();
    let saved_file = ctx.state.current_file.borrow().clone();
    ctx.set_current_ns(Rc::clone(ns_name));
    *ctx.state.current_file.borrow_mut() = loaded.file.clone();

    let result = load_forms(ctx, &loaded.source, ns_name);

    ctx.set_current_ns(saved_ns);
    *ctx.state.current_file.borrow_mut() = saved_file;

    if let Err(e) = result {
        namespaces.borrow_mut().remove(ns_name);
        return Err(e);
    }
    Ok(())
}

fn load_forms(ctx: &Context, source: &str, ns_name: &Rc<str>) -> RunResult<()> {
    // §4.J step 3: the required source evaluates with a fresh empty lexical
    // frame, never the requiring call site's — a free symbol in `foo`'s
    // source must resolve through `foo`'s own namespace, not leak the
    // caller's `let`/`fn` bindings.
    let load_ctx = ctx.with_bindings(crate::env::Bindings::Empty);
    let forms = reader::read_all(source, Rc::clone(ns_name))?;
    for form in forms {
        let node = analyzer::analyze(&load_ctx, &form.value, &form.meta, &interpreter::call_closure_as_macro)?;
        interpreter::interpret(&load_ctx, &node)?;
    }
    Ok(())
}
