//! Static analyzer (§4.Analyzer, §6 "Analyzer").
//!
//! Walks a raw form (as read by `reader.rs`) and produces an analyzed
//! [`Node`]. Most forms compile to a generic [`Node::Call`] whose head is
//! resolved — or deliberately left as a bare special-form symbol — at
//! interpret time (§4.G step 2); only `fn`, `try`, static/var/deref access,
//! and local-symbol lookups get their own tagged variant, because those
//! require resolution work done up front.
//!
//! Lexical scope (which names are locally bound) is tracked the same way
//! the interpreter tracks runtime bindings — by extending `ctx.bindings`
//! with placeholder entries for each parameter/`let` name while analyzing a
//! nested body. The *values* are never consulted during analysis, only
//! `Bindings::contains`; this keeps one `Context` type serving both the
//! external `analyze(ctx, form)` and `interpret(ctx, expr)` contracts.
//!
//! The reader only hands out a source position for a *top-level* form (§6
//! Reader: "forms carry `{line, col}` metadata"); nothing below that level
//! carries its own position. So every node analysis produces from one
//! top-level form is tagged with that form's position — coarser than a
//! per-subexpression location, but it's what lets a nested call's error
//! carry "the call's source line" (§7, §8 scenario 8) at all.
//!
//! `recur` validity (§9 "the analyzer rejects `recur` forms it can prove
//! are not in tail position") is tracked by threading an `Option<usize>`
//! recur arity through analysis: it is `Some(n)` only while analyzing a
//! form that is actually in tail position relative to the nearest
//! enclosing `fn`/`loop`, and is forced to `None` for every non-tail
//! sub-form (a test expression, all but the last form of a body, any
//! argument list, anything inside `try`).

use std::rc::Rc;

use crate::{
    env::Context,
    exception::{CodeLoc, Exception, RunError, RunResult},
    macros::{self, is_special_form},
    meta::Meta,
    node::{CatchClause, FnArity, Node},
    value::{Callable, PList, Symbol, Value},
    var::VarRef,
};

fn loc_of(meta: &Meta) -> CodeLoc {
    CodeLoc { line: meta.line().unwrap_or(0), col: meta.col().unwrap_or(0) }
}

fn err(meta: &Meta, msg: impl Into<String>) -> RunError {
    Exception::new("SyntaxError", msg.into()).with_loc(loc_of(meta)).into()
}

/// The callable a symbol names as a macro in the current namespace, if any.
pub fn resolve_macro(ctx: &Context, sym: &Symbol) -> Option<Callable> {
    if sym.ns.is_none() && ctx.bindings.contains(&sym.name) {
        return None;
    }
    let var = resolve_var(ctx, sym)?;
    if !var.is_macro() {
        return None;
    }
    var.deref().and_then(|v| if let Value::Fn(c) = v { Some(c) } else { None })
}

/// Runs a user-defined macro's closure through the real call path. Injected
/// from `run.rs` to avoid `analyzer.rs` depending on `call.rs`/`interpreter.rs`
/// (which in turn depend on the analyzer for `fn` bodies).
pub type MacroCaller<'a> = dyn Fn(&Context, &Callable, &[Value]) -> RunResult<Value> + 'a;

/// Resolves a (possibly namespace-qualified) symbol to a var, honoring
/// aliases, refers, and the implicit `wisp.core` fallback (§3 "Namespace
/// entity", §4.F `refer`).
pub fn resolve_var(ctx: &Context, sym: &Symbol) -> Option<VarRef> {
    let namespaces = ctx.namespaces();
    if let Some(ns_part) = &sym.ns {
        let cur_ns_name = ctx.current_ns_name();
        let cur_ns = namespaces.borrow().get(&cur_ns_name)?;
        let target_name = cur_ns.borrow().alias_target(ns_part).unwrap_or_else(|| Rc::clone(ns_part));
        let target = namespaces.borrow().get(&target_name)?;
        return target.borrow().get_var(&sym.name);
    }
    let cur_ns_name = ctx.current_ns_name();
    let cur_ns = namespaces.borrow().get(&cur_ns_name)?;
    if let Some(v) = cur_ns.borrow().get_var(&sym.name) {
        return Some(v);
    }
    let refers: Vec<(Rc<str>, std::collections::HashSet<Rc<str>>)> =
        cur_ns.borrow().refers().map(|(ns, spec)| (Rc::clone(ns), spec.exclude.clone())).collect();
    for (ns_name, excluded) in &refers {
        if excluded.contains(&sym.name) {
            continue;
        }
        if let Some(ns) = namespaces.borrow().get(ns_name)
            && let Some(v) = ns.borrow().get_var(&sym.name)
        {
            return Some(v);
        }
    }
    if cur_ns_name.as_ref() != "wisp.core"
        && let Some(core) = namespaces.borrow().get("wisp.core")
    {
        return core.borrow().get_var(&sym.name);
    }
    None
}

/// `analyze(ctx, form) -> Node` (§4.Analyzer, §6 "Analyzer").
///
/// `pos` is the enclosing top-level form's source position (`Form::meta` from
/// `reader.rs`); pass `Meta::none()` when analyzing a form synthesized at
/// runtime (macro output, `eval`) with no source position of its own.
pub fn analyze(ctx: &Context, form: &Value, pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    analyze_inner(ctx, form, None, pos, caller)
}

fn analyze_inner(ctx: &Context, form: &Value, recur_arity: Option<usize>, pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    match form {
        Value::Symbol(sym) => analyze_symbol(ctx, sym, pos),
        Value::Vector(items) => {
            let nodes = items.iter().map(|v| analyze_inner(ctx, v, None, pos, caller)).collect::<RunResult<Vec<_>>>()?;
            Ok(Node::VectorLit(Rc::from(nodes), pos.clone()))
        }
        Value::Set(items) => {
            let nodes = items.iter().map(|v| analyze_inner(ctx, v, None, pos, caller)).collect::<RunResult<Vec<_>>>()?;
            Ok(Node::SetLit(Rc::from(nodes), pos.clone()))
        }
        Value::Map(pairs) => {
            let nodes = pairs
                .iter()
                .map(|(k, v)| Ok((analyze_inner(ctx, k, None, pos, caller)?, analyze_inner(ctx, v, None, pos, caller)?)))
                .collect::<RunResult<Vec<_>>>()?;
            Ok(Node::MapLit(Rc::from(nodes), pos.clone()))
        }
        Value::List(list) if !list.is_empty() => analyze_list(ctx, list.iter().cloned().collect(), recur_arity, pos, caller),
        other => Ok(Node::Literal(other.clone())),
    }
}

fn analyze_symbol(ctx: &Context, sym: &Symbol, meta: &Meta) -> RunResult<Node> {
    // A `^Tag`/`^{...}` reader macro attaches to the symbol itself; fold it
    // into the node's own meta so `:tag` survives into `.`'s class
    // resolution (§4.I) regardless of which node variant this resolves to.
    let meta = meta.merged(&sym.meta);
    if sym.ns.is_none() && ctx.bindings.contains(&sym.name) {
        return Ok(Node::ResolveSym { sym: sym.clone(), meta });
    }
    if let Some(var) = resolve_var(ctx, sym) {
        if !var.is_macro()
            && let Some(Value::Fn(Callable::CtxBuiltin(builtin))) = var.deref()
        {
            return Ok(Node::NeedsCtx { builtin, meta });
        }
        return Ok(Node::VarValue { var, meta });
    }
    if let Some(ns_part) = &sym.ns
        && ctx.state.host_classes.contains(ns_part)
    {
        return Ok(Node::StaticAccess { class: Rc::clone(ns_part), field: Rc::clone(&sym.name), meta });
    }
    // Deferred to runtime resolve-sym: supports mutual top-level recursion
    // where the referencing var doesn't exist yet at analysis time.
    Ok(Node::ResolveSym { sym: sym.clone(), meta })
}

fn analyze_list(ctx: &Context, items: Vec<Value>, recur_arity: Option<usize>, pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    let meta = pos.clone();
    if let Value::Symbol(sym) = &items[0]
        && sym.ns.is_none()
    {
        let name = sym.name.as_ref();
        match name {
            "quote" => {
                return items.get(1).cloned().map(Node::Literal).ok_or_else(|| err(pos, "quote requires exactly one argument"));
            }
            "fn" => return analyze_fn(ctx, &items[1..], pos, caller),
            "try" => return analyze_try(ctx, &items[1..], pos, caller),
            "quasiquote" => return analyze_inner(ctx, &expand_quasiquote(&items[1], 1), recur_arity, pos, caller),
            _ if name.len() > 1 && name.starts_with('.') && name != ".." => {
                return analyze_dot_call(ctx, &name[1..], &items[1..], pos, caller);
            }
            _ => {}
        }
        if is_special_form(name) {
            let args = analyze_rest(ctx, &items[1..], name, recur_arity, pos, caller)?;
            return Ok(Node::Call { op: Rc::new(Node::Literal(Value::Symbol(sym.clone()))), args: Rc::from(args), meta });
        }
        if resolve_macro(ctx, sym).is_some() {
            let expanded = macros::macroexpand_1(ctx, &Value::List(PList::from_vec(items.clone())), &resolve_macro, caller)?;
            return analyze_inner(ctx, &expanded, recur_arity, pos, caller);
        }
    }

    let op_node = analyze_inner(ctx, &items[0], None, pos, caller)?;
    let args = items[1..].iter().map(|a| analyze_inner(ctx, a, None, pos, caller)).collect::<RunResult<Vec<_>>>()?;
    Ok(Node::Call { op: Rc::new(op_node), args: Rc::from(args), meta })
}

/// Analyzes a special form's argument list, threading tail position and the
/// recur target through only the sub-forms that actually inherit it.
fn analyze_rest(
    ctx: &Context,
    rest: &[Value],
    form_name: &str,
    recur_arity: Option<usize>,
    pos: &Meta,
    caller: &MacroCaller<'_>,
) -> RunResult<Vec<Node>> {
    match form_name {
        "do" => analyze_tail_seq(ctx, rest, recur_arity, pos, caller),
        "let" | "loop" => analyze_body_sugar(ctx, form_name, rest, recur_arity, pos, caller),
        "if" => {
            let mut out = Vec::with_capacity(rest.len());
            for (i, v) in rest.iter().enumerate() {
                let ra = if i == 0 { None } else { recur_arity };
                out.push(analyze_inner(ctx, v, ra, pos, caller)?);
            }
            Ok(out)
        }
        "recur" => {
            let Some(n) = recur_arity else {
                return Err(err(pos, "Can only recur from tail position"));
            };
            if rest.len() != n {
                return Err(err(pos, format!("recur expects {n} argument(s), got {}", rest.len())));
            }
            rest.iter().map(|v| analyze_inner(ctx, v, None, pos, caller)).collect()
        }
        "def" | "def-macro" => analyze_def_args(ctx, rest, pos, caller),
        "new" => {
            let Some(Value::Symbol(class_sym)) = rest.first() else {
                return Err(err(pos, "new requires a class name"));
            };
            let mut out = vec![Node::Literal(Value::Str(Rc::from(class_sym.name.as_ref())))];
            for v in &rest[1..] {
                out.push(analyze_inner(ctx, v, None, pos, caller)?);
            }
            Ok(out)
        }
        "." => {
            let target = analyze_inner(ctx, rest.first().ok_or_else(|| err(pos, ". requires a target"))?, None, pos, caller)?;
            let Some(Value::Symbol(method)) = rest.get(1) else {
                return Err(err(pos, ". requires a method name"));
            };
            let mut out = vec![target, Node::Literal(Value::Str(Rc::from(method.name.as_ref())))];
            for v in &rest[2..] {
                out.push(analyze_inner(ctx, v, None, pos, caller)?);
            }
            Ok(out)
        }
        "set!" => {
            let Some(Value::Symbol(sym)) = rest.first() else {
                return Err(err(pos, "set! requires a var symbol"));
            };
            let var = resolve_var(ctx, sym).ok_or_else(|| err(pos, format!("Unable to resolve var: {sym}")))?;
            let mut out = vec![Node::Literal(Value::Var(var))];
            for v in &rest[1..] {
                out.push(analyze_inner(ctx, v, None, pos, caller)?);
            }
            Ok(out)
        }
        _ => rest.iter().map(|v| analyze_inner(ctx, v, None, pos, caller)).collect(),
    }
}

/// Analyzes a flat sequence of forms, giving tail position only to the last.
fn analyze_tail_seq(ctx: &Context, forms: &[Value], recur_arity: Option<usize>, pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Vec<Node>> {
    let n = forms.len();
    forms
        .iter()
        .enumerate()
        .map(|(i, v)| analyze_inner(ctx, v, if i + 1 == n { recur_arity } else { None }, pos, caller))
        .collect()
}

/// `let`/`loop` bindings extend lexical scope across subsequent bindings and
/// the body. The binding vector is encoded as a flat `[count, name1, init1,
/// name2, init2, ..., body...]` node list, decoded positionally by
/// `special_forms.rs`. `loop` additionally establishes a new recur target
/// sized to its binding count.
fn analyze_body_sugar(
    ctx: &Context,
    form_name: &str,
    rest: &[Value],
    recur_arity: Option<usize>,
    pos: &Meta,
    caller: &MacroCaller<'_>,
) -> RunResult<Vec<Node>> {
    let Some(Value::Vector(binding_forms)) = rest.first() else {
        return Err(err(pos, format!("{form_name} requires a binding vector")));
    };
    if binding_forms.len() % 2 != 0 {
        return Err(err(pos, format!("{form_name} binding vector requires an even number of forms")));
    }
    let mut scoped_ctx = ctx.clone();
    let mut names = Vec::new();
    let mut inits = Vec::new();
    let mut chunks = binding_forms.chunks(2);
    while let Some([name_form, init_form]) = chunks.next() {
        let Value::Symbol(name) = name_form else {
            return Err(err(pos, format!("{form_name} binding names must be symbols")));
        };
        inits.push(analyze_inner(&scoped_ctx, init_form, None, pos, caller)?);
        scoped_ctx = scoped_ctx.with_bindings(scoped_ctx.bindings.extend(Rc::clone(&name.name), Value::Nil));
        names.push(Rc::clone(&name.name));
    }
    let mut encoded = vec![Node::Literal(Value::Int(names.len() as i64))];
    let mut init_iter = inits.into_iter();
    for name in &names {
        encoded.push(Node::Literal(Value::Symbol(Symbol::unqualified(Rc::clone(name)))));
        encoded.push(init_iter.next().expect("one init per name"));
    }
    let body_recur = if form_name == "loop" { Some(names.len()) } else { recur_arity };
    let body = &rest[1..];
    let n = body.len();
    for (i, form) in body.iter().enumerate() {
        let ra = if i + 1 == n { body_recur } else { None };
        encoded.push(analyze_inner(&scoped_ctx, form, ra, pos, caller)?);
    }
    Ok(encoded)
}

fn analyze_def_args(ctx: &Context, rest: &[Value], pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Vec<Node>> {
    let Some(Value::Symbol(name)) = rest.first() else {
        return Err(err(pos, "def requires a symbol name"));
    };
    // Pre-intern the var before analyzing the initializer so a self- or
    // mutually-recursive reference inside it resolves (mirrors how real
    // Lisp analyzers handle `(defn f [...] ... (f ...))`).
    let ns_name = ctx.current_ns_name();
    let namespaces = ctx.namespaces();
    let ns = namespaces.borrow_mut().get_or_create(&ns_name);
    let var = ns.borrow_mut().get_or_create_var(&name.name);
    let mut out = vec![Node::Literal(Value::Var(var))];
    for v in &rest[1..] {
        out.push(analyze_inner(ctx, v, None, pos, caller)?);
    }
    Ok(out)
}

fn analyze_fn(ctx: &Context, rest: &[Value], pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    let mut idx = 0;
    let name = match rest.first() {
        Some(Value::Symbol(s)) => {
            idx = 1;
            Some(s.clone())
        }
        _ => None,
    };
    let clauses: Vec<Vec<Value>> = match rest.get(idx) {
        Some(Value::Vector(_)) => vec![rest[idx..].to_vec()],
        Some(Value::List(_)) => rest[idx..]
            .iter()
            .map(|v| match v {
                Value::List(l) => Ok(l.iter().cloned().collect::<Vec<Value>>()),
                _ => Err(err(pos, "fn multi-arity clauses must be lists")),
            })
            .collect::<RunResult<Vec<_>>>()?,
        _ => return Err(err(pos, "fn requires a parameter vector")),
    };

    let mut scope_ctx = ctx.clone();
    if let Some(n) = &name {
        scope_ctx = scope_ctx.with_bindings(scope_ctx.bindings.extend(Rc::clone(&n.name), Value::Nil));
    }

    let mut arities = Vec::with_capacity(clauses.len());
    for clause in &clauses {
        let Some(Value::Vector(params_form)) = clause.first() else {
            return Err(err(pos, "fn clause requires a parameter vector"));
        };
        let mut params = Vec::new();
        let mut variadic = None;
        let mut seen_amp = false;
        for p in params_form.iter() {
            let Value::Symbol(s) = p else {
                return Err(err(pos, "fn parameters must be symbols"));
            };
            if s.name.as_ref() == "&" {
                seen_amp = true;
                continue;
            }
            if seen_amp {
                variadic = Some(Rc::clone(&s.name));
            } else {
                params.push(Rc::clone(&s.name));
            }
        }
        let mut body_ctx = scope_ctx.clone();
        for p in params.iter().chain(variadic.iter()) {
            body_ctx = body_ctx.with_bindings(body_ctx.bindings.extend(Rc::clone(p), Value::Nil));
        }
        let recur_arity = Some(params.len());
        let body_forms = &clause[1..];
        let n = body_forms.len();
        let body = body_forms
            .iter()
            .enumerate()
            .map(|(i, v)| analyze_inner(&body_ctx, v, if i + 1 == n { recur_arity } else { None }, pos, caller))
            .collect::<RunResult<Vec<_>>>()?;
        arities.push(FnArity { params: Rc::from(params), variadic, body: Rc::from(body) });
    }
    Ok(Node::Fn { name, arities: Rc::from(arities), is_macro: false, meta: pos.clone() })
}

/// `try` bodies, catch clauses, and finally blocks never inherit an
/// enclosing recur target: unwinding through a `try` breaks the trampoline's
/// loop shape, so `recur` is rejected anywhere inside one, even in what
/// would otherwise be tail position.
fn analyze_try(ctx: &Context, rest: &[Value], pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    let mut body = Vec::new();
    let mut catches = Vec::new();
    let mut finally = None;
    for form in rest {
        match form {
            Value::List(l) if matches!(l.first(), Some(Value::Symbol(s)) if s.name.as_ref() == "catch") => {
                let items: Vec<Value> = l.iter().cloned().collect();
                let (Some(Value::Symbol(class)), Some(Value::Symbol(binding))) = (items.get(1), items.get(2)) else {
                    return Err(err(pos, "catch requires a class and a binding symbol"));
                };
                let catch_ctx = ctx.with_bindings(ctx.bindings.extend(Rc::clone(&binding.name), Value::Nil));
                let catch_body = items[3..].iter().map(|v| analyze_inner(&catch_ctx, v, None, pos, caller)).collect::<RunResult<Vec<_>>>()?;
                catches.push(CatchClause { class: Rc::clone(&class.name), binding: Rc::clone(&binding.name), body: Rc::from(catch_body) });
            }
            Value::List(l) if matches!(l.first(), Some(Value::Symbol(s)) if s.name.as_ref() == "finally") => {
                let items: Vec<Value> = l.iter().cloned().collect();
                finally = Some(Rc::from(items[1..].iter().map(|v| analyze_inner(ctx, v, None, pos, caller)).collect::<RunResult<Vec<_>>>()?));
            }
            other if catches.is_empty() && finally.is_none() => {
                body.push(analyze_inner(ctx, other, None, pos, caller)?);
            }
            _ => return Err(err(pos, "try body must precede catch/finally clauses")),
        }
    }
    Ok(Node::Try { body: Rc::from(body), catches: Rc::from(catches), finally, meta: pos.clone() })
}

fn analyze_dot_call(ctx: &Context, method: &str, rest: &[Value], pos: &Meta, caller: &MacroCaller<'_>) -> RunResult<Node> {
    let mut args = vec![
        analyze_inner(ctx, rest.first().ok_or_else(|| err(pos, ". requires a target"))?, None, pos, caller)?,
        Node::Literal(Value::Str(Rc::from(method))),
    ];
    for a in &rest[1..] {
        args.push(analyze_inner(ctx, a, None, pos, caller)?);
    }
    Ok(Node::Call { op: Rc::new(Node::Literal(Value::Symbol(Symbol::unqualified(".")))), args: Rc::from(args), meta: pos.clone() })
}

/// Expands a quasiquoted form into ordinary `list`/`vector`/`concat` calls,
/// substituting `unquote`/`unquote-splicing`. Supports a single nesting
/// level (§4.Reader scope).
fn expand_quasiquote(form: &Value, depth: i32) -> Value {
    match form {
        Value::List(l) if matches!(l.first(), Some(Value::Symbol(s)) if s.name.as_ref() == "unquote") && depth == 1 => {
            l.iter().nth(1).cloned().unwrap_or(Value::Nil)
        }
        Value::List(l) if !l.is_empty() => {
            let items: Vec<Value> = l.iter().cloned().collect();
            let mut parts = Vec::new();
            for item in &items {
                match item {
                    Value::List(inner)
                        if matches!(inner.first(), Some(Value::Symbol(s)) if s.name.as_ref() == "unquote-splicing") && depth == 1 =>
                    {
                        let spliced = inner.iter().nth(1).cloned().unwrap_or(Value::Nil);
                        parts.push(Value::List(PList::from_vec(vec![Value::Symbol(Symbol::unqualified("seq")), spliced])));
                    }
                    other => {
                        parts.push(Value::List(PList::from_vec(vec![
                            Value::Symbol(Symbol::unqualified("list")),
                            expand_quasiquote(other, depth),
                        ])));
                    }
                }
            }
            let mut concat_call = vec![Value::Symbol(Symbol::unqualified("concat"))];
            concat_call.extend(parts);
            Value::List(PList::from_vec(concat_call))
        }
        Value::Vector(v) => {
            let list_form = expand_quasiquote(&Value::List(PList::from_vec(v.iter().cloned().collect())), depth);
            Value::List(PList::from_vec(vec![Value::Symbol(Symbol::unqualified("vec")), list_form]))
        }
        Value::Symbol(_) => Value::List(PList::from_vec(vec![Value::Symbol(Symbol::unqualified("quote")), form.clone()])),
        other => other.clone(),
    }
}
