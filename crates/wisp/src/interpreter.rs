//! The interpreter's core dispatch loop (§4.E).
//!
//! `interpret` walks an analyzed [`Node`] and produces a [`Value`],
//! re-raising any error from inside a call with the call node's own source
//! location attached (§4.G, last paragraph) so a deeply nested failure still
//! points at the outermost call site a user would recognize.

use std::{cell::RefCell, rc::Rc};

use crate::{
    call,
    env::Context,
    exception::{CodeLoc, Exception, RunError, RunResult},
    interop,
    macros::is_special_form,
    meta::Meta,
    node::Node,
    resource::check_realize_max,
    special_forms,
    value::{Callable, Closure, Value},
};

fn loc_of(meta: &Meta) -> CodeLoc {
    CodeLoc { line: meta.line().unwrap_or(0), col: meta.col().unwrap_or(0) }
}

/// `interpret(ctx, expr) -> Value` (§4.E).
pub fn interpret(ctx: &Context, node: &Node) -> RunResult<Value> {
    let value = interpret_node(ctx, node)?;
    check_realize_max(&value, ctx.state.realize_max)?;
    Ok(value)
}

/// Runs a macro's closure through the real call path (§4.H). Shared by
/// `macroexpand-1`/`macroexpand` (`special_forms.rs`) and by the analyzer's
/// inline macro expansion during `require`'s namespace loading.
pub fn call_closure_as_macro(ctx: &Context, callable: &Callable, args: &[Value]) -> RunResult<Value> {
    call::apply(ctx, callable, args, &interpret_body)
}

/// Evaluates a closure/`fn` body (or a `let`/`loop` body) as an implicit
/// `do`: empty bodies evaluate to `nil`, non-empty bodies evaluate every
/// form and return the last (§4.F `do`).
pub fn interpret_body(ctx: &Context, body: &[Node]) -> RunResult<Value> {
    let mut result = Value::Nil;
    for node in body {
        result = interpret(ctx, node)?;
    }
    Ok(result)
}

fn interpret_node(ctx: &Context, node: &Node) -> RunResult<Value> {
    match node {
        Node::Literal(v) => interpret_literal(v),
        Node::VectorLit(items, _) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(interpret(ctx, item)?);
            }
            Ok(Value::Vector(Rc::new(out)))
        }
        Node::SetLit(items, _) => {
            let mut out = indexmap::IndexSet::new();
            for item in items.iter() {
                out.insert(interpret(ctx, item)?);
            }
            Ok(Value::Set(Rc::new(out)))
        }
        Node::MapLit(pairs, _) => {
            let mut out = indexmap::IndexMap::new();
            for (k, v) in pairs.iter() {
                let key = interpret(ctx, k)?;
                let val = interpret(ctx, v)?;
                // Last writer wins on duplicate keys (§4.E step 2 "map literal").
                out.insert(key, val);
            }
            Ok(Value::Map(Rc::new(out)))
        }
        Node::Call { op, args, meta } => interpret_call(ctx, op, args, meta),
        Node::Try { body, catches, finally, .. } => interpret_try(ctx, body, catches, finally.as_deref()),
        Node::Fn { name, arities, is_macro, .. } => {
            let closure = Closure { name: RefCell::new(name.clone()), arities: Rc::clone(arities), captured: ctx.bindings.clone(), is_macro: *is_macro };
            Ok(Value::Fn(Callable::Closure(Rc::new(closure))))
        }
        Node::StaticAccess { class, field, meta } => {
            interop::static_field(&ctx.state.host_classes, &ctx.state.class_policy, class, field, loc_of(meta))
        }
        Node::VarValue { var, meta } => {
            if var.is_macro() {
                return Err(Exception::new("TypeError", "Can't take value of a macro").with_loc(loc_of(meta)).into());
            }
            var.deref().ok_or_else(|| Exception::new("ResolutionError", format!("Unbound var: {}/{}", var.ns_name, var.sym)).with_loc(loc_of(meta)).into())
        }
        Node::Deref { target, meta } => {
            let value = interpret(ctx, target)?;
            deref_value(value, loc_of(meta))
        }
        Node::ResolveSym { sym, meta } => ctx
            .bindings
            .get(&sym.name)
            .ok_or_else(|| Exception::new("ResolutionError", format!("Could not resolve symbol: {sym}")).with_loc(loc_of(meta)).into()),
        Node::NeedsCtx { builtin, .. } => Ok(Value::Fn(Callable::CtxBuiltin(builtin))),
    }
}

fn interpret_literal(v: &Value) -> RunResult<Value> {
    if let Value::Var(var) = v {
        if var.is_macro() {
            return Err(Exception::new("TypeError", "Can't take value of a macro").into());
        }
        return var.deref().ok_or_else(|| Exception::new("ResolutionError", format!("Unbound var: {}/{}", var.ns_name, var.sym)).into());
    }
    Ok(v.clone())
}

/// Forces a var or a lazy sequence's head/tail pair (`deref!`); any other
/// value derefs to itself.
fn deref_value(value: Value, loc: CodeLoc) -> RunResult<Value> {
    match value {
        Value::Var(var) => {
            var.deref().ok_or_else(|| Exception::new("ResolutionError", format!("Unbound var: {}/{}", var.ns_name, var.sym)).with_loc(loc).into())
        }
        Value::Lazy(seq) => match seq.force()? {
            Some((head, _tail)) => Ok(head),
            None => Ok(Value::Nil),
        },
        other => Ok(other),
    }
}

/// `op: call` (§4.G). Dispatches a special form by its bare head symbol, a
/// static method call when the operator is a resolved class reference, or
/// an ordinary function call otherwise. Any error surfacing from within is
/// re-raised carrying this call's own source location.
fn interpret_call(ctx: &Context, op: &Node, args: &[Node], meta: &Meta) -> RunResult<Value> {
    let loc = loc_of(meta);
    dispatch_call(ctx, op, args, meta).map_err(|e| e.rewrap_at(loc))
}

fn dispatch_call(ctx: &Context, op: &Node, args: &[Node], meta: &Meta) -> RunResult<Value> {
    if let Node::Literal(Value::Symbol(sym)) = op
        && sym.ns.is_none()
        && is_special_form(&sym.name)
    {
        return special_forms::eval(ctx, &sym.name, args, meta);
    }
    if let Node::StaticAccess { class, field, meta: sa_meta } = op {
        let arg_vals = call::eval_args(ctx, args, interpret)?;
        return interop::static_method_call(
            &ctx.state.host_classes,
            &ctx.state.class_policy,
            class,
            field,
            &arg_vals,
            ctx.state.dry_run,
            loc_of(sa_meta),
        );
    }
    let callee = interpret(ctx, op)?;
    let Value::Fn(callable) = callee else {
        return Err(Exception::new("TypeError", format!("Cannot call a value of type {}", callee.type_name())).with_loc(loc_of(meta)).into());
    };
    let arg_vals = call::eval_args(ctx, args, interpret)?;
    call::apply(ctx, &callable, &arg_vals, &interpret_body)
}

/// `op: try` (§4.F `try`). Evaluates the body; on a catchable exception,
/// runs the first matching `catch` clause with the exception bound; always
/// runs `finally` last, for its side effects only, whether or not the body
/// or a catch clause raised.
fn interpret_try(ctx: &Context, body: &[Node], catches: &[crate::node::CatchClause], finally: Option<&[Node]>) -> RunResult<Value> {
    let was_in_try = ctx.state.in_try.replace(true);
    let body_result = interpret_body(ctx, body);
    ctx.state.in_try.set(was_in_try);

    let result = match body_result {
        Ok(v) => Ok(v),
        Err(e) => {
            let mut handled = None;
            for clause in catches {
                if let Some(exc) = e.catchable_as(&clause.class) {
                    let exc_obj = Value::Host(Rc::new(crate::exception::ExceptionObject(Rc::new(exc.clone()))));
                    let catch_ctx = ctx.with_bindings(ctx.bindings.extend(Rc::clone(&clause.binding), exc_obj));
                    handled = Some(interpret_body(&catch_ctx, &clause.body));
                    break;
                }
            }
            handled.unwrap_or(Err(e))
        }
    };

    if let Some(finally_body) = finally {
        let finally_result = interpret_body(ctx, finally_body);
        finally_result?;
    }
    result
}
