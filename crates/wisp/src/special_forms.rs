//! Special-form evaluation (§4.F).
//!
//! Every form here reached the interpreter as a generic [`Node::Call`] whose
//! operator the analyzer deliberately left as a bare symbol (§4.G step 2) —
//! `fn`/`try`/`quote`/`quasiquote` get their own [`Node`] variant instead and
//! never arrive here. Argument `Node`s already carry whatever the analyzer
//! precomputed (a pre-interned [`Value::Var`] for `def`/`def-macro`/`set!`,
//! a class-name string literal for `new`/`.`), so this module only drives
//! evaluation order and the handful of runtime side effects (namespace
//! switches, var mutation, macro expansion, `require`).

use std::rc::Rc;

use crate::{
    analyzer,
    call,
    env::Context,
    exception::{CodeLoc, Exception, RunError, RunResult},
    interop,
    macros,
    meta::Meta,
    node::Node,
    require,
    value::{Callable, Value},
};

fn loc_of(meta: &Meta) -> CodeLoc {
    CodeLoc { line: meta.line().unwrap_or(0), col: meta.col().unwrap_or(0) }
}

fn internal_malformed(form: &str) -> RunError {
    RunError::internal(format!("malformed {form} node"))
}

fn call_macro_closure(ctx: &Context, callable: &Callable, args: &[Value]) -> RunResult<Value> {
    call::apply(ctx, callable, args, &crate::interpreter::interpret_body)
}

/// A value's host class name for `.`/instance-method dispatch: strings map
/// to the built-in `"String"` class; host objects report their own.
fn host_class_name(value: &Value) -> &str {
    match value {
        Value::Str(_) => "String",
        Value::Host(h) => h.type_name(),
        other => other.type_name(),
    }
}

/// A `^Tag`/`^{:tag Tag}` value, read off the target expression's metadata.
fn tag_name(meta: &Meta) -> Option<Rc<str>> {
    match meta.get(&crate::value::Keyword::unqualified("tag"))? {
        Value::Symbol(sym) => Some(Rc::clone(&sym.name)),
        Value::Keyword(kw) => Some(Rc::clone(&kw.name)),
        Value::Str(s) => Some(Rc::clone(s)),
        _ => None,
    }
}

/// Resolves the class used for `.` dispatch, in the §4.I priority order:
/// `:tag` metadata on the target expression (if it names a registered host
/// class), then a user-supplied `public-class` classifier, then the
/// target's own runtime class.
fn resolve_dot_class(ctx: &Context, target_meta: &Meta, target: &Value) -> String {
    if let Some(tag) = tag_name(target_meta)
        && ctx.state.host_classes.contains(&tag)
    {
        return tag.to_string();
    }
    if let Some(classify) = ctx.state.public_class.as_ref()
        && let Some(name) = classify(target)
    {
        return name.to_string();
    }
    host_class_name(target).to_owned()
}

/// Evaluates a special form by name against its (already analyzed) argument
/// nodes (§4.F).
pub fn eval(ctx: &Context, name: &str, args: &[Node], meta: &Meta) -> RunResult<Value> {
    use crate::interpreter::{interpret, interpret_body};

    match name {
        "do" => {
            let mut result = Value::Nil;
            for a in args {
                result = interpret(ctx, a)?;
            }
            Ok(result)
        }
        "if" => {
            let test = interpret(ctx, &args[0])?;
            if test.is_truthy() {
                interpret(ctx, &args[1])
            } else if let Some(else_node) = args.get(2) {
                interpret(ctx, else_node)
            } else {
                Ok(Value::Nil)
            }
        }
        "and" => {
            let mut result = Value::Bool(true);
            for a in args {
                result = interpret(ctx, a)?;
                if !result.is_truthy() {
                    return Ok(result);
                }
            }
            Ok(result)
        }
        "or" => {
            let mut result = Value::Nil;
            for a in args {
                result = interpret(ctx, a)?;
                if result.is_truthy() {
                    return Ok(result);
                }
            }
            Ok(result)
        }
        "let" => {
            let (let_ctx, body) = decode_bindings(ctx, args)?;
            interpret_body(&let_ctx, body)
        }
        "loop" => eval_loop(ctx, args),
        "def" | "def-macro" => {
            let Node::Literal(Value::Var(var)) = &args[0] else {
                return Err(internal_malformed("def"));
            };
            if let Some(init) = args.get(1) {
                let value = interpret(ctx, init)?;
                if let Value::Fn(Callable::Closure(closure)) = &value
                    && closure.name.borrow().is_none()
                {
                    *closure.name.borrow_mut() = Some(crate::value::Symbol::unqualified(Rc::clone(&var.sym)));
                }
                var.bind_root(value);
            }
            if name == "def-macro" {
                var.set_macro(true);
            }
            Ok(Value::Var(Rc::clone(var)))
        }
        "case" => eval_case(ctx, args),
        "throw" => {
            let value = interpret(ctx, &args[0])?;
            Err(crate::exception::to_run_error(value))
        }
        "recur" => {
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(interpret(ctx, a)?);
            }
            Ok(Value::Recur(Rc::new(vals)))
        }
        "new" => {
            let Node::Literal(Value::Str(class_name)) = &args[0] else {
                return Err(internal_malformed("new"));
            };
            let ctor_args = call::eval_args(ctx, &args[1..], interpret)?;
            interop::construct(&ctx.state.host_classes, &ctx.state.class_policy, class_name, &ctor_args, ctx.state.dry_run, loc_of(meta))
        }
        "." => {
            let target_meta = args[0].meta();
            let target = interpret(ctx, &args[0])?;
            let Node::Literal(Value::Str(method)) = &args[1] else {
                return Err(internal_malformed("."));
            };
            let call_args = call::eval_args(ctx, &args[2..], interpret)?;
            let class_name = resolve_dot_class(ctx, &target_meta, &target);
            interop::instance_method_call(
                &ctx.state.host_classes,
                &ctx.state.class_policy,
                &class_name,
                &target,
                method,
                &call_args,
                ctx.state.dry_run,
                loc_of(meta),
            )
        }
        "in-ns" => {
            let v = interpret(ctx, &args[0])?;
            let Value::Symbol(sym) = &v else {
                return Err(Exception::new("SyntaxError", "in-ns requires a symbol").with_loc(loc_of(meta)).into());
            };
            let ns_name: Rc<str> = Rc::from(sym.to_string());
            ctx.namespaces().borrow_mut().get_or_create(&ns_name);
            ctx.set_current_ns(ns_name);
            Ok(Value::Nil)
        }
        "set!" => {
            let Node::Literal(Value::Var(var)) = &args[0] else {
                return Err(internal_malformed("set!"));
            };
            let value = interpret(ctx, &args[1])?;
            var.set_val(value.clone());
            Ok(value)
        }
        "refer" => eval_refer(ctx, args),
        "resolve" => {
            let v = interpret(ctx, &args[0])?;
            let Value::Symbol(sym) = &v else {
                return Err(Exception::new("SyntaxError", "resolve requires a symbol").with_loc(loc_of(meta)).into());
            };
            Ok(analyzer::resolve_var(ctx, sym).map(Value::Var).unwrap_or(Value::Nil))
        }
        "macroexpand-1" => {
            let form = interpret(ctx, &args[0])?;
            macros::macroexpand_1(ctx, &form, &analyzer::resolve_macro, &call_macro_closure)
        }
        "macroexpand" => {
            let form = interpret(ctx, &args[0])?;
            macros::macroexpand(ctx, &form, &analyzer::resolve_macro, &call_macro_closure)
        }
        "require" => {
            let mut specs = Vec::with_capacity(args.len());
            for a in args {
                specs.push(interpret(ctx, a)?);
            }
            require::require(ctx, &specs)?;
            Ok(Value::Nil)
        }
        other => Err(RunError::internal(format!("unhandled special form: {other}"))),
    }
}

/// Decodes the `[count, name1, init1, name2, init2, ...]` prefix `let`/`loop`
/// share, evaluating each init against the bindings established by the
/// ones before it, and returns the extended context plus the remaining body
/// nodes.
fn decode_bindings<'a>(ctx: &Context, args: &'a [Node]) -> RunResult<(Context, &'a [Node])> {
    use crate::interpreter::interpret;

    let Node::Literal(Value::Int(count)) = &args[0] else {
        return Err(internal_malformed("let/loop"));
    };
    let count = *count as usize;
    let mut cur = ctx.clone();
    let mut idx = 1;
    for _ in 0..count {
        let Node::Literal(Value::Symbol(name)) = &args[idx] else {
            return Err(internal_malformed("let/loop"));
        };
        let value = interpret(&cur, &args[idx + 1])?;
        cur = cur.with_bindings(cur.bindings.extend(Rc::clone(&name.name), value));
        idx += 2;
    }
    Ok((cur, &args[idx..]))
}

fn loop_binding_names(args: &[Node]) -> RunResult<Vec<Rc<str>>> {
    let Node::Literal(Value::Int(count)) = &args[0] else {
        return Err(internal_malformed("loop"));
    };
    let count = *count as usize;
    let mut names = Vec::with_capacity(count);
    for i in 0..count {
        let Node::Literal(Value::Symbol(name)) = &args[1 + i * 2] else {
            return Err(internal_malformed("loop"));
        };
        names.push(Rc::clone(&name.name));
    }
    Ok(names)
}

/// `loop`'s own trampoline (§4.F `loop`, §4.G "Recur trampoline"): each
/// `recur` re-binds the loop's names to fresh values against the *original*
/// enclosing context, rather than nesting another frame on top of the
/// previous iteration's.
fn eval_loop(ctx: &Context, args: &[Node]) -> RunResult<Value> {
    use crate::interpreter::interpret_body;

    let names = loop_binding_names(args)?;
    let (mut loop_ctx, body) = decode_bindings(ctx, args)?;
    loop {
        match interpret_body(&loop_ctx, body)? {
            Value::Recur(vals) => {
                if vals.len() != names.len() {
                    return Err(Exception::new("ArityError", format!("loop recur expects {} argument(s), got {}", names.len(), vals.len()))
                        .into());
                }
                let mut next = ctx.clone();
                for (n, v) in names.iter().zip(vals.iter()) {
                    next = next.with_bindings(next.bindings.extend(Rc::clone(n), v.clone()));
                }
                loop_ctx = next;
            }
            other => return Ok(other),
        }
    }
}

fn eval_case(ctx: &Context, args: &[Node]) -> RunResult<Value> {
    use crate::interpreter::interpret;

    let subject = interpret(ctx, &args[0])?;
    let rest = &args[1..];
    let mut i = 0;
    while i + 1 < rest.len() {
        let test_val = interpret(ctx, &rest[i])?;
        if test_val == subject {
            return interpret(ctx, &rest[i + 1]);
        }
        i += 2;
    }
    if i < rest.len() {
        interpret(ctx, &rest[i])
    } else {
        Err(Exception::new("IllegalArgumentException", format!("No matching clause: {subject}")).into())
    }
}

fn eval_refer(ctx: &Context, args: &[Node]) -> RunResult<Value> {
    use crate::interpreter::interpret;

    let target_val = interpret(ctx, &args[0])?;
    let Value::Symbol(target_sym) = &target_val else {
        return Err(Exception::new("SyntaxError", "refer requires a namespace symbol").into());
    };
    let target_name: Rc<str> = Rc::from(target_sym.to_string());
    let mut excludes = Vec::new();
    let rest = &args[1..];
    let mut i = 0;
    while i + 1 < rest.len() {
        if let Value::Keyword(kw) = interpret(ctx, &rest[i])?
            && kw.ns.is_none()
            && kw.name.as_ref() == "exclude"
            && let Value::Vector(syms) = interpret(ctx, &rest[i + 1])?
        {
            for s in syms.iter() {
                if let Value::Symbol(sym) = s {
                    excludes.push(Rc::clone(&sym.name));
                }
            }
        }
        i += 2;
    }
    let namespaces = ctx.namespaces();
    namespaces.borrow_mut().get_or_create(&target_name);
    let cur_ns = namespaces.borrow_mut().get_or_create(&ctx.current_ns_name());
    cur_ns.borrow_mut().refer_exclude(&target_name, excludes);
    Ok(Value::Nil)
}
