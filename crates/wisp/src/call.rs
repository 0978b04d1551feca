//! Function call + trampoline (§4.G).
//!
//! Argument evaluation is strictly left-to-right (§5 "Ordering"). Arguments
//! are gathered into a [`smallvec::SmallVec`] rather than a manually
//! arity-specialized 0–19 dispatch table: inline storage avoids the heap
//! allocation for the overwhelmingly common small-arity calls, and the
//! vector transparently spills to the heap for larger arities, which is the
//! same "no allocation below a size, materialized list above it" property
//! §4.G asks for, reached the idiomatic-Rust way (see DESIGN.md).

use smallvec::SmallVec;

use crate::{
    env::Context,
    exception::{Exception, RunError, RunResult},
    node::{FnArity, Node},
    resource::DepthGuard,
    value::{Callable, Closure, Value},
};

pub type ArgVec = SmallVec<[Value; 8]>;

/// Evaluates each argument node in order, left-to-right (§4.G step 5).
pub fn eval_args(ctx: &Context, nodes: &[Node], interpret: impl Fn(&Context, &Node) -> RunResult<Value>) -> RunResult<ArgVec> {
    let mut out = ArgVec::with_capacity(nodes.len());
    for node in nodes {
        out.push(interpret(ctx, node)?);
    }
    Ok(out)
}

fn arity_error(callable: &Callable, got: usize) -> RunError {
    let name = callable.name().unwrap_or_else(|| "fn".to_owned());
    Exception::new("ArityError", format!("{name} does not accept {got} argument(s)")).into()
}

fn check_builtin_arity(name: &str, min: usize, max: Option<usize>, got: usize) -> RunResult<()> {
    let ok = got >= min && max.is_none_or(|m| got <= m);
    if ok {
        Ok(())
    } else {
        Err(Exception::new("ArityError", format!("{name} does not accept {got} argument(s)")).into())
    }
}

fn select_arity<'a>(arities: &'a [FnArity], n: usize) -> Option<&'a FnArity> {
    arities
        .iter()
        .find(|a| !a.is_variadic() && a.fixed_arity() == n)
        .or_else(|| arities.iter().find(|a| a.is_variadic() && n >= a.fixed_arity()))
}

/// Invokes any [`Callable`] with already-evaluated arguments (§4.G step 6).
///
/// `interpret_body` evaluates a closure body (a sequence of analyzed nodes)
/// as an implicit `do`; it is passed in rather than imported to avoid a
/// cyclic dependency on `interpreter.rs`.
pub fn apply(
    ctx: &Context,
    callable: &Callable,
    args: &[Value],
    interpret_body: &impl Fn(&Context, &[Node]) -> RunResult<Value>,
) -> RunResult<Value> {
    match callable {
        Callable::Builtin(b) => {
            check_builtin_arity(b.name, b.min_arity, b.max_arity, args.len())?;
            (b.func)(args)
        }
        Callable::CtxBuiltin(b) => {
            check_builtin_arity(b.name, b.min_arity, b.max_arity, args.len())?;
            (b.func)(ctx, args)
        }
        Callable::NativeMacro(m) => Err(RunError::internal(format!("cannot call macro {} as a function", m.name))),
        Callable::Closure(closure) => call_closure(ctx, closure, args, interpret_body),
    }
}

/// The recur trampoline: runs the closure body in a loop, re-entering with
/// the recur marker's values on every `recur` instead of growing the host
/// stack (§4.G "Recur trampoline", §8 "a loop of N iterations succeeds for N
/// ≥ 10^5").
fn call_closure(
    ctx: &Context,
    closure: &std::rc::Rc<Closure>,
    args: &[Value],
    interpret_body: &impl Fn(&Context, &[Node]) -> RunResult<Value>,
) -> RunResult<Value> {
    let _depth = DepthGuard::enter(&ctx.state.depth, ctx.state.max_recursion_depth)?;
    let mut cur_args: ArgVec = args.iter().cloned().collect();
    let fn_name = closure.name.borrow().as_ref().map(ToString::to_string);
    ctx.state.tracer.on_call(fn_name.as_deref(), ctx.state.depth.get());
    loop {
        let Some(arity) = select_arity(&closure.arities, cur_args.len()) else {
            return Err(arity_error(&Callable::Closure(std::rc::Rc::clone(closure)), cur_args.len()));
        };
        let mut bindings = closure.captured.clone();
        if let Some(name) = closure.name.borrow().clone() {
            bindings = bindings.extend(name.name, Value::Fn(Callable::Closure(std::rc::Rc::clone(closure))));
        }
        for (param, value) in arity.params.iter().zip(cur_args.iter()) {
            bindings = bindings.extend(std::rc::Rc::clone(param), value.clone());
        }
        if let Some(rest) = &arity.variadic {
            let rest_items: Vec<Value> = cur_args[arity.params.len()..].to_vec();
            bindings = bindings.extend(std::rc::Rc::clone(rest), Value::List(crate::value::PList::from_vec(rest_items)));
        }
        let body_ctx = ctx.with_bindings(bindings);
        match interpret_body(&body_ctx, &arity.body)? {
            Value::Recur(vals) => {
                cur_args = vals.iter().cloned().collect();
                ctx.state.tracer.on_recur(fn_name.as_deref(), ctx.state.depth.get());
            }
            other => return Ok(other),
        }
    }
}
