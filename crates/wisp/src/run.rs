//! Top-level driver (§6 "Top-level driver contract").
//!
//! Grounded on the teacher's `Runner`/`Executor` split (`run.rs` in
//! `examples/parcadei-ouros/crates/ouros`), but without any of the
//! bytecode-VM machinery that split exists to support: no snapshot/resume,
//! no external-function futures, no postcard serialization. A tree-walking
//! interpreter with no bytecode compiler and no async boundary has no
//! intermediate state worth persisting between calls, so one function
//! suffices where the teacher needs a whole module.

use crate::{
    analyzer,
    builtins,
    env::{Context, EvalOptions},
    exception::RunResult,
    interpreter,
    meta::Meta,
    reader,
    value::Value,
};

/// Parses and evaluates every top-level form in `source` against a fresh
/// context built from `opts`, returning the value of the last form
/// evaluated (`nil` if `source` contains none).
///
/// Implements the four-step contract: initialize a context defaulting to
/// the `user` namespace, repeatedly read the next form, splice a top-level
/// `(do ...)` into its own top-level forms so each child's `def`s land
/// before the next child is analyzed, and otherwise analyze-then-interpret
/// the form directly.
pub fn eval_string(source: &str, opts: EvalOptions) -> RunResult<Value> {
    let ctx = opts.build();
    builtins::install(&ctx.namespaces());
    let forms = reader::read_all(source, ctx.current_ns_name())?;
    eval_top_level_forms(&ctx, forms.into_iter().map(|f| (f.value, f.meta)))
}

fn eval_top_level_forms(ctx: &Context, forms: impl IntoIterator<Item = (Value, Meta)>) -> RunResult<Value> {
    let mut result = Value::Nil;
    for (form, pos) in forms {
        result = eval_top_level_form(ctx, &form, &pos)?;
    }
    Ok(result)
}

fn eval_top_level_form(ctx: &Context, form: &Value, pos: &Meta) -> RunResult<Value> {
    if let Value::List(list) = form
        && let Some(Value::Symbol(head)) = list.first()
        && head.ns.is_none()
        && head.name.as_ref() == "do"
    {
        return eval_top_level_forms(ctx, list.rest().iter().cloned().map(|v| (v, pos.clone())));
    }
    let node = analyzer::analyze(ctx, form, pos, &interpreter::call_closure_as_macro)?;
    interpreter::interpret(ctx, &node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Value {
        eval_string(source, EvalOptions::new()).unwrap()
    }

    #[test]
    fn evaluates_the_last_top_level_form() {
        assert_eq!(eval("(def x 1) (def y 2) (+ x y)"), Value::Int(3));
    }

    #[test]
    fn empty_source_evaluates_to_nil() {
        assert_eq!(eval("  ; just a comment\n"), Value::Nil);
    }

    #[test]
    fn top_level_do_splices_so_later_forms_see_earlier_defs() {
        assert_eq!(eval("(do (def a 10) (def b 20)) (+ a b)"), Value::Int(30));
    }

    #[test]
    fn arity_mismatch_raises_a_catchable_exception() {
        let err = eval_string("(def f (fn [x] x)) (f 1 2)", EvalOptions::new()).unwrap_err();
        assert!(err.catchable_as("ArityError").is_some());
    }
}
