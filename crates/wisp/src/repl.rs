//! Interactive session (grounded on the teacher's `ReplSession`, `repl.rs`
//! in `examples/parcadei-ouros/crates/ouros`).
//!
//! The teacher's session carries a heap, an interner, a function table, and
//! snapshot/resume state so a paused external-function call can cross an
//! async yield point. None of that applies here: a `wisp` evaluation never
//! yields mid-expression, so a session is just a [`Context`] that outlives
//! any one call to [`ReplSession::eval`], reused across inputs exactly the
//! way top-level `def`s are expected to accumulate in a REPL (§6 "Persisted
//! state: none" describes a single `eval-string` call; a session is many of
//! them sharing one namespace store).

use crate::{analyzer, builtins, env::{Context, EvalOptions}, exception::RunResult, interpreter, meta::Meta, reader, value::Value};

/// A persistent evaluation session: one [`Context`] reused across many
/// inputs, so a `def` in one call is visible to the next.
pub struct ReplSession {
    ctx: Context,
}

impl ReplSession {
    pub fn new(opts: EvalOptions) -> Self {
        let ctx = opts.build();
        builtins::install(&ctx.namespaces());
        Self { ctx }
    }

    /// Evaluates every top-level form in `source` against this session's
    /// persistent context, returning the last value (`nil` if none).
    pub fn eval(&self, source: &str) -> RunResult<Value> {
        let forms = reader::read_all(source, self.ctx.current_ns_name())?;
        let mut result = Value::Nil;
        for form in forms {
            result = self.eval_top_level_form(&form.value, &form.meta)?;
        }
        Ok(result)
    }

    fn eval_top_level_form(&self, form: &Value, pos: &Meta) -> RunResult<Value> {
        if let Value::List(list) = form
            && let Some(Value::Symbol(head)) = list.first()
            && head.ns.is_none()
            && head.name.as_ref() == "do"
        {
            let mut result = Value::Nil;
            for child in list.rest().iter() {
                result = self.eval_top_level_form(child, pos)?;
            }
            return Ok(result);
        }
        let node = analyzer::analyze(&self.ctx, form, pos, &interpreter::call_closure_as_macro)?;
        interpreter::interpret(&self.ctx, &node)
    }

    /// The namespace this session currently evaluates top-level forms in
    /// (mutated by `in-ns`).
    pub fn current_ns(&self) -> std::rc::Rc<str> {
        self.ctx.current_ns_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defs_persist_across_separate_eval_calls() {
        let session = ReplSession::new(EvalOptions::new());
        session.eval("(def counter 1)").unwrap();
        assert_eq!(session.eval("(def counter (+ counter 1)) counter").unwrap(), Value::Int(2));
    }

    #[test]
    fn in_ns_persists_across_calls() {
        let session = ReplSession::new(EvalOptions::new());
        session.eval("(in-ns 'scratch)").unwrap();
        assert_eq!(session.current_ns().as_ref(), "scratch");
    }
}
