//! The universal invariants every program must satisfy, not just the eight
//! literal scenarios: determinism, binding/initializer parity, `do`/`if`
//! evaluation order, closure capture-by-value, macroexpand idempotence, the
//! `recur` trampoline's stack bound, and the `realize-max` guard.

use pretty_assertions::assert_eq;
use wisp::{EvalOptions, RunError, Value, eval_string};

fn eval(source: &str) -> Value {
    eval_string(source, EvalOptions::new()).unwrap()
}

// ============================================================================
// determinism
// ============================================================================

#[test]
fn a_side_effect_free_expression_evaluates_the_same_way_every_time() {
    let source = "(let [xs [1 2 3 4 5]] (reduce + 0 (map (fn [x] (* x x)) xs)))";
    let first = eval(source);
    for _ in 0..10 {
        assert_eq!(eval(source), first);
    }
}

// ============================================================================
// binding forms: one initializer per bound name
// ============================================================================

#[test]
fn let_binds_exactly_as_many_names_as_it_has_initializers() {
    assert_eq!(eval("(let [a 1 b 2 c 3] (+ a b c))"), Value::Int(6));
}

#[test]
fn an_odd_binding_vector_is_rejected_at_analysis_time() {
    let err = eval_string("(let [a 1 b] a)", EvalOptions::new()).unwrap_err();
    assert!(err.as_exception().is_some(), "a malformed binding vector must fail as a catchable syntax error");
}

// ============================================================================
// do: result is the last subform's value, after all prior ones ran
// ============================================================================

#[test]
fn do_returns_the_last_subforms_value() {
    assert_eq!(eval("(do 1 2 3)"), Value::Int(3));
}

#[test]
fn do_evaluates_every_subform_for_its_side_effects() {
    let session = wisp::ReplSession::new(EvalOptions::new());
    session.eval("(def log [])").unwrap();
    session.eval("(do (def log (conj log 1)) (def log (conj log 2)) (def log (conj log 3)))").unwrap();
    assert_eq!(session.eval("log").unwrap(), eval("[1 2 3]"));
}

// ============================================================================
// if: exactly one branch runs
// ============================================================================

#[test]
fn if_only_evaluates_the_taken_branch() {
    let session = wisp::ReplSession::new(EvalOptions::new());
    session.eval("(def ran-then 0) (def ran-else 0)").unwrap();
    session
        .eval("(if true (def ran-then 1) (def ran-else 1))")
        .unwrap();
    assert_eq!(session.eval("ran-then").unwrap(), Value::Int(1));
    assert_eq!(session.eval("ran-else").unwrap(), Value::Int(0));
}

#[test]
fn if_without_an_else_branch_evaluates_to_nil_when_the_test_is_falsy() {
    assert_eq!(eval("(if false 1)"), Value::Nil);
}

// ============================================================================
// fn: closures capture their lexical frame by value at construction
// ============================================================================

#[test]
fn a_closure_keeps_the_binding_value_it_saw_at_construction() {
    // `make-adder` captures `n` when the closure is built; a later binding
    // of the same name in a sibling scope must not leak into it.
    let adder = eval("(let [n 10] ((fn [] (fn [x] (+ x n)))))");
    let Value::Fn(_) = adder else { panic!("expected a closure, got {adder:?}") };
    let session = wisp::ReplSession::new(EvalOptions::new());
    session.eval("(def make-adder (fn [n] (fn [x] (+ x n))))").unwrap();
    session.eval("(def add5 (make-adder 5))").unwrap();
    session.eval("(def add100 (make-adder 100))").unwrap();
    assert_eq!(session.eval("(add5 1)").unwrap(), Value::Int(6));
    assert_eq!(session.eval("(add100 1)").unwrap(), Value::Int(101));
}

// ============================================================================
// macroexpand: repeated expansion reaches a fixed point
// ============================================================================

#[test]
fn macroexpand_of_an_already_expanded_form_returns_it_unchanged() {
    let session = wisp::ReplSession::new(EvalOptions::new());
    let once = session.eval("(macroexpand '(when true 1 2 3))").unwrap();
    let twice = eval_string(
        &format!("(macroexpand (quote {once}))"),
        EvalOptions::new(),
    )
    .unwrap();
    assert_eq!(once, twice);
}

#[test]
fn macroexpand_1_on_a_non_macro_call_is_a_no_op() {
    assert_eq!(eval("(macroexpand-1 '(+ 1 2))"), eval("'(+ 1 2)"));
}

// ============================================================================
// recur: the trampoline does not grow the host call stack
// ============================================================================

#[test]
fn recur_handles_a_large_iteration_count_without_overflowing_the_stack() {
    assert_eq!(
        eval("((fn loop-to [n acc] (if (= n 0) acc (recur (dec n) (+ acc 1)))) 100000 0)"),
        Value::Int(100_000)
    );
}

#[test]
fn loop_recur_handles_a_large_iteration_count_without_overflowing_the_stack() {
    assert_eq!(eval("(loop [n 150000 acc 0] (if (= n 0) acc (recur (dec n) (+ acc 1))))"), Value::Int(150_000));
}

// ============================================================================
// realize-max: no returned value exceeds the configured realized size
// ============================================================================

#[test]
fn realize_max_permits_a_value_within_the_limit() {
    let result = eval_string("(vec (list 1 2 3))", EvalOptions::new().realize_max(3)).unwrap();
    assert_eq!(result, eval("[1 2 3]"));
}

#[test]
fn realize_max_rejects_a_value_over_the_limit() {
    let err = eval_string("(vec (list 1 2 3 4))", EvalOptions::new().realize_max(3)).unwrap_err();
    match err {
        RunError::Uncatchable(exc) => assert_eq!(exc.class_name.as_ref(), "MemoryError"),
        other => panic!("expected an uncatchable MemoryError, got {other:?}"),
    }
}

#[test]
fn realize_max_violation_cannot_be_caught_by_user_code() {
    let err = eval_string(
        r#"(try (vec (list 1 2 3 4)) (catch Exception e "caught"))"#,
        EvalOptions::new().realize_max(3),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Uncatchable(_)), "a resource guard must not be swallowed by catch Exception");
}
