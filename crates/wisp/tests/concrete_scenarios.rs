//! The eight literal-input/expected-output scenarios the interpreter must
//! reproduce exactly, one test per row.

use std::{cell::Cell, rc::Rc};

use pretty_assertions::assert_eq;
use wisp::{EvalOptions, Keyword, LoadFn, LoadResult, ReplSession, Value, eval_string};

fn eval(source: &str) -> Value {
    eval_string(source, EvalOptions::new()).unwrap()
}

// ============================================================================
// 1. recur trampoline
// ============================================================================

#[test]
fn recur_counts_up_to_the_fixed_point() {
    assert_eq!(eval("((fn f [x] (if (< x 3) (recur (inc x)) x)) 0)"), Value::Int(3));
}

// ============================================================================
// 2. let sees earlier bindings
// ============================================================================

#[test]
fn let_bindings_see_earlier_siblings() {
    assert_eq!(eval("(let [a 1 b (inc a)] (+ a b))"), Value::Int(3));
}

// ============================================================================
// 3. and/or short-circuiting
// ============================================================================

#[test]
fn and_returns_the_last_value_when_everything_is_truthy() {
    assert_eq!(eval("(and 1 2 3)"), Value::Int(3));
}

#[test]
fn and_short_circuits_on_the_first_falsy_value() {
    assert_eq!(eval("(and 1 nil 3)"), Value::Nil);
}

#[test]
fn or_short_circuits_on_the_first_truthy_value() {
    assert_eq!(eval("(or nil false 7)"), Value::Int(7));
}

// ============================================================================
// 4. case
// ============================================================================

#[test]
fn case_matches_by_equality_against_its_keys() {
    assert_eq!(eval("(case 2 1 :a 2 :b :z)"), Value::Keyword(Keyword::unqualified("b")));
}

// ============================================================================
// 5. try / catch / finally
// ============================================================================

#[test]
fn try_catches_ex_info_and_runs_finally_for_its_side_effect() {
    let session = ReplSession::new(EvalOptions::new());
    session.eval("(def ran 0)").unwrap();
    let result = session
        .eval(r#"(try (throw (ex-info "x" {})) (catch Exception e (ex-message e)) (finally (set! ran 42)))"#)
        .unwrap();
    assert_eq!(result, Value::from("x"));
    assert_eq!(session.eval("ran").unwrap(), Value::Int(42));
}

// ============================================================================
// 6. def updates a var's root without changing its identity
// ============================================================================

#[test]
fn redefining_a_var_keeps_its_identity_stable() {
    let session = ReplSession::new(EvalOptions::new());
    assert_eq!(session.eval("(do (def x 10) (def x 20) x)").unwrap(), Value::Int(20));

    session.eval("(def y 1)").unwrap();
    let before = session.eval("(resolve 'y)").unwrap();
    session.eval("(def y 2)").unwrap();
    let after = session.eval("(resolve 'y)").unwrap();
    match (before, after) {
        (Value::Var(a), Value::Var(b)) => assert!(Rc::ptr_eq(&a, &b), "redefining must not allocate a new var"),
        other => panic!("expected (Var, Var), got {other:?}"),
    }
}

// ============================================================================
// 7. require is idempotent; refer + alias both resolve the referred symbol
// ============================================================================

#[test]
fn require_loads_once_and_wires_alias_and_refer() {
    let load_count = Rc::new(Cell::new(0));
    let counted = Rc::clone(&load_count);
    let load_fn: LoadFn = Rc::new(move |name: &str| {
        if name == "foo" {
            counted.set(counted.get() + 1);
            Some(LoadResult { file: None, source: Rc::from("(defn g [] 7)") })
        } else {
            None
        }
    });

    let session = ReplSession::new(EvalOptions::new().load_fn(load_fn));
    session.eval("(require '[foo :as f :refer [g]])").unwrap();
    assert_eq!(session.eval("(f/g)").unwrap(), Value::Int(7));
    assert_eq!(session.eval("(g)").unwrap(), Value::Int(7));
    assert_eq!(load_count.get(), 1);

    session.eval("(require '[foo :as f :refer [g]])").unwrap();
    assert_eq!(load_count.get(), 1, "a second require must not re-evaluate the source");

    session.eval("(require '[foo :as f :refer [g] :reload])").unwrap();
    assert_eq!(load_count.get(), 2, ":reload must force re-evaluation even though foo is already loaded");
}

// ============================================================================
// 8. disallowed host interop
// ============================================================================

#[test]
fn disallowed_host_method_fails_with_the_policy_message() {
    let err = eval_string(r#"(.length "hi")"#, EvalOptions::new()).unwrap_err();
    let exc = err.as_exception().expect("expected a catchable PolicyError");
    assert_eq!(exc.class_name.as_ref(), "PolicyError");
    assert!(exc.message.contains("Method length on String not allowed!"));
    assert_eq!(exc.loc.map(|l| l.line), Some(1));
}
