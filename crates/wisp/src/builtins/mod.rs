//! Built-in functions installed into the `wisp.core` namespace at bootstrap
//! (`run.rs`).
//!
//! Grouped by concern rather than one file per function: the teacher's
//! `builtins/` directory gives each builtin its own file because every call
//! has to thread a `Heap`/refcounting dance through `ArgValues` (see
//! `examples/parcadei-ouros/crates/ouros/src/builtins/abs.rs`); wisp's `Value`
//! is `Rc`-shared with no manual drop bookkeeping, so that per-function
//! ceremony doesn't apply here and the natural granularity is a handful of
//! thematic modules instead.

mod arithmetic;
mod collections;
mod comparison;
mod exceptions;
mod higher_order;
mod meta;
mod predicates;
mod sequences;
mod strings;

use crate::{
    exception::{Exception, RunError},
    namespace::NamespacesHandle,
    value::{Builtin, Callable, Value},
};

fn type_err(expected: &str, got: &Value) -> RunError {
    Exception::new("TypeError", format!("expected {expected}, got {}", got.type_name())).into()
}

fn arity_err(name: &str, got: usize) -> RunError {
    Exception::new("ArityError", format!("{name} does not accept {got} argument(s)")).into()
}

/// Installs every core builtin, native macro, and special-form-adjacent
/// helper into the `wisp.core` namespace. Idempotent: re-running it just
/// rebinds the same var roots.
pub fn install(namespaces: &NamespacesHandle) {
    let core = namespaces.borrow_mut().get_or_create("wisp.core");
    let mut core = core.borrow_mut();

    let groups: &[&[&'static Builtin]] = &[
        arithmetic::BUILTINS,
        comparison::BUILTINS,
        predicates::BUILTINS,
        sequences::BUILTINS,
        collections::BUILTINS,
        strings::BUILTINS,
        exceptions::BUILTINS,
        meta::BUILTINS,
    ];
    for group in groups {
        for b in *group {
            core.get_or_create_var(b.name).bind_root(Value::Fn(Callable::Builtin(b)));
        }
    }
    for b in higher_order::CTX_BUILTINS {
        core.get_or_create_var(b.name).bind_root(Value::Fn(Callable::CtxBuiltin(b)));
    }
    for m in crate::macros::native_macros() {
        let var = core.get_or_create_var(m.name);
        var.bind_root(Value::Fn(Callable::NativeMacro(m)));
        var.set_macro(true);
    }
}
