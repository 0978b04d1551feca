//! Macro engine (§4.H) and the native-macro bootstrap that defines
//! `defn`/`defmacro`/`when`/`when-not`/`cond` (§4.F "Supplemented from the
//! language's natural surface").
//!
//! A *native* macro (§3 "NativeMacro") is a pure Rust syntactic transform
//! over unevaluated forms — used for the handful of macros the language
//! needs before any self-hosted macro can exist to define them. A
//! user-defined macro (`defmacro`) is an ordinary [`Closure`] whose var is
//! flagged `is_macro`; expanding one runs real interpreted code through the
//! normal call path (`call.rs`).

use crate::{
    env::Context,
    exception::{Exception, RunError, RunResult},
    value::{Callable, NativeMacro, PList, Symbol, Value},
};

/// Special-form head names (§4.F): the analyzer never treats these as
/// resolvable vars or macro calls — they dispatch directly in `special_forms.rs`.
pub const SPECIAL_FORMS: &[&str] = &[
    "quote",
    "fn",
    "try",
    "do",
    "if",
    "and",
    "or",
    "let",
    "loop",
    "def",
    "def-macro",
    "case",
    "throw",
    "recur",
    "new",
    ".",
    "in-ns",
    "set!",
    "refer",
    "resolve",
    "macroexpand-1",
    "macroexpand",
    "require",
    "quasiquote",
    "unquote",
    "unquote-splicing",
];

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name) || (name.len() > 1 && name.starts_with('.'))
}

fn list_args(rest: &[Value]) -> Value {
    Value::List(PList::from_vec(rest.to_vec()))
}

fn sym(s: &str) -> Value {
    Value::Symbol(Symbol::unqualified(s))
}

/// `(defn name [params...] body...)` => `(def name (fn name [params...] body...))`
fn expand_defn(args: &[Value]) -> RunResult<Value> {
    let [name, rest @ ..] = args else {
        return Err(Exception::new("SyntaxError", "defn requires a name").into());
    };
    let mut fn_form = vec![sym("fn"), name.clone()];
    fn_form.extend_from_slice(rest);
    Ok(list_args(&[sym("def"), name.clone(), Value::List(PList::from_vec(fn_form))]))
}

/// `(defmacro name [params...] body...)` expands to the `def-macro` special
/// form (§4.F `def`, macro-flagged variant) rather than plain `def`, so the
/// var ends up flagged `is_macro` atomically with its creation.
fn expand_defmacro(args: &[Value]) -> RunResult<Value> {
    let [name, rest @ ..] = args else {
        return Err(Exception::new("SyntaxError", "defmacro requires a name").into());
    };
    let mut fn_form = vec![sym("fn"), name.clone()];
    fn_form.extend_from_slice(rest);
    Ok(list_args(&[sym("def-macro"), name.clone(), Value::List(PList::from_vec(fn_form))]))
}

fn expand_when(args: &[Value]) -> RunResult<Value> {
    let [test, body @ ..] = args else {
        return Err(Exception::new("SyntaxError", "when requires a test").into());
    };
    let mut do_form = vec![sym("do")];
    do_form.extend_from_slice(body);
    Ok(list_args(&[sym("if"), test.clone(), Value::List(PList::from_vec(do_form)), Value::Nil]))
}

fn expand_when_not(args: &[Value]) -> RunResult<Value> {
    let [test, body @ ..] = args else {
        return Err(Exception::new("SyntaxError", "when-not requires a test").into());
    };
    let mut do_form = vec![sym("do")];
    do_form.extend_from_slice(body);
    Ok(list_args(&[sym("if"), test.clone(), Value::Nil, Value::List(PList::from_vec(do_form))]))
}

/// `(cond test1 expr1 test2 expr2 ... [:else default])` => nested `if`s.
fn expand_cond(args: &[Value]) -> RunResult<Value> {
    if args.is_empty() {
        return Ok(Value::Nil);
    }
    if args.len() < 2 {
        return Err(Exception::new("SyntaxError", "cond requires an even number of forms").into());
    }
    let rest = expand_cond(&args[2..])?;
    Ok(list_args(&[sym("if"), args[0].clone(), args[1].clone(), rest]))
}

fn expand_thread_first(args: &[Value]) -> RunResult<Value> {
    thread(args, true)
}

fn expand_thread_last(args: &[Value]) -> RunResult<Value> {
    thread(args, false)
}

fn thread(args: &[Value], first: bool) -> RunResult<Value> {
    let [seed, steps @ ..] = args else {
        return Err(Exception::new("SyntaxError", "threading macro requires a seed form").into());
    };
    let mut acc = seed.clone();
    for step in steps {
        acc = match step {
            Value::List(l) if !l.is_empty() => {
                let mut items: Vec<Value> = l.iter().cloned().collect();
                if first {
                    items.insert(1, acc);
                } else {
                    items.push(acc);
                }
                Value::List(PList::from_vec(items))
            }
            other => Value::List(PList::from_vec(vec![other.clone(), acc])),
        };
    }
    Ok(acc)
}

macro_rules! native_macro {
    ($ident:ident, $name:literal, $func:ident) => {
        static $ident: NativeMacro = NativeMacro { name: $name, func: $func };
    };
}

native_macro!(DEFN, "defn", expand_defn);
native_macro!(DEFMACRO, "defmacro", expand_defmacro);
native_macro!(WHEN, "when", expand_when);
native_macro!(WHEN_NOT, "when-not", expand_when_not);
native_macro!(COND, "cond", expand_cond);
native_macro!(THREAD_FIRST, "->", expand_thread_first);
native_macro!(THREAD_LAST, "->>", expand_thread_last);

/// All native macros, installed into `wisp.core` at bootstrap (`run.rs`).
pub fn native_macros() -> &'static [&'static NativeMacro] {
    &[&DEFN, &DEFMACRO, &WHEN, &WHEN_NOT, &COND, &THREAD_FIRST, &THREAD_LAST]
}

/// `macroexpand-1` (§4.H): expands a list form exactly one level, or returns
/// it unchanged if its head isn't a macro.
///
/// `call_macro_closure` performs the actual interpreted call for
/// user-defined macros; it's injected to avoid a cyclic dependency on
/// `interpreter.rs`.
pub fn macroexpand_1(
    ctx: &Context,
    expr: &Value,
    resolve_macro: &impl Fn(&Context, &Symbol) -> Option<Callable>,
    call_macro_closure: &impl Fn(&Context, &Callable, &[Value]) -> RunResult<Value>,
) -> RunResult<Value> {
    let Value::List(list) = expr else { return Ok(expr.clone()) };
    let Some(Value::Symbol(head)) = list.first() else { return Ok(expr.clone()) };
    if is_special_form(&head.name) {
        return Ok(expr.clone());
    }
    let Some(callable) = resolve_macro(ctx, head) else { return Ok(expr.clone()) };
    let rest: Vec<Value> = list.rest().iter().cloned().collect();
    match callable {
        Callable::NativeMacro(m) => (m.func)(&rest),
        closure @ Callable::Closure(_) => {
            let mut call_args = vec![expr.clone(), Value::Nil];
            call_args.extend(rest);
            call_macro_closure(ctx, &closure, &call_args)
        }
        _ => Ok(expr.clone()),
    }
}

/// `macroexpand` (§4.H): repeats `macroexpand-1` to a fixed point.
pub fn macroexpand(
    ctx: &Context,
    form: &Value,
    resolve_macro: &impl Fn(&Context, &Symbol) -> Option<Callable>,
    call_macro_closure: &impl Fn(&Context, &Callable, &[Value]) -> RunResult<Value>,
) -> RunResult<Value> {
    let mut cur = form.clone();
    loop {
        let next = macroexpand_1(ctx, &cur, resolve_macro, call_macro_closure)?;
        if next == cur {
            return Ok(next);
        }
        cur = next;
    }
}

pub fn err_not_a_symbol() -> RunError {
    Exception::new("SyntaxError", "expected a symbol").into()
}
