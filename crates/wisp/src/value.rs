//! Runtime value representation.
//!
//! `Value` is a tagged sum covering every kind of data the interpreter can
//! produce or consume: scalars, the four collection kinds, lazy sequences,
//! callables (user closures and host-registered builtins), vars, opaque host
//! objects, and the internal recur marker used by the tail-call trampoline
//! (§4.G). Collections are `Rc`-shared so that binding a name to a vector and
//! then extending a lexical frame never copies the vector itself.

use std::{
    cell::RefCell,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};

use crate::{env::Bindings, exception::RunResult, meta::Meta, node::FnArity, var::VarRef};

/// A (possibly namespace-qualified) symbol.
///
/// Carries its own `meta` sidecar (the `^{...}`/`^:kw`/`^Tag` reader macro
/// attaches here) so a `:tag` survives from reader to analyzer to the `.`
/// dispatch's class-resolution tiers (§4.I). Metadata is never part of
/// equality or hashing (§3), so `PartialEq`/`Eq`/`Hash` are hand-rolled below
/// rather than derived.
#[derive(Clone)]
pub struct Symbol {
    pub ns: Option<Rc<str>>,
    pub name: Rc<str>,
    pub meta: Meta,
}

impl Symbol {
    pub fn unqualified(name: impl Into<Rc<str>>) -> Self {
        Self { ns: None, name: name.into(), meta: Meta::none() }
    }

    pub fn qualified(ns: impl Into<Rc<str>>, name: impl Into<Rc<str>>) -> Self {
        Self { ns: Some(ns.into()), name: name.into(), meta: Meta::none() }
    }

    /// Splits `ns/name` into its parts, or returns `name` unqualified if there is no `/`
    /// (a leading `/` or a bare `/` symbol is kept unqualified — that's the division symbol).
    pub fn parse(text: &str) -> Self {
        if text != "/"
            && let Some((ns, name)) = text.split_once('/')
            && !ns.is_empty()
            && !name.is_empty()
        {
            return Self::qualified(ns, name);
        }
        Self::unqualified(text)
    }

    /// Returns a copy of this symbol with its metadata replaced by `meta`
    /// (`with-meta` semantics — the original is untouched).
    #[must_use]
    pub fn with_meta(&self, meta: Meta) -> Self {
        Self { ns: self.ns.clone(), name: Rc::clone(&self.name), meta }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ns == other.ns && self.name == other.name
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ns.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A (possibly namespace-qualified) keyword, e.g. `:foo` or `:ns/foo`.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Keyword {
    pub ns: Option<Rc<str>>,
    pub name: Rc<str>,
}

impl Keyword {
    pub fn unqualified(name: impl Into<Rc<str>>) -> Self {
        Self { ns: None, name: name.into() }
    }

    pub fn qualified(ns: impl Into<Rc<str>>, name: impl Into<Rc<str>>) -> Self {
        Self { ns: Some(ns.into()), name: name.into() }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, ":{ns}/{}", self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A persistent singly-linked list node. `Nil` is the empty list.
///
/// Lists share structure on `cons`: prepending never touches the tail.
#[derive(Clone, Default)]
pub enum PList {
    #[default]
    Nil,
    Cons(Rc<PCons>),
}

pub struct PCons {
    pub head: Value,
    pub tail: PList,
    pub len: usize,
}

impl PList {
    pub fn from_vec(items: Vec<Value>) -> Self {
        let mut list = Self::Nil;
        for item in items.into_iter().rev() {
            list = list.cons(item);
        }
        list
    }

    #[must_use]
    pub fn cons(&self, head: Value) -> Self {
        let len = self.len() + 1;
        Self::Cons(Rc::new(PCons { head, tail: self.clone(), len }))
    }

    pub fn first(&self) -> Option<&Value> {
        match self {
            Self::Nil => None,
            Self::Cons(c) => Some(&c.head),
        }
    }

    pub fn rest(&self) -> Self {
        match self {
            Self::Nil => Self::Nil,
            Self::Cons(c) => c.tail.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Nil => 0,
            Self::Cons(c) => c.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn iter(&self) -> PListIter<'_> {
        PListIter { cur: self }
    }
}

pub struct PListIter<'a> {
    cur: &'a PList,
}

impl<'a> Iterator for PListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cur {
            PList::Nil => None,
            PList::Cons(c) => {
                self.cur = &c.tail;
                Some(&c.head)
            }
        }
    }
}

/// A lazy sequence: an unevaluated thunk plus a memoized realized prefix.
///
/// Only `deref!` and a handful of forcing operations realize elements beyond
/// what has already been computed (§9, "Coroutines / laziness"). The
/// `realize_max` guard (`resource.rs`) is applied at force time.
#[derive(Clone)]
pub struct LazySeq(pub Rc<RefCell<LazyState>>);

pub enum LazyState {
    /// Not yet forced; holds the thunk that produces the head/tail pair, or `None`
    /// once the sequence is known to be empty.
    Pending(Rc<dyn Fn() -> RunResult<Option<(Value, Value)>>>),
    Realized(Option<(Value, Value)>),
}

impl LazySeq {
    pub fn new(thunk: impl Fn() -> RunResult<Option<(Value, Value)>> + 'static) -> Self {
        Self(Rc::new(RefCell::new(LazyState::Pending(Rc::new(thunk)))))
    }

    /// Forces the head/tail pair, memoizing the result.
    pub fn force(&self) -> RunResult<Option<(Value, Value)>> {
        let thunk = {
            let state = self.0.borrow();
            match &*state {
                LazyState::Realized(pair) => return Ok(pair.clone()),
                LazyState::Pending(thunk) => thunk.clone(),
            }
        };
        let pair = thunk()?;
        *self.0.borrow_mut() = LazyState::Realized(pair.clone());
        Ok(pair)
    }
}

/// An opaque, host-registered object. Only method dispatch through the
/// interop gateway (`interop.rs`) can observe its contents.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// A user-defined closure: captured lexical frame plus one or more arities.
pub struct Closure {
    pub name: RefCell<Option<Symbol>>,
    pub arities: Rc<[FnArity]>,
    pub captured: Bindings,
    pub is_macro: bool,
}

pub type BuiltinFn = fn(&[Value]) -> RunResult<Value>;
pub type CtxBuiltinFn = fn(&crate::env::Context, &[Value]) -> RunResult<Value>;

pub struct Builtin {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: Option<usize>,
    pub func: BuiltinFn,
}

pub struct CtxBuiltin {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: Option<usize>,
    pub func: CtxBuiltinFn,
}

/// A Rust-native macro: a pure syntactic transform over unevaluated argument
/// forms, used to bootstrap `defn`/`defmacro`/`when`/`cond`/... (§4.F
/// "Supplemented from the language's natural surface") without requiring a
/// self-hosted macro to already exist to define them.
pub struct NativeMacro {
    pub name: &'static str,
    pub func: fn(&[Value]) -> RunResult<Value>,
}

/// Anything the call path (§4.G) can invoke.
#[derive(Clone)]
pub enum Callable {
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    CtxBuiltin(&'static CtxBuiltin),
    NativeMacro(&'static NativeMacro),
}

impl Callable {
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Closure(c) => c.name.borrow().as_ref().map(ToString::to_string),
            Self::Builtin(b) => Some(b.name.to_string()),
            Self::CtxBuiltin(b) => Some(b.name.to_string()),
            Self::NativeMacro(m) => Some(m.name.to_string()),
        }
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(Rc<str>),
    Symbol(Symbol),
    Keyword(Keyword),
    List(PList),
    Vector(Rc<Vec<Value>>),
    Set(Rc<IndexSet<Value>>),
    Map(Rc<IndexMap<Value, Value>>),
    Lazy(LazySeq),
    Fn(Callable),
    Var(VarRef),
    Host(Rc<dyn HostObject>),
    /// Internal marker produced by `recur`; never observable by user code
    /// outside the enclosing callable's trampoline (§4.F `recur`, §4.G).
    Recur(Rc<Vec<Value>>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Keyword(_) => "keyword",
            Self::List(_) => "list",
            Self::Vector(_) => "vector",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Lazy(_) => "lazy-seq",
            Self::Fn(_) => "function",
            Self::Var(_) => "var",
            Self::Host(h) => h.type_name(),
            Self::Recur(_) => "recur",
        }
    }

    /// Best-effort count of the elements a realized view of this value would
    /// hold. Used by the `realize_max` guard (`resource.rs`).
    pub fn realized_size(&self) -> usize {
        match self {
            Self::List(l) => l.len(),
            Self::Vector(v) => v.len(),
            Self::Set(s) => s.len(),
            Self::Map(m) => m.len(),
            Self::Str(s) => s.chars().count(),
            _ => 0,
        }
    }
}

fn seq_iter(v: &Value) -> Option<Box<dyn Iterator<Item = &Value> + '_>> {
    match v {
        Value::List(l) => Some(Box::new(l.iter())),
        Value::Vector(v) => Some(Box::new(v.iter())),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Keyword(a), Self::Keyword(b)) => a == b,
            (Self::List(_) | Self::Vector(_), Self::List(_) | Self::Vector(_)) => {
                let (Some(a), Some(b)) = (seq_iter(self), seq_iter(other)) else {
                    return false;
                };
                a.eq(b)
            }
            (Self::Set(a), Self::Set(b)) => a.len() == b.len() && a.iter().all(|x| b.contains(x)),
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            // Lazy sequences, callables, vars, and host objects compare by identity:
            // forcing a lazy seq just to check equality would defeat laziness.
            (Self::Lazy(a), Self::Lazy(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Self::Var(a), Self::Var(b)) => Rc::ptr_eq(a, b),
            (Self::Host(a), Self::Host(b)) => Rc::ptr_eq(a, b),
            (Self::Fn(a), Self::Fn(b)) => match (a, b) {
                (Callable::Closure(a), Callable::Closure(b)) => Rc::ptr_eq(a, b),
                (Callable::Builtin(a), Callable::Builtin(b)) => std::ptr::eq(*a, *b),
                (Callable::CtxBuiltin(a), Callable::CtxBuiltin(b)) => std::ptr::eq(*a, *b),
                (Callable::NativeMacro(a), Callable::NativeMacro(b)) => std::ptr::eq(*a, *b),
                _ => false,
            },
            (Self::Recur(a), Self::Recur(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Nil => 0u8.hash(state),
            Self::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Self::Int(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Self::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Char(c) => {
                4u8.hash(state);
                c.hash(state);
            }
            Self::Str(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            Self::Symbol(s) => {
                6u8.hash(state);
                s.hash(state);
            }
            Self::Keyword(k) => {
                7u8.hash(state);
                k.hash(state);
            }
            // Lists and vectors hash identically so that cross-type equal values collide.
            Self::List(_) | Self::Vector(_) => {
                8u8.hash(state);
                for item in seq_iter(self).into_iter().flatten() {
                    item.hash(state);
                }
            }
            Self::Set(s) => {
                9u8.hash(state);
                let mut acc: u64 = 0;
                for item in s.iter() {
                    acc = acc.wrapping_add(fnv64(item));
                }
                acc.hash(state);
            }
            Self::Map(m) => {
                10u8.hash(state);
                let mut acc: u64 = 0;
                for (k, v) in m.iter() {
                    acc = acc.wrapping_add(fnv64(k) ^ fnv64(v).rotate_left(1));
                }
                acc.hash(state);
            }
            Self::Lazy(l) => {
                11u8.hash(state);
                (Rc::as_ptr(&l.0) as usize).hash(state);
            }
            Self::Fn(Callable::Closure(c)) => {
                12u8.hash(state);
                (Rc::as_ptr(c) as usize).hash(state);
            }
            Self::Fn(Callable::Builtin(b)) => {
                12u8.hash(state);
                (*b as *const Builtin as usize).hash(state);
            }
            Self::Fn(Callable::CtxBuiltin(b)) => {
                12u8.hash(state);
                (*b as *const CtxBuiltin as usize).hash(state);
            }
            Self::Fn(Callable::NativeMacro(m)) => {
                12u8.hash(state);
                (*m as *const NativeMacro as usize).hash(state);
            }
            Self::Var(v) => {
                13u8.hash(state);
                (Rc::as_ptr(v) as usize).hash(state);
            }
            Self::Host(h) => {
                14u8.hash(state);
                (Rc::as_ptr(h) as *const () as usize).hash(state);
            }
            Self::Recur(r) => {
                15u8.hash(state);
                r.hash(state);
            }
        }
    }
}

/// Order-independent per-element hash used to combine set/map contents.
fn fnv64(v: &Value) -> u64 {
    struct Fnv(u64);
    impl Hasher for Fnv {
        fn finish(&self) -> u64 {
            self.0
        }
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 ^ u64::from(b)).wrapping_mul(0x100_0000_01b3);
            }
        }
    }
    let mut h = Fnv(0xcbf2_9ce4_8422_2325);
    v.hash(&mut h);
    h.finish()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "\\{c}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Keyword(k) => write!(f, "{k}"),
            Self::List(l) => {
                f.write_str("(")?;
                for (i, item) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Vector(v) => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Set(s) => {
                f.write_str("#{")?;
                for (i, item) in s.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Self::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                f.write_str("}")
            }
            Self::Lazy(_) => f.write_str("#<lazy-seq>"),
            Self::Fn(c) => write!(f, "#<fn {}>", c.name().as_deref().unwrap_or("anonymous")),
            Self::Var(v) => write!(f, "#'{}/{}", v.ns_name, v.sym),
            Self::Host(h) => write!(f, "#<{}>", h.type_name()),
            Self::Recur(_) => f.write_str("#<recur>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}
