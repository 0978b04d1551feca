//! Analyzed AST nodes (§3 "Analyzed node", §4.Analyzer).
//!
//! A [`Node`] is what the analyzer hands the interpreter: most forms compile
//! down to an untagged [`Node::Literal`] or a generic [`Node::Call`] (whose
//! head is resolved — or left as a bare special-form symbol — at call time,
//! §4.G step 2), and only the forms that need resolution work done up front
//! (`fn`, `try`, static/var/deref access, local-symbol lookup) get their own
//! variant carrying precomputed data.

use std::rc::Rc;

use crate::{
    meta::Meta,
    value::{CtxBuiltin, Symbol, Value},
    var::VarRef,
};

/// One arity of a `fn` form: parameter names, an optional variadic rest
/// parameter (`[a & rest]`), and the body (evaluated as an implicit `do`).
#[derive(Clone)]
pub struct FnArity {
    pub params: Rc<[Rc<str>]>,
    pub variadic: Option<Rc<str>>,
    pub body: Rc<[Node]>,
}

impl FnArity {
    /// Fixed arity this clause accepts exactly, ignoring the variadic tail.
    pub fn fixed_arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Does this clause accept `n` positional arguments?
    pub fn accepts(&self, n: usize) -> bool {
        if self.variadic.is_some() { n >= self.params.len() } else { n == self.params.len() }
    }
}

/// One `catch` clause of a `try` form (§4.F `try`).
#[derive(Clone)]
pub struct CatchClause {
    pub class: Rc<str>,
    pub binding: Rc<str>,
    pub body: Rc<[Node]>,
}

/// An analyzed expression (§3 "Analyzed node").
#[derive(Clone)]
pub enum Node {
    /// Self-evaluating or already-a-value form: no `op` tag (§4.E step 2).
    Literal(Value),
    /// Map literal: each key and value is itself an analyzed node, evaluated
    /// in order of appearance (§4.E step 2 "map literal").
    MapLit(Rc<[(Node, Node)]>, Meta),
    VectorLit(Rc<[Node]>, Meta),
    SetLit(Rc<[Node]>, Meta),
    /// `op: call` — operator plus argument nodes, unevaluated (§4.G).
    Call { op: Rc<Node>, args: Rc<[Node]>, meta: Meta },
    /// `op: try` (§4.F `try`).
    Try { body: Rc<[Node]>, catches: Rc<[CatchClause]>, finally: Option<Rc<[Node]>>, meta: Meta },
    /// `op: fn` — one or more arities sharing a captured lexical frame at
    /// interpret time (§4.E step 3 `fn`).
    Fn { name: Option<Symbol>, arities: Rc<[FnArity]>, is_macro: bool, meta: Meta },
    /// `op: static-access` — a field read on an allow-listed host class.
    StaticAccess { class: Rc<str>, field: Rc<str>, meta: Meta },
    /// `op: var-value` — a var reference resolved at analysis time.
    VarValue { var: VarRef, meta: Meta },
    /// `op: deref!` — force a var or a lazy sequence.
    Deref { target: Rc<Node>, meta: Meta },
    /// `op: resolve-sym` — a lexical-frame lookup resolved to a bare name at
    /// analysis time (shadows any var of the same name).
    ResolveSym { sym: Symbol, meta: Meta },
    /// `op: needs-ctx` — yields a function that receives the live context as
    /// an implicit first argument when called (§4.E step 3 `needs-ctx`).
    NeedsCtx { builtin: &'static CtxBuiltin, meta: Meta },
}

impl Node {
    pub fn meta(&self) -> Meta {
        match self {
            Self::Literal(_) => Meta::none(),
            Self::MapLit(_, m)
            | Self::VectorLit(_, m)
            | Self::SetLit(_, m)
            | Self::Call { meta: m, .. }
            | Self::Try { meta: m, .. }
            | Self::Fn { meta: m, .. }
            | Self::StaticAccess { meta: m, .. }
            | Self::VarValue { meta: m, .. }
            | Self::Deref { meta: m, .. }
            | Self::ResolveSym { meta: m, .. }
            | Self::NeedsCtx { meta: m, .. } => m.clone(),
        }
    }
}
