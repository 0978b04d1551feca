//! Lexical environment and the evaluation context (§3 "Environment (context)
//! entity").
//!
//! `Bindings` is the per-frame lexical chain (cheap to extend, cheap to
//! clone — a closure captures one by bumping an `Rc`). `Context` bundles a
//! `Bindings` with a handle to everything that is shared across the whole
//! evaluation (the namespace store, the allow-list, resource limits, the
//! `require` loader) so that extending the lexical frame for a `let` or a
//! function call never touches the shared half.

use std::{cell::Cell, cell::RefCell, rc::Rc};

use crate::{
    capability::ClassPolicy,
    interop::{HostRegistry, StringClass},
    namespace::{Namespaces, NamespacesHandle},
    resource::DEFAULT_MAX_RECURSION_DEPTH,
    tracer::{NoopTracer, VmTracer},
    value::Value,
};

fn default_host_registry() -> HostRegistry {
    HostRegistry::builder().register(StringClass).build()
}

/// A single name bound in a lexical frame, chained to its parent frame.
struct BindingFrame {
    name: Rc<str>,
    value: Value,
    parent: Bindings,
}

/// An immutable lexical frame, extended one name at a time.
///
/// Lookup walks the chain from innermost to outermost, matching §3 invariant
/// 2 ("after evaluating any expression, `bindings` is unchanged in the
/// caller's context"): extending never mutates an existing frame.
#[derive(Clone, Default)]
pub enum Bindings {
    #[default]
    Empty,
    Frame(Rc<BindingFrame>),
}

impl Bindings {
    #[must_use]
    pub fn extend(&self, name: impl Into<Rc<str>>, value: Value) -> Self {
        Self::Frame(Rc::new(BindingFrame { name: name.into(), value, parent: self.clone() }))
    }

    /// Extends by a whole parameter list at once, innermost binding last
    /// wins on duplicate names (left-to-right shadowing, as in `let`).
    #[must_use]
    pub fn extend_all<I>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (Rc<str>, Value)>,
    {
        let mut out = self.clone();
        for (name, value) in pairs {
            out = out.extend(name, value);
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut cur = self;
        loop {
            match cur {
                Self::Empty => return None,
                Self::Frame(f) => {
                    if &*f.name == name {
                        return Some(f.value.clone());
                    }
                    cur = &f.parent;
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Resolves a required library name to its source text (§4.J).
pub struct LoadResult {
    pub file: Option<Rc<str>>,
    pub source: Rc<str>,
}

pub type LoadFn = Rc<dyn Fn(&str) -> Option<LoadResult>>;

/// Everything shared across an entire evaluation, independent of the
/// current lexical frame. Cloning a `Context` to extend `bindings` for a
/// nested call is an `Rc` bump of this struct, not a deep copy.
pub struct EvalState {
    pub namespaces: NamespacesHandle,
    pub class_policy: ClassPolicy,
    pub host_classes: HostRegistry,
    pub load_fn: Option<LoadFn>,
    /// Tier 2 of the `.` class-resolution priority (§4.I): consulted when
    /// the target expression carries no `:tag`, before falling back to the
    /// target value's own runtime class.
    pub public_class: Option<Rc<dyn Fn(&Value) -> Option<Rc<str>>>>,
    pub realize_max: Option<usize>,
    pub dry_run: bool,
    pub max_recursion_depth: usize,
    pub depth: Cell<usize>,
    pub current_ns: RefCell<Rc<str>>,
    pub current_file: RefCell<Option<Rc<str>>>,
    /// Set while evaluating inside a `try` body, for diagnostics (§3).
    pub in_try: Cell<bool>,
    pub tracer: Rc<dyn VmTracer>,
}

/// Per-evaluation bundle of lexical bindings plus the shared global state
/// (§3 "Environment (context) entity").
#[derive(Clone)]
pub struct Context {
    pub bindings: Bindings,
    pub state: Rc<EvalState>,
}

impl Context {
    #[must_use]
    pub fn with_bindings(&self, bindings: Bindings) -> Self {
        Self { bindings, state: Rc::clone(&self.state) }
    }

    pub fn current_ns_name(&self) -> Rc<str> {
        Rc::clone(&self.state.current_ns.borrow())
    }

    pub fn set_current_ns(&self, name: Rc<str>) {
        *self.state.current_ns.borrow_mut() = name;
    }

    pub fn namespaces(&self) -> NamespacesHandle {
        Rc::clone(&self.state.namespaces)
    }
}

/// Builder for the options the top-level driver accepts (§6 "Options").
///
/// Mirrors the teacher's parameter-object-then-`build()` style
/// (`ResourceLimits::new().max_operations(..)`).
#[derive(Default)]
pub struct EvalOptions {
    namespaces: Option<NamespacesHandle>,
    bindings: Bindings,
    classes: ClassPolicy,
    host_classes: HostRegistry,
    load_fn: Option<LoadFn>,
    public_class: Option<Rc<dyn Fn(&Value) -> Option<Rc<str>>>>,
    realize_max: Option<usize>,
    dry_run: bool,
    max_recursion_depth: Option<usize>,
    tracer: Option<Rc<dyn VmTracer>>,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self { host_classes: default_host_registry(), ..Self::default() }
    }

    #[must_use]
    pub fn namespaces(mut self, namespaces: NamespacesHandle) -> Self {
        self.namespaces = Some(namespaces);
        self
    }

    #[must_use]
    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub fn classes(mut self, classes: ClassPolicy) -> Self {
        self.classes = classes;
        self
    }

    #[must_use]
    pub fn host_classes(mut self, registry: HostRegistry) -> Self {
        self.host_classes = registry;
        self
    }

    #[must_use]
    pub fn load_fn(mut self, load_fn: LoadFn) -> Self {
        self.load_fn = Some(load_fn);
        self
    }

    #[must_use]
    pub fn public_class(mut self, classify: impl Fn(&Value) -> Option<Rc<str>> + 'static) -> Self {
        self.public_class = Some(Rc::new(classify));
        self
    }

    #[must_use]
    pub fn realize_max(mut self, limit: usize) -> Self {
        self.realize_max = Some(limit);
        self
    }

    #[must_use]
    pub fn dry_run(mut self, flag: bool) -> Self {
        self.dry_run = flag;
        self
    }

    #[must_use]
    pub fn max_recursion_depth(mut self, limit: usize) -> Self {
        self.max_recursion_depth = Some(limit);
        self
    }

    #[must_use]
    pub fn tracer(mut self, tracer: impl VmTracer + 'static) -> Self {
        self.tracer = Some(Rc::new(tracer));
        self
    }

    pub fn build(self) -> Context {
        let namespaces = self.namespaces.unwrap_or_else(Namespaces::new);
        namespaces.borrow_mut().get_or_create("user");
        let state = EvalState {
            namespaces,
            class_policy: self.classes,
            host_classes: self.host_classes,
            load_fn: self.load_fn,
            public_class: self.public_class,
            realize_max: self.realize_max,
            dry_run: self.dry_run,
            max_recursion_depth: self.max_recursion_depth.unwrap_or(DEFAULT_MAX_RECURSION_DEPTH),
            depth: Cell::new(0),
            current_ns: RefCell::new(Rc::from("user")),
            current_file: RefCell::new(None),
            in_try: Cell::new(false),
            tracer: self.tracer.unwrap_or_else(|| Rc::new(NoopTracer)),
        };
        Context { bindings: self.bindings, state: Rc::new(state) }
    }
}
