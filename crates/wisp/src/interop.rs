//! Host interop gateway (§4.I).
//!
//! The embedding contract: a host class is a named Rust type implementing
//! [`HostClass`], registered by name into a [`HostRegistry`]. The allow-list
//! *policy* (which class names are even reachable) lives in `capability.rs`
//! and is checked here before any dispatch; `HostRegistry` only answers "what
//! does this class do", never "is this class allowed".

use std::{collections::HashMap, fmt, rc::Rc};

use crate::{
    capability::ClassPolicy,
    exception::{CodeLoc, Exception, RunError, RunResult},
    value::Value,
};

/// A Rust-side type reachable from `new`/`.`/static-access AST nodes.
pub trait HostClass: fmt::Debug {
    fn class_name(&self) -> &'static str;

    fn static_field(&self, field: &str) -> Option<Value> {
        let _ = field;
        None
    }

    fn static_method(&self, _method: &str, _args: &[Value]) -> Option<RunResult<Value>> {
        None
    }

    fn construct(&self, args: &[Value]) -> RunResult<Value> {
        let _ = args;
        Err(RunError::internal(format!("{} is not constructible", self.class_name())))
    }

    fn instance_method(&self, _target: &Value, _method: &str, _args: &[Value]) -> Option<RunResult<Value>> {
        None
    }
}

#[derive(Default, Clone)]
pub struct HostRegistry {
    classes: Rc<HashMap<&'static str, Rc<dyn HostClass>>>,
}

impl HostRegistry {
    pub fn builder() -> HostRegistryBuilder {
        HostRegistryBuilder { classes: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn HostClass>> {
        self.classes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }
}

pub struct HostRegistryBuilder {
    classes: HashMap<&'static str, Rc<dyn HostClass>>,
}

impl HostRegistryBuilder {
    #[must_use]
    pub fn register(mut self, class: impl HostClass + 'static) -> Self {
        let class: Rc<dyn HostClass> = Rc::new(class);
        self.classes.insert(class.class_name(), class);
        self
    }

    pub fn build(self) -> HostRegistry {
        HostRegistry { classes: Rc::new(self.classes) }
    }
}

fn denied(policy: &ClassPolicy, class_name: &str, member: &str, loc: CodeLoc) -> RunError {
    let err = policy.check(class_name, member).unwrap_err();
    Exception::new("PolicyError", err.to_string()).with_loc(loc).into()
}

/// Static field read (§4.I "static field read"). Never suppressed by
/// `dry_run` ("still permits static-field reads").
pub fn static_field(
    registry: &HostRegistry,
    policy: &ClassPolicy,
    class_name: &str,
    field: &str,
    loc: CodeLoc,
) -> RunResult<Value> {
    policy.check(class_name, field).map_err(|_| denied(policy, class_name, field, loc))?;
    let class = registry
        .get(class_name)
        .ok_or_else(|| RunError::from(Exception::new("ResolutionError", format!("Unknown class: {class_name}")).with_loc(loc)))?;
    class
        .static_field(field)
        .ok_or_else(|| RunError::from(Exception::new("ResolutionError", format!("No static field {field} on {class_name}")).with_loc(loc)))
}

/// Static method call.
pub fn static_method_call(
    registry: &HostRegistry,
    policy: &ClassPolicy,
    class_name: &str,
    method: &str,
    args: &[Value],
    dry_run: bool,
    loc: CodeLoc,
) -> RunResult<Value> {
    policy.check(class_name, method).map_err(|_| denied(policy, class_name, method, loc))?;
    if dry_run {
        return Ok(Value::Nil);
    }
    let class = registry
        .get(class_name)
        .ok_or_else(|| RunError::from(Exception::new("ResolutionError", format!("Unknown class: {class_name}")).with_loc(loc)))?;
    class.static_method(method, args).unwrap_or_else(|| {
        Err(Exception::new("ResolutionError", format!("No static method {method} on {class_name}")).with_loc(loc).into())
    })
}

/// Instance method call. Suppressed entirely under `dry_run`.
pub fn instance_method_call(
    registry: &HostRegistry,
    policy: &ClassPolicy,
    class_name: &str,
    target: &Value,
    method: &str,
    args: &[Value],
    dry_run: bool,
    loc: CodeLoc,
) -> RunResult<Value> {
    policy.check(class_name, method).map_err(|_| denied(policy, class_name, method, loc))?;
    if dry_run {
        return Ok(Value::Nil);
    }
    let class = registry
        .get(class_name)
        .ok_or_else(|| RunError::from(Exception::new("ResolutionError", format!("Unknown class: {class_name}")).with_loc(loc)))?;
    class.instance_method(target, method, args).unwrap_or_else(|| {
        Err(Exception::new("ResolutionError", format!("Method {method} on {class_name} not allowed!")).with_loc(loc).into())
    })
}

/// Constructor call. Suppressed entirely under `dry_run`.
pub fn construct(
    registry: &HostRegistry,
    policy: &ClassPolicy,
    class_name: &str,
    args: &[Value],
    dry_run: bool,
    loc: CodeLoc,
) -> RunResult<Value> {
    policy.check(class_name, "new").map_err(|_| denied(policy, class_name, "new", loc))?;
    if dry_run {
        return Ok(Value::Nil);
    }
    let class = registry
        .get(class_name)
        .ok_or_else(|| RunError::from(Exception::new("ResolutionError", format!("Unknown class: {class_name}")).with_loc(loc)))?;
    class.construct(args)
}

/// Built-in host class giving `(.length s)`/`(.toUpperCase s)`-style access
/// to strings, exercising the gateway end-to-end without any embedder setup
/// (§8 scenario 8 uses exactly this class, denied by an empty allow-list).
#[derive(Debug)]
pub struct StringClass;

impl HostClass for StringClass {
    fn class_name(&self) -> &'static str {
        "String"
    }

    fn instance_method(&self, target: &Value, method: &str, args: &[Value]) -> Option<RunResult<Value>> {
        let Value::Str(s) = target else {
            return Some(Err(RunError::internal("instance method on non-string target")));
        };
        match method {
            "length" if args.is_empty() => Some(Ok(Value::Int(s.chars().count() as i64))),
            "toUpperCase" if args.is_empty() => Some(Ok(Value::Str(Rc::from(s.to_uppercase())))),
            "toLowerCase" if args.is_empty() => Some(Ok(Value::Str(Rc::from(s.to_lowercase())))),
            _ => None,
        }
    }
}
