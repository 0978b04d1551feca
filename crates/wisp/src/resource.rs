//! Resource discipline (§5, §9 "Coroutines / laziness").
//!
//! Two independent guards: `realize_max` bounds the size of any realized
//! collection-like value, and a recursion-depth counter bounds host stack
//! growth for evaluation that isn't in tail position (the trampoline in
//! `call.rs` handles the tail case without consuming any stack at all).

use std::fmt;

use crate::{
    exception::{Exception, RunError, RunResult},
    value::Value,
};

pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 2048;

#[derive(Clone, Debug)]
pub enum ResourceError {
    SizeExceeded { limit: usize, actual: usize },
    RecursionExceeded { limit: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeExceeded { limit, actual } => {
                write!(f, "realized size {actual} exceeds limit {limit}")
            }
            Self::RecursionExceeded { limit } => write!(f, "maximum recursion depth ({limit}) exceeded"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        // Resource errors are uncatchable: evaluated code must not be able to
        // swallow a limit violation with a `(catch Exception ...)`.
        let class = match &err {
            ResourceError::SizeExceeded { .. } => "MemoryError",
            ResourceError::RecursionExceeded { .. } => "RecursionError",
        };
        Self::Uncatchable(Box::new(Exception::new(class, err.to_string())))
    }
}

/// Invariant 5 / §9: any allocation that would cause a realized sequence to
/// exceed `realize_max` aborts evaluation with a size-exceeded error.
pub fn check_realize_max(value: &Value, realize_max: Option<usize>) -> RunResult<()> {
    let Some(limit) = realize_max else {
        return Ok(());
    };
    let actual = value.realized_size();
    if actual > limit {
        return Err(ResourceError::SizeExceeded { limit, actual }.into());
    }
    Ok(())
}

/// RAII depth counter. Every non-tail evaluation step that can recurse
/// (argument evaluation, nested `do`/`let` bodies, `try` bodies) should hold
/// one of these for its duration.
pub struct DepthGuard<'a> {
    depth: &'a std::cell::Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    pub fn enter(depth: &'a std::cell::Cell<usize>, limit: usize) -> RunResult<Self> {
        let cur = depth.get() + 1;
        if cur > limit {
            return Err(ResourceError::RecursionExceeded { limit }.into());
        }
        depth.set(cur);
        Ok(Self { depth })
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
