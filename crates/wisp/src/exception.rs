//! Error model (§7).
//!
//! Mirrors the teacher's `RunError`/`Exception` split: `RunError::Internal`
//! signals an interpreter bug, `RunError::Exc` carries a catchable,
//! user-visible `Exception` with a source location and an optional cause
//! chain. `?` composes across module boundaries via the `From` impls below.

use std::{fmt, rc::Rc};

use crate::value::{HostObject, Value};

pub type RunResult<T> = Result<T, RunError>;

/// A source location for diagnostics (§3 "preserve source metadata").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A catchable, user-visible error.
///
/// `class_name` is what `try`/`catch` class matching (§4.F `try`) compares
/// against; `"Exception"` is the universal base and matches anything (§3
/// "primary exception class - matches any exception").
#[derive(Clone, Debug)]
pub struct Exception {
    pub class_name: Rc<str>,
    pub message: Rc<str>,
    pub data: Value,
    pub loc: Option<CodeLoc>,
    pub cause: Option<Rc<Exception>>,
}

impl Exception {
    pub fn new(class_name: impl Into<Rc<str>>, message: impl Into<Rc<str>>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            data: Value::Nil,
            loc: None,
            cause: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_loc(mut self, loc: CodeLoc) -> Self {
        self.loc = self.loc.or(Some(loc));
        self
    }

    pub fn with_cause(mut self, cause: Exception) -> Self {
        self.cause = Some(Rc::new(cause));
        self
    }

    /// True if a `(catch class_sym ...)` clause naming `class_sym` should
    /// handle this exception. `"Exception"`/`"Throwable"` are universal.
    pub fn is_a(&self, class_sym: &str) -> bool {
        class_sym == "Exception" || class_sym == "Throwable" || class_sym == self.class_name.as_ref()
    }

    /// Enriches this exception with a call-site location, preserving the
    /// original message and cause (§4.G: "the raised error is re-raised with
    /// the call node's source location attached").
    pub fn rewrap_at(self, loc: CodeLoc) -> Self {
        if self.loc.is_some() {
            // Already has a more specific (innermost) location; keep it but
            // chain this frame in the cause so outer context isn't lost.
            return self;
        }
        self.with_loc(loc)
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class_name, self.message)?;
        if let Some(loc) = self.loc {
            write!(f, " at {loc}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "\nCaused by: {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}

/// Top-level evaluator error. `Internal` never reaches user code uncaught —
/// it indicates a bug in the interpreter itself, not in the evaluated
/// program.
#[derive(Clone, Debug)]
pub enum RunError {
    Internal(String),
    Exc(Box<Exception>),
    /// An error from a resource guard (`resource.rs`) that `try`/`catch`
    /// cannot intercept — uncatchable, so untrusted code can't suppress
    /// limit violations (mirrors the teacher's `UncatchableExc`).
    Uncatchable(Box<Exception>),
}

impl RunError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn exc(exc: Exception) -> Self {
        Self::Exc(Box::new(exc))
    }

    pub fn as_exception(&self) -> Option<&Exception> {
        match self {
            Self::Exc(e) | Self::Uncatchable(e) => Some(e),
            Self::Internal(_) => None,
        }
    }

    /// Is this exception catchable by a `(catch class_sym ...)` clause?
    pub fn catchable_as(&self, class_sym: &str) -> Option<&Exception> {
        match self {
            Self::Exc(e) if e.is_a(class_sym) => Some(e),
            _ => None,
        }
    }

    pub fn rewrap_at(self, loc: CodeLoc) -> Self {
        match self {
            Self::Exc(e) => Self::Exc(Box::new(e.rewrap_at(loc))),
            other => other,
        }
    }
}

impl From<Exception> for RunError {
    fn from(e: Exception) -> Self {
        Self::Exc(Box::new(e))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Exc(e) | Self::Uncatchable(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for RunError {}

/// Host wrapper exposing a thrown/caught [`Exception`] to user code through
/// `ex-info`/`ex-message`/`ex-data`/`ex-cause` (§4.F `throw`/`catch`).
#[derive(Debug)]
pub struct ExceptionObject(pub Rc<Exception>);

impl HostObject for ExceptionObject {
    fn type_name(&self) -> &'static str {
        "Exception"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Converts a thrown value into a `RunError` (§4.F `throw`). A value built
/// by `ex-info` unwraps to the `Exception` it carries, preserving class,
/// message, data, and cause; any other value is wrapped so `throw` always
/// produces something `catch` can match against.
pub fn to_run_error(value: Value) -> RunError {
    if let Value::Host(h) = &value
        && let Some(exc_obj) = h.as_any().downcast_ref::<ExceptionObject>()
    {
        return RunError::Exc(Box::new((*exc_obj.0).clone()));
    }
    Exception::new("UserException", value.to_string()).with_data(value).into()
}
