#![doc = include_str!("../../../README.md")]

mod value;
mod meta;
mod env;
mod namespace;
mod var;
mod node;
mod interpreter;
mod special_forms;
mod call;
mod macros;
mod interop;
mod capability;
mod require;
mod resource;
mod exception;
mod reader;
mod analyzer;
mod builtins;
mod run;
mod repl;
mod tracer;

pub use crate::{
    analyzer::MacroCaller,
    capability::{ClassOpts, ClassPolicy, PermissionDenied},
    env::{Bindings, Context, EvalOptions, EvalState, LoadFn, LoadResult},
    exception::{CodeLoc, Exception, ExceptionObject, RunError, RunResult},
    interop::{HostClass, HostRegistry, HostRegistryBuilder, StringClass},
    namespace::{Namespace, Namespaces, NamespacesHandle, ReferSpec},
    node::{CatchClause, FnArity, Node},
    reader::{Form, Reader, read_all},
    repl::ReplSession,
    resource::{DEFAULT_MAX_RECURSION_DEPTH, DepthGuard, ResourceError},
    run::eval_string,
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, VmTracer},
    value::{
        Builtin, BuiltinFn, Callable, Closure, CtxBuiltin, CtxBuiltinFn, HostObject, Keyword, LazySeq, NativeMacro,
        PList, Symbol, Value,
    },
    var::{BindingScope, VarData, VarRef, VarRoot},
};
