//! Host-class allow-list policy (§3 "class→opts", §4.I "Allow-list policy").
//!
//! Adapted from a capability-set shape: instead of gating named host
//! *functions*, this gate checks whether a named host *class* is reachable
//! at all from interop (`interop.rs`). An empty policy denies every class;
//! `ClassPolicy::AllowAll` is the "allow everything" sentinel from §3.

use std::{collections::HashMap, fmt};

/// Per-class options. Currently just a marker: presence in the allow-list is
/// the whole policy (§4.I doesn't specify finer per-method grants for the
/// core), but it is a distinct type so a richer policy can grow into it
/// without changing the `ClassPolicy` shape.
#[derive(Debug, Clone, Default)]
pub struct ClassOpts;

#[derive(Debug, Clone)]
pub enum ClassPolicy {
    /// Deny-by-default allow-list of specific classes.
    Listed(HashMap<String, ClassOpts>),
    /// The "allow everything" sentinel — appropriate only for trusted code.
    AllowAll,
}

impl Default for ClassPolicy {
    fn default() -> Self {
        Self::Listed(HashMap::new())
    }
}

impl ClassPolicy {
    pub fn none() -> Self {
        Self::Listed(HashMap::new())
    }

    pub fn allow_all() -> Self {
        Self::AllowAll
    }

    pub fn allow(&mut self, class_name: impl Into<String>) {
        if let Self::Listed(map) = self {
            map.insert(class_name.into(), ClassOpts);
        }
    }

    pub fn allows_class(&self, class_name: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::Listed(map) => map.contains_key(class_name),
        }
    }

    /// Checks a method/field/constructor access on `class_name`, returning
    /// the exact denial the spec's concrete scenario 8 expects.
    pub fn check(&self, class_name: &str, member: &str) -> Result<(), PermissionDenied> {
        if self.allows_class(class_name) {
            Ok(())
        } else {
            Err(PermissionDenied { member: member.into(), class: class_name.into() })
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionDenied {
    pub member: String,
    pub class: String,
}

impl fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method {} on {} not allowed!", self.member, self.class)
    }
}

impl std::error::Error for PermissionDenied {}
