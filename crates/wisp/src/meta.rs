//! Metadata sidecar for forms, analyzed nodes, and a handful of runtime values.
//!
//! Metadata (source line/col, `:tag`, `:doc`, `:ns`, ...) travels beside a node
//! rather than inside the value representation, so that duplicating a keyword
//! or a small integer never has to duplicate a map. It is never part of
//! equality or hashing.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::{Keyword, Value};

/// Copy-on-write keyword-keyed metadata map.
///
/// Cloning a `Meta` is an `Rc` bump; mutating it (`with`) allocates a new map
/// only when the old one has other owners.
#[derive(Clone, Debug, Default)]
pub struct Meta(Option<Rc<IndexMap<Keyword, Value>>>);

impl Meta {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_ref().is_none_or(|m| m.is_empty())
    }

    pub fn get(&self, key: &Keyword) -> Option<&Value> {
        self.0.as_ref().and_then(|m| m.get(key))
    }

    /// Returns a new `Meta` with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: Keyword, value: Value) -> Self {
        let mut map = self.0.as_deref().cloned().unwrap_or_default();
        map.insert(key, value);
        Self(Some(Rc::new(map)))
    }

    /// Returns a new `Meta` that is `other` merged over `self` (other wins on conflict).
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let Some(other_map) = other.0.as_ref() else {
            return self.clone();
        };
        let mut map = self.0.as_deref().cloned().unwrap_or_default();
        for (k, v) in other_map.iter() {
            map.insert(k.clone(), v.clone());
        }
        Self(Some(Rc::new(map)))
    }

    pub fn as_map(&self) -> Option<&IndexMap<Keyword, Value>> {
        self.0.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        match self.get(&Keyword::unqualified("line")) {
            Some(Value::Int(n)) => Some(*n as u32),
            _ => None,
        }
    }

    pub fn col(&self) -> Option<u32> {
        match self.get(&Keyword::unqualified("col")) {
            Some(Value::Int(n)) => Some(*n as u32),
            _ => None,
        }
    }

    pub fn with_pos(line: u32, col: u32) -> Self {
        Self::none()
            .with(Keyword::unqualified("line"), Value::Int(i64::from(line)))
            .with(Keyword::unqualified("col"), Value::Int(i64::from(col)))
    }
}
