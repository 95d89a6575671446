//! Name-unique, insertion-ordered declaration registries
//!
//! A [`Scope`] only grows. Adding an entry produces the extended scope and
//! leaves nothing behind to mutate, so a cloned builder prefix never sees
//! entries added through another clone.

use std::fmt;

use serde::Serialize;

use crate::error::BuildError;

/// Which registry a scope is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    WorkflowParameters,
    Templates,
    Inputs,
    Outputs,
    Steps,
    Tasks,
    Arguments,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::WorkflowParameters => "workflow parameter scope",
            ScopeKind::Templates => "template scope",
            ScopeKind::Inputs => "input scope",
            ScopeKind::Outputs => "output scope",
            ScopeKind::Steps => "step scope",
            ScopeKind::Tasks => "task scope",
            ScopeKind::Arguments => "argument scope",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Scope<T> {
    kind: ScopeKind,
    entries: Vec<(String, T)>,
}

impl<T> Scope<T> {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Extend the scope by exactly one key
    pub fn with(mut self, name: impl Into<String>, value: T) -> Result<Self, BuildError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(BuildError::DuplicateName {
                kind: self.kind,
                name,
            });
        }
        tracing::debug!(scope = %self.kind, name = %name, "scope extended");
        self.entries.push((name, value));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Like [`Scope::get`], failing with [`BuildError::UnknownName`]
    pub fn require(&self, name: &str) -> Result<&T, BuildError> {
        self.get(name).ok_or_else(|| BuildError::UnknownName {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}
