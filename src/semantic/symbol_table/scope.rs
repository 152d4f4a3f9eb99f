use std::sync::Arc;

use indexmap::IndexMap;

use super::declaration::DeclId;

/// Unique identifier for a scope within one file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace { anonymous: bool },
    Class,
    Block,
}

/// A lexical scope in a file table.
///
/// `path` is the canonical scope path used to line scopes up across files
/// in a translation unit (`""` for global, `"ns1::ns2"` for namespaces).
/// Anonymous namespaces and block scopes embed the file id in their path so
/// they can never line up with another file's scopes.
#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    pub path: Arc<str>,
    /// Maps simple name to declaration ids (multiple allowed: overloads,
    /// reopened namespaces, specializations). IndexMap keeps extraction
    /// order deterministic.
    pub names: IndexMap<Arc<str>, Vec<DeclId>>,
    pub children: Vec<ScopeId>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>, kind: ScopeKind, path: Arc<str>) -> Self {
        Self {
            parent,
            kind,
            path,
            names: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn is_anonymous_namespace(&self) -> bool {
        matches!(self.kind, ScopeKind::Namespace { anonymous: true })
    }

    /// Declarations of `name` in this scope, in extraction order.
    pub fn decls_named(&self, name: &str) -> &[DeclId] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Join a parent scope path with a child component.
pub(super) fn join_path(parent: &str, component: &str) -> Arc<str> {
    if parent.is_empty() {
        component.into()
    } else {
        format!("{parent}::{component}").into()
    }
}
