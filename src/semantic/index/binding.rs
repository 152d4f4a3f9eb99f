use std::sync::Arc;

use crate::base::FileId;
use crate::semantic::symbol_table::{
    DeclId, DeclKind, Declaration, FileTable, StructuralKind, canonical_pattern,
};

/// Unique identifier for a binding in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The identity under which declarations merge.
///
/// Two declarations collapse into one binding exactly when their keys are
/// equal. Anonymous-namespace scopes embed their file id in `scope_path`,
/// so file-local declarations can never share a key across files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    /// Canonical path of the containing scope.
    pub scope_path: Arc<str>,
    pub name: Arc<str>,
    pub kind: StructuralKind,
    /// Function signature or canonical specialization pattern; `None` for
    /// kinds with a single declaration slot per name.
    pub disambiguator: Option<Arc<str>>,
}

/// Compute the merge key for a declaration, or `None` for declarations
/// that never merge (template parameters, locals in block scopes).
pub fn merge_key_for(table: &FileTable, decl: &Declaration) -> Option<MergeKey> {
    use crate::semantic::symbol_table::ScopeKind;

    let scope = table.scope(decl.scope);
    if matches!(scope.kind, ScopeKind::Block) {
        return None;
    }
    let disambiguator = match &decl.kind {
        DeclKind::TemplateParam { .. } => return None,
        DeclKind::Function { signature, .. } => Some(signature.clone()),
        DeclKind::ClassTemplate {
            params,
            spec_args: Some(args),
            ..
        } => Some(canonical_pattern(params, args)),
        _ => None,
    };
    Some(MergeKey {
        scope_path: scope.path.clone(),
        name: decl.name.clone(),
        kind: decl.structural_kind(),
        disambiguator,
    })
}

/// A single named entity, merged across every file that declares it.
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: BindingId,
    pub key: MergeKey,
    /// Display-qualified name (anonymous namespaces render `(anonymous)`).
    pub qualified_name: Arc<str>,
    /// Every declaration of this entity, kept sorted by (file, decl) so
    /// the binding's contents are independent of merge order.
    pub decls: Vec<(FileId, DeclId)>,
    /// The defining declaration, if any file provides one.
    pub definition: Option<(FileId, DeclId)>,
}

impl Binding {
    pub fn new(id: BindingId, key: MergeKey, qualified_name: Arc<str>) -> Self {
        Self {
            id,
            key,
            qualified_name,
            decls: Vec::new(),
            definition: None,
        }
    }

    pub fn kind(&self) -> StructuralKind {
        self.key.kind
    }

    pub fn name(&self) -> &Arc<str> {
        &self.key.name
    }

    pub fn is_defined(&self) -> bool {
        self.definition.is_some()
    }

    pub(super) fn insert_decl(&mut self, file: FileId, decl: DeclId) {
        let entry = (file, decl);
        if let Err(pos) = self.decls.binary_search(&entry) {
            self.decls.insert(pos, entry);
        }
    }

    pub(super) fn remove_file(&mut self, file: FileId) {
        self.decls.retain(|&(f, _)| f != file);
        if self.definition.is_some_and(|(f, _)| f == file) {
            self.definition = None;
        }
    }
}
