use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::base::{FileId, Span};
use crate::semantic::index::SymbolIndex;
use crate::semantic::symbol_table::ScopeId;

/// An include that named no file in the file set.
#[derive(Debug, Clone)]
pub struct MissingInclude {
    pub file: FileId,
    pub path: Arc<str>,
    pub span: Span,
}

/// The slice of the index visible to one translation unit: the primary
/// file plus the transitive closure of its includes.
///
/// Scopes are grouped by canonical path, so a namespace reopened in three
/// headers presents as one logical scope. Anonymous-namespace and block
/// scope paths embed their file id and therefore never group.
#[derive(Debug)]
pub struct TuView {
    primary: FileId,
    /// Closure files in breadth-first include order, primary first.
    files: Vec<FileId>,
    scopes: FxHashMap<Arc<str>, Vec<(FileId, ScopeId)>>,
    missing: Vec<MissingInclude>,
}

impl TuView {
    /// Walk the include graph from `primary`. Include cycles are benign:
    /// each file enters the closure once.
    pub fn build(index: &SymbolIndex, primary: FileId) -> Self {
        let mut files = Vec::new();
        let mut seen = FxHashSet::default();
        let mut missing = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(primary);
        seen.insert(primary);

        while let Some(file) = queue.pop_front() {
            let Some(table) = index.table(file) else {
                continue;
            };
            files.push(file);
            for include in table.includes() {
                match index.file_id(&include.path) {
                    Some(next) => {
                        if seen.insert(next) {
                            queue.push_back(next);
                        }
                    }
                    None => missing.push(MissingInclude {
                        file,
                        path: include.path.clone(),
                        span: include.span,
                    }),
                }
            }
        }

        let mut scopes: FxHashMap<Arc<str>, Vec<(FileId, ScopeId)>> = FxHashMap::default();
        for &file in &files {
            if let Some(table) = index.table(file) {
                for (i, scope) in table.scopes().iter().enumerate() {
                    scopes
                        .entry(scope.path.clone())
                        .or_default()
                        .push((file, ScopeId::new(i)));
                }
            }
        }

        Self {
            primary,
            files,
            scopes,
            missing,
        }
    }

    pub fn primary(&self) -> FileId {
        self.primary
    }

    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn missing_includes(&self) -> &[MissingInclude] {
        &self.missing
    }

    /// All scopes in the closure sharing a canonical path, in closure
    /// order.
    pub fn scopes_at(&self, path: &str) -> &[(FileId, ScopeId)] {
        self.scopes.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}
