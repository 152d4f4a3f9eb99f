use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::base::FileId;
use crate::semantic::symbol_table::{DeclId, FileTable, StructuralKind, Visibility};
use crate::semantic::types::SemanticError;

use super::binding::{Binding, BindingId, MergeKey, merge_key_for};

/// Structural kinds that occupy a name exclusively within a scope.
/// Functions are exempt (overloading, and coexistence with class names);
/// so are template parameters.
const EXCLUSIVE_KINDS: &[StructuralKind] = &[
    StructuralKind::Namespace,
    StructuralKind::NamespaceAlias,
    StructuralKind::Class,
    StructuralKind::ClassTemplate,
    StructuralKind::Variable,
    StructuralKind::Field,
];

/// The cross-file symbol index.
///
/// Holds one immutable [`FileTable`] per indexed file and the bindings
/// merged from them. A file is always replaced atomically: its previous
/// contributions are fully retracted before the new table is merged, and
/// every binding touched either way lands in the dirty set.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    tables: FxHashMap<FileId, Arc<FileTable>>,
    paths: FxHashMap<Arc<str>, FileId>,
    bindings: Vec<Option<Binding>>,
    by_key: FxHashMap<MergeKey, BindingId>,
    by_decl: FxHashMap<(FileId, DeclId), BindingId>,
    free: Vec<BindingId>,
    dirty: FxHashSet<BindingId>,
    /// Files with at least one declaration rejected by a merge conflict.
    /// Retracting a file can free a name, so these are re-merged then.
    conflicted: FxHashSet<FileId>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------

    pub fn binding(&self, id: BindingId) -> &Binding {
        self.bindings[id.index()]
            .as_ref()
            .expect("stale binding id")
    }

    /// Like [`Self::binding`], but `None` for retracted ids.
    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index()).and_then(Option::as_ref)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter_map(Option::as_ref)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_some()).count()
    }

    pub fn binding_for_decl(&self, file: FileId, decl: DeclId) -> Option<BindingId> {
        self.by_decl.get(&(file, decl)).copied()
    }

    pub fn lookup_key(&self, key: &MergeKey) -> Option<BindingId> {
        self.by_key.get(key).copied()
    }

    pub fn table(&self, file: FileId) -> Option<&Arc<FileTable>> {
        self.tables.get(&file)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<FileTable>> {
        self.tables.values()
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.paths.get(path).copied()
    }

    /// Drain the set of bindings touched since the last drain.
    pub fn take_dirty(&mut self) -> FxHashSet<BindingId> {
        std::mem::take(&mut self.dirty)
    }

    // ------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------

    /// Merge a file table, atomically replacing any previous table for the
    /// same file. Returns the merge conflicts encountered; conflicting
    /// declarations are rejected, everything else in the file still merges.
    pub fn merge_file(&mut self, table: Arc<FileTable>) -> Vec<SemanticError> {
        let file = table.file;
        if self.tables.contains_key(&file) {
            self.retract_file(file);
        }
        debug!(file = %table.path, decls = table.decls().len(), "merging file");

        let mut errors = Vec::new();
        for decl_id in table.decl_ids() {
            let decl = table.decl(decl_id);
            let Some(key) = merge_key_for(&table, decl) else {
                continue;
            };

            if let Some(conflict) = self.exclusive_conflict(&key) {
                errors.push(SemanticError::MergeConflict {
                    qualified_name: decl.qualified_name.to_string(),
                    existing_kind: conflict.as_str(),
                    incoming_kind: key.kind.as_str(),
                    span: decl.span,
                });
                continue;
            }

            let id = match self.by_key.get(&key) {
                Some(&id) => id,
                None => self.alloc_binding(key.clone(), decl.qualified_name.clone()),
            };
            let binding = self.bindings[id.index()]
                .as_mut()
                .expect("stale binding id");
            binding.insert_decl(file, decl_id);
            self.by_decl.insert((file, decl_id), id);
            self.dirty.insert(id);
        }

        if errors.is_empty() {
            self.conflicted.remove(&file);
        } else {
            self.conflicted.insert(file);
        }
        self.paths.insert(table.path.clone(), file);
        self.tables.insert(file, table);
        self.recompute_definitions();
        errors
    }

    /// Re-merge every file that had declarations rejected by a merge
    /// conflict, in path order. Called after retractions: a rejection is
    /// only valid while the occupying declaration is in the index, so the
    /// final state matches building the surviving file set from scratch.
    pub fn reevaluate_conflicts(&mut self) -> Vec<(FileId, Vec<SemanticError>)> {
        let mut files: Vec<FileId> = self.conflicted.iter().copied().collect();
        files.sort_by_key(|f| self.tables.get(f).map(|t| t.path.clone()));

        let mut results = Vec::new();
        for file in files {
            let Some(table) = self.tables.get(&file).cloned() else {
                continue;
            };
            let errors = self.merge_file(table);
            results.push((file, errors));
        }
        results
    }

    /// Remove a file from the index entirely.
    pub fn remove_file(&mut self, file: FileId) {
        if let Some(table) = self.tables.get(&file) {
            let path = table.path.clone();
            self.paths.remove(&path);
        }
        self.retract_file(file);
        self.recompute_definitions();
    }

    /// Retract a file's declarations from every binding they reached.
    fn retract_file(&mut self, file: FileId) {
        let Some(table) = self.tables.remove(&file) else {
            return;
        };
        debug!(file = %table.path, "retracting file");
        self.conflicted.remove(&file);
        for decl_id in table.decl_ids() {
            let Some(id) = self.by_decl.remove(&(file, decl_id)) else {
                continue;
            };
            let binding = self.bindings[id.index()]
                .as_mut()
                .expect("stale binding id");
            binding.remove_file(file);
            self.dirty.insert(id);
            if binding.decls.is_empty() {
                let key = binding.key.clone();
                self.by_key.remove(&key);
                self.bindings[id.index()] = None;
                self.free.push(id);
            }
        }
    }

    /// Fold class bindings declared only through `friend` into the ordinary
    /// class binding visible from an enclosing scope. A pure function of
    /// index state, so the result is independent of merge order.
    pub fn attach_friends(&mut self) {
        let mut moves: Vec<(BindingId, BindingId)> = Vec::new();
        for binding in self.bindings() {
            if binding.kind() != StructuralKind::Class || !self.is_friend_only(binding) {
                continue;
            }
            if let Some(target) = self.ordinary_class_in_outer_scope(binding) {
                moves.push((binding.id, target));
            }
        }
        moves.sort();

        for (source, target) in moves {
            let decls = {
                let binding = self.bindings[source.index()]
                    .as_mut()
                    .expect("stale binding id");
                std::mem::take(&mut binding.decls)
            };
            let key = self.binding(source).key.clone();
            self.by_key.remove(&key);
            self.bindings[source.index()] = None;
            self.free.push(source);

            let target_binding = self.bindings[target.index()]
                .as_mut()
                .expect("stale binding id");
            for (file, decl) in decls {
                target_binding.insert_decl(file, decl);
                self.by_decl.insert((file, decl), target);
            }
            self.dirty.insert(source);
            self.dirty.insert(target);
            debug!(binding = ?key.name, "folded friend-only class into outer binding");
        }
        self.recompute_definitions();
    }

    fn is_friend_only(&self, binding: &Binding) -> bool {
        !binding.decls.is_empty()
            && binding.decls.iter().all(|&(file, decl)| {
                self.tables[&file].decl(decl).visibility == Visibility::Friend
            })
    }

    fn ordinary_class_in_outer_scope(&self, binding: &Binding) -> Option<BindingId> {
        let mut path: &str = &binding.key.scope_path;
        loop {
            path = match path.rfind("::") {
                Some(pos) => &path[..pos],
                None if !path.is_empty() => "",
                None => return None,
            };
            let key = MergeKey {
                scope_path: path.into(),
                name: binding.key.name.clone(),
                kind: StructuralKind::Class,
                disambiguator: None,
            };
            if let Some(&id) = self.by_key.get(&key) {
                let candidate = self.binding(id);
                let has_ordinary = candidate.decls.iter().any(|&(file, decl)| {
                    self.tables[&file].decl(decl).visibility == Visibility::Ordinary
                });
                if has_ordinary {
                    return Some(id);
                }
            }
        }
    }

    fn alloc_binding(&mut self, key: MergeKey, qualified_name: Arc<str>) -> BindingId {
        match self.free.pop() {
            Some(id) => {
                self.bindings[id.index()] = Some(Binding::new(id, key.clone(), qualified_name));
                self.by_key.insert(key, id);
                id
            }
            None => {
                let id = BindingId::new(self.bindings.len());
                self.bindings
                    .push(Some(Binding::new(id, key.clone(), qualified_name)));
                self.by_key.insert(key, id);
                id
            }
        }
    }

    /// A binding's conflicting neighbor: another exclusive kind already
    /// occupying the same name in the same scope.
    fn exclusive_conflict(&self, key: &MergeKey) -> Option<StructuralKind> {
        if !EXCLUSIVE_KINDS.contains(&key.kind) || key.disambiguator.is_some() {
            return None;
        }
        for &kind in EXCLUSIVE_KINDS {
            if kind == key.kind {
                continue;
            }
            let probe = MergeKey {
                scope_path: key.scope_path.clone(),
                name: key.name.clone(),
                kind,
                disambiguator: None,
            };
            if self.by_key.contains_key(&probe) {
                return Some(kind);
            }
        }
        None
    }

    /// Recompute every dirty binding's defining declaration. Definitions
    /// are chosen as the first definition in (file, decl) order, so the
    /// choice does not depend on merge order.
    fn recompute_definitions(&mut self) {
        let dirty: Vec<BindingId> = self.dirty.iter().copied().collect();
        for id in dirty {
            let Some(binding) = self.bindings[id.index()].as_ref() else {
                continue;
            };
            let definition = binding
                .decls
                .iter()
                .copied()
                .find(|&(file, decl)| self.tables[&file].decl(decl).is_definition());
            self.bindings[id.index()]
                .as_mut()
                .expect("stale binding id")
                .definition = definition;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn table(file: u32, path: &str, text: &str) -> Arc<FileTable> {
        let ast = parse(text).unwrap();
        Arc::new(FileTable::build(FileId::new(file), path.into(), &ast))
    }

    fn binding_named<'a>(index: &'a SymbolIndex, qualified: &str) -> &'a Binding {
        index
            .bindings()
            .find(|b| b.qualified_name.as_ref() == qualified)
            .unwrap_or_else(|| panic!("binding '{qualified}' not found"))
    }

    #[test]
    fn test_declarations_merge_across_files() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(0, "a.h", "namespace ns {\nclass A;\n}"));
        index.merge_file(table(1, "a.cpp", "namespace ns {\nclass A {};\n}"));

        let a = binding_named(&index, "ns::A");
        assert_eq!(a.decls.len(), 2);
        assert!(a.is_defined());
        assert_eq!(a.definition, Some((FileId::new(1), a.decls[1].1)));
    }

    #[test]
    fn test_anonymous_namespace_never_merges() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(0, "one.cpp", "namespace {\nstruct B {};\n}"));
        index.merge_file(table(1, "two.cpp", "namespace {\nstruct B {};\n}"));

        let bs: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "B")
            .collect();
        assert_eq!(bs.len(), 2);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = "namespace ns {\nclass A;\nclass B {};\n}";
        let b = "namespace ns {\nclass A {};\n}";

        let mut forward = SymbolIndex::new();
        forward.merge_file(table(0, "a.h", a));
        forward.merge_file(table(1, "b.h", b));

        let mut backward = SymbolIndex::new();
        backward.merge_file(table(1, "b.h", b));
        backward.merge_file(table(0, "a.h", a));

        for binding in forward.bindings() {
            let other = backward
                .bindings()
                .find(|b| b.key == binding.key)
                .expect("binding missing after reordering");
            assert_eq!(binding.decls, other.decls);
            assert_eq!(binding.definition, other.definition);
        }
        assert_eq!(forward.binding_count(), backward.binding_count());
    }

    #[test]
    fn test_file_replacement_is_atomic() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(0, "a.h", "class A {};\nclass B {};"));
        index.take_dirty();

        index.merge_file(table(0, "a.h", "class A {};"));
        assert!(
            index
                .bindings()
                .all(|b| b.qualified_name.as_ref() != "B")
        );
        let dirty = index.take_dirty();
        assert!(!dirty.is_empty());
    }

    #[test]
    fn test_kind_conflict_rejects_later_declaration() {
        let mut index = SymbolIndex::new();
        let first = index.merge_file(table(0, "a.h", "class A {};"));
        assert!(first.is_empty());

        let errors = index.merge_file(table(1, "b.h", "namespace A {\n}"));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SemanticError::MergeConflict { .. }));
        // The class binding is untouched.
        assert_eq!(binding_named(&index, "A").kind(), StructuralKind::Class);
    }

    #[test]
    fn test_removing_the_winner_readmits_rejected_declarations() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(0, "a.h", "class A {};"));
        let errors = index.merge_file(table(1, "b.h", "namespace A {\n}"));
        assert_eq!(errors.len(), 1);

        index.remove_file(FileId::new(0));
        let results = index.reevaluate_conflicts();
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_empty());
        assert_eq!(
            binding_named(&index, "A").kind(),
            StructuralKind::Namespace
        );
    }

    #[test]
    fn test_function_overloads_stay_separate() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(0, "a.h", "void f(int x);\nvoid f(A* a);"));

        let fs: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "f")
            .collect();
        assert_eq!(fs.len(), 2);
    }

    #[test]
    fn test_friend_class_merges_with_ordinary_class() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(
            0,
            "a.h",
            "class B;\nstruct C {\n  friend class B;\n};",
        ));
        index.merge_file(table(1, "b.h", "class B {};"));
        index.attach_friends();

        let bs: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "B")
            .collect();
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].decls.len(), 3);
        assert!(bs[0].is_defined());
    }

    #[test]
    fn test_friend_in_namespace_folds_into_outer_class() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(
            0,
            "a.h",
            "class B {};\nnamespace ns {\nstruct C {\n  friend class B;\n};\n}",
        ));
        index.attach_friends();

        let bs: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "B")
            .collect();
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].qualified_name.as_ref(), "B");
    }

    #[test]
    fn test_specializations_get_their_own_bindings() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(
            0,
            "a.h",
            "template <typename T>\nstruct atomic {};\ntemplate <typename T>\nstruct atomic<T*> {};",
        ));

        let atomics: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "atomic")
            .collect();
        assert_eq!(atomics.len(), 2);
        let patterns: Vec<_> = atomics
            .iter()
            .map(|b| b.key.disambiguator.clone())
            .collect();
        assert!(patterns.contains(&None));
        assert!(patterns.contains(&Some("<$0*>".into())));
    }

    #[test]
    fn test_specialization_decl_and_definition_merge_across_files() {
        let mut index = SymbolIndex::new();
        index.merge_file(table(
            0,
            "fwd.h",
            "template <typename T>\nstruct atomic;\ntemplate <typename U>\nstruct atomic<U*>;",
        ));
        index.merge_file(table(
            1,
            "def.h",
            "template <typename T>\nstruct atomic {};\ntemplate <typename T>\nstruct atomic<T*> {\n  void fetch_sub();\n};",
        ));

        let atomics: Vec<_> = index
            .bindings()
            .filter(|b| b.name().as_ref() == "atomic")
            .collect();
        assert_eq!(atomics.len(), 2);
        for binding in atomics {
            assert_eq!(binding.decls.len(), 2);
            assert!(binding.is_defined());
        }
    }
}
