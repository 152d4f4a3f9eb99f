use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::base::{FileId, Position};
use crate::parser::parse;
use crate::semantic::index::{BindingId, SymbolIndex};
use crate::semantic::resolver::{Resolution, ResolvedUse, Resolver, TuView};
use crate::semantic::symbol_table::FileTable;
use crate::semantic::templates::InstantiationEngine;
use crate::semantic::types::{Diagnostic, DiagnosticKind};
use crate::syntax::SourceFile;

/// Workspace tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Parse and resolve files on the rayon pool. Merging is always
    /// serialized (and sorted), so results do not depend on this.
    pub parallel: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// The result of one build round.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Every live diagnostic, sorted by file path then span.
    pub diagnostics: Vec<Diagnostic>,
    /// Files re-parsed this round.
    pub files_parsed: usize,
    /// Translation units re-resolved this round.
    pub files_resolved: usize,
}

impl BuildOutcome {
    pub fn has_errors(&self) -> bool {
        use crate::semantic::types::Severity;
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// A set of source files and the index built from them.
pub struct Workspace {
    config: WorkspaceConfig,
    index: SymbolIndex,
    engine: InstantiationEngine,
    texts: FxHashMap<Arc<str>, Arc<str>>,
    ids: FxHashMap<Arc<str>, FileId>,
    next_id: u32,
    /// Paths changed (or added) since the last build.
    pending: FxHashSet<Arc<str>>,
    removed: FxHashSet<FileId>,
    /// Per-file diagnostics from parsing and merging.
    file_diags: FxHashMap<FileId, Vec<Diagnostic>>,
    /// Per-file diagnostics and resolutions from the last resolve.
    resolve_diags: FxHashMap<FileId, Vec<Diagnostic>>,
    resolutions: FxHashMap<FileId, Vec<ResolvedUse>>,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            index: SymbolIndex::new(),
            engine: InstantiationEngine::new(),
            texts: FxHashMap::default(),
            ids: FxHashMap::default(),
            next_id: 0,
            pending: FxHashSet::default(),
            removed: FxHashSet::default(),
            file_diags: FxHashMap::default(),
            resolve_diags: FxHashMap::default(),
            resolutions: FxHashMap::default(),
        }
    }

    /// Add a file or replace its text. Takes effect at the next build.
    pub fn set_file_text(&mut self, path: impl Into<Arc<str>>, text: impl Into<Arc<str>>) {
        let path = path.into();
        self.texts.insert(path.clone(), text.into());
        self.pending.insert(path);
    }

    pub fn remove_file(&mut self, path: &str) {
        if self.texts.remove(path).is_some() {
            self.pending.remove(path);
            if let Some(&id) = self.ids.get(path) {
                self.removed.insert(id);
            }
        }
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    /// The last build's resolutions for a file.
    pub fn resolutions(&self, path: &str) -> &[ResolvedUse] {
        self.file_id(path)
            .and_then(|id| self.resolutions.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The resolution covering a source position, innermost span first.
    pub fn resolve_at(&self, path: &str, position: Position) -> Option<&Resolution> {
        let id = self.file_id(path)?;
        self.resolutions
            .get(&id)?
            .iter()
            .filter(|u| u.span.contains(position))
            .min_by_key(|u| {
                (
                    u.span.end.line - u.span.start.line,
                    u.span.end.column,
                )
            })
            .and_then(|u| u.result.as_ref().ok())
    }

    /// Run a build round: parse changed files, merge them (in path order,
    /// so the index never depends on change order), then re-resolve every
    /// translation unit that can observe the changes.
    pub fn build(&mut self) -> BuildOutcome {
        let removed = std::mem::take(&mut self.removed);
        let mut retracted = !removed.is_empty();
        for id in removed {
            self.index.remove_file(id);
            self.file_diags.remove(&id);
            self.resolve_diags.remove(&id);
            self.resolutions.remove(&id);
        }

        let mut pending: Vec<Arc<str>> = std::mem::take(&mut self.pending).into_iter().collect();
        pending.sort();
        for path in &pending {
            if !self.ids.contains_key(path) {
                self.ids.insert(path.clone(), FileId::new(self.next_id));
                self.next_id += 1;
            }
        }

        let parsed = self.parse_pending(&pending);
        let files_parsed = parsed.len();

        let mut changed: FxHashSet<FileId> = FxHashSet::default();
        for (file, path, table, diags) in parsed {
            changed.insert(file);
            retracted |= self.index.table(file).is_some();
            let mut diags = diags;
            for error in self.index.merge_file(table) {
                diags.push(Diagnostic::from_semantic_error(path.clone(), &error));
            }
            self.file_diags.insert(file, diags);
        }
        if retracted {
            // A retraction can free a name another file's declaration was
            // rejected against, so its conflicts must be re-evaluated.
            for (file, errors) in self.index.reevaluate_conflicts() {
                changed.insert(file);
                let Some(path) = self.index.table(file).map(|t| t.path.clone()) else {
                    continue;
                };
                let diags = self.file_diags.entry(file).or_default();
                diags.retain(|d| d.kind != DiagnosticKind::MergeConflict);
                for error in &errors {
                    diags.push(Diagnostic::from_semantic_error(path.clone(), error));
                }
            }
        }
        self.index.attach_friends();

        let dirty = self.index.take_dirty();
        self.engine.invalidate(&self.index, &dirty);

        let targets = self.resolve_targets(&changed, &dirty);
        let files_resolved = targets.len();
        info!(
            parsed = files_parsed,
            resolved = files_resolved,
            bindings = self.index.binding_count(),
            "build round"
        );
        self.resolve(targets);

        self.outcome(files_parsed, files_resolved)
    }

    // ------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------

    #[allow(clippy::type_complexity)]
    fn parse_pending(
        &self,
        pending: &[Arc<str>],
    ) -> Vec<(FileId, Arc<str>, Arc<FileTable>, Vec<Diagnostic>)> {
        let parse_one = |path: &Arc<str>| {
            let file = self.ids[path];
            let text = &self.texts[path];
            let mut diags = Vec::new();
            let ast = match parse(text) {
                Ok(ast) => ast,
                Err(error) => {
                    // A file that fails to parse contributes nothing, but
                    // the build carries on.
                    diags.push(Diagnostic::from_parse_error(path.clone(), &error));
                    SourceFile {
                        items: Vec::new(),
                        includes: Vec::new(),
                    }
                }
            };
            let table = Arc::new(FileTable::build(file, path.clone(), &ast));
            (file, path.clone(), table, diags)
        };

        if self.config.parallel {
            pending.par_iter().map(parse_one).collect()
        } else {
            pending.iter().map(parse_one).collect()
        }
    }

    /// Which translation units need re-resolving: anything not resolved
    /// yet, anything whose include closure reaches a changed file, and
    /// anything whose previous resolutions mention a dirty binding.
    fn resolve_targets(
        &self,
        changed: &FxHashSet<FileId>,
        dirty: &FxHashSet<BindingId>,
    ) -> Vec<FileId> {
        let mut targets: Vec<FileId> = self
            .ids
            .values()
            .copied()
            .filter(|&file| {
                // Ids are stable across removal and re-addition, so a path
                // can have an id without a table.
                if self.index.table(file).is_none() {
                    return false;
                }
                let Some(previous) = self.resolutions.get(&file) else {
                    return true;
                };
                let view = TuView::build(&self.index, file);
                if view.files().iter().any(|f| changed.contains(f)) {
                    return true;
                }
                previous.iter().any(|u| match &u.result {
                    Ok(Resolution::Binding(b)) => dirty.contains(b),
                    Ok(Resolution::Instance(inst)) => {
                        dirty.contains(&inst.primary) || dirty.contains(&inst.chosen)
                    }
                    Ok(Resolution::Local(..)) => false,
                    Err(_) => false,
                })
            })
            .collect();
        targets.sort();
        targets
    }

    fn resolve(&mut self, targets: Vec<FileId>) {
        let index = &self.index;
        let engine = &self.engine;
        let resolve_one = |&file: &FileId| {
            let view = TuView::build(index, file);
            let resolver = Resolver::new(index, &view, engine);
            let resolved = resolver.resolve_file();
            debug!(file = file.index(), uses = resolved.len(), "resolved");

            let path: Arc<str> = index
                .table(file)
                .map(|t| t.path.clone())
                .unwrap_or_else(|| "".into());
            let mut diags = Vec::new();
            for missing in view.missing_includes() {
                if missing.file == file {
                    diags.push(Diagnostic::missing_include(
                        path.clone(),
                        &missing.path,
                        missing.span,
                    ));
                }
            }
            for resolved_use in &resolved {
                if let Err(error) = &resolved_use.result {
                    diags.push(Diagnostic::from_semantic_error(path.clone(), error));
                }
            }
            (file, resolved, diags)
        };

        let results: Vec<_> = if self.config.parallel {
            targets.par_iter().map(resolve_one).collect()
        } else {
            targets.iter().map(resolve_one).collect()
        };
        for (file, resolved, diags) in results {
            self.resolutions.insert(file, resolved);
            self.resolve_diags.insert(file, diags);
        }
    }

    fn outcome(&self, files_parsed: usize, files_resolved: usize) -> BuildOutcome {
        let mut diagnostics: Vec<Diagnostic> = self
            .file_diags
            .values()
            .chain(self.resolve_diags.values())
            .flatten()
            .cloned()
            .collect();
        diagnostics.sort_by(|a, b| {
            (a.file.as_ref(), a.span.start)
                .cmp(&(b.file.as_ref(), b.span.start))
        });
        BuildOutcome {
            diagnostics,
            files_parsed,
            files_resolved,
        }
    }
}
