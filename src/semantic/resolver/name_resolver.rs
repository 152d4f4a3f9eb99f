use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::base::{FileId, Span};
use crate::semantic::index::{Binding, BindingId, SymbolIndex};
use crate::semantic::symbol_table::{
    BUILTIN_TYPES, DeclId, DeclKind, Declaration, NameUse, ScopeId, UseKind,
};
use crate::semantic::templates::{Candidate, Instantiation, InstantiationEngine, Ty};
use crate::semantic::types::SemanticError;
use crate::syntax::{NamePath, TypeExpr};

/// What a name use resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A cross-file binding.
    Binding(BindingId),
    /// An instantiated class template.
    Instance(Arc<Instantiation>),
    /// A declaration with no binding: a local variable or a template
    /// parameter.
    Local(FileId, DeclId),
}

/// One resolved (or failed) name use.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUse {
    pub span: Span,
    pub result: Result<Resolution, SemanticError>,
}

/// What a lookup is willing to find, by position in the use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupKind {
    Type,
    Value,
    Callable,
    /// A namespace-alias target.
    Namespace,
    /// A non-final path segment.
    Qualifier,
}

fn accepts(kind: LookupKind, decl: &Declaration) -> bool {
    use crate::semantic::symbol_table::StructuralKind as K;
    let k = decl.structural_kind();
    match kind {
        LookupKind::Type => matches!(k, K::Class | K::ClassTemplate | K::TemplateParam),
        LookupKind::Value => matches!(k, K::Variable | K::Field | K::Function | K::TemplateParam),
        LookupKind::Callable => matches!(k, K::Function),
        LookupKind::Namespace => matches!(k, K::Namespace | K::NamespaceAlias),
        LookupKind::Qualifier => matches!(
            k,
            K::Namespace | K::NamespaceAlias | K::Class | K::ClassTemplate
        ),
    }
}

/// Where a qualified lookup continues after a resolved segment.
enum Container {
    /// A namespace (or the global scope), by canonical path.
    Scope(Arc<str>),
    /// A class: members come from its definition's body scope.
    Class(BindingId),
}

/// Resolves the name uses of one file against its translation unit view.
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
    view: &'a super::TuView,
    engine: &'a InstantiationEngine,
}

impl<'a> Resolver<'a> {
    pub fn new(
        index: &'a SymbolIndex,
        view: &'a super::TuView,
        engine: &'a InstantiationEngine,
    ) -> Self {
        Self {
            index,
            view,
            engine,
        }
    }

    /// Resolve every recorded use of the view's primary file, in recording
    /// order. Nested template-argument names produce their own entries.
    pub fn resolve_file(&self) -> Vec<ResolvedUse> {
        let Some(table) = self.index.table(self.view.primary()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for name_use in table.uses() {
            self.resolve_use(name_use, &mut out);
        }
        out
    }

    fn resolve_use(&self, name_use: &NameUse, out: &mut Vec<ResolvedUse>) {
        let at = (self.view.primary(), name_use.scope);
        match &name_use.kind {
            UseKind::Type(ty) => {
                let Some(path) = ty.name_path() else { return };
                let result = self.resolve_path(path, at, LookupKind::Type, None, out);
                out.push(ResolvedUse {
                    span: name_use.span,
                    result,
                });
            }
            UseKind::Name(path) => {
                let result = self.resolve_path(path, at, LookupKind::Value, None, out);
                out.push(ResolvedUse {
                    span: name_use.span,
                    result,
                });
            }
            UseKind::Call {
                callee,
                args,
                arg_count,
            } => self.resolve_call(callee, args, *arg_count, at, name_use.span, out),
            UseKind::MemberCall {
                receiver,
                member,
                member_span,
            } => self.resolve_member_call(receiver, member, *member_span, at, out),
        }
    }

    // ------------------------------------------------------------
    // Path resolution
    // ------------------------------------------------------------

    fn resolve_path(
        &self,
        path: &NamePath,
        at: (FileId, ScopeId),
        kind: LookupKind,
        arity: Option<usize>,
        records: &mut Vec<ResolvedUse>,
    ) -> Result<Resolution, SemanticError> {
        let mut seen_aliases = FxHashSet::default();
        self.resolve_path_inner(path, at, kind, arity, &mut seen_aliases, records)
    }

    fn resolve_path_inner(
        &self,
        path: &NamePath,
        at: (FileId, ScopeId),
        kind: LookupKind,
        arity: Option<usize>,
        seen_aliases: &mut FxHashSet<(FileId, DeclId)>,
        records: &mut Vec<ResolvedUse>,
    ) -> Result<Resolution, SemanticError> {
        let unresolved = || SemanticError::UnresolvedName {
            name: path.to_qualified_string(),
            span: path.span,
        };
        let last = path.segments.len() - 1;
        let mut container: Option<Container> =
            path.absolute.then(|| Container::Scope("".into()));

        for (i, seg) in path.segments.iter().enumerate() {
            let is_last = i == last;
            let seg_kind = if is_last { kind } else { LookupKind::Qualifier };
            let seg_arity = if is_last { arity } else { None };

            let hits = match &container {
                None => self.unqualified(&seg.name, at, seg_kind),
                Some(c) => self.in_container(c, &seg.name, seg_kind),
            };
            let picked = self.pick(hits, seg_arity).ok_or_else(unresolved)?;
            let decl = self.decl(picked);
            trace!(name = %seg.name, found = %decl.qualified_name, "resolved segment");

            // Namespace aliases collapse transitively, wherever they sit
            // in the path.
            if let DeclKind::NamespaceAlias { target } = &decl.kind {
                if !seen_aliases.insert(picked) {
                    return Err(SemanticError::CyclicAlias {
                        name: decl.name.to_string(),
                        span: path.span,
                    });
                }
                let resolved = self
                    .resolve_path_inner(
                        target,
                        (picked.0, decl.scope),
                        LookupKind::Namespace,
                        None,
                        seen_aliases,
                        records,
                    )
                    .map_err(|e| match e {
                        SemanticError::CyclicAlias { .. } => e,
                        _ => unresolved(),
                    })?;
                if is_last {
                    return Ok(resolved);
                }
                container = Some(self.namespace_container(&resolved).ok_or_else(unresolved)?);
                continue;
            }

            // Template-id segments instantiate.
            if let (Some(args), DeclKind::ClassTemplate { .. }) = (&seg.args, &decl.kind) {
                let resolution = self.instantiate_segment(picked, args, at, path.span, records)?;
                if is_last {
                    return Ok(resolution);
                }
                container = Some(match &resolution {
                    Resolution::Instance(inst) => Container::Class(inst.chosen),
                    Resolution::Binding(b) => Container::Class(*b),
                    Resolution::Local(..) => return Err(unresolved()),
                });
                continue;
            }

            let resolution = self.resolution_of(picked);
            if is_last {
                return Ok(resolution);
            }
            container = Some(self.container_of(picked, &resolution).ok_or_else(unresolved)?);
        }
        Err(unresolved())
    }

    fn resolution_of(&self, (file, decl): (FileId, DeclId)) -> Resolution {
        match self.index.binding_for_decl(file, decl) {
            Some(b) => Resolution::Binding(b),
            None => Resolution::Local(file, decl),
        }
    }

    fn namespace_container(&self, resolution: &Resolution) -> Option<Container> {
        let Resolution::Binding(id) = resolution else {
            return None;
        };
        let binding = self.index.binding(*id);
        Some(Container::Scope(join(
            &binding.key.scope_path,
            &binding.key.name,
        )))
    }

    fn container_of(
        &self,
        picked: (FileId, DeclId),
        resolution: &Resolution,
    ) -> Option<Container> {
        let decl = self.decl(picked);
        match &decl.kind {
            DeclKind::Namespace => self.namespace_container(resolution),
            DeclKind::Class { .. } | DeclKind::ClassTemplate { .. } => {
                match resolution {
                    Resolution::Binding(b) => Some(Container::Class(*b)),
                    Resolution::Instance(inst) => Some(Container::Class(inst.chosen)),
                    Resolution::Local(..) => None,
                }
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------
    // Lookup primitives
    // ------------------------------------------------------------

    /// Unqualified lookup: walk the lexical chain outward from `at`,
    /// stopping at the first level with any hit. At each level the file's
    /// own anonymous-namespace children are consulted before the level's
    /// shared scope.
    fn unqualified(
        &self,
        name: &str,
        at: (FileId, ScopeId),
        kind: LookupKind,
    ) -> Vec<(FileId, DeclId)> {
        let Some(table) = self.index.table(at.0) else {
            return Vec::new();
        };
        let mut scope = Some(at.1);
        while let Some(id) = scope {
            let s = table.scope(id);
            let mut hits = Vec::new();
            for &child in &s.children {
                let ch = table.scope(child);
                if ch.is_anonymous_namespace() {
                    hits.extend(self.collect(&ch.path, name, kind, false));
                }
            }
            if hits.is_empty() {
                hits = self.collect(&s.path, name, kind, false);
            }
            if !hits.is_empty() {
                return hits;
            }
            scope = s.parent;
        }
        Vec::new()
    }

    fn in_container(
        &self,
        container: &Container,
        name: &str,
        kind: LookupKind,
    ) -> Vec<(FileId, DeclId)> {
        match container {
            Container::Scope(path) => self.collect(path, name, kind, false),
            Container::Class(binding) => match self.member_scope_path(*binding) {
                Some(path) => self.collect(&path, name, kind, false),
                None => Vec::new(),
            },
        }
    }

    /// The canonical path of a class binding's definition body scope.
    fn member_scope_path(&self, id: BindingId) -> Option<Arc<str>> {
        let binding = self.index.binding(id);
        let (file, decl_id) = binding.definition?;
        let table = self.index.table(file)?;
        let decl = table.decl(decl_id);
        let body = decl.body_scope()?;
        Some(table.scope(body).path.clone())
    }

    /// Everything named `name` across the closure's scopes at `path`.
    /// Friend declarations are visible to argument-dependent lookup only.
    fn collect(
        &self,
        path: &str,
        name: &str,
        kind: LookupKind,
        include_friends: bool,
    ) -> Vec<(FileId, DeclId)> {
        use crate::semantic::symbol_table::Visibility;
        let mut hits = Vec::new();
        for &(file, scope) in self.view.scopes_at(path) {
            let Some(table) = self.index.table(file) else {
                continue;
            };
            for &decl_id in table.scope(scope).decls_named(name) {
                let decl = table.decl(decl_id);
                if decl.visibility == Visibility::Friend && !include_friends {
                    continue;
                }
                if accepts(kind, decl) {
                    hits.push((file, decl_id));
                }
            }
        }
        hits
    }

    /// Choose one hit deterministically: primary templates before their
    /// specializations, the use's own file before included files, then
    /// the lowest binding id.
    fn pick(
        &self,
        mut hits: Vec<(FileId, DeclId)>,
        arity: Option<usize>,
    ) -> Option<(FileId, DeclId)> {
        if let Some(n) = arity {
            let exact: Vec<_> = hits
                .iter()
                .copied()
                .filter(|&h| {
                    matches!(
                        &self.decl(h).kind,
                        DeclKind::Function { param_count, .. } if *param_count == n
                    )
                })
                .collect();
            if !exact.is_empty() {
                hits = exact;
            }
        }
        hits.sort_by_key(|&(f, d)| {
            let decl = self.decl((f, d));
            let is_spec = matches!(
                &decl.kind,
                DeclKind::ClassTemplate {
                    spec_args: Some(_),
                    ..
                }
            );
            let binding = self
                .index
                .binding_for_decl(f, d)
                .map_or(u32::MAX, |b| b.0);
            (is_spec, f != self.view.primary(), binding, f.0, d.0)
        });
        hits.first().copied()
    }

    fn decl(&self, (file, decl): (FileId, DeclId)) -> &Declaration {
        self.index
            .table(file)
            .expect("closure file present")
            .decl(decl)
    }

    // ------------------------------------------------------------
    // Template instantiation
    // ------------------------------------------------------------

    fn instantiate_segment(
        &self,
        picked: (FileId, DeclId),
        arg_exprs: &[TypeExpr],
        at: (FileId, ScopeId),
        span: Span,
        records: &mut Vec<ResolvedUse>,
    ) -> Result<Resolution, SemanticError> {
        let decl = self.decl(picked);
        let primary = self
            .index
            .binding_for_decl(picked.0, picked.1)
            .ok_or_else(|| SemanticError::UnresolvedName {
                name: decl.name.to_string(),
                span,
            })?;

        let no_params = FxHashMap::default();
        let mut args: Vec<Ty> = arg_exprs
            .iter()
            .map(|a| self.lower(a, at, &no_params, records))
            .collect();
        args = self.complete_args(args, picked);

        if args.iter().any(Ty::is_dependent) {
            // Dependent template-ids bind to the primary; selection waits
            // for concrete arguments.
            return Ok(Resolution::Binding(primary));
        }
        let inst = self.instantiate(primary, args, span)?;
        Ok(Resolution::Instance(inst))
    }

    fn instantiate(
        &self,
        primary: BindingId,
        args: Vec<Ty>,
        span: Span,
    ) -> Result<Arc<Instantiation>, SemanticError> {
        let binding = self.index.binding(primary);
        let candidates = self.spec_candidates(binding);
        self.engine
            .instantiate(&binding.key.name, primary, args, &candidates, span)
    }

    /// Fill omitted trailing arguments from parameter defaults. Earlier
    /// arguments substitute into later defaults.
    fn complete_args(&self, mut args: Vec<Ty>, picked: (FileId, DeclId)) -> Vec<Ty> {
        let decl = self.decl(picked);
        let DeclKind::ClassTemplate { params, .. } = &decl.kind else {
            return args;
        };
        if args.len() >= params.len() {
            return args;
        }
        let param_map = param_positions(params);
        let mut scratch = Vec::new();
        for param in params.iter().skip(args.len()) {
            let ty = match &param.default {
                Some(default) => self
                    .lower(default, (picked.0, decl.scope), &param_map, &mut scratch)
                    .substitute(&args),
                None => Ty::Error,
            };
            args.push(ty);
        }
        args
    }

    /// All specializations registered for a primary template, with their
    /// patterns lowered in each specialization's own declaring context.
    fn spec_candidates(&self, primary: &Binding) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut scratch = Vec::new();
        for binding in self.index.bindings() {
            if binding.kind() != primary.kind()
                || binding.key.scope_path != primary.key.scope_path
                || binding.key.name != primary.key.name
            {
                continue;
            }
            let Some(display) = &binding.key.disambiguator else {
                continue;
            };
            let Some(&(file, decl_id)) = binding.decls.first() else {
                continue;
            };
            let decl = self.decl((file, decl_id));
            let DeclKind::ClassTemplate {
                params,
                spec_args: Some(spec_args),
                ..
            } = &decl.kind
            else {
                continue;
            };
            let param_map = param_positions(params);
            let pattern = spec_args
                .iter()
                .map(|a| self.lower(a, (file, decl.scope), &param_map, &mut scratch))
                .collect();
            candidates.push(Candidate {
                binding: binding.id,
                pattern,
                display: display.clone(),
            });
        }
        candidates.sort_by_key(|c| c.binding);
        candidates
    }

    /// Lower a written type to a [`Ty`]. Named types resolve through the
    /// view; each non-builtin name lowered from a use site is recorded.
    fn lower(
        &self,
        ty: &TypeExpr,
        at: (FileId, ScopeId),
        params: &FxHashMap<Arc<str>, u32>,
        records: &mut Vec<ResolvedUse>,
    ) -> Ty {
        match ty {
            TypeExpr::Literal(text) => Ty::Value(text.clone()),
            TypeExpr::Pointer(inner) => {
                Ty::Pointer(Box::new(self.lower(inner, at, params, records)))
            }
            TypeExpr::Named(path) => {
                if path.segments.len() == 1 && path.segments[0].args.is_none() {
                    let name = &path.segments[0].name;
                    if let Some(&i) = params.get(name) {
                        return Ty::Param(i);
                    }
                    if BUILTIN_TYPES.contains(&name.as_ref()) {
                        return Ty::Value(name.clone());
                    }
                }
                let result = self.resolve_path(path, at, LookupKind::Type, None, records);
                records.push(ResolvedUse {
                    span: path.span,
                    result: result.clone(),
                });
                match result {
                    Ok(Resolution::Binding(b)) => Ty::Class(b),
                    Ok(Resolution::Instance(inst)) => Ty::Instance {
                        primary: inst.primary,
                        args: inst.args.clone(),
                    },
                    Ok(Resolution::Local(file, decl_id)) => {
                        match &self.decl((file, decl_id)).kind {
                            DeclKind::TemplateParam { index } => Ty::Param(*index),
                            _ => Ty::Error,
                        }
                    }
                    Err(_) => Ty::Error,
                }
            }
        }
    }

    // ------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------

    fn resolve_call(
        &self,
        callee: &NamePath,
        args: &[NamePath],
        arg_count: usize,
        at: (FileId, ScopeId),
        span: Span,
        out: &mut Vec<ResolvedUse>,
    ) {
        let direct =
            self.resolve_path(callee, at, LookupKind::Callable, Some(arg_count), out);
        let result = match direct {
            Ok(r) => Ok(r),
            Err(e) => {
                // Argument-dependent lookup for plain unqualified callees.
                if callee.segments.len() == 1 && !callee.absolute {
                    match self.adl(&callee.segments[0].name, args, at) {
                        Some(r) => Ok(r),
                        None => Err(e),
                    }
                } else {
                    Err(e)
                }
            }
        };
        out.push(ResolvedUse { span, result });
    }

    /// Search the namespaces of the arguments' class types, friend
    /// declarations included.
    fn adl(
        &self,
        callee: &str,
        args: &[NamePath],
        at: (FileId, ScopeId),
    ) -> Option<Resolution> {
        let mut scratch = Vec::new();
        for arg in args {
            let Ok(resolution) =
                self.resolve_path(arg, at, LookupKind::Value, None, &mut scratch)
            else {
                continue;
            };
            let Some(ty) = self.type_of_value(&resolution, &mut scratch) else {
                continue;
            };
            let Some(class) = self.class_binding_of(&ty) else {
                continue;
            };
            let ns_path = self.index.binding(class).key.scope_path.clone();
            let hits = self.collect(&ns_path, callee, LookupKind::Callable, true);
            if let Some(picked) = self.pick(hits, None) {
                return Some(self.resolution_of(picked));
            }
        }
        None
    }

    fn resolve_member_call(
        &self,
        receiver: &NamePath,
        member: &Arc<str>,
        member_span: Span,
        at: (FileId, ScopeId),
        out: &mut Vec<ResolvedUse>,
    ) {
        let recv = self.resolve_path(receiver, at, LookupKind::Value, None, out);
        out.push(ResolvedUse {
            span: receiver.span,
            result: recv.clone(),
        });

        let result = recv.and_then(|resolution| {
            let unresolved = || SemanticError::UnresolvedName {
                name: member.to_string(),
                span: member_span,
            };
            let mut scratch = Vec::new();
            let ty = self
                .type_of_value(&resolution, &mut scratch)
                .ok_or_else(unresolved)?;
            let class = self.member_target(&ty, member, member_span)?;
            let path = self.member_scope_path(class).ok_or_else(unresolved)?;
            let hits = self.collect(&path, member, LookupKind::Callable, false);
            self.pick(hits, None)
                .map(|picked| self.resolution_of(picked))
                .ok_or_else(unresolved)
        });
        out.push(ResolvedUse {
            span: member_span,
            result,
        });
    }

    /// The declared type of a value resolution, lowered in its declaring
    /// context.
    fn type_of_value(
        &self,
        resolution: &Resolution,
        scratch: &mut Vec<ResolvedUse>,
    ) -> Option<Ty> {
        let (file, decl_id) = match resolution {
            Resolution::Local(file, decl_id) => (*file, *decl_id),
            Resolution::Binding(b) => *self.index.binding(*b).decls.first()?,
            Resolution::Instance(_) => return None,
        };
        let decl = self.decl((file, decl_id));
        match &decl.kind {
            DeclKind::Variable { ty } | DeclKind::Field { ty } => {
                let no_params = FxHashMap::default();
                Some(self.lower(ty, (file, decl.scope), &no_params, scratch))
            }
            _ => None,
        }
    }

    fn class_binding_of(&self, ty: &Ty) -> Option<BindingId> {
        match ty {
            Ty::Class(b) => Some(*b),
            Ty::Instance { primary, .. } => Some(*primary),
            Ty::Pointer(inner) => self.class_binding_of(inner),
            _ => None,
        }
    }

    /// The class whose members a receiver of type `ty` exposes. Template
    /// instances expose the chosen specialization's members.
    fn member_target(
        &self,
        ty: &Ty,
        member: &str,
        span: Span,
    ) -> Result<BindingId, SemanticError> {
        match ty {
            Ty::Class(b) => Ok(*b),
            Ty::Instance { primary, args } => {
                let inst = self.instantiate(*primary, args.clone(), span)?;
                Ok(inst.chosen)
            }
            Ty::Pointer(inner) => self.member_target(inner, member, span),
            _ => Err(SemanticError::UnresolvedName {
                name: member.to_string(),
                span,
            }),
        }
    }
}

fn join(parent: &str, component: &str) -> Arc<str> {
    if parent.is_empty() {
        component.into()
    } else {
        format!("{parent}::{component}").into()
    }
}

fn param_positions(
    params: &[crate::syntax::TemplateParam],
) -> FxHashMap<Arc<str>, u32> {
    params
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.name.clone().map(|n| (n, i as u32)))
        .collect()
}
