use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::{FileId, Span};
use crate::syntax::{
    Expr, Function, Include, Item, Member, NamePath, Record, SourceFile, Stmt, Template,
    TemplateDecl, TemplateParam, TypeExpr, Variable,
};

use super::declaration::{DeclId, DeclKind, Declaration, Visibility, canonical_pattern};
use super::scope::{Scope, ScopeId, ScopeKind, join_path};

/// Builtin type names that never produce name uses.
pub const BUILTIN_TYPES: &[&str] = &[
    "void", "bool", "char", "short", "int", "long", "float", "double", "unsigned", "signed",
    "auto",
];

/// How a name is used. Determines the resolution strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum UseKind {
    /// A type annotation: `A<B*> z;`, `waldo::A* x;`
    Type(TypeExpr),
    /// A bare expression name: `x` in `new A<B, C>(x)`
    Name(NamePath),
    /// A call: `waldo(a)`. Argument names feed argument-dependent lookup
    Call {
        callee: NamePath,
        args: Vec<NamePath>,
        arg_count: usize,
    },
    /// A member call: `a.m(b)`
    MemberCall {
        receiver: NamePath,
        member: Arc<str>,
        member_span: Span,
    },
}

/// A recorded name use, resolved after indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct NameUse {
    pub kind: UseKind,
    /// The lexical scope the use appears in.
    pub scope: ScopeId,
    /// Span of the used name (for diagnostics and cursor queries).
    pub span: Span,
}

/// The symbol table of one translation-unit file.
#[derive(Debug, Clone)]
pub struct FileTable {
    pub file: FileId,
    /// The file's virtual path (diagnostics only).
    pub path: Arc<str>,
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    uses: Vec<NameUse>,
    includes: Vec<Include>,
}

impl FileTable {
    /// Build the table for a parsed file. Extraction is deterministic:
    /// the same AST always yields the same arenas in the same order.
    pub fn build(file: FileId, path: Arc<str>, ast: &SourceFile) -> Self {
        let mut extractor = Extractor::new(file, path);
        extractor.walk_items(&ast.items);
        extractor.finish(ast.includes.clone())
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn decls(&self) -> &[Declaration] {
        &self.decls
    }

    pub fn decl_ids(&self) -> impl Iterator<Item = DeclId> + '_ {
        (0..self.decls.len()).map(DeclId::new)
    }

    pub fn uses(&self) -> &[NameUse] {
        &self.uses
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    pub const GLOBAL_SCOPE: ScopeId = ScopeId(0);
}

// ============================================================
// Extraction
// ============================================================

struct Extractor {
    file: FileId,
    path: Arc<str>,
    scopes: Vec<Scope>,
    /// Display path per scope (anonymous namespaces render `(anonymous)`).
    display_paths: Vec<Arc<str>>,
    /// Whether each scope is (transitively) file-local.
    file_local: Vec<bool>,
    decls: Vec<Declaration>,
    uses: Vec<NameUse>,
    current: ScopeId,
}

impl Extractor {
    fn new(file: FileId, path: Arc<str>) -> Self {
        Self {
            file,
            path,
            scopes: vec![Scope::new(None, ScopeKind::Global, "".into())],
            display_paths: vec!["".into()],
            file_local: vec![false],
            decls: Vec::new(),
            uses: Vec::new(),
            current: ScopeId(0),
        }
    }

    fn finish(self, includes: Vec<Include>) -> FileTable {
        FileTable {
            file: self.file,
            path: self.path,
            scopes: self.scopes,
            decls: self.decls,
            uses: self.uses,
            includes,
        }
    }

    // ------------------------------------------------------------
    // Scope helpers
    // ------------------------------------------------------------

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    fn push_scope(&mut self, kind: ScopeKind, path: Arc<str>, display: Arc<str>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        let parent = self.current;
        let local = self.file_local[parent.index()]
            || matches!(kind, ScopeKind::Namespace { anonymous: true });
        self.scopes.push(Scope::new(Some(parent), kind, path));
        self.display_paths.push(display);
        self.file_local.push(local);
        self.scopes[parent.index()].children.push(id);
        id
    }

    /// Find an existing child scope by canonical path (namespace reopening),
    /// or create it.
    fn namespace_scope(&mut self, name: Option<&str>) -> ScopeId {
        let parent = self.current;
        let (component, display_component, anonymous) = match name {
            Some(n) => (n.to_string(), n.to_string(), false),
            // Embed the file id so anonymous scopes never line up across files
            None => (format!("(anonymous:{})", self.file.0), "(anonymous)".to_string(), true),
        };
        let path = join_path(&self.scope(parent).path, &component);

        if let Some(&existing) = self
            .scope(parent)
            .children
            .iter()
            .find(|&&c| self.scope(c).path == path && !matches!(self.scope(c).kind, ScopeKind::Class))
        {
            return existing;
        }

        let display = join_path(&self.display_paths[parent.index()], &display_component);
        self.push_scope(ScopeKind::Namespace { anonymous }, path, display)
    }

    // ------------------------------------------------------------
    // Declarations and uses
    // ------------------------------------------------------------

    fn add_decl_in(
        &mut self,
        scope: ScopeId,
        name: Arc<str>,
        kind: DeclKind,
        span: Span,
        visibility: Visibility,
    ) -> DeclId {
        let id = DeclId::new(self.decls.len());
        let qualified_name = join_path(&self.display_paths[scope.index()], &name);
        self.decls.push(Declaration {
            name: name.clone(),
            qualified_name,
            kind,
            file: self.file,
            span,
            scope,
            visibility,
            file_local: self.file_local[scope.index()],
        });
        self.scopes[scope.index()]
            .names
            .entry(name)
            .or_default()
            .push(id);
        id
    }

    fn add_decl(&mut self, name: Arc<str>, kind: DeclKind, span: Span) -> DeclId {
        self.add_decl_in(self.current, name, kind, span, Visibility::Ordinary)
    }

    fn record_type_use(&mut self, ty: &TypeExpr) {
        let Some(path) = ty.name_path() else { return };
        if path.segments.len() == 1
            && path.segments[0].args.is_none()
            && BUILTIN_TYPES.contains(&path.segments[0].name.as_ref())
        {
            return;
        }
        self.uses.push(NameUse {
            kind: UseKind::Type(ty.clone()),
            scope: self.current,
            span: path.span,
        });
    }

    // ------------------------------------------------------------
    // AST walk
    // ------------------------------------------------------------

    fn walk_items(&mut self, items: &[Item]) {
        for item in items {
            self.walk_item(item);
        }
    }

    fn walk_item(&mut self, item: &Item) {
        match item {
            Item::Namespace(ns) => {
                if let Some(name) = &ns.name {
                    self.add_decl(name.clone(), DeclKind::Namespace, ns.span);
                }
                let scope = self.namespace_scope(ns.name.as_deref());
                let prev = std::mem::replace(&mut self.current, scope);
                self.walk_items(&ns.items);
                self.current = prev;
            }
            Item::NamespaceAlias(alias) => {
                self.add_decl(
                    alias.name.clone(),
                    DeclKind::NamespaceAlias {
                        target: alias.target.clone(),
                    },
                    alias.span,
                );
            }
            Item::Record(record) => self.walk_record(record, None),
            Item::Template(template) => self.walk_template(template),
            Item::Function(function) => self.walk_function(function, Visibility::Ordinary),
            Item::Variable(var) => self.walk_variable(var, false),
        }
    }

    fn walk_template(&mut self, template: &Template) {
        match &template.decl {
            TemplateDecl::Record(record) => self.walk_record(record, Some(&template.params)),
            // Function and variable templates carry no index semantics
            // beyond their plain counterparts.
            TemplateDecl::Function(f) => self.walk_function(f, Visibility::Ordinary),
            TemplateDecl::Variable(v) => self.walk_variable(v, false),
        }
    }

    fn walk_record(&mut self, record: &Record, template_params: Option<&[TemplateParam]>) {
        let Some(name) = &record.name else {
            // Unnamed records declare nothing the index can name.
            return;
        };

        let is_definition = record.is_definition();
        let body_scope = record.body.as_ref().map(|members| {
            // Distinguish specialization body scopes by canonical pattern so
            // `atomic` and `atomic<$0*>` keep separate member scopes.
            let component = match (&record.spec_args, template_params) {
                (Some(args), Some(params)) => {
                    format!("{}{}", name, canonical_pattern(params, args))
                }
                _ => name.to_string(),
            };
            let path = join_path(&self.scope(self.current).path, &component);
            let display = join_path(&self.display_paths[self.current.index()], name);
            let scope = self.push_scope(ScopeKind::Class, path, display);

            let prev = std::mem::replace(&mut self.current, scope);
            if let Some(params) = template_params {
                for (i, param) in params.iter().enumerate() {
                    if let Some(param_name) = &param.name {
                        self.add_decl(
                            param_name.clone(),
                            DeclKind::TemplateParam { index: i as u32 },
                            record.span,
                        );
                    }
                }
            }
            // Base clauses are recorded inside the body scope so they can
            // name the template's own parameters.
            for base in &record.bases {
                self.record_type_use(&TypeExpr::Named(base.clone()));
            }
            self.walk_members(members, name);
            self.current = prev;
            scope
        });

        let kind = match template_params {
            Some(params) => DeclKind::ClassTemplate {
                params: params.to_vec(),
                spec_args: record.spec_args.clone(),
                is_definition,
                body_scope,
            },
            None => DeclKind::Class {
                is_definition,
                body_scope,
            },
        };
        self.add_decl(name.clone(), kind, record.span);
    }

    fn walk_members(&mut self, members: &[Member], _class_name: &str) {
        for member in members {
            match member {
                Member::Record(record) => self.walk_record(record, None),
                Member::Template(template) => self.walk_template(template),
                Member::FriendClass { name, span } => self.walk_friend_class(name, *span),
                Member::FriendFunction(function) => {
                    self.walk_function(function, Visibility::Friend)
                }
                Member::Function(function) => self.walk_function(function, Visibility::Ordinary),
                Member::Field(var) => self.walk_variable(var, true),
            }
        }
    }

    /// `friend class B;` declares `B` in the nearest enclosing namespace,
    /// visible to argument-dependent lookup only.
    fn walk_friend_class(&mut self, name: &Arc<str>, span: Span) {
        let scope = self.enclosing_namespace(self.current);
        self.add_decl_in(
            scope,
            name.clone(),
            DeclKind::Class {
                is_definition: false,
                body_scope: None,
            },
            span,
            Visibility::Friend,
        );
    }

    fn enclosing_namespace(&self, from: ScopeId) -> ScopeId {
        let mut current = from;
        loop {
            let scope = self.scope(current);
            match scope.kind {
                ScopeKind::Global | ScopeKind::Namespace { .. } => return current,
                _ => current = scope.parent.expect("non-global scope without parent"),
            }
        }
    }

    fn walk_function(&mut self, function: &Function, visibility: Visibility) {
        // Friend functions are declared in the nearest enclosing namespace,
        // like friend classes.
        let decl_scope = match visibility {
            Visibility::Friend => self.enclosing_namespace(self.current),
            Visibility::Ordinary => self.current,
        };

        if let Some(ret) = &function.ret {
            self.record_type_use(ret);
        }
        for param in &function.params {
            self.record_type_use(&param.ty);
        }

        let signature: Arc<str> = {
            let empty = FxHashMap::default();
            let rendered: Vec<String> = function
                .params
                .iter()
                .map(|p| super::declaration::render_type(&p.ty, &empty))
                .collect();
            format!("({})", rendered.join(", ")).into()
        };

        let body_scope = function.body.as_ref().map(|stmts| {
            let decl_index = self.decls.len();
            let component = format!("{}()#{}", function.name, decl_index);
            let path = join_path(&self.scope(self.current).path, &component);
            let display = self.display_paths[self.current.index()].clone();
            let scope = self.push_scope(ScopeKind::Block, path, display);

            let prev = std::mem::replace(&mut self.current, scope);
            for param in &function.params {
                if let Some(name) = &param.name {
                    self.add_decl(
                        name.clone(),
                        DeclKind::Variable {
                            ty: param.ty.clone(),
                        },
                        function.span,
                    );
                }
            }
            for init in &function.mem_inits {
                self.record_type_use(&TypeExpr::Named(init.clone()));
            }
            for stmt in stmts {
                self.walk_stmt(stmt);
            }
            self.current = prev;
            scope
        });

        if body_scope.is_none() {
            for init in &function.mem_inits {
                self.record_type_use(&TypeExpr::Named(init.clone()));
            }
        }

        self.add_decl_in(
            decl_scope,
            function.name.clone(),
            DeclKind::Function {
                signature,
                param_count: function.params.len(),
                body_scope,
            },
            function.span,
            visibility,
        );
    }

    fn walk_variable(&mut self, var: &Variable, is_field: bool) {
        self.record_type_use(&var.ty);
        let kind = if is_field {
            DeclKind::Field { ty: var.ty.clone() }
        } else {
            DeclKind::Variable { ty: var.ty.clone() }
        };
        self.add_decl(var.name.clone(), kind, var.span);
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(var) => self.walk_variable(var, false),
            Stmt::Expr(expr) => self.walk_expr(expr),
            Stmt::Return(Some(expr)) => self.walk_expr(expr),
            Stmt::Return(None) => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(path) => {
                self.uses.push(NameUse {
                    kind: UseKind::Name(path.clone()),
                    scope: self.current,
                    span: path.span,
                });
            }
            Expr::Call { callee, args } => {
                let arg_paths: Vec<NamePath> = args
                    .iter()
                    .filter_map(|a| match a {
                        Expr::Name(p) => Some(p.clone()),
                        _ => None,
                    })
                    .collect();
                self.uses.push(NameUse {
                    kind: UseKind::Call {
                        callee: callee.clone(),
                        args: arg_paths,
                        arg_count: args.len(),
                    },
                    scope: self.current,
                    span: callee.span,
                });
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::MemberCall {
                receiver,
                member,
                member_span,
                args,
            } => {
                self.uses.push(NameUse {
                    kind: UseKind::MemberCall {
                        receiver: receiver.clone(),
                        member: member.clone(),
                        member_span: *member_span,
                    },
                    scope: self.current,
                    span: *member_span,
                });
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::New { ty, args } => {
                self.record_type_use(&TypeExpr::Named(ty.clone()));
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::BraceInit { ty } => {
                self.record_type_use(&TypeExpr::Named(ty.clone()));
            }
            Expr::Literal(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::semantic::symbol_table::StructuralKind;

    fn build(text: &str) -> FileTable {
        let ast = parse(text).unwrap();
        FileTable::build(FileId::new(0), "test.cpp".into(), &ast)
    }

    fn decl_named<'a>(table: &'a FileTable, name: &str) -> &'a Declaration {
        table
            .decls()
            .iter()
            .find(|d| d.name.as_ref() == name)
            .unwrap_or_else(|| panic!("declaration '{name}' not found"))
    }

    #[test]
    fn test_nested_namespace_paths() {
        let table = build("namespace ns1 {\nnamespace ns2 {\nclass A {};\n}\n}");
        let a = decl_named(&table, "A");
        assert_eq!(a.qualified_name.as_ref(), "ns1::ns2::A");
        assert!(!a.file_local);
    }

    #[test]
    fn test_anonymous_namespace_is_file_local() {
        let table = build("namespace {\nstruct B {};\n}");
        let b = decl_named(&table, "B");
        assert_eq!(b.qualified_name.as_ref(), "(anonymous)::B");
        assert!(b.file_local);
        // The scope path embeds the file id
        assert!(table.scope(b.scope).path.contains("(anonymous:0)"));
    }

    #[test]
    fn test_namespace_reopening_reuses_scope() {
        let table = build("namespace ns {\nclass A {};\n}\nnamespace ns {\nclass B {};\n}");
        let a = decl_named(&table, "A");
        let b = decl_named(&table, "B");
        assert_eq!(a.scope, b.scope);
    }

    #[test]
    fn test_friend_class_lands_in_enclosing_namespace() {
        let table = build("namespace ns {\nstruct C {\n  friend class B;\n};\n}");
        let b = decl_named(&table, "B");
        assert_eq!(b.visibility, Visibility::Friend);
        assert_eq!(b.qualified_name.as_ref(), "ns::B");
        // Declared in ns, not in C
        assert!(matches!(
            table.scope(b.scope).kind,
            ScopeKind::Namespace { anonymous: false }
        ));
    }

    #[test]
    fn test_template_params_declared_in_body_scope() {
        let table = build("template <typename T>\nstruct A {\n  void m(T p);\n};");
        let t = decl_named(&table, "T");
        assert_eq!(t.structural_kind(), StructuralKind::TemplateParam);
        let a = decl_named(&table, "A");
        assert_eq!(a.body_scope(), Some(t.scope));
    }

    #[test]
    fn test_member_call_use_recorded() {
        let table = build("void test(B* b) {\n  a.m(b);\n}");
        let member_use = table
            .uses()
            .iter()
            .find(|u| matches!(u.kind, UseKind::MemberCall { .. }))
            .expect("member call use not recorded");
        assert!(matches!(
            &member_use.kind,
            UseKind::MemberCall { member, .. } if member.as_ref() == "m"
        ));
    }

    #[test]
    fn test_builtin_types_produce_no_uses() {
        let table = build("void test() {\n  int x;\n}");
        assert!(table.uses().is_empty());
    }

    #[test]
    fn test_specialization_body_scope_distinct_from_primary() {
        let table = build(
            "template <typename T>\nstruct atomic {};\n\ntemplate <typename T>\nstruct atomic<T*> {\n  void fetch_sub();\n};",
        );
        let scopes: Vec<_> = table
            .decls()
            .iter()
            .filter(|d| d.name.as_ref() == "atomic")
            .map(|d| d.body_scope().unwrap())
            .collect();
        assert_eq!(scopes.len(), 2);
        assert_ne!(scopes[0], scopes[1]);
        assert_ne!(
            table.scope(scopes[0]).path,
            table.scope(scopes[1]).path
        );
    }
}
