use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::{FileId, Span};
use crate::syntax::{NamePath, TemplateParam, TypeExpr};

use super::scope::ScopeId;

/// Unique identifier for a declaration within one file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration visibility.
///
/// Friend declarations grant visibility to argument-dependent lookup only;
/// ordinary lookup never sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Ordinary,
    Friend,
}

/// The kind of a declaration, a closed enum matched exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Namespace,
    /// `namespace waldo = ns1;`. The target is resolved lazily and transitively.
    NamespaceAlias { target: NamePath },
    Class {
        is_definition: bool,
        body_scope: Option<ScopeId>,
    },
    /// Class template primary (`spec_pattern: None`) or specialization.
    ClassTemplate {
        params: Vec<TemplateParam>,
        /// Argument pattern for partial/explicit specializations.
        spec_args: Option<Vec<TypeExpr>>,
        is_definition: bool,
        body_scope: Option<ScopeId>,
    },
    /// A template parameter, declared inside its template's body scope.
    TemplateParam { index: u32 },
    Function {
        signature: Arc<str>,
        param_count: usize,
        body_scope: Option<ScopeId>,
    },
    Variable { ty: TypeExpr },
    Field { ty: TypeExpr },
}

/// Structural kind used by merge keys: two declarations may only merge when
/// their structural kinds agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    Namespace,
    NamespaceAlias,
    Class,
    ClassTemplate,
    TemplateParam,
    Function,
    Variable,
    Field,
}

impl StructuralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StructuralKind::Namespace => "namespace",
            StructuralKind::NamespaceAlias => "namespace alias",
            StructuralKind::Class => "class",
            StructuralKind::ClassTemplate => "class template",
            StructuralKind::TemplateParam => "template parameter",
            StructuralKind::Function => "function",
            StructuralKind::Variable => "variable",
            StructuralKind::Field => "field",
        }
    }
}

/// A declared name: one entry in a file table's declaration arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Arc<str>,
    /// Display-qualified name; anonymous namespace components render as
    /// `(anonymous)`.
    pub qualified_name: Arc<str>,
    pub kind: DeclKind,
    pub file: FileId,
    pub span: Span,
    /// The scope this declaration was made in (weak reference by id).
    pub scope: ScopeId,
    pub visibility: Visibility,
    /// True when an enclosing scope is file-local (anonymous namespace);
    /// file-local declarations never merge across files.
    pub file_local: bool,
}

impl Declaration {
    pub fn structural_kind(&self) -> StructuralKind {
        match &self.kind {
            DeclKind::Namespace => StructuralKind::Namespace,
            DeclKind::NamespaceAlias { .. } => StructuralKind::NamespaceAlias,
            DeclKind::Class { .. } => StructuralKind::Class,
            DeclKind::ClassTemplate { .. } => StructuralKind::ClassTemplate,
            DeclKind::TemplateParam { .. } => StructuralKind::TemplateParam,
            DeclKind::Function { .. } => StructuralKind::Function,
            DeclKind::Variable { .. } => StructuralKind::Variable,
            DeclKind::Field { .. } => StructuralKind::Field,
        }
    }

    /// True when this declaration provides a definition (a class body, a
    /// function body). Declarations that cannot be "defined" count as
    /// definitions.
    pub fn is_definition(&self) -> bool {
        match &self.kind {
            DeclKind::Class { is_definition, .. }
            | DeclKind::ClassTemplate { is_definition, .. } => *is_definition,
            DeclKind::Function { body_scope, .. } => body_scope.is_some(),
            _ => true,
        }
    }

    /// The class body scope, for member lookup.
    pub fn body_scope(&self) -> Option<ScopeId> {
        match &self.kind {
            DeclKind::Class { body_scope, .. }
            | DeclKind::ClassTemplate { body_scope, .. } => *body_scope,
            _ => None,
        }
    }
}

// ============================================================
// Canonical type rendering (merge-key disambiguators)
// ============================================================

/// Render a type the way merge keys see it: template parameters normalized
/// to `$0`, `$1`, ... by position, pointers suffixed with `*`.
pub fn render_type(ty: &TypeExpr, params: &FxHashMap<Arc<str>, usize>) -> String {
    match ty {
        TypeExpr::Named(path) => {
            let mut out = String::new();
            if path.segments.len() == 1 && path.segments[0].args.is_none() {
                if let Some(&i) = params.get(&path.segments[0].name) {
                    return format!("${i}");
                }
            }
            out.push_str(&path.to_qualified_string());
            if let Some(args) = path.segments.last().and_then(|s| s.args.as_ref()) {
                out.push('<');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&render_type(arg, params));
                }
                out.push('>');
            }
            out
        }
        TypeExpr::Pointer(inner) => format!("{}*", render_type(inner, params)),
        TypeExpr::Literal(text) => text.to_string(),
    }
}

/// Canonicalize a specialization argument pattern: `atomic<T*>` with
/// parameter `T` renders as `<$0*>` regardless of the parameter's name.
pub fn canonical_pattern(params: &[TemplateParam], args: &[TypeExpr]) -> Arc<str> {
    let param_map: FxHashMap<Arc<str>, usize> = params
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.name.clone().map(|n| (n, i)))
        .collect();

    let mut out = String::from("<");
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&render_type(arg, &param_map));
    }
    out.push('>');
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::syntax::{Item, TemplateDecl};

    fn template_parts(text: &str) -> (Vec<TemplateParam>, Vec<TypeExpr>) {
        let file = parse(text).unwrap();
        match &file.items[0] {
            Item::Template(t) => match &t.decl {
                TemplateDecl::Record(r) => (t.params.clone(), r.spec_args.clone().unwrap()),
                _ => panic!("expected record"),
            },
            _ => panic!("expected template"),
        }
    }

    #[test]
    fn test_canonical_pattern_normalizes_param_names() {
        let (params_t, args_t) = template_parts("template <typename T> struct atomic<T*>;");
        let (params_u, args_u) = template_parts("template <typename U> struct atomic<U*>;");
        assert_eq!(
            canonical_pattern(&params_t, &args_t),
            canonical_pattern(&params_u, &args_u)
        );
        assert_eq!(canonical_pattern(&params_t, &args_t).as_ref(), "<$0*>");
    }

    #[test]
    fn test_canonical_pattern_concrete_args() {
        let (params, args) = template_parts("template <> struct A<B, C>;");
        assert!(params.is_empty());
        assert_eq!(canonical_pattern(&params, &args).as_ref(), "<B, C>");
    }
}
