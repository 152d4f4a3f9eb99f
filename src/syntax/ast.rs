use std::sync::Arc;

use crate::base::Span;

/// A parsed file: top-level items plus the includes it pulls in.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub items: Vec<Item>,
    pub includes: Vec<Include>,
}

/// `#include "path"`. Paths are virtual, matched exactly against the file set.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: Arc<str>,
    pub span: Span,
}

/// A possibly-qualified name, e.g. `waldo::A` or `::ns1`.
///
/// Each segment may carry template arguments (`A<B*>`).
#[derive(Debug, Clone, PartialEq)]
pub struct NamePath {
    /// Leading `::`: lookup starts at the global scope.
    pub absolute: bool,
    pub segments: Vec<NameSeg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameSeg {
    pub name: Arc<str>,
    /// Template arguments, if this segment is a template-id.
    /// `Some(vec![])` for an empty argument list (`derived<>`).
    pub args: Option<Vec<TypeExpr>>,
    pub span: Span,
}

impl NamePath {
    /// The last segment's name (the name actually being declared or used).
    pub fn last_name(&self) -> &Arc<str> {
        &self.segments.last().expect("empty name path").name
    }

    /// True if any segment carries template arguments.
    pub fn has_template_args(&self) -> bool {
        self.segments.iter().any(|s| s.args.is_some())
    }

    /// Render as written, without template arguments.
    pub fn to_qualified_string(&self) -> String {
        let mut out = String::new();
        if self.absolute {
            out.push_str("::");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push_str("::");
            }
            out.push_str(&seg.name);
        }
        out
    }
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `B`, `waldo::A`, `A<B*>`
    Named(NamePath),
    /// `T*`
    Pointer(Box<TypeExpr>),
    /// Non-type template argument: `false`, `0`
    Literal(Arc<str>),
}

impl TypeExpr {
    /// The name path at the root of this type, if any (through pointers).
    pub fn name_path(&self) -> Option<&NamePath> {
        match self {
            TypeExpr::Named(path) => Some(path),
            TypeExpr::Pointer(inner) => inner.name_path(),
            TypeExpr::Literal(_) => None,
        }
    }
}

/// A top-level or namespace-scope item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Namespace(Namespace),
    NamespaceAlias(NamespaceAlias),
    Record(Record),
    Template(Template),
    Function(Function),
    Variable(Variable),
}

/// `namespace N { ... }` or anonymous `namespace { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: Option<Arc<str>>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// `namespace waldo = ns1;`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceAlias {
    pub name: Arc<str>,
    pub target: NamePath,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKeyword {
    Struct,
    Class,
}

/// A `struct`/`class` declaration or definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub keyword: RecordKeyword,
    pub name: Option<Arc<str>>,
    /// Template arguments on the declared name (`struct atomic<T*>`);
    /// present only for template specializations.
    pub spec_args: Option<Vec<TypeExpr>>,
    pub bases: Vec<NamePath>,
    /// `None` for a forward declaration (`class B;`).
    pub body: Option<Vec<Member>>,
    pub span: Span,
}

impl Record {
    pub fn is_definition(&self) -> bool {
        self.body.is_some()
    }
}

/// A class member.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Record(Record),
    Template(Template),
    /// `friend class B;`
    FriendClass { name: Arc<str>, span: Span },
    /// `friend int operator*(unrelated, unrelated) { return 0; }`
    FriendFunction(Function),
    Function(Function),
    Field(Variable),
}

/// `template <params> decl`
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub params: Vec<TemplateParam>,
    pub decl: TemplateDecl,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateDecl {
    Record(Record),
    Function(Function),
    Variable(Variable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateParamKind {
    /// `typename T` / `class T`
    Type,
    /// `bool B`, a non-type parameter carried as a literal value
    Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParam {
    /// `None` for anonymous parameters (`template <typename = void>`).
    pub name: Option<Arc<str>>,
    pub kind: TemplateParamKind,
    pub default: Option<TypeExpr>,
}

/// A function declaration or definition (including constructors,
/// conversion operators, and operator functions).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Arc<str>,
    /// `None` for constructors and conversion operators.
    pub ret: Option<TypeExpr>,
    pub params: Vec<Param>,
    /// Constructor mem-initializer list entries (`: base<B>()`).
    pub mem_inits: Vec<NamePath>,
    /// `None` for a declaration without a body.
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeExpr,
    pub name: Option<Arc<str>>,
}

/// A variable declaration (namespace scope, class field, or local).
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: TypeExpr,
    pub name: Arc<str>,
    pub span: Span,
}

/// A function-body statement. Only the shapes the index cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(Variable),
    Expr(Expr),
    /// `return <expr>;`. The expression is kept for its name uses
    Return(Option<Expr>),
}

/// An expression, reduced to the forms that produce name uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A bare name: `b`, `waldo::A`
    Name(NamePath),
    /// `waldo(a)`
    Call { callee: NamePath, args: Vec<Expr> },
    /// `a.m(b)`
    MemberCall {
        receiver: NamePath,
        member: Arc<str>,
        member_span: Span,
        args: Vec<Expr>,
    },
    /// `new A<B, C>(x)`
    New { ty: NamePath, args: Vec<Expr> },
    /// `C<>{}`
    BraceInit { ty: NamePath },
    /// `0`, `0.5`, `"s"`
    Literal(Arc<str>),
}
