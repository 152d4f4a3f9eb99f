//! Syntax: AST types for the indexed C/C++ subset.
//!
//! The AST is a set of closed enums with exhaustive matches downstream;
//! no open-ended subtype checks. Nodes carry line/column spans for
//! diagnostics and cursor queries.

mod ast;

pub use ast::{
    Expr, Function, Include, Item, Member, NamePath, NameSeg, Namespace, NamespaceAlias, Param,
    Record, RecordKeyword, SourceFile, Stmt, Template, TemplateDecl, TemplateParam,
    TemplateParamKind, TypeExpr, Variable,
};
