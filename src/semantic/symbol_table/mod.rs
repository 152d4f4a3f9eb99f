//! Per-translation-unit symbol tables.
//!
//! Each parsed file gets a [`FileTable`]: a scope arena, a declaration
//! arena, the name uses recorded for later resolution, and the file's
//! include list. Tables are immutable once built; the multi-file index
//! merges declarations across tables and the resolver reads both.

mod declaration;
mod scope;
mod table;

pub use declaration::{
    DeclId, DeclKind, Declaration, StructuralKind, Visibility, canonical_pattern, render_type,
};
pub use scope::{Scope, ScopeId, ScopeKind};
pub use table::{BUILTIN_TYPES, FileTable, NameUse, UseKind};
