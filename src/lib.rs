//! ccindex: a cross-translation-unit C/C++ symbol index.
//!
//! Files are parsed independently into per-file symbol tables, merged into
//! a shared binding index, and resolved per translation unit: each file
//! sees exactly the declarations reachable through its include closure.
//! Re-indexing a file is atomic, and merging is commutative, so the index
//! never depends on the order files were added or changed.
//!
//! Modules, in dependency order:
//! - [`base`]: file ids, positions, line indexing
//! - [`parser`]: lexer and recursive-descent parser
//! - [`syntax`]: the AST
//! - [`semantic`]: tables, index, resolver, templates, workspace
//! - [`project`]: virtual-file fixtures
//!
//! ```
//! use ccindex::project::Project;
//!
//! let (project, outcome) = Project::build(
//!     r#"
//! //- A.h
//! namespace ns { class A {}; }
//! //- test.cpp *
//! #include "A.h"
//! void test() {
//!   ns::A* a;
//! }
//! "#,
//! );
//! assert!(!outcome.has_errors());
//! assert!(project.workspace.index().bindings().any(|b| b.qualified_name.as_ref() == "ns::A"));
//! ```

pub mod base;
pub mod parser;
pub mod project;
pub mod semantic;
pub mod syntax;

pub use base::{FileId, Position, Span};
pub use semantic::workspace::{BuildOutcome, Workspace, WorkspaceConfig};
