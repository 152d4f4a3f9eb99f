//! Semantic analysis: symbol tables, the multi-file index, name
//! resolution, template instantiation, and the build orchestrator.

pub mod index;
pub mod resolver;
pub mod symbol_table;
pub mod templates;
pub mod types;
pub mod workspace;
