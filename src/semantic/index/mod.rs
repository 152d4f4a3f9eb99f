//! The multi-file symbol index.
//!
//! File tables are merged one file at a time into a set of [`Binding`]s.
//! Declarations of the same entity in different files collapse into one
//! binding keyed by canonical scope path, name, structural kind, and a
//! disambiguator (function signature or specialization pattern). Merging
//! is commutative: any insertion order of the same file set produces the
//! same bindings.

mod binding;
mod index;

pub use binding::{Binding, BindingId, MergeKey, merge_key_for};
pub use index::SymbolIndex;
