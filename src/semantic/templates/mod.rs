//! Class template instantiation.
//!
//! Types lower to [`Ty`] values keyed by binding id, specialization
//! candidates are ranked by partial ordering, and the engine caches each
//! distinct (template, arguments) pair so it is instantiated at most once
//! per build round.

mod engine;
mod ordering;
mod ty;

pub use engine::{Candidate, InstKey, Instantiation, InstantiationEngine};
pub use ordering::{match_pattern, more_specialized};
pub use ty::Ty;
