//! Name resolution.
//!
//! Resolution is scoped to a translation unit: a [`TuView`] restricts the
//! index to the include closure of one file, and the [`Resolver`] walks
//! that file's recorded name uses against the merged scopes of the
//! closure. Declarations from unrelated translation units are invisible.

mod name_resolver;
mod tu_view;

pub use name_resolver::{Resolution, ResolvedUse, Resolver};
pub use tu_view::{MissingInclude, TuView};
