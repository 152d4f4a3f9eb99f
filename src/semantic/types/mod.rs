pub mod diagnostic;
pub mod error;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::{SemanticError, SemanticResult};
