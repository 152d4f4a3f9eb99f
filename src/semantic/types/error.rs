use thiserror::Error;

use crate::base::Span;

pub type SemanticResult<T> = Result<T, SemanticError>;

/// The semantic error taxonomy.
///
/// Nothing here is fatal to a build round: every variant is scoped to the
/// file or name use that triggered it and surfaced as a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    /// Lookup found nothing; resolution continues for other uses.
    #[error("unresolved name '{name}'")]
    UnresolvedName { name: String, span: Span },

    /// Two specialization candidates are incomparable by partial ordering.
    #[error("ambiguous specialization of '{template_name}': '{first}' and '{second}' are incomparable")]
    AmbiguousSpecialization {
        template_name: String,
        first: String,
        second: String,
        span: Span,
    },

    /// A namespace alias chain refers back to itself.
    #[error("cyclic namespace alias '{name}'")]
    CyclicAlias { name: String, span: Span },

    /// Two non-file-local declarations claim the same merge key with
    /// incompatible structural kinds. The later declaration is rejected.
    #[error("merge conflict on '{qualified_name}': {existing_kind} vs {incoming_kind}")]
    MergeConflict {
        qualified_name: String,
        existing_kind: &'static str,
        incoming_kind: &'static str,
        span: Span,
    },
}

impl SemanticError {
    /// The source span the error is anchored to.
    pub fn span(&self) -> Span {
        match self {
            SemanticError::UnresolvedName { span, .. }
            | SemanticError::AmbiguousSpecialization { span, .. }
            | SemanticError::CyclicAlias { span, .. }
            | SemanticError::MergeConflict { span, .. } => *span,
        }
    }

    /// Re-anchor to another use site (cached errors carry the span of the
    /// use that first triggered them).
    pub fn with_span(mut self, new_span: Span) -> Self {
        match &mut self {
            SemanticError::UnresolvedName { span, .. }
            | SemanticError::AmbiguousSpecialization { span, .. }
            | SemanticError::CyclicAlias { span, .. }
            | SemanticError::MergeConflict { span, .. } => *span = new_span,
        }
        self
    }
}
