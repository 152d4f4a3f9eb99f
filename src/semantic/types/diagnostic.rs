use std::sync::Arc;

use crate::base::Span;
use crate::parser::ParseError;

use super::error::SemanticError;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// What produced a diagnostic. Closed enum so consumers can match
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    ParseError,
    UnresolvedName,
    AmbiguousSpecialization,
    CyclicAlias,
    MergeConflict,
    MissingInclude,
}

/// A diagnostic keyed by file and span, reported to the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: Arc<str>,
    pub span: Span,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn from_parse_error(file: Arc<str>, error: &ParseError) -> Self {
        Self {
            file,
            span: error.span,
            severity: Severity::Error,
            kind: DiagnosticKind::ParseError,
            message: error.message.clone(),
        }
    }

    pub fn from_semantic_error(file: Arc<str>, error: &SemanticError) -> Self {
        let kind = match error {
            SemanticError::UnresolvedName { .. } => DiagnosticKind::UnresolvedName,
            SemanticError::AmbiguousSpecialization { .. } => DiagnosticKind::AmbiguousSpecialization,
            SemanticError::CyclicAlias { .. } => DiagnosticKind::CyclicAlias,
            SemanticError::MergeConflict { .. } => DiagnosticKind::MergeConflict,
        };
        Self {
            file,
            span: error.span(),
            severity: Severity::Error,
            kind,
            message: error.to_string(),
        }
    }

    pub fn missing_include(file: Arc<str>, path: &str, span: Span) -> Self {
        Self {
            file,
            span,
            severity: Severity::Warning,
            kind: DiagnosticKind::MissingInclude,
            message: format!("included file \"{path}\" not found in file set"),
        }
    }
}
