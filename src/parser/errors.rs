use thiserror::Error;

use crate::base::Span;

/// A structural parse error, scoped to a single file.
///
/// A malformed context file does not abort the build round; a malformed
/// primary file short-circuits resolution for that file only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {}: {message}", span.start)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
