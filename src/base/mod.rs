//! Foundation types for the ccindex toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`FileId`] - Interned file identifiers
//! - [`Position`], [`Span`] - Line/column positions for declarations and uses
//! - [`LineIndex`] - Byte offset to line/column conversion
//!
//! This module has NO dependencies on other ccindex modules.

mod file_id;
mod line_index;
mod position;

pub use file_id::FileId;
pub use line_index::LineIndex;
pub use position::{Position, Span};

// Re-export text-size types for convenience
pub use text_size::{TextRange, TextSize};
