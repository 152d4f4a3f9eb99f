//! The indexing workspace.
//!
//! Owns the file set, drives build rounds (parse, merge, resolve), and
//! answers queries against the last round's results. A build round is
//! incremental: only changed files are re-parsed and re-merged, and only
//! translation units that can observe a change are re-resolved.

#[allow(clippy::module_inception)]
mod workspace;

pub use workspace::{BuildOutcome, Workspace, WorkspaceConfig};
