//! Virtual-file projects for tests and embedders.
//!
//! Source sets are described inline with the section convention: a `//-`
//! line names each file, a trailing `*` marks a primary file (the ones a
//! test inspects). [`Project`] loads a fixture into a workspace.

mod fixture;

pub use fixture::{Fixture, FixtureFile, parse_fixture};

use crate::semantic::workspace::{BuildOutcome, Workspace, WorkspaceConfig};

/// A workspace built from a fixture.
pub struct Project {
    pub workspace: Workspace,
    pub fixture: Fixture,
}

impl Project {
    /// Parse a fixture and run one build round.
    pub fn build(text: &str) -> (Self, BuildOutcome) {
        Self::build_with(text, WorkspaceConfig::default())
    }

    pub fn build_with(text: &str, config: WorkspaceConfig) -> (Self, BuildOutcome) {
        let fixture = parse_fixture(text);
        let mut workspace = Workspace::new(config);
        for file in &fixture.files {
            workspace.set_file_text(file.path.clone(), file.text.clone());
        }
        let outcome = workspace.build();
        (Self { workspace, fixture }, outcome)
    }
}
