/// Unique identifier for a file in the workspace.
///
/// Files are interned by the workspace when added; the id is stable for the
/// lifetime of the workspace and compact enough to key hot maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new FileId from an index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the index value
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file#{}", self.0)
    }
}
