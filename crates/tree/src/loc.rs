//! Source locations for error reporting and tooling.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source location attached to every tree node.
///
/// Lines are 0-indexed internally for LSP compatibility; `Display` renders
/// them 1-based for humans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    /// Line (0-indexed)
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: PathBuf, line: usize) -> Self {
        SourceLocation { file, line }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line + 1)
    }
}
