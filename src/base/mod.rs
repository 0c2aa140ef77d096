//! Foundation types for the extraction engine.
//!
//! This module has NO dependencies on other confex modules.

/// A location in the source configuration file.
///
/// The external parser delivers one statement per line, so a line number is
/// the whole position; there is no column or byte-offset tracking here.
/// Lines are 1-indexed, matching what device CLIs print in their own
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Loc {
    pub line: u32,
}

impl Loc {
    pub fn new(line: u32) -> Self {
        Self { line }
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.line)
    }
}

impl From<u32> for Loc {
    fn from(line: u32) -> Self {
        Self { line }
    }
}
