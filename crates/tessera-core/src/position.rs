//! Source location tracking for diagnostics.
//!
//! Every AST node and most errors carry a [`Position`]. Positions are purely
//! informational: nothing in detailing branches on them.

use std::fmt;

/// Identifies a source file known to the driver.
///
/// File names are owned by whoever produced the AST; the detailer only needs
/// a stable handle to report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file_{}", self.0)
    }
}

/// A location in source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub column: u32,
    /// Byte offset from the start of the file.
    pub offset: u32,
    /// The file this position belongs to.
    pub file: FileId,
}

impl Position {
    /// Create a position in the default file.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            offset: 0,
            file: FileId(0),
        }
    }

    /// Create a position with every field given.
    #[inline]
    pub const fn at(file: FileId, line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
            file,
        }
    }

    /// Whether this is the zero position used for synthesised nodes.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0 && self.column == 0
    }

    /// The earlier of two positions in the same file.
    ///
    /// Positions in different files are not comparable; `self` wins.
    #[inline]
    pub fn min(self, other: Position) -> Position {
        if self.file != other.file {
            return self;
        }
        if (other.line, other.column) < (self.line, self.column) {
            other
        } else {
            self
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
