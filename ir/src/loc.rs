//! Caller-derived source locations.
//!
//! Every constructed operation and block argument carries a [`Loc`] taken
//! from the position of the *user* call site, not from this crate's
//! internals. Constructors are `#[track_caller]` all the way down, so
//! capturing [`Loc::caller`] inside them observes the outermost
//! non-tracked frame.

use std::fmt;

/// A source location in user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loc {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

impl Loc {
    /// Capture the location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self { file: loc.file(), line: loc.line(), column: loc.column() }
    }

    /// A location for synthesized IR with no user call site.
    pub const fn unknown() -> Self {
        Self { file: "<unknown>", line: 0, column: 0 }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
