//! Error locations accumulated by the dialect parsers.

use std::fmt;

/// A 1-based line/column position within a parser's input.
///
/// Line and column both start at `1`, matching the convention of every
/// dialect parser in this crate: an empty input fails at `(1, 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number, counted in `char`s since the last newline.
    pub column: u32,
}

impl Position {
    /// The position at the very start of an input.
    pub const START: Position = Position { line: 1, column: 1 };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A structured parse-error record: where parsing broke, and what was
/// expected there.
///
/// Every dialect parser produces this on failure rather than a bare string,
/// so callers can point a user or a log line at the exact offending byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Position at which parsing failed.
    pub position: Position,
    /// Human-readable description of what was expected.
    pub message: String,
}

impl Location {
    /// Creates a new location at `position` describing `message`.
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// 1-based line number.
    pub fn line(&self) -> u32 {
        self.position.line
    }

    /// 1-based column number.
    pub fn column(&self) -> u32 {
        self.position.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_one_one() {
        assert_eq!(Position::START, Position { line: 1, column: 1 });
    }

    #[test]
    fn display_format() {
        let loc = Location::new(Position { line: 3, column: 5 }, "expected '#'");
        assert_eq!(loc.to_string(), "3:5: expected '#'");
    }
}
