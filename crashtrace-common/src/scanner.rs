//! A line-oriented cursor over input text.
//!
//! Every dialect parser drives one of these instead of hand-rolling byte
//! offset arithmetic. Primitives never fail: an empty advance is not an
//! error by itself, it is up to the caller to decide whether that means the
//! grammar was violated and to produce a [`Location`] describing it.

use crate::location::{Location, Position};

/// A cursor over `&str` input that tracks `(byte offset, line, column)`.
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// The unconsumed remainder of the input.
    pub fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Byte offset of the cursor within the original input.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Current `(line, column)`.
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Builds a [`Location`] at the current position with `message`.
    pub fn error(&self, message: impl Into<String>) -> Location {
        Location::new(self.position(), message)
    }

    /// Whether the cursor has reached the end of input.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// The next unconsumed byte, if any.
    pub fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Advances the cursor by `n` bytes, updating line/column as it crosses
    /// newlines. `n` is clamped to the remaining input length.
    fn advance_by(&mut self, n: usize) -> usize {
        let end = (self.pos + n).min(self.input.len());
        let consumed = &self.input.as_bytes()[self.pos..end];
        for &b in consumed {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        let advanced = end - self.pos;
        self.pos = end;
        advanced
    }

    /// Skips runs of plain space/tab. Does not cross a newline.
    pub fn skip_whitespace(&mut self) -> usize {
        let bytes = self.input.as_bytes();
        let mut n = 0;
        while let Some(&b) = bytes.get(self.pos + n) {
            if b == b' ' || b == b'\t' {
                n += 1;
            } else {
                break;
            }
        }
        self.advance_by(n)
    }

    /// Skips bytes that are members of `set`. May cross newlines.
    pub fn skip_span(&mut self, set: &[u8]) -> usize {
        let bytes = self.input.as_bytes();
        let mut n = 0;
        while let Some(&b) = bytes.get(self.pos + n) {
            if set.contains(&b) {
                n += 1;
            } else {
                break;
            }
        }
        self.advance_by(n)
    }

    /// Skips bytes that are *not* members of `set`. May cross newlines.
    pub fn skip_cspan(&mut self, set: &[u8]) -> usize {
        let bytes = self.input.as_bytes();
        let mut n = 0;
        while let Some(&b) = bytes.get(self.pos + n) {
            if !set.contains(&b) {
                n += 1;
            } else {
                break;
            }
        }
        self.advance_by(n)
    }

    /// Consumes and returns the run of bytes matching `pred`, starting at
    /// the cursor.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut n = 0;
        while let Some(&b) = bytes.get(self.pos + n) {
            if pred(b) {
                n += 1;
            } else {
                break;
            }
        }
        self.advance_by(n);
        &self.input[start..start + n]
    }

    /// Consumes the rest of the current line, *not* including the
    /// terminating newline.
    pub fn take_line(&mut self) -> &'a str {
        self.take_while(|b| b != b'\n')
    }

    /// Advances past `literal` iff the remaining input starts with it.
    pub fn match_literal(&mut self, literal: &str) -> bool {
        if self.remaining().starts_with(literal) {
            self.advance_by(literal.len());
            true
        } else {
            false
        }
    }

    /// Advances past a single `\n`, incrementing the line counter and
    /// resetting the column. Returns whether a newline was consumed; also
    /// consumes an optional preceding `\r`.
    pub fn eat_newline(&mut self) -> bool {
        if self.peek_byte() == Some(b'\r') {
            self.advance_by(1);
        }
        if self.peek_byte() == Some(b'\n') {
            self.advance_by(1);
            true
        } else {
            false
        }
    }

    /// Returns up to `n` decimal digits from the cursor without requiring a
    /// following delimiter, alongside the parsed value if any digits were
    /// consumed.
    pub fn take_decimal(&mut self, max_digits: usize) -> Option<(&'a str, u64)> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut n = 0;
        while n < max_digits {
            match bytes.get(self.pos + n) {
                Some(b) if b.is_ascii_digit() => n += 1,
                _ => break,
            }
        }
        if n == 0 {
            return None;
        }
        self.advance_by(n);
        let text = &self.input[start..start + n];
        text.parse::<u64>().ok().map(|v| (text, v))
    }

    /// Returns up to `max_digits` hexadecimal digits (no `0x` prefix).
    pub fn take_hex(&mut self, max_digits: usize) -> Option<(&'a str, u64)> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let mut n = 0;
        while n < max_digits {
            match bytes.get(self.pos + n) {
                Some(b) if b.is_ascii_hexdigit() => n += 1,
                _ => break,
            }
        }
        if n == 0 {
            return None;
        }
        self.advance_by(n);
        let text = &self.input[start..start + n];
        u64::from_str_radix(text, 16).ok().map(|v| (text, v))
    }
}
