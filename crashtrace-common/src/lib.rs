//! Scanning primitives and error-location tracking shared by the crashtrace
//! dialect parsers.
//!
//! This crate has no knowledge of any particular crash-report dialect; it
//! only provides the line-oriented [`Scanner`] cursor and the [`Location`]
//! error record that every dialect parser in the `crashtrace` crate builds
//! on.

#![warn(missing_docs)]

mod location;
mod scanner;

pub use location::{Location, Position};
pub use scanner::Scanner;
