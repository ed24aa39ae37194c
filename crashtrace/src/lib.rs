//! Parses crash reports from several textual dialects into a uniform
//! stacktrace model, with structural comparison, quality scoring, and
//! document serialization. See [`facade`] for the public entry points.

#![warn(missing_docs)]

pub mod compare;
pub mod coredump;
pub mod document;
pub mod error;
pub mod facade;
pub mod frame;
pub mod normalize;
pub mod stacktrace;
pub mod tag;
pub mod thread;

mod gdb;
mod java;
mod js;
mod koops;
mod python_dialect;

pub use error::{DocumentError, DocumentErrorKind, ParseError, ParseErrorKind};
pub use facade::{
    crash_thread, duplication_hash, duplication_hash_inputs, from_document, parse,
    quality_complex, quality_simple, short_text, to_document, ArtifactReader, Hasher,
};
pub use frame::Frame;
pub use normalize::NormalizationOptions;
pub use stacktrace::Stacktrace;
pub use tag::Tag;
pub use thread::Thread;
