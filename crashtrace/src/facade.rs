//! Public entry points (spec.md §6). This is the only module that logs —
//! dialect dispatch and normalization decisions are traced here with
//! `tracing`, never inside the pure parsers in [`crate::gdb`] and friends.

use tracing::{debug, trace};

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::{Frame, UNKNOWN_FUNCTION};
use crate::normalize;
use crate::stacktrace::Stacktrace;
use crate::tag::Tag;
use crate::thread::Thread;
use crate::{document, gdb, java, js, koops, python_dialect as python};

pub use crate::normalize::{quality_complex, quality_simple, NormalizationOptions};

/// Parses `input` as the dialect named by `tag`.
///
/// `tag` must be one of the wire strings recognized by [`Tag::from_str_opt`]
/// (`"gdb"`, `"core"`, `"koops"`, `"python"`/`"ruby"`, `"java"`,
/// `"javascript"`); anything else is rejected with
/// [`ParseErrorKind::UnknownTag`]. There is no text grammar for the `"core"`
/// tag — see [`crate::coredump::build_from_debugger_trace`] for the one way
/// a core-dump stacktrace is produced outside the document deserializer.
pub fn parse(tag: &str, input: &str) -> Result<Stacktrace, ParseError> {
    let Some(tag) = Tag::from_str_opt(tag) else {
        trace!(tag, "unrecognized dialect tag");
        return Err(ParseError::new(ParseErrorKind::UnknownTag, 1, 1));
    };
    debug!(?tag, len = input.len(), "dispatching to dialect parser");

    match tag {
        Tag::Debugger => gdb::parse(input).map(Stacktrace::Debugger),
        Tag::KernelOops => koops::parse(input).map(Stacktrace::KernelOops),
        Tag::Script => python::parse(input).map(Stacktrace::Script),
        Tag::Managed => java::parse(input).map(Stacktrace::Managed),
        Tag::Js => js::parse(input).map(Stacktrace::Js),
        Tag::CoreDump => {
            trace!("core-dump tag has no text grammar");
            Err(ParseError::new(
                ParseErrorKind::ExpectedToken("a dialect with a text grammar (core-dump has none)"),
                1,
                1,
            ))
        }
    }
}

/// Serializes `st` to its structured document form. See [`document`].
pub fn to_document(st: &Stacktrace) -> serde_json::Value {
    document::to_document(st)
}

/// Deserializes a stacktrace of dialect `tag` from its document form. See
/// [`document`].
pub fn from_document(
    tag: Tag,
    doc: &serde_json::Value,
) -> Result<Stacktrace, crate::error::DocumentError> {
    document::from_document(tag, doc)
}

/// Renders `st` as a short human-readable text report (spec.md §6 op 4): the
/// first `max_frames` innermost frames of the crash thread only, as a
/// `Stack trace of thread <id>:` header followed by `#<idx> <rendering>`
/// lines (or one unheaded block for the always-single-threaded dialects).
/// Signal-handler markers and unknown-function frames are stripped first.
///
/// At most one header is ever produced, so `short_text(st, k)` is at most
/// `k + 1` lines (spec.md §8) regardless of how many threads `st` has.
pub fn short_text(st: &Stacktrace, max_frames: usize) -> String {
    let (id, frames) = crash_thread_block(st);
    let mut out = String::new();
    if let Some(id) = id {
        out.push_str(&format!("Stack trace of thread {id}:\n"));
    }
    for (idx, frame) in frames.iter().take(max_frames).enumerate() {
        out.push_str(&format!("#{idx} "));
        append_short_frame(frame, &mut out);
        out.push('\n');
    }
    if frames.len() > max_frames {
        trace!(max_frames, "short_text truncated the crash thread's frames");
    }
    out
}

fn append_short_frame(frame: &Frame, buf: &mut String) {
    let text = frame.to_short_text();
    if text.is_empty() {
        buf.push_str(UNKNOWN_FUNCTION);
    } else {
        buf.push_str(&text);
    }
}

/// The single `(thread id, kept frames)` block `short_text` renders: the
/// crash thread for the explicitly-threaded dialects (falling back to the
/// lowest-id thread when no crash thread can be identified), or the flat
/// frame list for the always-single-threaded dialects.
fn crash_thread_block(st: &Stacktrace) -> (Option<i64>, Vec<Frame>) {
    fn keep(f: &Frame) -> bool {
        !f.is_signal_handler() && f.is_known_function()
    }

    match st {
        Stacktrace::KernelOops(_) | Stacktrace::Script(_) | Stacktrace::Js(_) => {
            (None, st.all_frames().into_iter().filter(|f| keep(f)).collect())
        }
        Stacktrace::Debugger(_) | Stacktrace::CoreDump(_) | Stacktrace::Managed(_) => {
            let thread = normalize::find_crash_thread(st)
                .or_else(|| st.threads().iter().min_by_key(|t| t.id()));
            match thread {
                Some(t) => (
                    Some(t.id()),
                    t.frames().iter().filter(|f| keep(f)).cloned().collect(),
                ),
                None => (None, Vec::new()),
            }
        }
    }
}

/// The crash thread of `st`, if one can be identified (spec.md §4.11).
pub fn crash_thread(st: &Stacktrace) -> Option<&Thread> {
    let found = normalize::find_crash_thread(st);
    match &found {
        Some(t) => trace!(thread_id = t.id(), "crash thread identified"),
        None => trace!("no crash thread found"),
    }
    found
}

/// Canonical pre-hash text for deduplication (spec.md §4.11).
pub fn duplication_hash_inputs(st: &Stacktrace) -> String {
    normalize::duplication_hash_inputs(st)
}

/// Hashes arbitrary text into a duplication key.
pub trait Hasher {
    /// Returns a stable hash of `input`.
    fn hash(&self, input: &str) -> String;
}

/// Computes the duplication hash of `st` using `hasher` over
/// [`duplication_hash_inputs`].
pub fn duplication_hash(st: &Stacktrace, hasher: &impl Hasher) -> String {
    hasher.hash(&duplication_hash_inputs(st))
}

/// Reads a named artifact (e.g. a companion minidump or symbol file) by
/// name, for callers that need to pull in out-of-band data before calling
/// [`coredump::build_from_debugger_trace`]. The out-of-scope collaborator
/// named in spec.md §5; no implementation ships in this crate.
pub trait ArtifactReader {
    /// Looks up the artifact named `name`, returning `None` when absent.
    fn read(&self, name: &str) -> Option<String>;
}

#[cfg(test)]
struct MapArtifactReader(std::collections::HashMap<String, String>);

#[cfg(test)]
impl ArtifactReader for MapArtifactReader {
    fn read(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

#[cfg(test)]
struct UppercaseHasher;

#[cfg(test)]
impl Hasher for UppercaseHasher {
    fn hash(&self, input: &str) -> String {
        input.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn unknown_tag_is_rejected() {
        let err = parse("cobol", "whatever").unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnknownTag);
    }

    #[test]
    fn core_tag_has_no_text_grammar() {
        let err = parse("core", "whatever").unwrap_err();
        assert!(matches!(err.kind(), ParseErrorKind::ExpectedToken(_)));
    }

    #[test]
    fn ruby_alias_dispatches_to_script_parser() {
        let input = "Traceback (most recent call last):\n  File \"a.py\", line 1, in f\nStopIteration\n";
        let st = parse("ruby", input).unwrap();
        assert!(matches!(st, Stacktrace::Script(_)));
    }

    #[test]
    fn short_text_strips_unknown_and_signal_handler_frames() {
        use crate::frame::DebuggerFrame;
        use crate::stacktrace::DebuggerStacktrace;
        use crate::thread::DebuggerThread;

        let st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(DebuggerThread {
                tid: 7,
                frames: vec![
                    Frame::Debugger(DebuggerFrame {
                        function_name: Some("known".into()),
                        ..Default::default()
                    }),
                    Frame::Debugger(DebuggerFrame {
                        signal_handler: true,
                        ..Default::default()
                    }),
                    Frame::Debugger(DebuggerFrame::default()),
                ],
                ..Default::default()
            })],
            ..Default::default()
        });
        let text = short_text(&st, 10);
        assert_eq!(text, "Stack trace of thread 7:\n#0 known\n");
    }

    #[test]
    fn short_text_respects_max_frames() {
        use crate::frame::DebuggerFrame;
        use crate::stacktrace::DebuggerStacktrace;
        use crate::thread::DebuggerThread;

        let frames = (0..5)
            .map(|i| {
                Frame::Debugger(DebuggerFrame {
                    function_name: Some(format!("f{i}")),
                    ..Default::default()
                })
            })
            .collect();
        let st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(DebuggerThread {
                frames,
                ..Default::default()
            })],
            ..Default::default()
        });
        let text = short_text(&st, 2);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn duplication_hash_uses_the_supplied_hasher() {
        use crate::frame::DebuggerFrame;
        use crate::stacktrace::DebuggerStacktrace;
        use crate::thread::DebuggerThread;

        let st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(DebuggerThread {
                frames: vec![Frame::Debugger(DebuggerFrame {
                    function_name: Some("boom".into()),
                    ..Default::default()
                })],
                ..Default::default()
            })],
            ..Default::default()
        });
        assert_eq!(duplication_hash(&st, &UppercaseHasher), "BOOM|");
    }

    #[test]
    fn artifact_reader_test_double_round_trips() {
        let mut map = std::collections::HashMap::new();
        map.insert("minidump.sym".to_string(), "contents".to_string());
        let reader = MapArtifactReader(map);
        assert_eq!(reader.read("minidump.sym").as_deref(), Some("contents"));
        assert_eq!(reader.read("missing"), None);
    }
}
