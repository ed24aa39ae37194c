//! Core-dump dialect builder (`core` tag).
//!
//! A core-dump stacktrace is normally produced only by the document
//! deserializer (spec.md §4.4, §4.9) — no text format exists for it. The one
//! exception is this builder: it lifts a debugger-dialect textual trace into
//! a [`CoreDumpStacktrace`] using an external address resolver, for hosts
//! that only have a gdb transcript plus an out-of-band symbol table.

use crate::error::ParseError;
use crate::frame::{CoreDumpFrame, Frame};
use crate::gdb;
use crate::stacktrace::CoreDumpStacktrace;
use crate::thread::{CoreDumpThread, Thread};

/// Resolves a raw instruction address to its owning binary and symbol. The
/// out-of-scope collaborator named in spec.md §4.4; no implementation ships
/// in this crate.
pub trait AddressResolver {
    /// Looks up `address`, returning `None` when nothing maps it.
    fn resolve(&self, address: u64) -> Option<AddressInfo>;
}

/// What an [`AddressResolver`] knows about one instruction address.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddressInfo {
    /// Opaque per-binary identifier.
    pub build_id: Option<String>,
    /// Offset of the address within the binary identified by `build_id`.
    pub build_id_offset: Option<u64>,
    /// Resolved source file name.
    pub file_name: Option<String>,
    /// Resolved function name.
    pub function_name: Option<String>,
}

/// Builds a [`CoreDumpStacktrace`] from a debugger-dialect textual trace,
/// resolving each frame's address through `resolver`. Frames left
/// unresolved fall back to whatever the debugger transcript itself carried
/// (its own `function_name`/`source_file`, if any).
pub fn build_from_debugger_trace(
    debugger_trace: &str,
    resolver: &impl AddressResolver,
) -> Result<CoreDumpStacktrace, ParseError> {
    let parsed = gdb::parse(debugger_trace)?;

    let threads = parsed
        .threads
        .into_iter()
        .map(|t| convert_thread(t, resolver))
        .collect();

    Ok(CoreDumpStacktrace {
        signal: 0,
        executable: String::new(),
        threads,
        crash_thread_id: None,
        only_crash_thread: false,
    })
}

fn convert_thread(thread: Thread, resolver: &impl AddressResolver) -> Thread {
    let Thread::Debugger(t) = thread else {
        return thread;
    };
    let frames = t
        .frames
        .into_iter()
        .map(|f| convert_frame(f, resolver))
        .collect();
    Thread::CoreDump(CoreDumpThread {
        thread_id: t.tid as i64,
        frames,
    })
}

fn convert_frame(frame: Frame, resolver: &impl AddressResolver) -> Frame {
    let Frame::Debugger(f) = frame else {
        return frame;
    };
    let resolved = f.address.and_then(|addr| resolver.resolve(addr));
    let (build_id, build_id_offset, mut file_name, mut function_name) = match resolved {
        Some(info) => (
            info.build_id,
            info.build_id_offset,
            info.file_name,
            info.function_name,
        ),
        None => (None, None, None, None),
    };
    if function_name.is_none() {
        function_name = f.function_name;
    }
    if file_name.is_none() {
        file_name = f.source_file;
    }

    Frame::CoreDump(CoreDumpFrame {
        address: f.address,
        build_id,
        build_id_offset,
        function_name,
        file_name,
        fingerprint: None,
        fingerprint_hashed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use std::collections::HashMap;

    struct MapResolver(HashMap<u64, AddressInfo>);

    impl AddressResolver for MapResolver {
        fn resolve(&self, address: u64) -> Option<AddressInfo> {
            self.0.get(&address).cloned()
        }
    }

    #[test]
    fn resolved_frame_prefers_resolver_output() {
        let mut map = HashMap::new();
        map.insert(
            0x322a2362b9,
            AddressInfo {
                build_id: Some("abc123".into()),
                build_id_offset: Some(0x10),
                file_name: Some("pixman-bits-image.c".into()),
                function_name: Some("repeat".into()),
            },
        );
        let resolver = MapResolver(map);

        let trace = "#0  0x000000322a2362b9 in unresolved_name () at fallback.c:1\n";
        let st = build_from_debugger_trace(trace, &resolver).unwrap();
        assert_eq!(st.threads.len(), 1);
        let Frame::CoreDump(f) = &st.threads[0].frames()[0] else {
            panic!("expected core-dump frame");
        };
        assert_eq!(f.build_id.as_deref(), Some("abc123"));
        assert_eq!(f.function_name.as_deref(), Some("repeat"));
    }

    #[test]
    fn unresolved_frame_falls_back_to_debugger_text() {
        let resolver = MapResolver(HashMap::new());
        let trace = "#0  0x1 in foo () at foo.c:1\n";
        let st = build_from_debugger_trace(trace, &resolver).unwrap();
        let Frame::CoreDump(f) = &st.threads[0].frames()[0] else {
            panic!("expected core-dump frame");
        };
        assert_eq!(f.function_name.as_deref(), Some("foo"));
        assert_eq!(f.build_id, None);
    }
}
