//! Total ordering ([`compare`]) and the weaker deduplication ordering
//! ([`compare_distance`]) over frames, threads, and stacktraces.
//!
//! # Distance field masks
//!
//! The fields a dialect's [`compare_distance`] ignores relative to its
//! strict [`compare`] (Open Question from spec.md §9 — the source never
//! states these explicitly, they are inferred from its comparator code):
//!
//! | Dialect | Ignored vs. strict compare | Unknown-equivalence |
//! |---|---|---|
//! | Debugger | `address`, `frame_number` | function name: never equal across two unknowns (tiebreak by address); library: unknown (`None`) == unknown |
//! | CoreDump | `address` when a `build_id` or `function_name`/`file_name` pair is available | function name: as above |
//! | KernelOops | `function_offset`/`function_length` exact value (rounded to the nearest 16 bytes), `address`, `reliable` | function name: as above; module: unknown == unknown |
//! | Script | `file_line` within ±2 | function name: `special_function` frames never equal across two frames |
//! | Managed | `source_line` within ±2, `class_path` | method name always "known" (no equivalence class) |
//! | Js | `file_line`/`file_column` within ±2 | function name: as above |
//!
//! "Within ±K" means two values at most `K` apart compare equal under
//! distance; `K = 2` was chosen as a deliberately small tolerance for
//! compiler/interpreter line-table jitter between otherwise-identical
//! builds (see `DESIGN.md`).

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::frame::{Frame, ManagedFrame};
use crate::stacktrace::Stacktrace;
use crate::thread::Thread;

const LINE_TOLERANCE: i64 = 2;
const OFFSET_TOLERANCE: u64 = 16;

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-[0-9][0-9.]*(\.so[0-9.]*)?$|\.so(\.[0-9]+)*$").unwrap());

/// Strips a trailing shared-object version suffix (`libc-2.31.so` →
/// `libc`, `libfoo.so.6` → `libfoo`), so library paths differing only in
/// version compare equal under [`compare_distance`].
fn normalize_library(name: &str) -> String {
    let trimmed = VERSION_SUFFIX.replace(name, "");
    trimmed.into_owned()
}

fn compare_rounded_line(a: Option<u32>, b: Option<u32>, tolerance: i64) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if (a as i64 - b as i64).abs() <= tolerance {
                Ordering::Equal
            } else {
                a.cmp(&b)
            }
        }
    }
}

fn compare_rounded_offset(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if a.abs_diff(b) <= OFFSET_TOLERANCE {
                Ordering::Equal
            } else {
                a.cmp(&b)
            }
        }
    }
}

/// Identity key for a possibly-unknown function name under
/// [`compare_distance`]: known names compare by name alone (location-blind);
/// unknown names ("??", empty, or a dialect's own "special"/anonymous
/// marker) additionally compare by `address` so two unrelated unknown
/// frames do not collapse into the same equivalence class, while a
/// duplicated frame (same address) still compares equal to itself.
fn distance_function_identity<'a>(
    name: Option<&'a str>,
    address: Option<u64>,
) -> (bool, Option<&'a str>, Option<u64>) {
    match name {
        Some(n) => (true, Some(n), None),
        None => (false, None, address),
    }
}

fn library_key(name: Option<&str>) -> Option<String> {
    name.map(normalize_library)
}

/// Total ordering between two frames. Mismatched tags are never equal;
/// [`crate::Tag`] itself orders them so the overall relation stays total.
pub fn compare_frame(a: &Frame, b: &Frame) -> Ordering {
    a.tag().cmp(&b.tag()).then_with(|| match (a, b) {
        (Frame::Debugger(a), Frame::Debugger(b)) => a
            .function_name
            .cmp(&b.function_name)
            .then_with(|| a.function_type.cmp(&b.function_type))
            .then_with(|| a.source_file.cmp(&b.source_file))
            .then_with(|| a.source_line.cmp(&b.source_line))
            .then_with(|| a.library_name.cmp(&b.library_name))
            .then_with(|| a.signal_handler.cmp(&b.signal_handler))
            .then_with(|| a.address.cmp(&b.address))
            .then_with(|| a.frame_number.cmp(&b.frame_number)),
        (Frame::CoreDump(a), Frame::CoreDump(b)) => {
            match (&a.build_id, &b.build_id) {
                (Some(_), Some(_)) => a
                    .build_id
                    .cmp(&b.build_id)
                    .then_with(|| a.build_id_offset.cmp(&b.build_id_offset)),
                _ => a
                    .function_name
                    .cmp(&b.function_name)
                    .then_with(|| a.file_name.cmp(&b.file_name))
                    .then_with(|| a.address.cmp(&b.address)),
            }
        }
        (Frame::KernelOops(a), Frame::KernelOops(b)) => a
            .function_name
            .cmp(&b.function_name)
            .then_with(|| a.function_offset.cmp(&b.function_offset))
            .then_with(|| a.module_name.cmp(&b.module_name))
            .then_with(|| a.reliable.cmp(&b.reliable)),
        (Frame::Script(a), Frame::Script(b)) => a
            .file_name
            .cmp(&b.file_name)
            .then_with(|| a.function_name.cmp(&b.function_name))
            .then_with(|| a.file_line.cmp(&b.file_line)),
        (Frame::Managed(a), Frame::Managed(b)) => compare_managed(a, b),
        (Frame::Js(a), Frame::Js(b)) => a
            .function_name
            .cmp(&b.function_name)
            .then_with(|| a.file_name.cmp(&b.file_name))
            .then_with(|| a.file_line.cmp(&b.file_line))
            .then_with(|| a.file_column.cmp(&b.file_column)),
        _ => unreachable!("tag comparison already distinguished mismatched variants"),
    })
}

fn compare_managed(a: &ManagedFrame, b: &ManagedFrame) -> Ordering {
    // Method sorts before Exception when shapes differ, giving a total
    // order even though the fields below don't apply identically to both.
    let shape = |f: &ManagedFrame| matches!(f, ManagedFrame::Exception(_));
    shape(a).cmp(&shape(b)).then_with(|| match (a, b) {
        (ManagedFrame::Method(a), ManagedFrame::Method(b)) => a
            .name
            .cmp(&b.name)
            .then_with(|| a.source_file.cmp(&b.source_file))
            .then_with(|| a.source_line.cmp(&b.source_line))
            .then_with(|| a.class_path.cmp(&b.class_path))
            .then_with(|| a.is_native.cmp(&b.is_native)),
        (ManagedFrame::Exception(a), ManagedFrame::Exception(b)) => a
            .type_name
            .cmp(&b.type_name)
            .then_with(|| a.message.cmp(&b.message)),
        _ => Ordering::Equal,
    })
}

/// The weaker "distance" ordering used for deduplication: benignly-varying
/// fields are ignored, per the masks documented at the top of this module.
pub fn compare_frame_distance(a: &Frame, b: &Frame) -> Ordering {
    a.tag().cmp(&b.tag()).then_with(|| match (a, b) {
        (Frame::Debugger(a), Frame::Debugger(b)) => {
            distance_function_identity(a.function_name.as_deref(), a.address)
                .cmp(&distance_function_identity(b.function_name.as_deref(), b.address))
                .then_with(|| a.source_file.cmp(&b.source_file))
                .then_with(|| compare_rounded_line(a.source_line, b.source_line, LINE_TOLERANCE))
                .then_with(|| {
                    library_key(a.library_name.as_deref()).cmp(&library_key(b.library_name.as_deref()))
                })
        }
        (Frame::CoreDump(a), Frame::CoreDump(b)) => match (&a.build_id, &b.build_id) {
            (Some(_), Some(_)) => a
                .build_id
                .cmp(&b.build_id)
                .then_with(|| a.build_id_offset.cmp(&b.build_id_offset)),
            _ => distance_function_identity(a.function_name.as_deref(), a.address).cmp(
                &distance_function_identity(b.function_name.as_deref(), b.address),
            )
            .then_with(|| a.file_name.cmp(&b.file_name)),
        },
        (Frame::KernelOops(a), Frame::KernelOops(b)) => {
            distance_function_identity(a.function_name.as_deref(), Some(a.address))
                .cmp(&distance_function_identity(
                    b.function_name.as_deref(),
                    Some(b.address),
                ))
                .then_with(|| compare_rounded_offset(a.function_offset, b.function_offset))
                .then_with(|| {
                    library_key(a.module_name.as_deref()).cmp(&library_key(b.module_name.as_deref()))
                })
        }
        (Frame::Script(a), Frame::Script(b)) => {
            let name_a = if a.special_function { None } else { Some(a.function_name.as_str()) };
            let name_b = if b.special_function { None } else { Some(b.function_name.as_str()) };
            distance_function_identity(name_a, None)
                .cmp(&distance_function_identity(name_b, None))
                .then_with(|| a.file_name.cmp(&b.file_name))
                .then_with(|| compare_rounded_line(Some(a.file_line), Some(b.file_line), LINE_TOLERANCE))
        }
        (Frame::Managed(a), Frame::Managed(b)) => compare_managed_distance(a, b),
        (Frame::Js(a), Frame::Js(b)) => {
            distance_function_identity(a.function_name.as_deref(), None)
                .cmp(&distance_function_identity(b.function_name.as_deref(), None))
                .then_with(|| a.file_name.cmp(&b.file_name))
                .then_with(|| compare_rounded_line(Some(a.file_line), Some(b.file_line), LINE_TOLERANCE))
        }
        _ => unreachable!("tag comparison already distinguished mismatched variants"),
    })
}

fn compare_managed_distance(a: &ManagedFrame, b: &ManagedFrame) -> Ordering {
    let shape = |f: &ManagedFrame| matches!(f, ManagedFrame::Exception(_));
    shape(a).cmp(&shape(b)).then_with(|| match (a, b) {
        (ManagedFrame::Method(a), ManagedFrame::Method(b)) => a
            .name
            .cmp(&b.name)
            .then_with(|| a.source_file.cmp(&b.source_file))
            .then_with(|| compare_rounded_line(a.source_line, b.source_line, LINE_TOLERANCE)),
        (ManagedFrame::Exception(a), ManagedFrame::Exception(b)) => {
            a.type_name.cmp(&b.type_name)
        }
        _ => Ordering::Equal,
    })
}

fn compare_frame_lists(a: &[Frame], b: &[Frame], distance: bool) -> Ordering {
    let cmp = if distance { compare_frame_distance } else { compare_frame };
    for (fa, fb) in a.iter().zip(b.iter()) {
        let ord = cmp(fa, fb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    // A strict prefix is "less" than the longer list.
    a.len().cmp(&b.len())
}

/// Total ordering between two threads: tag, then id, then frame list.
pub fn compare_thread(a: &Thread, b: &Thread) -> Ordering {
    a.tag()
        .cmp(&b.tag())
        .then_with(|| a.id().cmp(&b.id()))
        .then_with(|| compare_frame_lists(a.frames(), b.frames(), false))
}

/// Distance ordering between two threads.
pub fn compare_thread_distance(a: &Thread, b: &Thread) -> Ordering {
    a.tag()
        .cmp(&b.tag())
        .then_with(|| compare_frame_lists(a.frames(), b.frames(), true))
}

/// The crash thread first (if any), then the remaining threads sorted by id.
fn ordered_threads(st: &Stacktrace) -> Vec<&Thread> {
    let crash = crate::normalize::find_crash_thread(st);
    let mut rest: Vec<&Thread> = st
        .threads()
        .iter()
        .filter(|t| !matches!(crash, Some(c) if std::ptr::eq(*t, c)))
        .collect();
    rest.sort_by(|x, y| x.id().cmp(&y.id()));
    match crash {
        Some(c) => std::iter::once(c).chain(rest).collect(),
        None => rest,
    }
}

/// Total ordering between two stacktraces: crash thread first, then
/// remaining threads sorted by id.
pub fn compare_stacktrace(a: &Stacktrace, b: &Stacktrace) -> Ordering {
    a.tag().cmp(&b.tag()).then_with(|| {
        let ta = ordered_threads(a);
        let tb = ordered_threads(b);
        for (x, y) in ta.iter().zip(tb.iter()) {
            let ord = compare_thread(x, y);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        ta.len()
            .cmp(&tb.len())
            .then_with(|| compare_frame_lists(&a.all_frames(), &b.all_frames(), false))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CoreDumpFrame;

    #[test]
    fn compare_is_antisymmetric_and_reflexive() {
        let a = Frame::Debugger(crate::frame::DebuggerFrame {
            function_name: Some("foo".into()),
            ..Default::default()
        });
        let b = Frame::Debugger(crate::frame::DebuggerFrame {
            function_name: Some("bar".into()),
            ..Default::default()
        });
        assert_eq!(compare_frame(&a, &a), Ordering::Equal);
        assert_eq!(compare_frame(&a, &b).reverse(), compare_frame(&b, &a));
    }

    #[test]
    fn distance_equal_build_id_different_address() {
        let a = Frame::CoreDump(CoreDumpFrame {
            build_id: Some("abc123".into()),
            build_id_offset: Some(10),
            address: Some(0x1000),
            ..Default::default()
        });
        let b = Frame::CoreDump(CoreDumpFrame {
            build_id: Some("abc123".into()),
            build_id_offset: Some(10),
            address: Some(0x2000),
            ..Default::default()
        });
        assert_eq!(compare_frame_distance(&a, &b), Ordering::Equal);
        assert_ne!(compare_frame(&a, &b), Ordering::Equal);
    }

    #[test]
    fn distance_never_merges_two_unknown_functions_at_different_addresses() {
        let a = Frame::Debugger(crate::frame::DebuggerFrame {
            address: Some(0x1),
            ..Default::default()
        });
        let b = Frame::Debugger(crate::frame::DebuggerFrame {
            address: Some(0x2),
            ..Default::default()
        });
        assert_ne!(compare_frame_distance(&a, &b), Ordering::Equal);
    }

    #[test]
    fn distance_unknown_library_markers_are_equal() {
        let a = Frame::Debugger(crate::frame::DebuggerFrame {
            function_name: Some("foo".into()),
            library_name: None,
            ..Default::default()
        });
        let b = Frame::Debugger(crate::frame::DebuggerFrame {
            function_name: Some("foo".into()),
            library_name: None,
            ..Default::default()
        });
        assert_eq!(compare_frame_distance(&a, &b), Ordering::Equal);
    }

    #[test]
    fn distance_strips_version_suffix() {
        assert_eq!(normalize_library("libc-2.31.so"), "libc");
        assert_eq!(normalize_library("libfoo.so.6"), "libfoo");
    }
}
