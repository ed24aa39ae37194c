//! Normalization, pruning, quality scoring, and crash-thread discovery
//! (spec.md §4.11).

use std::cmp::Ordering;

use crate::compare::compare_frame_distance;
use crate::frame::Frame;
use crate::stacktrace::Stacktrace;
use crate::thread::Thread;

/// Well-known libc/runtime abort entry points that the pruner treats as
/// uninteresting regardless of dialect, grounded on the original's
/// `sr_frame_calls_func`-style name matching (`lib/java_frame.c`,
/// `lib/frame.c` in `original_source/`).
const UNINTERESTING_FUNCTIONS: &[&str] = &[
    "abort",
    "raise",
    "__assert_fail",
    "__assert_fail_base",
    "__libc_message",
    "malloc_printerr",
    "__fortify_fail",
    "std::terminate",
    "__cxa_throw",
];

/// Whether `name` is a well-known abort/signal entry point that carries no
/// diagnostic value in a crash thread (spec.md §4.11 pruner, supplemented
/// per `SPEC_FULL.md` §5).
pub fn is_uninteresting_function(name: &str) -> bool {
    UNINTERESTING_FUNCTIONS.contains(&name)
}

/// `(ok, all)` frame counts for quality scoring: `ok` counts frames whose
/// function identity is known, using each dialect's own predicate.
pub fn quality_counts(frames: &[Frame]) -> (u32, u32) {
    let all = frames.len() as u32;
    let ok = frames.iter().filter(|f| f.is_known_function()).count() as u32;
    (ok, all)
}

fn ratio(ok: u32, all: u32) -> f32 {
    if all == 0 {
        1.0
    } else {
        ok as f32 / all as f32
    }
}

/// The crash thread of `st`, if one can be identified.
///
/// - Debugger: the thread whose top frame matches the stacktrace's detached
///   crash frame under [`compare_frame_distance`]; ties favor the lowest
///   thread id; no match yields `None`.
/// - CoreDump: the thread named by the stored crash-thread id, if any.
/// - All other dialects have no crash-thread concept and always return
///   `None` (kernel-oops/script/js are single-threaded by construction, and
///   a managed stacktrace does not single out a "crashing" thread).
pub fn find_crash_thread(st: &Stacktrace) -> Option<&Thread> {
    match st {
        Stacktrace::Debugger(s) => {
            let crash_frame = Frame::Debugger(s.crash_frame.clone()?);
            let mut best: Option<&Thread> = None;
            for t in &s.threads {
                let Some(top) = t.frames().first() else {
                    continue;
                };
                if compare_frame_distance(top, &crash_frame) == Ordering::Equal {
                    best = match best {
                        None => Some(t),
                        Some(b) if t.id() < b.id() => Some(t),
                        Some(b) => Some(b),
                    };
                }
            }
            best
        }
        Stacktrace::CoreDump(s) => {
            let id = s.crash_thread_id?;
            s.threads.iter().find(|t| t.id() == id)
        }
        Stacktrace::KernelOops(_) | Stacktrace::Script(_) | Stacktrace::Managed(_) | Stacktrace::Js(_) => {
            None
        }
    }
}

/// The frames used for quality scoring and deduplication: the crash
/// thread's frames if one was found, otherwise every frame of the
/// stacktrace (the natural fallback for the always-single-threaded
/// dialects, where there is exactly one frame list to begin with).
fn relevant_frames(st: &Stacktrace) -> Vec<Frame> {
    match find_crash_thread(st) {
        Some(t) => t.frames().to_vec(),
        None => st.all_frames(),
    }
}

/// Simple quality ratio in `[0, 1]`: `ok / all` known-function frames
/// across the whole stacktrace.
pub fn quality_simple(st: &Stacktrace) -> f32 {
    let frames = st.all_frames();
    let (ok, all) = quality_counts(&frames);
    ratio(ok, all)
}

/// Weighted quality ratio (debugger dialect only): the crash thread
/// contributes 60% of the score and other threads 40%; within the crash
/// thread, the innermost five frames count double.
pub fn quality_complex(st: &Stacktrace) -> f32 {
    let Stacktrace::Debugger(s) = st else {
        return quality_simple(st);
    };

    let crash = find_crash_thread(st);
    let crash_quality = match crash {
        Some(t) => weighted_thread_quality(t.frames()),
        None => 1.0,
    };

    let other_frames: Vec<Frame> = s
        .threads
        .iter()
        .filter(|t| !matches!(crash, Some(c) if std::ptr::eq(*t, c)))
        .flat_map(|t| t.frames().iter().cloned())
        .collect();
    let (ok, all) = quality_counts(&other_frames);
    let other_quality = ratio(ok, all);

    0.6 * crash_quality + 0.4 * other_quality
}

fn weighted_thread_quality(frames: &[Frame]) -> f32 {
    if frames.is_empty() {
        return 1.0;
    }
    let mut ok_weight = 0.0f32;
    let mut all_weight = 0.0f32;
    for (i, f) in frames.iter().enumerate() {
        let weight = if i < 5 { 2.0 } else { 1.0 };
        all_weight += weight;
        if f.is_known_function() {
            ok_weight += weight;
        }
    }
    ok_weight / all_weight
}

/// Keeps only the innermost `n` frames of every thread (explicit dialects)
/// or of the flat frame list (always-single-threaded dialects).
pub fn limit_frame_depth(st: &mut Stacktrace, n: usize) {
    match st {
        Stacktrace::Debugger(s) => {
            for t in &mut s.threads {
                t.limit_frame_depth(n);
            }
        }
        Stacktrace::CoreDump(s) => {
            for t in &mut s.threads {
                t.limit_frame_depth(n);
            }
        }
        Stacktrace::Managed(s) => {
            for t in &mut s.threads {
                t.limit_frame_depth(n);
            }
        }
        Stacktrace::KernelOops(s) => {
            if s.frames.len() > n {
                s.frames.truncate(n);
            }
        }
        Stacktrace::Script(s) => {
            if s.frames.len() > n {
                s.frames.truncate(n);
            }
        }
        Stacktrace::Js(s) => {
            if s.frames.len() > n {
                s.frames.truncate(n);
            }
        }
    }
}

/// Drops frames whose function identity is unknown, from every thread
/// (explicit dialects) or the flat frame list (implicit dialects).
pub fn drop_unknown_frames(st: &mut Stacktrace) {
    match st {
        Stacktrace::Debugger(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(|f| f.is_known_function());
            }
        }
        Stacktrace::CoreDump(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(|f| f.is_known_function());
            }
        }
        Stacktrace::Managed(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(|f| f.is_known_function());
            }
        }
        Stacktrace::KernelOops(s) => s.frames.retain(|f| f.function_name.is_some()),
        Stacktrace::Script(s) => s.frames.retain(|f| !f.special_function),
        Stacktrace::Js(s) => s.frames.retain(|f| f.function_name.is_some() || f.is_native),
    }
}

/// Drops frames calling a well-known uninteresting abort entry point (see
/// [`is_uninteresting_function`]), from every thread or the flat frame
/// list.
pub fn drop_uninteresting_frames(st: &mut Stacktrace) {
    fn keep(f: &Frame) -> bool {
        let name = match f {
            Frame::Debugger(f) => f.function_name.as_deref(),
            Frame::CoreDump(f) => f.function_name.as_deref(),
            Frame::KernelOops(f) => f.function_name.as_deref(),
            Frame::Script(f) => Some(f.function_name.as_str()),
            Frame::Managed(crate::frame::ManagedFrame::Method(m)) => Some(m.name.as_str()),
            Frame::Managed(crate::frame::ManagedFrame::Exception(_)) => None,
            Frame::Js(f) => f.function_name.as_deref(),
        };
        !matches!(name, Some(n) if is_uninteresting_function(n))
    }

    match st {
        Stacktrace::Debugger(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(keep);
            }
        }
        Stacktrace::CoreDump(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(keep);
            }
        }
        Stacktrace::Managed(s) => {
            for t in &mut s.threads {
                t.frames_mut().retain(keep);
            }
        }
        Stacktrace::KernelOops(s) => s.frames.retain(|f| {
            !matches!(f.function_name.as_deref(), Some(n) if is_uninteresting_function(n))
        }),
        Stacktrace::Script(s) => s.frames.retain(|f| !is_uninteresting_function(&f.function_name)),
        Stacktrace::Js(s) => s.frames.retain(|f| {
            !matches!(f.function_name.as_deref(), Some(n) if is_uninteresting_function(n))
        }),
    }
}

/// Options controlling [`NormalizationOptions::apply`], the façade's single
/// entry point for pruning a stacktrace before scoring or hashing it.
#[derive(Clone, Copy, Debug)]
pub struct NormalizationOptions {
    /// Keep only the innermost `n` frames of each thread, if set.
    pub max_frame_depth: Option<usize>,
    /// Drop frames with no known function identity.
    pub drop_unknown: bool,
    /// Drop frames calling a well-known uninteresting abort entry point.
    pub drop_uninteresting: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        NormalizationOptions {
            max_frame_depth: None,
            drop_unknown: false,
            drop_uninteresting: false,
        }
    }
}

impl NormalizationOptions {
    /// Applies the configured pruning steps to `st` in place, uninteresting
    /// frames first, then unknown frames, then depth limiting.
    pub fn apply(&self, st: &mut Stacktrace) {
        if self.drop_uninteresting {
            drop_uninteresting_frames(st);
        }
        if self.drop_unknown {
            drop_unknown_frames(st);
        }
        if let Some(n) = self.max_frame_depth {
            limit_frame_depth(st, n);
        }
    }
}

/// Canonical pre-hash text for deduplication: the crash thread's frames
/// (normalized: unknown frames stripped), each rendered as
/// `<function>|<library>` and joined by newlines.
pub fn duplication_hash_inputs(st: &Stacktrace) -> String {
    let mut frames = relevant_frames(st);
    frames.retain(|f| f.is_known_function());

    let mut lines = Vec::with_capacity(frames.len());
    for f in &frames {
        let function = f.to_short_text();
        let library = f.library_name().unwrap_or("");
        lines.push(format!("{function}|{library}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DebuggerFrame;
    use crate::stacktrace::DebuggerStacktrace;
    use crate::thread::DebuggerThread;

    fn known(name: &str) -> Frame {
        Frame::Debugger(DebuggerFrame {
            function_name: Some(name.into()),
            ..Default::default()
        })
    }

    fn unknown() -> Frame {
        Frame::Debugger(DebuggerFrame::default())
    }

    #[test]
    fn quality_counts_empty_is_one() {
        assert_eq!(ratio(quality_counts(&[]).0, quality_counts(&[]).1), 1.0);
    }

    #[test]
    fn quality_counts_half_known() {
        let frames = vec![known("a"), unknown()];
        assert_eq!(quality_counts(&frames), (1, 2));
    }

    #[test]
    fn crash_thread_discovery_picks_lowest_id_on_tie() {
        let crash_frame = DebuggerFrame {
            function_name: Some("boom".into()),
            ..Default::default()
        };
        let mut t1 = DebuggerThread {
            tid: 5,
            frames: vec![Frame::Debugger(crash_frame.clone())],
            ..Default::default()
        };
        let t2 = DebuggerThread {
            tid: 2,
            frames: vec![Frame::Debugger(crash_frame.clone())],
            ..Default::default()
        };
        t1.frames.push(known("other"));
        let st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(t1), Thread::Debugger(t2)],
            crash_frame: Some(crash_frame),
            ..Default::default()
        });
        let found = find_crash_thread(&st).unwrap();
        assert_eq!(found.id(), 2);
    }

    #[test]
    fn no_crash_frame_means_no_crash_thread() {
        let st = Stacktrace::Debugger(DebuggerStacktrace::default());
        assert!(find_crash_thread(&st).is_none());
    }

    #[test]
    fn limit_frame_depth_is_idempotent_on_stacktrace() {
        let mut st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(DebuggerThread {
                frames: vec![known("a"), known("b"), known("c")],
                ..Default::default()
            })],
            ..Default::default()
        });
        limit_frame_depth(&mut st, 2);
        limit_frame_depth(&mut st, 5);
        assert_eq!(st.threads()[0].frames().len(), 2);
    }
}
