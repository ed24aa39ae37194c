//! The stacktrace model: a collection of threads (or, for always
//! single-threaded dialects, a flat frame list treated as one implicit
//! thread), optionally naming a distinguished crash thread or frame.

use crate::frame::{DebuggerFrame, Frame, JsFrame, KernelOopsFrame, ScriptFrame};
use crate::tag::Tag;
use crate::thread::{LibraryMapping, Thread};

/// The thirteen taint booleans recognized in a kernel oops `Tainted:` line
/// (spec.md §4.5, plus the original's single-character form, spec.md §5.2
/// of `SPEC_FULL.md`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaintFlags {
    /// `P`/"proprietary module" — a non-GPL module is loaded.
    pub proprietary_module: bool,
    /// `O`/"out-of-tree" — a module not built in-tree is loaded.
    pub out_of_tree: bool,
    /// `F`/"forced module" — a module was loaded with `force`.
    pub forced_module: bool,
    /// `R`/"forced removal" — a module was forcibly unloaded.
    pub forced_removal: bool,
    /// `S`/"SMP unsafe" — running SMP-unsafe code on an SMP system.
    pub smp_unsafe: bool,
    /// `M`/"machine check" — a machine check exception occurred.
    pub machine_check: bool,
    /// `B`/"bad page" — a page was released improperly.
    pub page_release: bool,
    /// `U`/"userspace" — a userspace-requested taint.
    pub userspace: bool,
    /// `D`/"died recently" — the kernel previously oopsed or died.
    pub died_recently: bool,
    /// `A`/"ACPI overridden" — the ACPI tables were overridden.
    pub acpi_overridden: bool,
    /// `W`/"warning" — a `WARN_ON` previously fired.
    pub warning: bool,
    /// `C`/"staging driver" — a staging driver is loaded.
    pub staging_driver: bool,
    /// `I`/"firmware workaround" — a firmware bug workaround is active.
    pub firmware_workaround: bool,
}

/// A debugger-dialect stacktrace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebuggerStacktrace {
    /// Ordered threads. Every element's tag is [`Tag::Debugger`].
    pub threads: Vec<Thread>,
    /// A detached crash-frame pointer, printed outside any thread. May or
    /// may not correspond to a frame physically present in `threads`.
    pub crash_frame: Option<DebuggerFrame>,
    /// Shared-library table, consulted read-only during library-name
    /// resolution.
    pub library_table: Vec<LibraryMapping>,
}

/// A core-dump-dialect stacktrace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreDumpStacktrace {
    /// The fatal signal number.
    pub signal: u16,
    /// Path to the crashed executable.
    pub executable: String,
    /// Ordered threads. Every element's tag is [`Tag::CoreDump`].
    pub threads: Vec<Thread>,
    /// Id of the crash thread, if one was recorded.
    pub crash_thread_id: Option<i64>,
    /// Whether `threads` contains only the crash thread (the document was
    /// not a complete multi-thread dump).
    pub only_crash_thread: bool,
}

/// A kernel-oops-dialect stacktrace. Always single-threaded; frames are
/// stored flat rather than wrapped in a `Thread`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelOopsStacktrace {
    /// `Linux version <v>` string, if present.
    pub kernel_version: Option<String>,
    /// Parsed `Tainted:` flags.
    pub taint: TaintFlags,
    /// `Modules linked in:` list, in the order printed.
    pub modules: Vec<String>,
    /// Ordered call-trace frames, innermost first.
    pub frames: Vec<KernelOopsFrame>,
}

/// A scripting-language-dialect stacktrace (indentation form). Always
/// single-threaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptStacktrace {
    /// Qualified exception class name from the terminator line.
    pub exception_class: String,
    /// Exception message, if the terminator line had one.
    pub exception_message: Option<String>,
    /// Ordered frames, innermost first.
    pub frames: Vec<ScriptFrame>,
}

/// A managed-runtime-dialect stacktrace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagedStacktrace {
    /// Ordered threads (commonly exactly one). Every element's tag is
    /// [`Tag::Managed`].
    pub threads: Vec<Thread>,
}

/// A JavaScript-dialect stacktrace. Always single-threaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsStacktrace {
    /// Exception name from the optional preamble.
    pub exception_name: Option<String>,
    /// Exception message from the optional preamble.
    pub exception_message: Option<String>,
    /// Ordered frames, innermost first.
    pub frames: Vec<JsFrame>,
}

/// The top-level crash report model: a set of threads (or an implicit
/// single thread), uniform across all six dialects.
#[derive(Clone, Debug, PartialEq)]
pub enum Stacktrace {
    /// A debugger transcript.
    Debugger(DebuggerStacktrace),
    /// A structured core-dump document.
    CoreDump(CoreDumpStacktrace),
    /// A kernel oops buffer.
    KernelOops(KernelOopsStacktrace),
    /// A scripting-language traceback.
    Script(ScriptStacktrace),
    /// A managed-runtime exception chain.
    Managed(ManagedStacktrace),
    /// A JavaScript stack trace.
    Js(JsStacktrace),
}

impl Stacktrace {
    /// The dialect tag of this stacktrace.
    pub fn tag(&self) -> Tag {
        match self {
            Stacktrace::Debugger(_) => Tag::Debugger,
            Stacktrace::CoreDump(_) => Tag::CoreDump,
            Stacktrace::KernelOops(_) => Tag::KernelOops,
            Stacktrace::Script(_) => Tag::Script,
            Stacktrace::Managed(_) => Tag::Managed,
            Stacktrace::Js(_) => Tag::Js,
        }
    }

    /// The explicit threads of this stacktrace, for the three dialects that
    /// have real `Thread` values. Empty (not absent) for the three
    /// always-single-threaded dialects.
    pub fn threads(&self) -> &[Thread] {
        match self {
            Stacktrace::Debugger(s) => &s.threads,
            Stacktrace::CoreDump(s) => &s.threads,
            Stacktrace::Managed(s) => &s.threads,
            Stacktrace::KernelOops(_) | Stacktrace::Script(_) | Stacktrace::Js(_) => &[],
        }
    }

    /// Mutable access to the explicit thread list, when this dialect has
    /// one.
    pub fn threads_mut(&mut self) -> Option<&mut Vec<Thread>> {
        match self {
            Stacktrace::Debugger(s) => Some(&mut s.threads),
            Stacktrace::CoreDump(s) => Some(&mut s.threads),
            Stacktrace::Managed(s) => Some(&mut s.threads),
            Stacktrace::KernelOops(_) | Stacktrace::Script(_) | Stacktrace::Js(_) => None,
        }
    }

    /// Every frame of every thread, in thread order then frame order,
    /// rendered as the common [`Frame`] view. For always-single-threaded
    /// dialects this wraps the dialect's flat frame list.
    pub fn all_frames(&self) -> Vec<Frame> {
        match self {
            Stacktrace::Debugger(s) => s
                .threads
                .iter()
                .flat_map(|t| t.frames().iter().cloned())
                .collect(),
            Stacktrace::CoreDump(s) => s
                .threads
                .iter()
                .flat_map(|t| t.frames().iter().cloned())
                .collect(),
            Stacktrace::Managed(s) => s
                .threads
                .iter()
                .flat_map(|t| t.frames().iter().cloned())
                .collect(),
            Stacktrace::KernelOops(s) => {
                s.frames.iter().cloned().map(Frame::KernelOops).collect()
            }
            Stacktrace::Script(s) => s.frames.iter().cloned().map(Frame::Script).collect(),
            Stacktrace::Js(s) => s.frames.iter().cloned().map(Frame::Js).collect(),
        }
    }

    /// Deep-copies this stacktrace.
    pub fn duplicate(&self) -> Stacktrace {
        self.clone()
    }
}
