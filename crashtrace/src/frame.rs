//! The frame model: six dialect-specific shapes behind one polymorphic
//! enum, following the `Object` enum of `symbolic-debuginfo::object` (one
//! variant per format, a `match_inner!`-style macro for the operations that
//! are identical in shape across variants).

use std::fmt::Write as _;

use crate::tag::Tag;

/// Placeholder used for a missing function name when rendering short text,
/// matching the convention of `UNKNOWN_NAME` in Breakpad-style tooling.
pub const UNKNOWN_FUNCTION: &str = "??";

/// A single call-stack entry. See the module docs of `crate` for the shape
/// of each dialect.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// A C/C++ debugger transcript frame (`#<n> ...`).
    Debugger(DebuggerFrame),
    /// A structured core-dump frame.
    CoreDump(CoreDumpFrame),
    /// A Linux kernel oops call-trace frame.
    KernelOops(KernelOopsFrame),
    /// A scripting-language traceback frame.
    Script(ScriptFrame),
    /// A managed-runtime method frame or exception header.
    Managed(ManagedFrame),
    /// A JavaScript engine-native frame.
    Js(JsFrame),
}

/// Applies `$expr` to the inner value of whichever [`Frame`] variant
/// `$value` holds. Mirrors `symbolic_debuginfo::object::match_inner!`.
macro_rules! match_frame {
    ($value:expr, $pat:pat => $expr:expr) => {
        match $value {
            Frame::Debugger($pat) => $expr,
            Frame::CoreDump($pat) => $expr,
            Frame::KernelOops($pat) => $expr,
            Frame::Script($pat) => $expr,
            Frame::Managed($pat) => $expr,
            Frame::Js($pat) => $expr,
        }
    };
}

impl Frame {
    /// The dialect tag of this frame.
    pub fn tag(&self) -> Tag {
        match self {
            Frame::Debugger(_) => Tag::Debugger,
            Frame::CoreDump(_) => Tag::CoreDump,
            Frame::KernelOops(_) => Tag::KernelOops,
            Frame::Script(_) => Tag::Script,
            Frame::Managed(_) => Tag::Managed,
            Frame::Js(_) => Tag::Js,
        }
    }

    /// Appends this frame's one-line textual rendering to `buffer`,
    /// without a leading frame index and without a trailing newline.
    pub fn append_to_text(&self, buffer: &mut String) {
        match self {
            Frame::Debugger(f) => f.append_to_text(buffer),
            Frame::CoreDump(f) => f.append_to_text(buffer),
            Frame::KernelOops(f) => f.append_to_text(buffer),
            Frame::Script(f) => f.append_to_text(buffer),
            Frame::Managed(f) => f.append_to_text(buffer),
            Frame::Js(f) => f.append_to_text(buffer),
        }
    }

    /// Renders this frame's one-line text as an owned [`String`].
    pub fn to_short_text(&self) -> String {
        let mut buf = String::new();
        self.append_to_text(&mut buf);
        buf
    }

    /// Whether this frame has a known function identity, for the purposes
    /// of quality scoring (spec.md §4.11).
    pub fn is_known_function(&self) -> bool {
        match self {
            Frame::Debugger(f) => f.function_name.is_some(),
            Frame::CoreDump(f) => f.function_name.is_some(),
            Frame::KernelOops(f) => f.function_name.is_some(),
            Frame::Script(f) => !f.special_function,
            Frame::Managed(f) => match f {
                ManagedFrame::Method(_) => true,
                ManagedFrame::Exception(_) => false,
            },
            Frame::Js(f) => f.function_name.is_some() || f.is_native,
        }
    }

    /// This frame's library/module name, when the dialect has one, used by
    /// the distance comparator's "unknown library" equivalence class.
    pub fn library_name(&self) -> Option<&str> {
        match self {
            Frame::Debugger(f) => f.library_name.as_deref(),
            Frame::KernelOops(f) => f.module_name.as_deref(),
            _ => None,
        }
    }

    /// Whether this is the debugger dialect's `<signal handler called>`
    /// marker frame, stripped by `short_text`.
    pub fn is_signal_handler(&self) -> bool {
        matches!(self, Frame::Debugger(f) if f.signal_handler)
    }
}

fn write_addr(buf: &mut String, address: Option<u64>) {
    match address {
        Some(addr) => {
            let _ = write!(buf, "0x{addr:016x}");
        }
        None => buf.push_str("0x????????????????"),
    }
}

/// A frame from a C/C++ debugger transcript (the `gdb` dialect).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebuggerFrame {
    /// `#<n>` index as written in the transcript.
    pub frame_number: u32,
    /// Demangled or mangled function name, if resolvable.
    pub function_name: Option<String>,
    /// Return-type prefix preceding the function name, if any.
    pub function_type: Option<String>,
    /// Raw, unparsed argument-list text (the parser treats arguments as
    /// opaque balanced-paren text, per spec.md §4.3).
    pub arguments: String,
    /// Source file from an `at`/`from` clause.
    pub source_file: Option<String>,
    /// Source line from an `at`/`from` clause.
    pub source_line: Option<u32>,
    /// Instruction address. `None` means the frame was inlined (no address
    /// was printed), never "unknown" — the debugger dialect does not
    /// produce addresses it cannot determine.
    pub address: Option<u64>,
    /// Shared library containing `address`, resolved from the attached
    /// library table after parsing.
    pub library_name: Option<String>,
    /// Whether this frame is the synthetic `<signal handler called>` marker.
    pub signal_handler: bool,
}

impl DebuggerFrame {
    fn append_to_text(&self, buf: &mut String) {
        if self.signal_handler {
            buf.push_str("<signal handler called>");
            return;
        }
        match &self.function_name {
            Some(name) => buf.push_str(name),
            None => {
                write_addr(buf, self.address);
            }
        }
    }
}

/// A frame from a structured core-dump document (the `core` dialect).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreDumpFrame {
    /// Instruction address. `None` means unknown (the original sentinel
    /// `u64::MAX` convention is represented as an explicit optional, per
    /// the "null sentinels" design note).
    pub address: Option<u64>,
    /// Opaque per-binary identifier used for out-of-band symbolication.
    pub build_id: Option<String>,
    /// Offset of `address` within the binary identified by `build_id`.
    /// Meaningful only when `build_id` is present.
    pub build_id_offset: Option<u64>,
    /// Resolved function name.
    pub function_name: Option<String>,
    /// Resolved source file name.
    pub file_name: Option<String>,
    /// A fingerprint string, either raw or hashed (see `fingerprint_hashed`).
    pub fingerprint: Option<String>,
    /// Whether `fingerprint` already holds a hash rather than raw bytes.
    /// Read but never produced by any parser (fingerprint generation is
    /// disabled), kept for document round-trip fidelity.
    pub fingerprint_hashed: bool,
}

impl CoreDumpFrame {
    fn append_to_text(&self, buf: &mut String) {
        match &self.function_name {
            Some(name) => buf.push_str(name),
            None => write_addr(buf, self.address),
        }
    }
}

/// A frame from a Linux kernel oops call-trace line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelOopsFrame {
    /// Instruction address (always present; oops buffers always print one).
    pub address: u64,
    /// Whether the unwinder marked this frame reliable (absence of the `?`
    /// prefix).
    pub reliable: bool,
    /// Function symbol name.
    pub function_name: Option<String>,
    /// Offset of `address` within `function_name`.
    pub function_offset: Option<u64>,
    /// Length of the containing function's code.
    pub function_length: Option<u64>,
    /// Owning kernel module, if outside the core kernel image.
    pub module_name: Option<String>,
    /// Address of an associated "from" caller site, if present on the same
    /// line.
    pub caller_address: Option<u64>,
    /// Caller's function symbol name.
    pub caller_function: Option<String>,
    /// Caller's offset within its function.
    pub caller_offset: Option<u64>,
    /// Caller's function length.
    pub caller_length: Option<u64>,
    /// Caller's owning module.
    pub caller_module: Option<String>,
    /// Special stack this frame was recorded on (`"IRQ"`, `"NMI"`, ...).
    pub special_stack_tag: Option<String>,
}

impl KernelOopsFrame {
    fn append_to_text(&self, buf: &mut String) {
        match &self.function_name {
            Some(name) => buf.push_str(name),
            None => write_addr(buf, Some(self.address)),
        }
    }
}

/// A frame from an indentation-style scripting-language traceback (Python
/// and Ruby both use this grammar, per `Tag::Script`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptFrame {
    /// Source file name; may be a bracketed pseudo-name such as `<stdin>`.
    pub file_name: String,
    /// Set when `file_name` is a bracketed pseudo-name.
    pub special_file: bool,
    /// Line number within `file_name`.
    pub file_line: u32,
    /// Enclosing function name; may be a bracketed pseudo-name such as
    /// `<module>`.
    pub function_name: String,
    /// Set when `function_name` is a bracketed pseudo-name.
    pub special_function: bool,
    /// The source line's literal text, if the traceback included it.
    pub source_line_contents: Option<String>,
}

impl ScriptFrame {
    fn append_to_text(&self, buf: &mut String) {
        buf.push_str(&self.function_name);
    }
}

/// A managed-runtime frame: either a method activation or an exception
/// header interleaved into the same thread (spec.md §3, §4.8).
#[derive(Clone, Debug, PartialEq)]
pub enum ManagedFrame {
    /// A stack-frame-like method activation.
    Method(ManagedMethodFrame),
    /// An exception (or `Caused by:`) header.
    Exception(ManagedExceptionFrame),
}

/// A managed-runtime method activation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagedMethodFrame {
    /// Fully-qualified method name.
    pub name: String,
    /// Source file, absent for `Native Method`/`Unknown Source` locations.
    pub source_file: Option<String>,
    /// Source line, absent for `Native Method`/`Unknown Source` locations.
    pub source_line: Option<u32>,
    /// Enclosing class path, when distinguishable from `name`.
    pub class_path: Option<String>,
    /// Whether the location was literally `Native Method`.
    pub is_native: bool,
}

/// A managed-runtime exception (or `Caused by:`) header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagedExceptionFrame {
    /// Fully-qualified exception type name.
    pub type_name: String,
    /// Human-readable exception message, if present.
    pub message: Option<String>,
    /// Fold count from a trailing `"... N more"` marker that truncated this
    /// header's own frame run. `None` when no such marker followed.
    pub folded: Option<u32>,
}

impl ManagedFrame {
    fn append_to_text(&self, buf: &mut String) {
        match self {
            ManagedFrame::Method(m) => buf.push_str(&m.name),
            ManagedFrame::Exception(e) => buf.push_str(&e.type_name),
        }
    }
}

/// A JavaScript engine-native frame (`at <function> (<file>:<line>:<col>)`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsFrame {
    /// Source file, absent for frames with no location at all.
    pub file_name: Option<String>,
    /// Line number.
    pub file_line: u32,
    /// Column number.
    pub file_column: u32,
    /// Enclosing function name; `None` for anonymous frames
    /// (`at <file>:<line>:<col>` with no `<function> (...)` prefix).
    pub function_name: Option<String>,
    /// Whether the location was literally `(native)`.
    pub is_native: bool,
}

impl JsFrame {
    fn append_to_text(&self, buf: &mut String) {
        match &self.function_name {
            Some(name) => buf.push_str(name),
            None => match &self.file_name {
                Some(file) => {
                    let _ = write!(buf, "{file}:{}:{}", self.file_line, self.file_column);
                }
                None => buf.push_str(UNKNOWN_FUNCTION),
            },
        }
    }
}
