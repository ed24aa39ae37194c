//! The dialect tag carried by every frame, thread, and stacktrace.

use std::fmt;

/// Identifies which of the six supported crash-report dialects a frame,
/// thread, or stacktrace belongs to.
///
/// Every frame's tag equals its enclosing thread's tag equals its enclosing
/// stacktrace's tag (spec invariant). Mixing tags in a binary operation
/// (comparison, frame removal, ...) is a programming error.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Tag {
    /// A C/C++ debugger transcript (gdb-style `#<n> ...` frames).
    Debugger,
    /// A structured core-dump document built from a debugger transcript
    /// plus an external address-to-symbol mapping.
    CoreDump,
    /// A Linux kernel oops buffer.
    KernelOops,
    /// An interpreted scripting-language traceback (indentation form).
    Script,
    /// A managed-runtime exception chain.
    Managed,
    /// A JavaScript engine-native stack trace.
    Js,
}

impl Tag {
    /// The bit-exact wire tag string used by the document format and the
    /// façade's `parse(tag, ...)` entry point.
    pub const fn as_str(self) -> &'static str {
        match self {
            Tag::CoreDump => "core",
            Tag::Script => "python",
            Tag::KernelOops => "koops",
            Tag::Managed => "java",
            Tag::Debugger => "gdb",
            Tag::Js => "javascript",
        }
    }

    /// Parses a wire tag string back into a [`Tag`].
    ///
    /// Note that `"ruby"` is accepted as an alias for [`Tag::Script`]: the
    /// wire contract lists both `"python"` and `"ruby"` as dialect tag
    /// strings, but this crate models both with the same indentation-style
    /// traceback grammar (spec.md §6).
    pub fn from_str_opt(s: &str) -> Option<Tag> {
        match s {
            "core" => Some(Tag::CoreDump),
            "python" | "ruby" => Some(Tag::Script),
            "koops" => Some(Tag::KernelOops),
            "java" => Some(Tag::Managed),
            "gdb" => Some(Tag::Debugger),
            "javascript" => Some(Tag::Js),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_tag() {
        for tag in [
            Tag::Debugger,
            Tag::CoreDump,
            Tag::KernelOops,
            Tag::Script,
            Tag::Managed,
            Tag::Js,
        ] {
            assert_eq!(Tag::from_str_opt(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn ruby_aliases_script() {
        assert_eq!(Tag::from_str_opt("ruby"), Some(Tag::Script));
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(Tag::from_str_opt("cobol"), None);
    }
}
