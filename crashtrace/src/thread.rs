//! The thread model: three explicit shapes plus, for always-single-threaded
//! dialects, an implicit-thread view over the stacktrace itself.

use crate::frame::Frame;
use crate::tag::Tag;

/// One entry of a debugger dialect's shared-library table (spec.md §4.3).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LibraryMapping {
    /// Start address of the mapped range.
    pub from: u64,
    /// End address of the mapped range.
    pub to: u64,
    /// Path of the mapped file.
    pub filename: String,
    /// Whether debug symbols were loaded for this mapping, if the input
    /// carried that column.
    pub symbols_loaded: Option<bool>,
}

/// A thread from a debugger transcript.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebuggerThread {
    /// gdb's own thread index (`Thread <number> (...)`).
    pub number: u32,
    /// Operating-system thread id (`LWP <tid>`), when present.
    pub tid: u32,
    /// Ordered frames, innermost first.
    pub frames: Vec<Frame>,
    /// Shared-library table used to resolve `library_name` on each frame.
    /// Read-only during comparison/normalization.
    pub library_table: Option<Vec<LibraryMapping>>,
}

/// A thread from a structured core-dump document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreDumpThread {
    /// Thread id as recorded by the core-dump document.
    pub thread_id: i64,
    /// Ordered frames, innermost first.
    pub frames: Vec<Frame>,
}

/// A thread from a managed-runtime exception chain. Always exactly one per
/// stacktrace in practice, but modeled as a list to match the `Stacktrace`
/// shape of spec.md §3.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagedThread {
    /// Thread name (`"main"` in the seed scenario), if the header named one.
    pub name: Option<String>,
    /// Ordered frames, including interleaved exception headers.
    pub frames: Vec<Frame>,
}

/// One of the three concrete thread shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum Thread {
    /// A debugger dialect thread.
    Debugger(DebuggerThread),
    /// A core-dump dialect thread.
    CoreDump(CoreDumpThread),
    /// A managed-runtime dialect thread.
    Managed(ManagedThread),
}

macro_rules! match_thread {
    ($value:expr, $pat:pat => $expr:expr) => {
        match $value {
            Thread::Debugger($pat) => $expr,
            Thread::CoreDump($pat) => $expr,
            Thread::Managed($pat) => $expr,
        }
    };
}

impl Thread {
    /// The dialect tag of this thread.
    pub fn tag(&self) -> Tag {
        match self {
            Thread::Debugger(_) => Tag::Debugger,
            Thread::CoreDump(_) => Tag::CoreDump,
            Thread::Managed(_) => Tag::Managed,
        }
    }

    /// This thread's ordered frames, innermost first.
    pub fn frames(&self) -> &[Frame] {
        match_thread!(self, t => &t.frames)
    }

    /// Mutable access to this thread's ordered frames.
    pub fn frames_mut(&mut self) -> &mut Vec<Frame> {
        match_thread!(self, t => &mut t.frames)
    }

    /// Replaces this thread's frame list wholesale.
    pub fn set_frames(&mut self, frames: Vec<Frame>) {
        *self.frames_mut() = frames;
    }

    /// An identifying numeric id for this thread (gdb's LWP tid,
    /// core-dump's thread id, or `0` for the singular managed thread),
    /// used by the crash-thread tiebreak rule of spec.md §4.11.
    pub fn id(&self) -> i64 {
        match self {
            Thread::Debugger(t) => t.tid as i64,
            Thread::CoreDump(t) => t.thread_id,
            Thread::Managed(_) => 0,
        }
    }

    /// Removes and returns the frame at `index`, by position rather than
    /// pointer identity (see the "intrusive linked lists" design note).
    pub fn remove_frame(&mut self, index: usize) -> Option<Frame> {
        let frames = self.frames_mut();
        if index < frames.len() {
            Some(frames.remove(index))
        } else {
            None
        }
    }

    /// Drops every frame with a position greater than `index`, keeping
    /// `0..=index`.
    pub fn remove_frames_above(&mut self, index: usize) {
        let frames = self.frames_mut();
        if index + 1 < frames.len() {
            frames.truncate(index + 1);
        }
    }

    /// Keeps only the innermost `n` frames, dropping the rest. Idempotent
    /// for any `n' >= n` applied afterwards.
    pub fn limit_frame_depth(&mut self, n: usize) {
        let frames = self.frames_mut();
        if frames.len() > n {
            frames.truncate(n);
        }
    }

    /// Deep-copies this thread, including every frame's owned fields.
    pub fn duplicate(&self) -> Thread {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DebuggerFrame;

    fn frame(n: u32) -> Frame {
        Frame::Debugger(DebuggerFrame {
            frame_number: n,
            ..Default::default()
        })
    }

    #[test]
    fn remove_frame_by_index() {
        let mut t = Thread::Debugger(DebuggerThread {
            frames: vec![frame(0), frame(1), frame(2)],
            ..Default::default()
        });
        let removed = t.remove_frame(1).unwrap();
        assert_eq!(removed, frame(1));
        assert_eq!(t.frames().len(), 2);
    }

    #[test]
    fn remove_frames_above_keeps_prefix() {
        let mut t = Thread::Debugger(DebuggerThread {
            frames: vec![frame(0), frame(1), frame(2), frame(3)],
            ..Default::default()
        });
        t.remove_frames_above(1);
        assert_eq!(t.frames().len(), 2);
    }

    #[test]
    fn limit_frame_depth_idempotent_for_larger_n() {
        let mut t = Thread::Debugger(DebuggerThread {
            frames: vec![frame(0), frame(1), frame(2)],
            ..Default::default()
        });
        t.limit_frame_depth(2);
        assert_eq!(t.frames().len(), 2);
        t.limit_frame_depth(5);
        assert_eq!(t.frames().len(), 2);
    }

    #[test]
    fn duplicate_is_deep_copy() {
        let t = Thread::Debugger(DebuggerThread {
            frames: vec![frame(0)],
            ..Default::default()
        });
        let mut dup = t.duplicate();
        dup.remove_frame(0);
        assert_eq!(t.frames().len(), 1);
        assert_eq!(dup.frames().len(), 0);
    }
}
