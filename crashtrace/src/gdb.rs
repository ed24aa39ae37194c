//! C/C++ debugger-transcript parser (`gdb` tag).
//!
//! A hard syntactic break aborts the thread currently being built — the
//! deliberate opposite policy from the kernel-oops parser (spec.md §9,
//! "error accumulation across line boundaries"). The successfully parsed
//! prefix is returned only once at least one full thread has been parsed.

use crashtrace_common::Scanner;

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::{DebuggerFrame, Frame};
use crate::stacktrace::DebuggerStacktrace;
use crate::thread::{DebuggerThread, LibraryMapping, Thread};

/// Parses a debugger transcript into a [`DebuggerStacktrace`].
pub fn parse(input: &str) -> Result<DebuggerStacktrace, ParseError> {
    let mut scanner = Scanner::new(input);
    let mut threads: Vec<Thread> = Vec::new();
    let mut library_table: Vec<LibraryMapping> = Vec::new();
    let mut crash_frame: Option<DebuggerFrame> = None;
    let mut current_thread: Option<DebuggerThread> = None;
    let mut first_error: Option<ParseError> = None;

    while !scanner.is_eof() {
        let line_start = scanner.position();
        let mut lookahead = scanner.clone();
        let raw_line = lookahead.take_line();
        lookahead.eat_newline();
        let trimmed = raw_line.trim_end();

        if trimmed.trim().is_empty() {
            scanner = lookahead;
            continue;
        }

        if let Some((number, tid)) = parse_thread_header(trimmed.trim_start()) {
            if let Some(t) = current_thread.take() {
                threads.push(Thread::Debugger(t));
            }
            current_thread = Some(DebuggerThread {
                number,
                tid,
                ..Default::default()
            });
            scanner = lookahead;
            continue;
        }

        if trimmed.trim_start().starts_with("From") && trimmed.contains("Shared Object Library") {
            scanner = lookahead;
            while !scanner.is_eof() {
                let mut row_lookahead = scanner.clone();
                let row_line = row_lookahead.take_line();
                let row_trimmed = row_line.trim();
                if row_trimmed.is_empty() {
                    break;
                }
                let Some(mapping) = parse_library_row(row_trimmed) else {
                    break;
                };
                library_table.push(mapping);
                row_lookahead.eat_newline();
                scanner = row_lookahead;
            }
            continue;
        }

        if is_noise_line(trimmed.trim_start()) {
            scanner = lookahead;
            continue;
        }

        if trimmed.trim_start().starts_with('#') {
            match parse_frame_line(trimmed.trim_start()) {
                Ok(frame) => {
                    let starts_new_run = frame.frame_number == 0
                        && current_thread
                            .as_ref()
                            .is_some_and(|t| !t.frames.is_empty());
                    if starts_new_run {
                        if let Some(t) = current_thread.take() {
                            threads.push(Thread::Debugger(t));
                        }
                        // A fresh `#0` without an intervening thread header
                        // is a detached crash-frame pointer, not a new
                        // thread (spec.md §4.3). We keep only its top
                        // frame and stop tracking the rest of that run.
                        crash_frame = Some(frame);
                        scanner = lookahead;
                        continue;
                    }
                    current_thread
                        .get_or_insert_with(DebuggerThread::default)
                        .frames
                        .push(Frame::Debugger(frame));
                    scanner = lookahead;
                }
                Err(what) => {
                    if first_error.is_none() {
                        first_error = Some(ParseError::new(
                            ParseErrorKind::ExpectedToken(what),
                            line_start.line,
                            line_start.column,
                        ));
                    }
                    current_thread = None;
                    scanner = lookahead;
                }
            }
            continue;
        }

        // Unrecognized boilerplate outside any frame/header context.
        scanner = lookahead;
    }

    if let Some(t) = current_thread.take() {
        threads.push(Thread::Debugger(t));
    }

    if threads.is_empty() {
        return Err(first_error.unwrap_or_else(|| {
            ParseError::new(ParseErrorKind::ExpectedToken("at least one frame"), 1, 1)
        }));
    }

    resolve_library_names(&mut threads, &library_table);

    Ok(DebuggerStacktrace {
        threads,
        crash_frame,
        library_table,
    })
}

fn is_noise_line(line: &str) -> bool {
    line.starts_with("[New ")
        || line.starts_with("[Current thread is")
        || line.starts_with("Core was generated by")
        || line.starts_with("Program terminated with signal")
}

fn parse_thread_header(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("Thread ")?;
    let (num_str, rest) = rest.split_once(' ')?;
    let number: u32 = num_str.trim().parse().ok()?;
    let rest = rest.trim_start().strip_prefix('(')?;
    let (desc, rest) = rest.rsplit_once(')')?;
    if !rest.trim_start().starts_with(':') {
        return None;
    }
    let tid = extract_lwp(desc).unwrap_or(0);
    Some((number, tid))
}

fn extract_lwp(desc: &str) -> Option<u32> {
    let idx = desc.find("LWP ")?;
    let rest = &desc[idx + 4..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn parse_library_row(line: &str) -> Option<LibraryMapping> {
    let mut parts = line.split_whitespace();
    let from = u64::from_str_radix(parts.next()?.strip_prefix("0x")?, 16).ok()?;
    let to = u64::from_str_radix(parts.next()?.strip_prefix("0x")?, 16).ok()?;
    let mut rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return None;
    }
    let symbols_loaded = match rest[0] {
        "Yes" => {
            rest.remove(0);
            Some(true)
        }
        "No" => {
            rest.remove(0);
            Some(false)
        }
        _ => None,
    };
    let filename = rest.join(" ");
    if filename.is_empty() {
        return None;
    }
    Some(LibraryMapping {
        from,
        to,
        filename,
        symbols_loaded,
    })
}

fn parse_frame_line(line: &str) -> Result<DebuggerFrame, &'static str> {
    let rest = line.strip_prefix('#').ok_or("'#'")?;
    let digit_count = rest
        .bytes()
        .take(10)
        .take_while(u8::is_ascii_digit)
        .count();
    if digit_count == 0 {
        return Err("a frame number");
    }
    let frame_number: u32 = rest[..digit_count].parse().map_err(|_| "a frame number")?;
    let rest = &rest[digit_count..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return Err("a space after the frame number");
    }
    let rest = rest.trim_start();

    if rest.starts_with("<signal handler called>") {
        return Ok(DebuggerFrame {
            frame_number,
            signal_handler: true,
            ..Default::default()
        });
    }

    let mut address = None;
    let mut rest = rest;
    if let Some(hex) = rest.strip_prefix("0x") {
        let hex_len = hex.bytes().take_while(u8::is_ascii_hexdigit).count();
        if hex_len > 0 {
            address = u64::from_str_radix(&hex[..hex_len], 16).ok();
            rest = hex[hex_len..].trim_start();
        }
    }
    if let Some(after_in) = rest.strip_prefix("in ") {
        rest = after_in.trim_start();
    }

    let (call_part, after_call) = if rest.starts_with("at ") || rest.starts_with("from ") {
        ("", rest)
    } else {
        split_call_and_rest(rest)
    };

    let (function_type, function_name, arguments) = if call_part.is_empty() {
        (None, None, String::new())
    } else {
        parse_function_call(call_part)
    };

    let remainder = skip_with_clause(after_call);
    let location = remainder
        .strip_prefix("at ")
        .or_else(|| remainder.strip_prefix("from "));
    let (source_file, source_line) = match location {
        Some(loc) => parse_file_location(loc),
        None => (None, None),
    };

    Ok(DebuggerFrame {
        frame_number,
        function_name,
        function_type,
        arguments,
        source_file,
        source_line,
        address,
        library_name: None,
        signal_handler: false,
    })
}

/// Splits `s` at the last top-level (paren-depth-0) parenthesized group,
/// which is the argument list — the function name may itself contain an
/// earlier top-level group (`operator()(int)`), so the *last* one is taken.
fn split_call_and_rest(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut last_close = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    last_close = Some(i);
                }
            }
            _ => {}
        }
    }
    match last_close {
        Some(close) => (&s[..=close], &s[close + 1..]),
        None => (s, ""),
    }
}

fn parse_function_call(call_part: &str) -> (Option<String>, Option<String>, String) {
    let bytes = call_part.as_bytes();
    let mut depth = 0i32;
    let mut open_idx = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => {
                if depth == 0 {
                    open_idx = Some(i);
                }
                depth += 1;
            }
            b')' => depth -= 1,
            _ => {}
        }
    }
    let open_idx = open_idx.unwrap_or(call_part.len());
    let name_part = call_part[..open_idx].trim();
    let arguments = if open_idx < call_part.len() {
        call_part[open_idx + 1..call_part.len() - 1].to_string()
    } else {
        String::new()
    };

    let (function_type, name) = split_top_level_space(name_part);
    let function_name = if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    };
    (function_type, function_name, arguments)
}

/// The function-type prefix is everything up to the first space that is
/// not nested inside `<...>`/`(...)` (spec.md §4.3).
fn split_top_level_space(s: &str) -> (Option<String>, &str) {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth -= 1,
            b' ' if depth == 0 => {
                return (Some(s[..i].to_string()), s[i + 1..].trim_start());
            }
            _ => {}
        }
    }
    (None, s)
}

/// Skips a trailing `[with K = V; ...]` clause. Only one level of bracket
/// nesting is honored, matching the observed (and preserved) behavior of
/// the original parser (spec.md §9, Open Question).
fn skip_with_clause(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[end + 1..].trim_start();
        }
    }
    trimmed
}

fn parse_file_location(loc: &str) -> (Option<String>, Option<u32>) {
    let loc = loc.trim();
    if loc.is_empty() {
        return (None, None);
    }
    match loc.rsplit_once(':') {
        Some((file, line_str)) if !line_str.is_empty() && line_str.bytes().all(|b| b.is_ascii_digit()) => {
            (Some(file.to_string()), line_str.parse().ok())
        }
        _ => (Some(loc.to_string()), None),
    }
}

fn resolve_library_names(threads: &mut [Thread], library_table: &[LibraryMapping]) {
    if library_table.is_empty() {
        return;
    }
    for thread in threads {
        if let Thread::Debugger(t) = thread {
            for frame in &mut t.frames {
                if let Frame::Debugger(f) = frame {
                    if let Some(addr) = f.address {
                        if let Some(mapping) =
                            library_table.iter().find(|m| addr >= m.from && addr <= m.to)
                        {
                            f.library_name = Some(mapping.filename.clone());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn seed_scenario() {
        let input = "#0  0x000000322a2362b9 in repeat (image=<value optimized out>) at pixman-bits-image.c:145\n";
        let st = parse(input).unwrap();
        assert_eq!(st.threads.len(), 1);
        let frames = st.threads[0].frames();
        assert_eq!(frames.len(), 1);
        let Frame::Debugger(f) = &frames[0] else {
            panic!("expected debugger frame");
        };
        assert_eq!(f.frame_number, 0);
        assert_eq!(f.address, Some(0x322a2362b9));
        assert_eq!(f.function_name.as_deref(), Some("repeat"));
        assert_eq!(f.source_file.as_deref(), Some("pixman-bits-image.c"));
        assert_eq!(f.source_line, Some(145));
    }

    #[test]
    fn signal_handler_frame() {
        let input = "#3  <signal handler called>\n#4  0x1 in foo ()\n";
        let st = parse(input).unwrap();
        let frames = st.threads[0].frames();
        assert!(frames[0].is_signal_handler());
    }

    #[test]
    fn inlined_frame_has_no_address() {
        let input = "#1  Foo::bar (this=0x7fff0000) at foo.cc:12\n";
        let st = parse(input).unwrap();
        let Frame::Debugger(f) = &st.threads[0].frames()[0] else {
            panic!("expected debugger frame");
        };
        assert_eq!(f.address, None);
        assert_eq!(f.function_name.as_deref(), Some("Foo::bar"));
    }

    #[test]
    fn with_clause_is_skipped_before_location() {
        let input = "#2  0x1 in Foo<T>::bar (this=0x1) [with T = int] at foo.cc:10\n";
        let st = parse(input).unwrap();
        let Frame::Debugger(f) = &st.threads[0].frames()[0] else {
            panic!("expected debugger frame");
        };
        assert_eq!(f.source_file.as_deref(), Some("foo.cc"));
        assert_eq!(f.source_line, Some(10));
    }

    #[test]
    fn empty_input_fails_at_one_one() {
        let err = parse("").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
    }

    #[test]
    fn thread_headers_group_frames() {
        let input = "Thread 2 (Thread 0x1 (LWP 123)):\n#0  0x1 in foo ()\nThread 1 (Thread 0x2 (LWP 124)):\n#0  0x2 in bar ()\n";
        let st = parse(input).unwrap();
        assert_eq!(st.threads.len(), 2);
        assert_eq!(st.threads[0].id(), 123);
        assert_eq!(st.threads[1].id(), 124);
    }

    #[test]
    fn library_table_resolves_names() {
        let input = "Thread 1 (Thread 0x1 (LWP 1)):\n#0  0x1500 in foo ()\nFrom        To          Syms Read   Shared Object Library\n0x1000      0x2000      Yes         /lib/libfoo.so\n";
        let st = parse(input).unwrap();
        assert_eq!(st.library_table.len(), 1);
        let Frame::Debugger(f) = &st.threads[0].frames()[0] else {
            panic!("expected debugger frame");
        };
        assert_eq!(f.library_name.as_deref(), Some("/lib/libfoo.so"));
    }
}
