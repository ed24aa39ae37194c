//! Managed-runtime exception-chain parser (`java` tag).
//!
//! Emits one flat thread whose frames interleave exception headers with
//! method frames, per spec.md §4.8. A `Caused by:` chain is parsed
//! recursively and its frames appended in encountered order.

use crashtrace_common::Scanner;

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::{Frame, ManagedExceptionFrame, ManagedFrame, ManagedMethodFrame};
use crate::stacktrace::ManagedStacktrace;
use crate::thread::{ManagedThread, Thread};

/// Parses a managed-runtime exception chain into a [`ManagedStacktrace`].
pub fn parse(input: &str) -> Result<ManagedStacktrace, ParseError> {
    let mut scanner = Scanner::new(input);
    if !scanner.match_literal("Exception in thread \"") {
        return Err(expected(&scanner, "'Exception in thread \"'"));
    }
    let thread_name = scanner.take_while(|b| b != b'"').to_string();
    if !scanner.match_literal("\" ") {
        return Err(expected(&scanner, "'\" ' after thread name"));
    }

    let header_line = scanner.take_line().to_string();
    scanner.eat_newline();
    let frames = parse_chain(&mut scanner, &header_line)?;

    Ok(ManagedStacktrace {
        threads: vec![Thread::Managed(ManagedThread {
            name: Some(thread_name),
            frames,
        })],
    })
}

fn expected(scanner: &Scanner, what: &'static str) -> ParseError {
    let pos = scanner.position();
    ParseError::new(ParseErrorKind::ExpectedToken(what), pos.line, pos.column)
}

fn parse_chain(scanner: &mut Scanner, header_line: &str) -> Result<Vec<Frame>, ParseError> {
    let (type_name, message) = parse_exception_header(header_line);
    let mut exception_frame = ManagedExceptionFrame {
        type_name,
        message,
        folded: None,
    };

    let mut method_frames = Vec::new();
    while !scanner.is_eof() {
        let mut lookahead = scanner.clone();
        let line = lookahead.take_line();
        let Some(rest) = line.strip_prefix("\tat ") else {
            break;
        };
        let Some(mf) = parse_method_frame(rest) else {
            break;
        };
        lookahead.eat_newline();
        *scanner = lookahead;
        method_frames.push(mf);
    }

    if method_frames.is_empty() {
        return Err(expected(scanner, "at least one `\\tat ...` frame line"));
    }

    if !scanner.is_eof() {
        let mut lookahead = scanner.clone();
        let line = lookahead.take_line();
        if let Some(n) = parse_fold_count(line) {
            exception_frame.folded = Some(n);
            lookahead.eat_newline();
            *scanner = lookahead;
        }
    }

    let mut frames = Vec::with_capacity(1 + method_frames.len());
    frames.push(Frame::Managed(ManagedFrame::Exception(exception_frame)));
    frames.extend(
        method_frames
            .into_iter()
            .map(|m| Frame::Managed(ManagedFrame::Method(m))),
    );

    if !scanner.is_eof() {
        let mut lookahead = scanner.clone();
        let line = lookahead.take_line();
        if let Some(rest) = line.strip_prefix("Caused by: ") {
            let rest = rest.to_string();
            lookahead.eat_newline();
            *scanner = lookahead;
            frames.extend(parse_chain(scanner, &rest)?);
        }
    }

    Ok(frames)
}

fn parse_exception_header(line: &str) -> (String, Option<String>) {
    match line.split_once(": ") {
        Some((type_name, message)) => (type_name.to_string(), Some(message.to_string())),
        None => (line.to_string(), None),
    }
}

fn parse_method_frame(rest: &str) -> Option<ManagedMethodFrame> {
    let rest = rest.strip_suffix(')')?;
    let idx = rest.find('(')?;
    let name = rest[..idx].to_string();
    let location = &rest[idx + 1..];
    let (source_file, source_line, is_native) = parse_location(location);
    let class_path = name.rsplit_once('.').map(|(class, _)| class.to_string());
    Some(ManagedMethodFrame {
        name,
        source_file,
        source_line,
        class_path,
        is_native,
    })
}

fn parse_location(location: &str) -> (Option<String>, Option<u32>, bool) {
    match location {
        "Native Method" => (None, None, true),
        "Unknown Source" => (None, None, false),
        _ => match location.split_once(':') {
            Some((file, line)) => (Some(file.to_string()), line.parse().ok(), false),
            None => (Some(location.to_string()), None, false),
        },
    }
}

fn parse_fold_count(line: &str) -> Option<u32> {
    let rest = line.trim().strip_prefix("... ")?;
    rest.strip_suffix(" more")?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn chain_with_two_caused_by_levels() {
        let input = "Exception in thread \"main\" java.lang.RuntimeException: top\n\
                      \tat com.example.Foo.bar(Foo.java:10)\n\
                      \tat com.example.Foo.baz(Foo.java:20)\n\
                      Caused by: java.lang.IllegalStateException: middle\n\
                      \tat com.example.Foo.qux(Foo.java:30)\n\
                      \tat com.example.Foo.quux(Foo.java:40)\n\
                      \t... 3 more\n\
                      Caused by: java.lang.NullPointerException: bottom\n\
                      \tat com.example.Foo.corge(Foo.java:50)\n\
                      \tat com.example.Foo.grault(Foo.java:60)\n\
                      \t... 5 more\n";
        let st = parse(input).unwrap();
        assert_eq!(st.threads.len(), 1);
        let Thread::Managed(t) = &st.threads[0] else {
            panic!("expected managed thread");
        };
        assert_eq!(t.name.as_deref(), Some("main"));

        let exceptions: Vec<_> = t
            .frames
            .iter()
            .filter_map(|f| match f {
                Frame::Managed(ManagedFrame::Exception(e)) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(exceptions.len(), 3);
        assert_eq!(exceptions[0].folded, None);
        assert_eq!(exceptions[1].folded, Some(3));
        assert_eq!(exceptions[2].folded, Some(5));

        let methods: Vec<_> = t
            .frames
            .iter()
            .filter(|f| matches!(f, Frame::Managed(ManagedFrame::Method(_))))
            .collect();
        assert_eq!(methods.len(), 6);
    }

    #[test]
    fn native_method_location() {
        let input = "Exception in thread \"main\" java.lang.Error: e\n\tat Foo.bar(Native Method)\n";
        let st = parse(input).unwrap();
        let Thread::Managed(t) = &st.threads[0] else {
            panic!("expected managed thread");
        };
        let Frame::Managed(ManagedFrame::Method(m)) = &t.frames[1] else {
            panic!("expected method frame");
        };
        assert!(m.is_native);
        assert_eq!(m.source_file, None);
    }

    #[test]
    fn missing_frames_is_an_error() {
        let input = "Exception in thread \"main\" java.lang.Error: e\n";
        assert!(parse(input).is_err());
    }
}
