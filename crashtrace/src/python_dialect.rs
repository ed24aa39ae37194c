//! Scripting-language traceback parser, indentation form (`python`/`ruby`
//! tags, both modeled by [`crate::tag::Tag::Script`]).

use crashtrace_common::Scanner;

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::ScriptFrame;
use crate::stacktrace::ScriptStacktrace;

const PREAMBLE: &str = "Traceback (most recent call last):";

/// Parses an indentation-style traceback into a [`ScriptStacktrace`].
///
/// Frames are encountered outermost-first in the text and reversed so the
/// model is innermost-first, per spec.md §4.6.
pub fn parse(input: &str) -> Result<ScriptStacktrace, ParseError> {
    let mut scanner = Scanner::new(input);

    {
        let mut lookahead = scanner.clone();
        if lookahead.take_line().trim() == PREAMBLE {
            lookahead.eat_newline();
            scanner = lookahead;
        }
    }

    let mut frames = Vec::new();
    loop {
        if scanner.is_eof() {
            let pos = scanner.position();
            return Err(ParseError::new(
                ParseErrorKind::ExpectedToken("exception terminator line"),
                pos.line,
                pos.column,
            ));
        }

        let mut lookahead = scanner.clone();
        let raw_line = lookahead.take_line();
        let Some(mut frame) = parse_file_line(raw_line.trim_start()) else {
            break;
        };
        lookahead.eat_newline();

        if !lookahead.is_eof() {
            let mut src_lookahead = lookahead.clone();
            let src_line = src_lookahead.take_line();
            let src_trimmed = src_line.trim();
            if !src_trimmed.is_empty()
                && !src_line.trim_start().starts_with("File \"")
                && parse_exception_terminator(src_trimmed).is_none()
            {
                frame.source_line_contents = Some(src_trimmed.to_string());
                src_lookahead.eat_newline();
                lookahead = src_lookahead;
            }
        }

        frames.push(frame);
        scanner = lookahead;
    }

    if frames.is_empty() {
        let pos = scanner.position();
        return Err(ParseError::new(
            ParseErrorKind::ExpectedToken("at least one `File \"...\"` frame line"),
            pos.line,
            pos.column,
        ));
    }

    let term_line = scanner.take_line();
    scanner.eat_newline();
    let Some((exception_class, exception_message)) = parse_exception_terminator(term_line.trim())
    else {
        let pos = scanner.position();
        return Err(ParseError::new(
            ParseErrorKind::ExpectedToken("<Qualified.Name>: <message>"),
            pos.line,
            pos.column,
        ));
    };

    frames.reverse();
    Ok(ScriptStacktrace {
        exception_class,
        exception_message,
        frames,
    })
}

fn parse_file_line(line: &str) -> Option<ScriptFrame> {
    let rest = line.strip_prefix("File \"")?;
    let (file_name, rest) = rest.split_once("\", line ")?;
    let (line_str, rest) = rest.split_once(", in ")?;
    let file_line: u32 = line_str.trim().parse().ok()?;
    let function_name = rest.trim().to_string();
    let special_file = is_bracketed(file_name);
    let special_function = is_bracketed(&function_name);
    Some(ScriptFrame {
        file_name: file_name.to_string(),
        special_file,
        file_line,
        function_name,
        special_function,
        source_line_contents: None,
    })
}

fn is_bracketed(s: &str) -> bool {
    s.starts_with('<') && s.ends_with('>')
}

fn parse_exception_terminator(line: &str) -> Option<(String, Option<String>)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(": ") {
        Some((class, message)) => Some((class.to_string(), Some(message.to_string()))),
        None => Some((line.to_string(), None)),
    }
}
