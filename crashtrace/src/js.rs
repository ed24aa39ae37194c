//! JavaScript-dialect parser (`javascript` tag).

use crashtrace_common::Scanner;

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::JsFrame;
use crate::stacktrace::JsStacktrace;

/// Parses a JS engine-native stack trace into a [`JsStacktrace`].
pub fn parse(input: &str) -> Result<JsStacktrace, ParseError> {
    let mut scanner = Scanner::new(input);
    let mut exception_name = None;
    let mut exception_message = None;

    {
        let mut lookahead = scanner.clone();
        let line = lookahead.take_line();
        if !line.trim_start().starts_with("at ") {
            if let Some((name, message)) = line.split_once(": ") {
                exception_name = Some(name.trim().to_string());
                exception_message = Some(message.trim().to_string());
                lookahead.eat_newline();
                scanner = lookahead;
            }
        }
    }

    let mut frames = Vec::new();
    while !scanner.is_eof() {
        let raw_line = scanner.take_line();
        scanner.eat_newline();
        let Some(rest) = raw_line.trim().strip_prefix("at ") else {
            continue;
        };
        if let Some(frame) = parse_at_line(rest) {
            frames.push(frame);
        }
    }

    if frames.is_empty() {
        let pos = scanner.position();
        return Err(ParseError::new(
            ParseErrorKind::ExpectedToken("at least one `at ...` frame line"),
            pos.line,
            pos.column,
        ));
    }

    Ok(JsStacktrace {
        exception_name,
        exception_message,
        frames,
    })
}

fn parse_at_line(rest: &str) -> Option<JsFrame> {
    if rest.ends_with(')') {
        if let Some(idx) = rest.rfind(" (") {
            let function_name = rest[..idx].trim().to_string();
            let loc = &rest[idx + 2..rest.len() - 1];
            if loc == "native" {
                return Some(JsFrame {
                    file_name: None,
                    file_line: 0,
                    file_column: 0,
                    function_name: Some(function_name),
                    is_native: true,
                });
            }
            let (file_name, file_line, file_column) = parse_location(loc)?;
            return Some(JsFrame {
                file_name: Some(file_name),
                file_line,
                file_column,
                function_name: Some(function_name),
                is_native: false,
            });
        }
    }

    let (file_name, file_line, file_column) = parse_location(rest)?;
    Some(JsFrame {
        file_name: Some(file_name),
        file_line,
        file_column,
        function_name: None,
        is_native: false,
    })
}

fn parse_location(s: &str) -> Option<(String, u32, u32)> {
    let (file_and_line, col_str) = s.rsplit_once(':')?;
    let (file, line_str) = file_and_line.rsplit_once(':')?;
    let file_line: u32 = line_str.parse().ok()?;
    let file_column: u32 = col_str.parse().ok()?;
    Some((file.to_string(), file_line, file_column))
}
