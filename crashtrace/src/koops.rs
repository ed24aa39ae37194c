//! Kernel-oops dialect parser (`koops` tag).
//!
//! Line-oriented and best-effort: unrecognized lines are skipped rather than
//! aborting the parse, the one deliberate policy difference from the
//! debugger dialect (spec.md §9, "error accumulation across line
//! boundaries").

use crashtrace_common::Scanner;

use crate::error::{ParseError, ParseErrorKind};
use crate::frame::KernelOopsFrame;
use crate::stacktrace::{KernelOopsStacktrace, TaintFlags};

/// Parses a kernel-oops buffer into a [`KernelOopsStacktrace`].
///
/// Requires at least one recognized call-trace line; every other line (the
/// version banner, taint line, modules line, stack-switch markers, and
/// anything unrecognized) is optional.
pub fn parse(input: &str) -> Result<KernelOopsStacktrace, ParseError> {
    let mut out = KernelOopsStacktrace::default();
    let mut scanner = Scanner::new(input);
    let mut stack_tag: Option<String> = None;

    while !scanner.is_eof() {
        let raw_line = scanner.take_line();
        scanner.eat_newline();
        let line = strip_timestamp(raw_line);

        if let Some(rest) = line.strip_prefix("Linux version ") {
            out.kernel_version = Some(rest.trim().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("Tainted: ") {
            out.taint = parse_taint(rest.trim());
            continue;
        }
        if let Some(rest) = line.strip_prefix("Modules linked in: ") {
            out.modules = rest.split_whitespace().map(str::to_string).collect();
            continue;
        }
        if let Some(tag) = parse_stack_switch(line) {
            stack_tag = tag;
            continue;
        }
        if let Some(mut frame) = parse_call_trace_line(line) {
            frame.special_stack_tag = stack_tag.clone();
            out.frames.push(frame);
            continue;
        }
        // Unrecognized line: best-effort, keep scanning.
    }

    if out.frames.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::ExpectedToken("at least one call-trace line"),
            scanner.position().line,
            scanner.position().column,
        ));
    }

    Ok(out)
}

fn strip_timestamp(line: &str) -> &str {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let inner = &rest[..end];
            if inner.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
                return rest[end + 1..].trim_start();
            }
        }
    }
    trimmed
}

fn parse_taint(token: &str) -> TaintFlags {
    let chars: Vec<char> = if token.contains(char::is_whitespace) {
        token.split_whitespace().filter_map(|w| w.chars().next()).collect()
    } else {
        token.chars().collect()
    };

    let mut taint = TaintFlags::default();
    for c in chars {
        match c {
            'P' => taint.proprietary_module = true,
            'O' => taint.out_of_tree = true,
            'F' => taint.forced_module = true,
            'R' => taint.forced_removal = true,
            'S' => taint.smp_unsafe = true,
            'M' => taint.machine_check = true,
            'B' => taint.page_release = true,
            'U' => taint.userspace = true,
            'D' => taint.died_recently = true,
            'A' => taint.acpi_overridden = true,
            'W' => taint.warning = true,
            'C' => taint.staging_driver = true,
            'I' => taint.firmware_workaround = true,
            _ => {}
        }
    }
    taint
}

/// `<IRQ>`/`<NMI>`/... open a special stack; `<EOI>` closes it.
fn parse_stack_switch(line: &str) -> Option<Option<String>> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('<')?.strip_suffix('>')?;
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if inner == "EOI" {
        Some(None)
    } else {
        Some(Some(inner.to_string()))
    }
}

fn split_first_whitespace(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

fn parse_func_off_len(token: &str) -> Option<(String, u64, u64)> {
    let (func, rest) = token.split_once('+')?;
    let rest = rest.strip_prefix("0x")?;
    let (off_hex, len_part) = rest.split_once('/')?;
    let len_hex = len_part.strip_prefix("0x")?;
    let offset = u64::from_str_radix(off_hex, 16).ok()?;
    let length = u64::from_str_radix(len_hex, 16).ok()?;
    Some((func.to_string(), offset, length))
}

fn parse_bracketed_addr(s: &str) -> Option<(u64, &str)> {
    let rest = s.strip_prefix('[')?;
    let (hex, rest) = rest.split_once(']')?;
    let hex = hex.trim().strip_prefix('<')?.strip_suffix('>')?;
    let addr = u64::from_str_radix(hex, 16).ok()?;
    Some((addr, rest))
}

fn parse_call_trace_line(line: &str) -> Option<KernelOopsFrame> {
    let rest = line.trim_start();
    let (address, rest) = parse_bracketed_addr(rest)?;

    let mut rest = rest.trim_start();
    let reliable = if let Some(r) = rest.strip_prefix('?') {
        rest = r.trim_start();
        false
    } else {
        true
    };

    let (func_token, rest) = split_first_whitespace(rest);
    let (function_name, function_offset, function_length) = parse_func_off_len(func_token)?;
    let mut rest = rest.trim_start();

    let mut module_name = None;
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let (module, after) = after_bracket.split_once(']')?;
        module_name = Some(module.trim().to_string());
        rest = after.trim_start();
    }

    let mut frame = KernelOopsFrame {
        address,
        reliable,
        function_name: Some(function_name),
        function_offset: Some(function_offset),
        function_length: Some(function_length),
        module_name,
        ..Default::default()
    };

    if let Some(after_from) = rest.strip_prefix("from ") {
        if let Some((caller_address, rest)) = parse_bracketed_addr(after_from.trim_start()) {
            frame.caller_address = Some(caller_address);
            let rest = rest.trim_start();
            let (caller_token, rest) = split_first_whitespace(rest);
            if let Some((cfunc, coff, clen)) = parse_func_off_len(caller_token) {
                frame.caller_function = Some(cfunc);
                frame.caller_offset = Some(coff);
                frame.caller_length = Some(clen);
            }
            let rest = rest.trim_start();
            if let Some(after_bracket) = rest.strip_prefix('[') {
                if let Some((module, _)) = after_bracket.split_once(']') {
                    frame.caller_module = Some(module.trim().to_string());
                }
            }
        }
    }

    Some(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn seed_scenario_parses_modules_and_frame() {
        let input = "[ 4.321] BUG: unable to handle kernel NULL pointer dereference at 0000000000000000\n\
                      [ 4.321] Modules linked in: ext4 jbd2\n\
                      [ 4.321]  [<ffffffff81234567>] ? vfs_read+0x42/0x80\n";
        let st = parse(input).unwrap();
        assert_eq!(st.modules, vec!["ext4".to_string(), "jbd2".to_string()]);
        assert_eq!(st.frames.len(), 1);
        let f = &st.frames[0];
        assert_eq!(f.function_name.as_deref(), Some("vfs_read"));
        assert_eq!(f.function_offset, Some(0x42));
        assert_eq!(f.function_length, Some(0x80));
        assert!(!f.reliable);
    }

    #[test]
    fn no_taint_and_no_modules_still_succeeds() {
        let input = "[<ffffffff81234567>] vfs_read+0x42/0x80\n";
        let st = parse(input).unwrap();
        assert!(st.modules.is_empty());
        assert_eq!(st.taint, TaintFlags::default());
    }

    #[test]
    fn caller_fields_from_from_clause() {
        let input = "[<ffffffff81111111>] foo+0x1/0x10 from [<ffffffff82222222>] bar+0x2/0x20 [mymod]\n";
        let st = parse(input).unwrap();
        let f = &st.frames[0];
        assert_eq!(f.caller_function.as_deref(), Some("bar"));
        assert_eq!(f.caller_offset, Some(0x2));
        assert_eq!(f.caller_module.as_deref(), Some("mymod"));
    }

    #[test]
    fn word_form_taint_flags() {
        assert!(parse_taint("G W").warning);
        assert!(parse_taint("PW").proprietary_module);
        assert!(parse_taint("PW").warning);
    }

    #[test]
    fn empty_input_fails() {
        assert!(parse("").is_err());
    }

    #[test]
    fn stack_switch_tags_following_frames() {
        let input = "<IRQ>\n[<ffffffff81234567>] vfs_read+0x42/0x80\n<EOI>\n[<ffffffff81234568>] other+0x1/0x2\n";
        let st = parse(input).unwrap();
        assert_eq!(st.frames[0].special_stack_tag.as_deref(), Some("IRQ"));
        assert_eq!(st.frames[1].special_stack_tag, None);
    }
}
