//! Integration tests for the `gdb` dialect through the public façade.

use similar_asserts::assert_eq;

use crashtrace::compare::{compare_frame, compare_frame_distance};
use crashtrace::{crash_thread, from_document, parse, quality_complex, quality_simple, short_text, to_document, Tag};

const SEED: &str = "Thread 1 (Thread 0x1 (LWP 42)):\n\
                     #0  0x000000322a2362b9 in repeat (image=<value optimized out>) at pixman-bits-image.c:145\n\
                     #1  0x0000003229e38dd6 in general_composite_rect () at pixman-general.c:200\n";

#[test]
fn seed_scenario_round_trips_through_document() {
    let st = parse("gdb", SEED).unwrap();
    let doc = to_document(&st);
    assert_eq!(doc["type"], "gdb");
    let back = from_document(Tag::Debugger, &doc).unwrap();
    assert_eq!(st, back);
}

#[test]
fn crash_thread_is_found_by_top_frame_distance() {
    // A detached `#0` repeating thread 1's top frame, printed without an
    // intervening `Thread` header, is parsed as the crash frame (spec.md
    // §4.3's "detached crash-frame pointer").
    let input = format!(
        "{SEED}#0  0x000000322a2362b9 in repeat (image=<value optimized out>) at pixman-bits-image.c:145\n"
    );
    let st = parse("gdb", &input).unwrap();
    let crashing = crash_thread(&st).expect("a crash thread should be identified");
    assert_eq!(crashing.id(), 42);
}

#[test]
fn short_text_renders_known_frames_with_thread_header() {
    let st = parse("gdb", SEED).unwrap();
    let text = short_text(&st, 10);
    assert_eq!(
        text,
        "Stack trace of thread 42:\n#0 repeat\n#1 general_composite_rect\n"
    );
}

#[test]
fn short_text_renders_only_the_crash_thread_in_a_multithreaded_trace() {
    let input = format!(
        "Thread 2 (Thread 0x2 (LWP 43)):\n\
         #0  0x0000000000000001 in other_thread_fn () at other.c:1\n\
         {SEED}#0  0x000000322a2362b9 in repeat (image=<value optimized out>) at pixman-bits-image.c:145\n"
    );
    let st = parse("gdb", &input).unwrap();
    let text = short_text(&st, 10);
    assert_eq!(
        text,
        "Stack trace of thread 42:\n#0 repeat\n#1 general_composite_rect\n"
    );
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn quality_scores_agree_when_no_crash_thread_is_found() {
    let st = parse("gdb", SEED).unwrap();
    // No detached crash_frame was printed, so quality_complex falls back to
    // the crash-thread-less branch and should match quality_simple exactly
    // when every frame is known.
    assert_eq!(quality_simple(&st), 1.0);
    assert_eq!(quality_complex(&st), 1.0);
}

#[test]
fn duplicate_frames_compare_equal_under_distance_but_not_strict() {
    let a = parse("gdb", "#0  0x1000 in foo () at a.c:10\n").unwrap();
    let b = parse("gdb", "#0  0x2000 in foo () at a.c:11\n").unwrap();
    let fa = &a.threads()[0].frames()[0];
    let fb = &b.threads()[0].frames()[0];
    assert_eq!(compare_frame_distance(fa, fb), std::cmp::Ordering::Equal);
    assert_ne!(compare_frame(fa, fb), std::cmp::Ordering::Equal);
}
