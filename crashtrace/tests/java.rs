//! Integration tests for the `java` managed-runtime dialect through the
//! public façade.

use similar_asserts::assert_eq;

use crashtrace::{crash_thread, from_document, parse, quality_simple, short_text, to_document, Tag};

const SEED: &str = "Exception in thread \"main\" java.lang.RuntimeException: top\n\
                     \tat com.example.Foo.bar(Foo.java:10)\n\
                     \tat com.example.Foo.baz(Foo.java:20)\n";

#[test]
fn seed_scenario_round_trips_through_document() {
    let st = parse("java", SEED).unwrap();
    let doc = to_document(&st);
    assert_eq!(doc["type"], "java");
    let frames = doc["threads"][0]["frames"].as_array().unwrap();
    assert_eq!(frames[0]["is_exception"], true);
    assert_eq!(frames[1]["is_exception"], false);
    let back = from_document(Tag::Managed, &doc).unwrap();
    assert_eq!(st, back);
}

#[test]
fn short_text_drops_the_exception_header() {
    let st = parse("java", SEED).unwrap();
    let text = short_text(&st, 10);
    assert_eq!(
        text,
        "Stack trace of thread 0:\n#0 com.example.Foo.bar\n#1 com.example.Foo.baz\n"
    );
}

#[test]
fn quality_simple_counts_the_exception_header_as_unknown() {
    let st = parse("java", SEED).unwrap();
    assert_eq!(quality_simple(&st), 2.0 / 3.0);
}

#[test]
fn managed_dialect_has_no_crash_thread_concept() {
    let st = parse("java", SEED).unwrap();
    assert!(crash_thread(&st).is_none());
}

#[test]
fn caused_by_chain_folds_through() {
    let input = format!(
        "{SEED}Caused by: java.lang.IllegalStateException: middle\n\tat com.example.Foo.qux(Foo.java:30)\n\t... 3 more\n"
    );
    let st = parse("java", &input).unwrap();
    let doc = to_document(&st);
    let frames = doc["threads"][0]["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[0]["folded"], serde_json::Value::Null);
    assert_eq!(frames[3]["folded"], 3);
    let back = from_document(Tag::Managed, &doc).unwrap();
    assert_eq!(st, back);
}
