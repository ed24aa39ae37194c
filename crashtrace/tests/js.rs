//! Integration tests for the `javascript` dialect through the public façade.

use similar_asserts::assert_eq;

use crashtrace::{duplication_hash_inputs, from_document, parse, quality_simple, short_text, to_document, Tag};

const SEED: &str =
    "TypeError: x is not a function\n    at handle (/srv/app.js:12:5)\n    at /srv/app.js:7:1\n";

#[test]
fn seed_scenario_round_trips_through_document() {
    let st = parse("javascript", SEED).unwrap();
    let doc = to_document(&st);
    assert_eq!(doc["type"], "javascript");
    assert_eq!(doc["exception_name"], "TypeError");
    let back = from_document(Tag::Js, &doc).unwrap();
    assert_eq!(st, back);
}

#[test]
fn short_text_drops_the_anonymous_frame() {
    let st = parse("javascript", SEED).unwrap();
    assert_eq!(short_text(&st, 10), "#0 handle\n");
}

#[test]
fn quality_simple_counts_the_anonymous_frame_as_unknown() {
    let st = parse("javascript", SEED).unwrap();
    assert_eq!(quality_simple(&st), 0.5);
}

#[test]
fn duplication_hash_inputs_skip_anonymous_frames() {
    let st = parse("javascript", SEED).unwrap();
    assert_eq!(duplication_hash_inputs(&st), "handle|");
}

#[test]
fn native_marker_round_trips() {
    let st = parse("javascript", "    at Array.forEach (native)\n").unwrap();
    let doc = to_document(&st);
    let back = from_document(Tag::Js, &doc).unwrap();
    assert_eq!(st, back);
}
