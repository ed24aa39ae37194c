//! Integration tests for the `koops` dialect through the public façade.

use similar_asserts::assert_eq;

use crashtrace::normalize::limit_frame_depth;
use crashtrace::{duplication_hash_inputs, from_document, parse, to_document, Tag};

const SEED: &str = "[ 4.321] BUG: unable to handle kernel NULL pointer dereference at 0000000000000000\n\
                     [ 4.321] Modules linked in: ext4 jbd2\n\
                     [ 4.321]  [<ffffffff81234567>] ? vfs_read+0x42/0x80\n\
                     [ 4.321]  [<ffffffff81234999>] vfs_write+0x10/0x30\n";

#[test]
fn seed_scenario_round_trips_through_document() {
    let st = parse("koops", SEED).unwrap();
    let doc = to_document(&st);
    assert_eq!(doc["type"], "koops");
    assert_eq!(doc["modules"], serde_json::json!(["ext4", "jbd2"]));
    let back = from_document(Tag::KernelOops, &doc).unwrap();
    assert_eq!(st, back);
}

#[test]
fn limit_frame_depth_is_idempotent() {
    let mut st = parse("koops", SEED).unwrap();
    limit_frame_depth(&mut st, 1);
    limit_frame_depth(&mut st, 5);
    assert_eq!(st.all_frames().len(), 1);
}

#[test]
fn duplication_hash_inputs_use_function_and_module_names() {
    let st = parse("koops", SEED).unwrap();
    let hashed = duplication_hash_inputs(&st);
    assert_eq!(hashed, "vfs_read|\nvfs_write|");
}

#[test]
fn missing_call_trace_line_is_rejected() {
    let err = parse("koops", "[ 1.000] Modules linked in: ext4\n").unwrap_err();
    assert_eq!(err.line, 2);
}
