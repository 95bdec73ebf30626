//! Feeds arbitrary bytes to the COCO reader.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use prelabel::ir::io_coco_json::from_coco_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Errors are fine; panics are not.
    if let Ok(set) = from_coco_slice(data) {
        let _ = set.annotation_count();
    }
});
