//! Feeds arbitrary bytes to the VOC XML parser.
//!
//! Run with:
//!   cargo +nightly fuzz run voc_xml_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use prelabel::ir::io_voc_xml::from_voc_xml_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok((_, annotations)) = from_voc_xml_slice(data) {
        for annotation in &annotations {
            let _ = annotation.bbox.truncated();
        }
    }
});
