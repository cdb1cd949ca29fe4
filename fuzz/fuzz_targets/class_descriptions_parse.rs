//! Fuzz target for the class description table.
//!
//! Run with:
//!   cargo +nightly fuzz run class_descriptions_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use oicoco::ir::io_open_images_csv::from_class_descriptions_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let _ = from_class_descriptions_slice(data);
});
