//! Fuzz target for Open Images box CSV parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run open_images_csv_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use oicoco::convert::project_row;
use oicoco::ir::io_open_images_csv::from_open_images_csv_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Projection must not panic on whatever numbers made it through parsing.
    if let Ok(rows) = from_open_images_csv_slice(data) {
        for row in &rows {
            let _ = project_row(row, 640, 480);
        }
    }
});
