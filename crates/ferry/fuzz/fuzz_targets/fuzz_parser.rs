//! Fuzz target for the upload parser.
//!
//! This fuzzer tests that the CSV/TSV parser:
//! 1. Never panics on malformed input
//! 2. Handles all delimiter combinations
//! 3. Always yields rows as wide as the header

#![no_main]

use ferry::Parser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    for name in ["upload.csv", "upload.tsv", "upload.txt"] {
        if let Ok((table, _)) = parser.parse_bytes(name, data) {
            assert!(table.rows.iter().all(|row| row.len() == table.headers.len()));
        }
    }
});
