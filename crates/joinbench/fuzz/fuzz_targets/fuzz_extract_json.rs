//! Fuzz target for JSON block extraction.
//!
//! Model replies are arbitrary text. Extraction must never panic (the
//! brace scanner slices by byte offset), and whatever it returns must be a
//! JSON object.

#![no_main]

use joinbench::llm::extract_json_block;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(block) = extract_json_block(text) {
            let value: serde_json::Value =
                serde_json::from_str(block).expect("extracted block must parse");
            assert!(value.is_object());
        }
    }
});
