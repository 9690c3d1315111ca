//! Fuzz target for pair and choice answer parsing.

#![no_main]

use joinbench::llm::{parse_choice_answer, parse_pair_answer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    let text = String::from_utf8_lossy(data);
    if let Ok(answer) = parse_pair_answer(&text) {
        assert!((0.0..=1.0).contains(&answer.score));
        assert!(answer.reason.chars().count() <= 200);
    }
    let _ = parse_choice_answer(&text);
});
