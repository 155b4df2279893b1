//! Property-based tests for knowledge extraction from utterances.
//!
//! Arbitrary text never panics the parser, and any coordinate a speaker
//! mentions next to a water word is recovered exactly.

use proptest::prelude::*;

use hamlet_core::ResourceKind;
use hamlet_core::memory::SharedPayload;
use hamlet_sim::conversation::{extract_shared, find_coordinates};

proptest! {
    #[test]
    fn parser_never_panics(text in "\\PC{0,80}") {
        let _ = find_coordinates(&text);
        let _ = extract_shared("Ahmet", &text);
    }

    #[test]
    fn mentioned_water_is_recovered(x in -500i32..500, y in -500i32..500, pad in "[a-z ]{0,12}") {
        let text = format!("{pad} su burada ({x}, {y}) {pad}");
        let payloads = extract_shared("Ayşe", &text);
        let found = payloads.iter().any(|p| matches!(
            p,
            SharedPayload::Resource { kind: ResourceKind::Water, x: px, y: py, .. }
                if *px == x && *py == y
        ));
        prop_assert!(found, "missing ({}, {}) in {:?}", x, y, payloads);
    }

    #[test]
    fn coordinates_keep_their_order(points in prop::collection::vec((-99i32..99, -99i32..99), 0..6)) {
        let text: String = points.iter().map(|(x, y)| format!("yer ({x},{y}) ")).collect();
        prop_assert_eq!(find_coordinates(&text), points);
    }
}
