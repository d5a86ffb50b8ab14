//! Property-based tests for the split/merge pair.
//!
//! Invariants checked:
//! - Zero-overlap splits partition the text exactly
//! - Splits with overlap round-trip through stitching
//! - Every produced chunk respects the size budget (full default cascade)
//! - Planted overlaps are recovered exactly

use proptest::prelude::*;

use textsplice::measure::LengthMetric;
use textsplice::merge::logic::{find_overlap, stitch};
use textsplice::split::logic::{default_cascade, recursive_split};

fn prose_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 .!?\\n]{0,300}").unwrap()
}

/// Words are all distinct, so overlap detection can never latch onto a
/// coincidental repeat.
fn distinct_word_text(words: usize) -> String {
    (0..words)
        .map(|i| format!("w{i:02}"))
        .collect::<Vec<_>>()
        .join(" ")
}

proptest! {
    #[test]
    fn zero_overlap_split_partitions_text(text in prose_text(), size in 1usize..60) {
        let cascade = default_cascade().unwrap();
        let chunks = recursive_split(&text, &cascade, size, 0, LengthMetric::Chars);
        prop_assert_eq!(chunks.concat(), text.clone());
        prop_assert_eq!(stitch(&chunks, 0).text, text);
    }

    #[test]
    fn chunks_respect_budget(text in prose_text(), size in 1usize..60, overlap in 0usize..80) {
        let cascade = default_cascade().unwrap();
        let chunks = recursive_split(&text, &cascade, size, overlap, LengthMetric::Chars);
        for chunk in &chunks {
            prop_assert!(
                chunk.chars().count() <= size,
                "chunk of {} chars exceeds budget {}",
                chunk.chars().count(),
                size
            );
        }
    }

    #[test]
    fn overlapping_split_round_trips(words in 5usize..50, size in 6usize..30, overlap in 0usize..30) {
        prop_assume!(overlap < size);
        let text = distinct_word_text(words);
        let cascade = default_cascade().unwrap();
        let chunks = recursive_split(&text, &cascade, size, overlap, LengthMetric::Chars);
        prop_assert_eq!(stitch(&chunks, overlap).text, text);
    }

    #[test]
    fn planted_overlap_is_recovered(
        a in "[a-z]{0,40}",
        b in "[A-Z0-9]{1,40}",
        k in 1usize..40,
        extra in 0usize..10,
    ) {
        prop_assume!(k <= b.len());
        let left = format!("{a}{}", &b[..k]);
        prop_assert_eq!(find_overlap(&left, &b, k + extra), k);
    }

    #[test]
    fn disjoint_alphabets_share_no_overlap(
        a in "[a-z]{1,30}",
        b in "[0-9]{1,30}",
        cap in 0usize..40,
    ) {
        prop_assert_eq!(find_overlap(&a, &b, cap), 0);
    }

    #[test]
    fn stitch_single_chunk_is_identity(text in prose_text(), overlap in 0usize..100) {
        let out = stitch(std::slice::from_ref(&text), overlap);
        prop_assert_eq!(out.text, text);
        prop_assert!(out.misses.is_empty());
    }
}
