//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold across all valid inputs,
//! catching edge cases that might be missed by example-based tests.

use kmermaid::alphabet::NaType;
use kmermaid::coords::{SequenceCoords, Strand};
use kmermaid::sequence::kmers_from_sequence;
use proptest::prelude::*;

fn dna_sequence(min_len: usize, max_len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![Just('A'), Just('C'), Just('G'), Just('T')],
        min_len..=max_len,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn reference_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,12}".prop_map(|s| s)
}

proptest! {
    /// Parsing a coordinate string produced by `encode` should always
    /// recover the original struct.
    #[test]
    fn coords_roundtrip(
        reference in reference_name(),
        start in 0usize..10_000,
        len in 0usize..500,
        forward in any::<bool>(),
    ) {
        let strand = if forward { Strand::Forward } else { Strand::Reverse };
        let coords = SequenceCoords::new(reference, start, start + len, strand);
        let encoded = coords.encode();
        let parsed = SequenceCoords::parse(&encoded).unwrap();
        prop_assert_eq!(parsed, coords);
    }

    /// Every k-mer produced from a sequence is a contiguous, correctly
    /// positioned substring of it.
    #[test]
    fn kmers_are_contiguous_substrings(seq in dna_sequence(1, 64), k in 1usize..20) {
        let kmers: Vec<_> = kmers_from_sequence("ref", &seq, k, NaType::Dna, false).collect();
        for kmer in &kmers {
            prop_assert_eq!(kmer.coords.end - kmer.coords.start, k);
            prop_assert_eq!(&seq[kmer.coords.start..kmer.coords.end], kmer.seq.as_str());
        }
    }

    /// The number of k-mers produced never exceeds the number of valid
    /// sliding windows.
    #[test]
    fn kmer_count_bounded_by_windows(seq in dna_sequence(0, 64), k in 1usize..20) {
        let windows = if seq.len() >= k { seq.len() - k + 1 } else { 0 };
        let kmers: Vec<_> = kmers_from_sequence("ref", &seq, k, NaType::Dna, false).collect();
        prop_assert!(kmers.len() <= windows);
    }

    /// With `reverse` enabled, every forward k-mer is immediately paired
    /// with a reverse-complement k-mer sharing its coordinates.
    #[test]
    fn reverse_mode_doubles_output_and_shares_coords(seq in dna_sequence(4, 32), k in 1usize..4) {
        prop_assume!(seq.len() >= k);
        let forward: Vec<_> = kmers_from_sequence("ref", &seq, k, NaType::Dna, false).collect();
        let both: Vec<_> = kmers_from_sequence("ref", &seq, k, NaType::Dna, true).collect();
        prop_assert_eq!(both.len(), forward.len() * 2);
        for pair in both.chunks(2) {
            if pair.len() == 2 {
                prop_assert_eq!(pair[0].coords.start, pair[1].coords.start);
                prop_assert_eq!(pair[0].coords.end, pair[1].coords.end);
            }
        }
    }
}
