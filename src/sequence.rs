//! Record types (C2): `KMer`, `SequenceCount`, and the k-mer producer.

use crate::alphabet::{revcomp, NaType};
use crate::coords::{SequenceCoords, Strand};
use crate::error::KmaidError;

/// One fixed-length substring, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KMer {
    pub coords: SequenceCoords,
    pub seq: String,
    pub natype: NaType,
}

impl KMer {
    /// # Panics
    /// Never in practice: callers are expected to have already validated
    /// that `coords.len() == seq.len()`; this is enforced by every producer
    /// in this module.
    #[must_use]
    pub fn new(coords: SequenceCoords, seq: String, natype: NaType) -> Self {
        debug_assert_eq!(coords.len(), seq.len());
        Self {
            coords,
            seq,
            natype,
        }
    }

    /// Two-line FASTA rendering: `>ref:start-end:strand\nSEQ\n`.
    #[must_use]
    pub fn to_fasta(&self) -> String {
        format!(">{}\n{}\n", self.coords.encode(), self.seq)
    }

    /// Parse a `(header_line, seq_line)` pair back into a `KMer`.
    pub fn from_fasta(header_line: &str, seq_line: &str, natype: NaType) -> Result<Self, KmaidError> {
        let header = header_line
            .strip_prefix('>')
            .ok_or_else(|| KmaidError::MalformedFasta {
                offset: 0,
                details: "k-mer record header missing '>'".to_string(),
            })?;
        let coords = SequenceCoords::parse(header)?;
        Ok(Self::new(coords, seq_line.to_string(), natype))
    }
}

/// One sequence paired with every header whose k-mer equalled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceCount {
    pub seq: String,
    pub headers: Vec<String>,
    pub natype: NaType,
}

impl SequenceCount {
    #[must_use]
    pub fn new(seq: String, headers: Vec<String>, natype: NaType) -> Self {
        Self {
            seq,
            headers,
            natype,
        }
    }

    #[must_use]
    pub fn single(kmer: KMer) -> Self {
        Self {
            seq: kmer.seq,
            headers: vec![kmer.coords.encode()],
            natype: kmer.natype,
        }
    }

    /// Tab-separated line: `seq\th1 h2 h3...`.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.seq, self.headers.join(" "))
    }

    pub fn from_line(line: &str, natype: NaType) -> Result<Self, KmaidError> {
        let (seq, headers_str) = line.split_once('\t').ok_or_else(|| KmaidError::MalformedHeader {
            header: line.to_string(),
            details: "sequence-count line missing tab separator".to_string(),
        })?;
        let headers = headers_str.split(' ').map(str::to_string).collect();
        Ok(Self::new(seq.to_string(), headers, natype))
    }

    /// Merge another group with the same `seq` into this one.
    pub fn merge(&mut self, other: SequenceCount) {
        debug_assert_eq!(self.seq, other.seq);
        self.headers.extend(other.headers);
    }
}

/// How to scan a FASTA file for k-mer production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Fan out within each record into overlapping shards for parallel
    /// k-mer production (shards overlap by `k - 1` bases so no k-mer spanning
    /// a shard boundary is lost).
    Kmers,
    /// One worker per whole record; no intra-record sharding.
    Records,
}

/// Produce every k-mer of length `k` in `seq`, in left-to-right order.
///
/// `seq` is upper-cased in full before any k-mer is cut, so soft-masked
/// (lowercase) input merges with uppercase input of the same sequence
/// instead of sorting and grouping separately.
///
/// When `reverse` is set, each forward k-mer is immediately followed by its
/// reverse complement, sharing the *same* `(start, end)` coordinates as the
/// forward k-mer and strand `Strand::Reverse` — see DESIGN.md for why this
/// coordinate-sharing ambiguity is kept rather than resolved.
///
/// K-mers containing a base outside `natype`'s alphabet are skipped (logged
/// by the caller), never returned.
pub fn kmers_from_sequence<'a>(
    reference: &'a str,
    seq: &'a str,
    k: usize,
    natype: NaType,
    reverse: bool,
) -> impl Iterator<Item = KMer> + 'a {
    let bytes = seq.to_ascii_uppercase().into_bytes();
    let windows = if bytes.len() >= k {
        bytes.len() - k + 1
    } else {
        0
    };

    (0..windows).flat_map(move |start| {
        let end = start + k;
        let window = &bytes[start..end];
        let mut out = Vec::with_capacity(2);
        if natype.is_valid(window) {
            let coords = SequenceCoords::new(reference, start, end, Strand::Forward);
            let fwd = String::from_utf8_lossy(window).to_string();
            out.push(KMer::new(coords, fwd, natype));
            if reverse {
                let rc = revcomp(window, natype);
                let rc_coords = SequenceCoords::new(reference, start, end, Strand::Reverse);
                out.push(KMer::new(rc_coords, String::from_utf8_lossy(&rc).to_string(), natype));
            }
        } else {
            tracing::warn!(
                reference,
                start,
                end,
                window = %String::from_utf8_lossy(window),
                "skipping k-mer with out-of-alphabet base"
            );
        }
        out
    })
}
