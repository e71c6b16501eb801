//! Error types for kmermaid.
//!
//! This module provides an exhaustive, strongly-typed error enum covering
//! every failure mode of the batching, merging, joining, and abundance-vector
//! stages, enabling precise error handling and informative messages at the
//! CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in kmermaid operations.
#[derive(Debug, Error)]
pub enum KmaidError {
    /// K-mer length is zero or otherwise unusable.
    #[error("invalid k-mer length {k}: k must be at least 1")]
    InvalidKmerLength { k: usize },

    /// A FASTA record was malformed: header missing or content preceded the first `>`.
    #[error("malformed FASTA input at byte offset {offset}: {details}")]
    MalformedFasta { offset: u64, details: String },

    /// Input contained no usable records after skipping blank lines.
    #[error("input '{path}' contained no sequence records")]
    EmptyInput { path: PathBuf },

    /// A k-mer header string did not match `ref:start-end:strand`.
    #[error("malformed coordinate header '{header}': {details}")]
    MalformedHeader { header: String, details: String },

    /// Attempted to append to a batch that is already at capacity.
    #[error("batch is full: capacity {capacity} already reached")]
    BatchFull { capacity: usize },

    /// Attempted to mutate a batch that has already been written to disk.
    #[error("batch has already been written to '{path}' and is immutable")]
    WrittenBatchImmutable { path: PathBuf },

    /// A batch or record was used with a record type it was not built for.
    #[error("record type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Attempted to overwrite a non-zero abundance-vector cell without `replace`.
    #[error("refusing to overwrite existing count at {reference}:{position} ({strand}) without replace=true")]
    AbundanceConflict {
        reference: String,
        position: usize,
        strand: char,
    },

    /// Two operations disagreed on the k-mer length in play.
    #[error("inconsistent k: expected {expected}, found {found}")]
    InconsistentK { expected: usize, found: usize },

    /// The input path does not exist.
    #[error("input path '{path}' does not exist")]
    InputNotFound { path: PathBuf },

    /// An output directory that must be empty was not.
    #[error("output directory '{path}' is not empty")]
    OutputNotEmpty { path: PathBuf },

    /// Any filesystem or gzip failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_kmer_length_display() {
        let err = KmaidError::InvalidKmerLength { k: 0 };
        assert_eq!(err.to_string(), "invalid k-mer length 0: k must be at least 1");
    }

    #[test]
    fn abundance_conflict_display() {
        let err = KmaidError::AbundanceConflict {
            reference: "chr1".to_string(),
            position: 42,
            strand: '+',
        };
        assert_eq!(
            err.to_string(),
            "refusing to overwrite existing count at chr1:42 (+) without replace=true"
        );
    }

    #[test]
    fn io_error_wraps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KmaidError = io_err.into();
        assert!(matches!(err, KmaidError::Io(_)));
    }

    #[test]
    fn malformed_header_display() {
        let err = KmaidError::MalformedHeader {
            header: "garbage".to_string(),
            details: "missing ':'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed coordinate header 'garbage': missing ':'"
        );
    }
}
