//! Coordinate codec (C9): `ref:start-end:strand` header strings.
//!
//! The reference name may itself contain colons, so parsing is anchored
//! from the right: strand, then start-end, then whatever remains is ref.

use crate::error::KmaidError;

/// Strand a k-mer (or its originating match) was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            _ => None,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A parsed `ref:start-end:strand` coordinate. `[start, end)` is half-open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceCoords {
    pub reference: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl SequenceCoords {
    #[must_use]
    pub fn new(reference: impl Into<String>, start: usize, end: usize, strand: Strand) -> Self {
        Self {
            reference: reference.into(),
            start,
            end,
            strand,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Render as `ref:start-end:strand`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}:{}-{}:{}",
            self.reference,
            self.start,
            self.end,
            self.strand.as_char()
        )
    }

    /// Parse a `ref:start-end:strand` header, anchoring from the right so
    /// that a reference name containing colons still parses correctly.
    pub fn parse(header: &str) -> Result<Self, KmaidError> {
        let malformed = |details: &str| KmaidError::MalformedHeader {
            header: header.to_string(),
            details: details.to_string(),
        };

        let (rest, strand_str) = header
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing ':' before strand"))?;
        let mut strand_chars = strand_str.chars();
        let strand_char = strand_chars
            .next()
            .ok_or_else(|| malformed("empty strand field"))?;
        if strand_chars.next().is_some() {
            return Err(malformed("strand field must be a single character"));
        }
        let strand = Strand::from_char(strand_char)
            .ok_or_else(|| malformed("strand must be '+' or '-'"))?;

        let (reference, range_str) = rest
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing ':' before range"))?;
        let (start_str, end_str) = range_str
            .split_once('-')
            .ok_or_else(|| malformed("missing '-' in range"))?;
        let start: usize = start_str
            .parse()
            .map_err(|_| malformed("start is not a valid integer"))?;
        let end: usize = end_str
            .parse()
            .map_err(|_| malformed("end is not a valid integer"))?;
        if end < start {
            return Err(malformed("end precedes start"));
        }
        if reference.is_empty() {
            return Err(malformed("reference name is empty"));
        }

        Ok(Self {
            reference: reference.to_string(),
            start,
            end,
            strand,
        })
    }
}
