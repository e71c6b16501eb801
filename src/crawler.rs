//! Merge crawler (C5): a k-way merge over sorted batch files, grouping
//! records with identical sequence.
//!
//! The crawler merges over an abstract [`GroupedSource`] rather than a
//! fixed file format, so the same merge logic drives both the first-tier
//! merge over FASTA-formatted k-mer batches and the second-tier merge over
//! tab-formatted intermediate sequence-count batches (C7).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::PathBuf;

use crate::error::KmaidError;
use crate::reader::{BoundedFastaCursor, BoundedLineCursor};

/// One sorted, on-disk source of `(seq, headers)` entries, read lazily.
pub trait GroupedSource {
    fn next_entry(&mut self) -> Result<Option<(String, Vec<String>)>, KmaidError>;
}

/// Wraps a two-line-FASTA k-mer batch: each record contributes exactly one
/// header.
pub struct FastaGroupSource(BoundedFastaCursor);

impl FastaGroupSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self(BoundedFastaCursor::new(path))
    }
}

impl GroupedSource for FastaGroupSource {
    fn next_entry(&mut self) -> Result<Option<(String, Vec<String>)>, KmaidError> {
        let Some(raw) = self.0.next_record()? else {
            return Ok(None);
        };
        let mut lines = raw.lines();
        let header = lines
            .next()
            .and_then(|l| l.strip_prefix('>'))
            .ok_or_else(|| KmaidError::MalformedFasta {
                offset: 0,
                details: "crawler record missing header".to_string(),
            })?
            .to_string();
        let seq = lines
            .next()
            .ok_or_else(|| KmaidError::MalformedFasta {
                offset: 0,
                details: "crawler record missing sequence".to_string(),
            })?
            .to_string();
        Ok(Some((seq, vec![header])))
    }
}

/// Wraps a tab-formatted `SequenceCount` batch: each line already carries
/// its full header list.
pub struct SeqCountGroupSource(BoundedLineCursor);

impl SeqCountGroupSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self(BoundedLineCursor::new(path))
    }
}

impl GroupedSource for SeqCountGroupSource {
    fn next_entry(&mut self) -> Result<Option<(String, Vec<String>)>, KmaidError> {
        let Some(line) = self.0.next_line()? else {
            return Ok(None);
        };
        let (seq, headers_str) = line.split_once('\t').ok_or_else(|| KmaidError::MalformedHeader {
            header: line.clone(),
            details: "sequence-count line missing tab separator".to_string(),
        })?;
        let headers = headers_str.split(' ').map(str::to_string).collect();
        Ok(Some((seq.to_string(), headers)))
    }
}

struct HeapEntry {
    seq: String,
    headers: Vec<String>,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}
impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.seq.cmp(&other.seq)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// k-way merge over a set of sorted sources.
///
/// Each call to `next_group` returns the next distinct `seq` in ascending
/// order together with every header across every source whose entry
/// equalled it.
pub struct Crawler {
    sources: Vec<Box<dyn GroupedSource>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl Crawler {
    pub fn new(sources: Vec<Box<dyn GroupedSource>>) -> Result<Self, KmaidError> {
        let mut sources = sources;
        let mut heap = BinaryHeap::new();
        for (idx, source) in sources.iter_mut().enumerate() {
            if let Some((seq, headers)) = source.next_entry()? {
                heap.push(Reverse(HeapEntry {
                    seq,
                    headers,
                    source: idx,
                }));
            }
        }
        Ok(Self { sources, heap })
    }

    /// Convenience constructor over two-line-FASTA k-mer batch files.
    pub fn from_fasta_batches(batch_paths: Vec<PathBuf>) -> Result<Self, KmaidError> {
        let sources: Vec<Box<dyn GroupedSource>> = batch_paths
            .into_iter()
            .map(|p| Box::new(FastaGroupSource::new(p)) as Box<dyn GroupedSource>)
            .collect();
        Self::new(sources)
    }

    /// Convenience constructor over tab-formatted sequence-count batch
    /// files (the output of C7).
    pub fn from_seqcount_batches(batch_paths: Vec<PathBuf>) -> Result<Self, KmaidError> {
        let sources: Vec<Box<dyn GroupedSource>> = batch_paths
            .into_iter()
            .map(|p| Box::new(SeqCountGroupSource::new(p)) as Box<dyn GroupedSource>)
            .collect();
        Self::new(sources)
    }

    fn advance(&mut self, idx: usize) -> Result<(), KmaidError> {
        if let Some((seq, headers)) = self.sources[idx].next_entry()? {
            self.heap.push(Reverse(HeapEntry {
                seq,
                headers,
                source: idx,
            }));
        }
        Ok(())
    }

    /// Pull the next sequence-group, or `None` once every source is
    /// exhausted.
    pub fn next_group(&mut self) -> Result<Option<(String, Vec<String>)>, KmaidError> {
        let Some(Reverse(first)) = self.heap.pop() else {
            return Ok(None);
        };
        let seq = first.seq;
        let mut headers = first.headers;
        self.advance(first.source)?;

        while let Some(Reverse(top)) = self.heap.peek() {
            if top.seq != seq {
                break;
            }
            let Reverse(mut entry) = self.heap.pop().expect("peeked entry exists");
            headers.append(&mut entry.headers);
            self.advance(entry.source)?;
        }

        Ok(Some((seq, headers)))
    }
}

impl Iterator for Crawler {
    type Item = Result<(String, Vec<String>), KmaidError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_group().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_fasta_batch(dir: &Path, name: &str, records: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::new();
        for (header, seq) in records {
            text.push_str(&format!(">{header}\n{seq}\n"));
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn merges_in_ascending_seq_order() {
        let dir = tempdir().unwrap();
        let b1 = write_fasta_batch(dir.path(), "b1.batch", &[("h1", "AAA"), ("h2", "GGG")]);
        let b2 = write_fasta_batch(dir.path(), "b2.batch", &[("h3", "CCC"), ("h4", "GGG")]);

        let mut crawler = Crawler::from_fasta_batches(vec![b1, b2]).unwrap();
        let mut groups = Vec::new();
        while let Some(group) = crawler.next_group().unwrap() {
            groups.push(group);
        }
        let seqs: Vec<_> = groups.iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(seqs, vec!["AAA", "CCC", "GGG"]);
        let gg = groups.iter().find(|(s, _)| s == "GGG").unwrap();
        assert_eq!(gg.1.len(), 2);
    }

    #[test]
    fn empty_batches_yield_no_groups() {
        let dir = tempdir().unwrap();
        let empty = write_fasta_batch(dir.path(), "e.batch", &[]);
        let mut crawler = Crawler::from_fasta_batches(vec![empty]).unwrap();
        assert!(crawler.next_group().unwrap().is_none());
    }

    #[test]
    fn merges_seqcount_batches_concatenating_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sc.batch");
        std::fs::write(&path, "AAA\th1 h2\nGGG\th3\n").unwrap();
        let mut crawler = Crawler::from_seqcount_batches(vec![path]).unwrap();
        let (seq, headers) = crawler.next_group().unwrap().unwrap();
        assert_eq!(seq, "AAA");
        assert_eq!(headers, vec!["h1".to_string(), "h2".to_string()]);
    }
}
