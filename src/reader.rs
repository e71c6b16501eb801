//! FASTA reader (C1): eager whole-file scanning plus a bounded-handle
//! cursor used during the k-way merge to keep per-batch descriptor usage
//! at O(1) regardless of how many batch files are open "at once".

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::KmaidError;

/// One FASTA record: header (without the leading `>`) and concatenated
/// sequence lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: String,
    pub seq: String,
}

fn open_possibly_gzipped(path: &Path) -> Result<Box<dyn BufRead>, KmaidError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            KmaidError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            KmaidError::Io(source)
        }
    })?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Eagerly-scanning reader: streams `Record`s out of a plain or gzipped
/// FASTA file, tolerant of leading blank lines, strict about the `>`
/// sigil once content starts.
pub struct FastaReader {
    inner: Box<dyn BufRead>,
    pending_header: Option<String>,
    offset: u64,
    started: bool,
}

impl std::fmt::Debug for FastaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaReader")
            .field("pending_header", &self.pending_header)
            .field("offset", &self.offset)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl FastaReader {
    pub fn open(path: &Path) -> Result<Self, KmaidError> {
        Ok(Self {
            inner: open_possibly_gzipped(path)?,
            pending_header: None,
            offset: 0,
            started: false,
        })
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        self.offset += n as u64;
        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }
}

impl Iterator for FastaReader {
    type Item = Result<Record, KmaidError>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                match self.read_line() {
                    Ok(Some(line)) => {
                        let trimmed = line.trim_end();
                        if trimmed.is_empty() {
                            continue;
                        }
                        if let Some(h) = trimmed.strip_prefix('>') {
                            self.started = true;
                            break h.to_string();
                        }
                        return Some(Err(KmaidError::MalformedFasta {
                            offset: self.offset,
                            details: format!("expected '>' header, found '{trimmed}'"),
                        }));
                    }
                    Ok(None) => return None,
                    Err(e) => return Some(Err(KmaidError::Io(e))),
                }
            },
        };

        let mut seq = String::new();
        loop {
            match self.read_line() {
                Ok(Some(line)) => {
                    let trimmed = line.trim_end();
                    if let Some(h) = trimmed.strip_prefix('>') {
                        self.pending_header = Some(h.to_string());
                        break;
                    }
                    // Strip whitespace from anywhere in the line, not just
                    // the trailing newline: some FASTA dialects group bases
                    // with embedded spaces.
                    seq.extend(trimmed.chars().filter(|c| !c.is_whitespace()));
                }
                Ok(None) => break,
                Err(e) => return Some(Err(KmaidError::Io(e))),
            }
        }

        if seq.is_empty() {
            return Some(Err(KmaidError::MalformedFasta {
                offset: self.offset,
                details: format!("record '{header}' has no sequence"),
            }));
        }

        Some(Ok(Record { header, seq }))
    }
}

/// A cursor over a strictly two-line-per-record FASTA file (the format this
/// crate's own batch files are always written in): opens the file, seeks to
/// the stored byte offset, reads exactly one record, then closes the
/// handle again. Used by the merge crawler so that scanning thousands of
/// sorted batch files concurrently costs O(1) open descriptors per batch at
/// any instant, never O(batches).
pub struct BoundedFastaCursor {
    path: PathBuf,
    offset: u64,
    exhausted: bool,
}

impl BoundedFastaCursor {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            exhausted: false,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next two-line record, or `None` at EOF. Opens and closes
    /// the underlying file handle on every call.
    pub fn next_record(&mut self) -> Result<Option<String>, KmaidError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(file);

        let mut header_line = String::new();
        let header_bytes = reader.read_line(&mut header_line)?;
        if header_bytes == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        let mut seq_line = String::new();
        let seq_bytes = reader.read_line(&mut seq_line)?;
        if seq_bytes == 0 {
            self.exhausted = true;
            return Err(KmaidError::MalformedFasta {
                offset: self.offset,
                details: "batch record header with no following sequence line".to_string(),
            });
        }
        self.offset += (header_bytes + seq_bytes) as u64;

        if !header_line.trim_end().starts_with('>') {
            return Err(KmaidError::MalformedFasta {
                offset: self.offset,
                details: "batch record missing '>' sigil".to_string(),
            });
        }
        Ok(Some(format!(
            "{}\n{}",
            header_line.trim_end(),
            seq_line.trim_end()
        )))
    }

    /// Reset the cursor to the start of the file (used when a donor batch
    /// must be rescanned, e.g. `--re-sort`).
    pub fn rewind(&mut self) {
        self.offset = 0;
        self.exhausted = false;
    }
}

/// A cursor over a single-delimited-line-per-record file (used for
/// `SequenceCount` batches, which have no FASTA framing).
pub struct BoundedLineCursor {
    path: PathBuf,
    offset: u64,
    exhausted: bool,
}

impl BoundedLineCursor {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            exhausted: false,
        }
    }

    pub fn next_line(&mut self) -> Result<Option<String>, KmaidError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        self.offset += n as u64;
        Ok(Some(line.trim_end().to_string()))
    }
}
