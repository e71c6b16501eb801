//! Batch (C3): a bounded, typed, sort-then-spill record container.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::alphabet::NaType;
use crate::error::KmaidError;
use crate::sequence::{KMer, SequenceCount};

/// A record type a `Batch` can hold: knows how to serialize itself to and
/// parse itself back from its on-disk text form, and how to sort a
/// collection of itself.
pub trait BatchRecord: Sized + Clone {
    /// Whether this record's text form is two-line FASTA (`true`) or a
    /// single delimited line (`false`).
    const IS_FASTA: bool;

    fn sort_key(&self) -> &str;

    fn write_to(&self, w: &mut dyn Write) -> std::io::Result<()>;

    /// Parse one record starting at `first_line` (already consumed from the
    /// reader); for FASTA records this also consumes the following sequence
    /// line from `reader`.
    fn read_from(first_line: &str, reader: &mut dyn BufRead, natype: NaType) -> Result<Self, KmaidError>;
}

impl BatchRecord for KMer {
    const IS_FASTA: bool = true;

    fn sort_key(&self) -> &str {
        &self.seq
    }

    fn write_to(&self, w: &mut dyn Write) -> std::io::Result<()> {
        w.write_all(self.to_fasta().as_bytes())
    }

    fn read_from(first_line: &str, reader: &mut dyn BufRead, natype: NaType) -> Result<Self, KmaidError> {
        let mut seq_line = String::new();
        reader.read_line(&mut seq_line)?;
        KMer::from_fasta(first_line.trim_end(), seq_line.trim_end(), natype)
    }
}

impl BatchRecord for SequenceCount {
    const IS_FASTA: bool = false;

    fn sort_key(&self) -> &str {
        &self.seq
    }

    fn write_to(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", self.to_line())
    }

    fn read_from(first_line: &str, _reader: &mut dyn BufRead, natype: NaType) -> Result<Self, KmaidError> {
        SequenceCount::from_line(first_line.trim_end(), natype)
    }
}

/// State machine: `Filling` while records accumulate in memory, `Full` once
/// capacity is reached but not yet flushed, `Written` once spilled to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Filling,
    Full,
    Written,
}

/// A bounded buffer of records with an associated temp file.
///
/// Records accumulate in memory until `capacity` is reached, at which point
/// the caller calls `flush` to sort and spill them to `temp_path`. A full,
/// written batch is immutable except via `reset` (delete the spill) or
/// `unwrite` (pull the sorted records back into memory, only legal when the
/// batch was never actually full).
#[derive(Debug)]
pub struct Batch<T: BatchRecord> {
    capacity: usize,
    records: Vec<T>,
    temp_path: PathBuf,
    state: State,
    natype: NaType,
}

impl<T: BatchRecord> Batch<T> {
    #[must_use]
    pub fn new(capacity: usize, temp_path: PathBuf, natype: NaType) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity.min(1024)),
            temp_path,
            state: State::Filling,
            natype,
        }
    }

    /// Wrap an already-sorted, already-written spill file as a `Batch`,
    /// without re-flushing it. Used when reloading a previous run's batch
    /// directory: `record_count` becomes the batch's reported capacity.
    #[must_use]
    pub fn from_written(temp_path: PathBuf, natype: NaType, record_count: usize) -> Self {
        Self {
            capacity: record_count.max(1),
            records: Vec::new(),
            temp_path,
            state: State::Written,
            natype,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn current_size(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.current_size())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current_size() >= self.capacity
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        self.state == State::Written
    }

    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Append a record. Errors if the batch is already written, or if it
    /// has no remaining capacity.
    pub fn append(&mut self, record: T) -> Result<(), KmaidError> {
        if self.state == State::Written {
            return Err(KmaidError::WrittenBatchImmutable {
                path: self.temp_path.clone(),
            });
        }
        if self.remaining() == 0 {
            return Err(KmaidError::BatchFull {
                capacity: self.capacity,
            });
        }
        self.records.push(record);
        if self.is_full() {
            self.state = State::Full;
        }
        Ok(())
    }

    /// Sort the in-memory records and spill them to `temp_path`, releasing
    /// the in-memory collection.
    pub fn flush(&mut self) -> Result<(), KmaidError> {
        if self.state == State::Written {
            return Ok(());
        }
        self.records
            .sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        let file = File::create(&self.temp_path)?;
        let mut writer = BufWriter::new(file);
        for record in &self.records {
            record.write_to(&mut writer)?;
        }
        writer.flush()?;
        self.records.clear();
        self.records.shrink_to_fit();
        self.state = State::Written;
        Ok(())
    }

    /// Delete the spill file and return the batch to empty-and-filling.
    pub fn reset(&mut self) -> Result<(), KmaidError> {
        if self.temp_path.exists() {
            std::fs::remove_file(&self.temp_path)?;
        }
        self.records.clear();
        self.state = State::Filling;
        Ok(())
    }

    /// Pull a written, but never-full, batch's sorted records back into
    /// memory and delete the spill file. Errors if the batch ever reached
    /// capacity (the distilled contract: `unwrite` only undoes an early
    /// flush, not a genuinely full batch).
    pub fn unwrite(&mut self) -> Result<(), KmaidError> {
        if self.state != State::Written {
            return Ok(());
        }
        let records = self.read_records()?;
        if records.len() >= self.capacity {
            return Err(KmaidError::BatchFull {
                capacity: self.capacity,
            });
        }
        std::fs::remove_file(&self.temp_path)?;
        self.records = records;
        self.state = State::Filling;
        Ok(())
    }

    /// Read back the sorted records from disk without mutating state.
    pub fn read_records(&self) -> Result<Vec<T>, KmaidError> {
        let file = File::open(&self.temp_path)?;
        let mut reader = BufReader::new(file);
        let mut out = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            out.push(T::read_from(&line, &mut reader, self.natype)?);
        }
        Ok(out)
    }

    /// In-memory records, for a batch that has not yet been flushed.
    #[must_use]
    pub fn records(&self) -> &[T] {
        &self.records
    }
}

/// A batch variant that streams records directly to its temp file on every
/// `append`, never holding them in memory. Used by parallel workers that
/// each own one pre-allocated temp file.
#[derive(Debug)]
pub struct AppendableBatch<T: BatchRecord> {
    temp_path: PathBuf,
    writer: BufWriter<File>,
    count: usize,
    natype: NaType,
    _marker: std::marker::PhantomData<T>,
}

impl<T: BatchRecord> AppendableBatch<T> {
    pub fn create(temp_path: PathBuf, natype: NaType) -> Result<Self, KmaidError> {
        let file = File::create(&temp_path)?;
        Ok(Self {
            temp_path,
            writer: BufWriter::new(file),
            count: 0,
            natype,
            _marker: std::marker::PhantomData,
        })
    }

    pub fn append(&mut self, record: &T) -> Result<(), KmaidError> {
        record.write_to(&mut self.writer)?;
        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf, KmaidError> {
        self.writer.flush()?;
        Ok(self.temp_path)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    #[must_use]
    pub fn natype(&self) -> NaType {
        self.natype
    }
}
