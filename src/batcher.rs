//! Batcher (C4): orchestrates a growing collection of `Batch`es.
//!
//! `Batcher<T>` owns exactly one "active" (non-full) batch at a time; every
//! earlier batch in the collection has already been flushed to disk.
//! `FastaBatcher` is the entry point that turns a FASTA file into a
//! `Batcher<KMer>`, fanning out across `rayon` workers per the configured
//! [`ScanMode`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::alphabet::NaType;
use crate::batch::{Batch, BatchRecord};
use crate::error::KmaidError;
use crate::progress::ProgressTracker;
use crate::reader::{FastaReader, Record};
use crate::sequence::{kmers_from_sequence, KMer, ScanMode};

/// Shared configuration for a batching run (REDESIGN FLAGS: a single
/// configuration record replacing attribute-inheriting subclasses).
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub size: usize,
    pub threads: usize,
    pub natype: NaType,
    pub tmp_dir: PathBuf,
    pub reverse_complement: bool,
    pub scan_mode: ScanMode,
    pub feed_mode: FeedMode,
}

impl BatcherConfig {
    #[must_use]
    pub fn new(size: usize, tmp_dir: PathBuf, natype: NaType) -> Self {
        Self {
            size,
            threads: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            natype,
            tmp_dir,
            reverse_complement: false,
            scan_mode: ScanMode::Kmers,
            feed_mode: FeedMode::Append,
        }
    }
}

/// How to combine one collection of batches into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Swap: `self`'s collection becomes `other`'s, wholesale.
    Replace,
    /// Drain `other` record-by-record into `self`, resetting `other` as it
    /// empties. Pop order across batches is not deterministic beyond
    /// preserving within-batch sort order — see DESIGN.md.
    Flow,
    /// Concatenate `other`'s batches after `self`'s.
    Append,
}

static BATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_temp_path(tmp_dir: &Path, prefix: &str) -> PathBuf {
    let id = BATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    tmp_dir.join(format!("{prefix}-{id:08}.batch"))
}

/// A growing collection of `Batch<T>`, all written except the last.
pub struct Batcher<T: BatchRecord> {
    config: BatcherConfig,
    batches: Vec<Batch<T>>,
    prefix: String,
}

impl<T: BatchRecord> Batcher<T> {
    #[must_use]
    pub fn new(config: BatcherConfig, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let first = Batch::new(
            config.size,
            next_temp_path(&config.tmp_dir, &prefix),
            config.natype,
        );
        Self {
            config,
            batches: vec![first],
            prefix,
        }
    }

    #[must_use]
    pub fn batches(&self) -> &[Batch<T>] {
        &self.batches
    }

    pub fn batches_mut(&mut self) -> &mut [Batch<T>] {
        &mut self.batches
    }

    pub fn into_batches(self) -> Vec<Batch<T>> {
        self.batches
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(|b| b.current_size() == 0 && !b.is_written())
    }

    /// Append one record, flushing the active batch and opening a fresh one
    /// when it fills.
    pub fn add_record(&mut self, record: T) -> Result<(), KmaidError> {
        let active = self.batches.last_mut().expect("batcher always has an active batch");
        active.append(record)?;
        if active.is_full() {
            active.flush()?;
            self.batches.push(Batch::new(
                self.config.size,
                next_temp_path(&self.config.tmp_dir, &self.prefix),
                self.config.natype,
            ));
        }
        Ok(())
    }

    /// Flush whatever remains in the active batch, even if under capacity.
    pub fn finish(&mut self) -> Result<(), KmaidError> {
        let active = self.batches.last_mut().expect("batcher always has an active batch");
        if active.current_size() > 0 {
            active.flush()?;
        }
        Ok(())
    }

    /// Combine `other` into `self` per `mode`.
    pub fn feed(&mut self, other: Batcher<T>, mode: FeedMode) -> Result<(), KmaidError> {
        match mode {
            FeedMode::Replace => {
                self.batches = other.batches;
            }
            FeedMode::Append => {
                let active = self.batches.pop().expect("batcher always has an active batch");
                if active.current_size() > 0 || active.is_written() {
                    self.batches.push(active);
                }
                let non_empty = other
                    .batches
                    .into_iter()
                    .filter(|b| b.current_size() > 0 || b.is_written());
                self.batches.extend(non_empty);
                if self.batches.is_empty() || self.batches.last().map_or(false, Batch::is_written) {
                    self.batches.push(Batch::new(
                        self.config.size,
                        next_temp_path(&self.config.tmp_dir, &self.prefix),
                        self.config.natype,
                    ));
                }
            }
            FeedMode::Flow => {
                for mut donor in other.batches {
                    let records = if donor.is_written() {
                        donor.read_records()?
                    } else {
                        donor.records().to_vec()
                    };
                    for record in records {
                        self.add_record(record)?;
                    }
                    donor.reset()?;
                }
            }
        }
        Ok(())
    }
}

/// Reload a directory of previously-written, sorted batch files as a
/// `Batcher<T>`. Each `*.batch` file becomes one already-written `Batch`,
/// with `capacity` set to its own record count.
pub fn load_batches<T: BatchRecord>(
    dir: &Path,
    config: BatcherConfig,
) -> Result<Batcher<T>, KmaidError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "batch"))
        .collect();
    entries.sort();

    let mut batches = Vec::with_capacity(entries.len());
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record_count = if T::IS_FASTA {
            contents.lines().filter(|l| l.starts_with('>')).count()
        } else {
            contents.lines().filter(|l| !l.trim().is_empty()).count()
        };
        batches.push(Batch::from_written(path, config.natype, record_count));
    }
    if batches.is_empty() {
        batches.push(Batch::new(
            config.size,
            next_temp_path(&config.tmp_dir, "reload"),
            config.natype,
        ));
    }
    Ok(Batcher {
        config,
        batches,
        prefix: "reload".to_string(),
    })
}

/// Builds a `Batcher<KMer>` from one FASTA file, fanning work out across
/// `config.threads` workers per `config.scan_mode`.
pub struct FastaBatcher;

impl FastaBatcher {
    pub fn run(
        path: &Path,
        k: usize,
        config: &BatcherConfig,
        progress: &ProgressTracker,
    ) -> Result<Batcher<KMer>, KmaidError> {
        if k == 0 {
            return Err(KmaidError::InvalidKmerLength { k });
        }
        let reader = FastaReader::open(path)?;
        let records: Vec<Record> = reader.collect::<Result<_, _>>()?;
        if records.is_empty() {
            return Err(KmaidError::EmptyInput {
                path: path.to_path_buf(),
            });
        }

        let worker_batches: Vec<Vec<Batch<KMer>>> = records
            .par_iter()
            .enumerate()
            .map(|(idx, record)| -> Result<Vec<Batch<KMer>>, KmaidError> {
                FastaRecordBatcher::run(idx, record, k, config, progress)
            })
            .collect::<Result<_, _>>()?;

        // `config.feed_mode` folds each worker's batches into the running
        // total in turn; under `FeedMode::Replace` that means only the last
        // worker's batches survive, per its documented "swap wholesale"
        // semantics.
        let mut batcher: Batcher<KMer> = Batcher::new(config.clone(), "kmers");
        for batches in worker_batches {
            let worker = Batcher {
                config: config.clone(),
                batches,
                prefix: "kmers".to_string(),
            };
            batcher.feed(worker, config.feed_mode)?;
        }
        batcher.finish()?;
        Ok(batcher)
    }
}

/// Produces the sorted `Batch<KMer>`s for one FASTA record, in isolation
/// from the rest of the file, so that `FastaBatcher` can run one of these
/// per `rayon` task.
pub struct FastaRecordBatcher;

impl FastaRecordBatcher {
    fn run(
        record_idx: usize,
        record: &Record,
        k: usize,
        config: &BatcherConfig,
        progress: &ProgressTracker,
    ) -> Result<Vec<Batch<KMer>>, KmaidError> {
        let mut local = Batcher::new(config.clone(), format!("kmers-w{record_idx}"));

        match config.scan_mode {
            ScanMode::Records => {
                for kmer in kmers_from_sequence(
                    &record.header,
                    &record.seq,
                    k,
                    config.natype,
                    config.reverse_complement,
                ) {
                    local.add_record(kmer)?;
                }
            }
            ScanMode::Kmers => {
                // Shard the sequence with (k - 1) overlap so no k-mer
                // spanning a shard boundary is lost, and produce each
                // shard's k-mers on its own rayon task.
                let shard_count = config.threads.max(1);
                let seq_len = record.seq.len();
                let shard_size = seq_len.div_ceil(shard_count).max(k);
                let shard_results: Vec<Vec<KMer>> = (0..seq_len)
                    .step_by(shard_size)
                    .collect::<Vec<_>>()
                    .into_par_iter()
                    .map(|shard_start| {
                        let shard_end = (shard_start + shard_size + k.saturating_sub(1)).min(seq_len);
                        let shard_seq = &record.seq[shard_start..shard_end];
                        kmers_from_sequence(
                            &record.header,
                            shard_seq,
                            k,
                            config.natype,
                            config.reverse_complement,
                        )
                        .map(|mut kmer| {
                            kmer.coords.start += shard_start;
                            kmer.coords.end += shard_start;
                            kmer
                        })
                        .collect()
                    })
                    .collect();
                for shard in shard_results {
                    for kmer in shard {
                        local.add_record(kmer)?;
                    }
                }
            }
        }
        progress.record_sequence(record.seq.len() as u64);
        local.finish()?;
        Ok(local.into_batches())
    }
}
