//! Joiner (C6): reduces k-way-merged sequence groups into one of four
//! output artifacts.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::abundance::{self, AbundanceStore, FileBackedAbundance, InMemoryAbundance};
use crate::alphabet::NaType;
use crate::coords::SequenceCoords;
use crate::crawler::Crawler;
use crate::error::KmaidError;
use crate::fdlimit;
use crate::seqcount_batcher;

/// Which reduction to apply to each merged sequence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Emit only sequences that occurred exactly once.
    Unique,
    /// Emit every sequence with its total occurrence count.
    SeqCount,
    /// Write per-position abundance vectors; conflicting writes to an
    /// already-populated cell are a hard error.
    VecCount,
    /// Write per-position abundance vectors where each header's contributed
    /// count excludes occurrences on its own reference: a group spanning
    /// only one reference (or a single header) contributes nothing.
    /// Conflicting writes to an already-populated cell are still a hard
    /// error, same as `VecCount`.
    VecCountMasked,
}

/// Where the abundance vector backends for `VecCount`/`VecCountMasked`
/// should keep their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMode {
    /// Entire vector population held in a `HashMap` in memory.
    Normal,
    /// Vector population spilled to per-reference files under a scratch
    /// directory.
    Local,
}

/// Applies a [`JoinMode`] across a k-way merge of sorted k-mer batches,
/// inserting the two-tier intermediate batching of C7 when the batch count
/// would otherwise exceed the process's file-descriptor budget.
pub struct Joiner {
    pub mode: JoinMode,
    pub memory_mode: MemoryMode,
    pub natype: NaType,
    pub k: usize,
    pub threads: usize,
}

impl Joiner {
    fn crawler_over(
        &self,
        batch_paths: Vec<PathBuf>,
        tmp_dir: &Path,
    ) -> Result<Crawler, KmaidError> {
        let budget = fdlimit::descriptor_budget();
        if batch_paths.len() <= budget {
            Crawler::from_fasta_batches(batch_paths)
        } else {
            let intermediate = seqcount_batcher::build_intermediate(
                batch_paths,
                budget,
                self.threads,
                self.natype,
                tmp_dir,
            )?;
            Crawler::from_seqcount_batches(intermediate)
        }
    }

    pub fn run(
        &self,
        batch_paths: Vec<PathBuf>,
        output: &Path,
        tmp_dir: &Path,
    ) -> Result<(), KmaidError> {
        match self.mode {
            JoinMode::Unique => self.run_unique(batch_paths, output, tmp_dir),
            JoinMode::SeqCount => self.run_seq_count(batch_paths, output, tmp_dir),
            JoinMode::VecCount | JoinMode::VecCountMasked => {
                self.run_vec_count(batch_paths, output, tmp_dir)
            }
        }
    }

    fn run_unique(
        &self,
        batch_paths: Vec<PathBuf>,
        output: &Path,
        tmp_dir: &Path,
    ) -> Result<(), KmaidError> {
        let mut crawler = self.crawler_over(batch_paths, tmp_dir)?;
        let file = File::create(output)?;
        let mut writer = BufWriter::new(file);
        while let Some((seq, headers)) = crawler.next_group()? {
            if headers.len() == 1 {
                writeln!(writer, ">{}\n{}", headers[0], seq)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn run_seq_count(
        &self,
        batch_paths: Vec<PathBuf>,
        output: &Path,
        tmp_dir: &Path,
    ) -> Result<(), KmaidError> {
        let mut crawler = self.crawler_over(batch_paths, tmp_dir)?;
        let file = File::create(output)?;
        let mut writer = BufWriter::new(file);
        while let Some((seq, headers)) = crawler.next_group()? {
            writeln!(writer, "{seq}\t{}", headers.len())?;
        }
        writer.flush()?;
        Ok(())
    }

    fn run_vec_count(
        &self,
        batch_paths: Vec<PathBuf>,
        output: &Path,
        tmp_dir: &Path,
    ) -> Result<(), KmaidError> {
        let masked = self.mode == JoinMode::VecCountMasked;
        let mut crawler = self.crawler_over(batch_paths, tmp_dir)?;

        let mut in_memory;
        let mut file_backed;
        let store: &mut dyn AbundanceStore = match self.memory_mode {
            MemoryMode::Normal => {
                in_memory = InMemoryAbundance::new(self.k);
                &mut in_memory
            }
            MemoryMode::Local => {
                file_backed = FileBackedAbundance::new(self.k, tmp_dir.join("vectors"))?;
                &mut file_backed
            }
        };

        while let Some((_seq, headers)) = crawler.next_group()? {
            let coords: Vec<SequenceCoords> = headers
                .iter()
                .map(|h| SequenceCoords::parse(h))
                .collect::<Result<_, _>>()?;

            if masked {
                let mut by_ref: HashMap<&str, u64> = HashMap::new();
                for c in &coords {
                    *by_ref.entry(c.reference.as_str()).or_insert(0) += 1;
                }
                if coords.len() <= 1 || by_ref.len() <= 1 {
                    continue;
                }
                let total = coords.len() as u64;
                for c in &coords {
                    let same_ref = by_ref[c.reference.as_str()];
                    let hcount = total - same_ref;
                    store.add_count(&c.reference, c.strand, c.start, hcount, false)?;
                }
            } else {
                let count = coords.len() as u64;
                for c in &coords {
                    store.add_count(&c.reference, c.strand, c.start, count, false)?;
                }
            }
        }

        let dir = output.with_extension("");
        abundance::write_gz(store, self.k, &dir)
    }
}
