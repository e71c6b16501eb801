//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::alphabet::NaType;
use crate::batcher::FeedMode;
use crate::joiner::{JoinMode, MemoryMode};
use crate::sequence::ScanMode;

/// Batched external-sort k-mer counter, unique-filter, and abundance-vector
/// builder for large FASTA collections.
///
/// # Examples
///
/// ```bash
/// # Dump sorted k-mer batches to a directory
/// kmermaid batch genome.fa batches/ 21
///
/// # Count occurrences of every 21-mer
/// kmermaid count genome.fa counts.tsv 21 --count-mode seq-count
///
/// # Keep only 21-mers that occur exactly once
/// kmermaid uniq genome.fa uniq.fa 21
/// ```
#[derive(Parser, Debug)]
#[command(name = "kmermaid")]
#[command(version, author, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a FASTA file into sorted, on-disk k-mer batches.
    Batch(BatchArgs),
    /// Count k-mer occurrences, as a sequence-count table or abundance vectors.
    Count(CountArgs),
    /// Emit only k-mers that occur exactly once.
    Uniq(UniqArgs),
}

/// Options shared by every subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SharedArgs {
    /// Also emit the reverse complement of each k-mer, sharing its
    /// coordinates with the forward k-mer.
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// How to fan a record's k-mers out across worker threads.
    #[arg(short = 's', long = "scan-mode", value_enum, default_value = "kmers")]
    pub scan_mode: ScanModeArg,

    /// Maximum records held by a batch before it is sorted and spilled to disk.
    #[arg(short = 'b', long = "batch-size", default_value = "1000000")]
    pub batch_size: usize,

    /// How worker batches are combined into the final collection.
    #[arg(short = 'm', long = "batch-mode", value_enum, default_value = "append")]
    pub batch_mode: BatchModeArg,

    /// Reuse a directory of previously-written batches instead of rescanning the input.
    #[arg(short = 'B', long = "previous-batches")]
    pub previous_batches: Option<PathBuf>,

    /// Re-sort previously-written batches rather than trusting their existing order.
    #[arg(short = 'R', long = "re-sort")]
    pub re_sort: bool,

    /// Number of worker threads.
    #[arg(short = 't', long, default_value_t = default_threads())]
    pub threads: usize,

    /// Scratch directory for batch and vector spill files.
    #[arg(short = 'T', long = "tmp")]
    pub tmp: Option<PathBuf>,

    /// Nucleic-acid alphabet of the input.
    #[arg(long = "natype", value_enum, default_value = "dna")]
    pub natype: NaTypeArg,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    #[arg(value_parser = parse_k)]
    pub k: usize,
    #[command(flatten)]
    pub shared: SharedArgs,
    /// Gzip-recompress batch files into the output directory.
    #[arg(short = 'C', long)]
    pub compress: bool,
}

#[derive(Parser, Debug)]
pub struct CountArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(value_parser = parse_k)]
    pub k: usize,
    #[command(flatten)]
    pub shared: SharedArgs,
    /// Which reduction to apply to each merged sequence group.
    #[arg(short = 'm', long = "count-mode", value_enum, default_value = "seq-count")]
    pub count_mode: CountModeArg,
    /// Where abundance vectors (for vector count modes) keep their data.
    #[arg(short = 'M', long = "memory-mode", value_enum, default_value = "normal")]
    pub memory_mode: MemoryModeArg,
}

#[derive(Parser, Debug)]
pub struct UniqArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    #[arg(value_parser = parse_k)]
    pub k: usize,
    #[command(flatten)]
    pub shared: SharedArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScanModeArg {
    Kmers,
    Records,
}

impl From<ScanModeArg> for ScanMode {
    fn from(value: ScanModeArg) -> Self {
        match value {
            ScanModeArg::Kmers => ScanMode::Kmers,
            ScanModeArg::Records => ScanMode::Records,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BatchModeArg {
    Append,
    Flow,
    Replace,
}

impl From<BatchModeArg> for FeedMode {
    fn from(value: BatchModeArg) -> Self {
        match value {
            BatchModeArg::Append => FeedMode::Append,
            BatchModeArg::Flow => FeedMode::Flow,
            BatchModeArg::Replace => FeedMode::Replace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum NaTypeArg {
    Dna,
    Rna,
}

impl From<NaTypeArg> for NaType {
    fn from(value: NaTypeArg) -> Self {
        match value {
            NaTypeArg::Dna => NaType::Dna,
            NaTypeArg::Rna => NaType::Rna,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CountModeArg {
    SeqCount,
    VecCount,
    VecCountMasked,
}

impl From<CountModeArg> for JoinMode {
    fn from(value: CountModeArg) -> Self {
        match value {
            CountModeArg::SeqCount => JoinMode::SeqCount,
            CountModeArg::VecCount => JoinMode::VecCount,
            CountModeArg::VecCountMasked => JoinMode::VecCountMasked,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MemoryModeArg {
    Normal,
    Local,
}

impl From<MemoryModeArg> for MemoryMode {
    fn from(value: MemoryModeArg) -> Self {
        match value {
            MemoryModeArg::Normal => MemoryMode::Normal,
            MemoryModeArg::Local => MemoryMode::Local,
        }
    }
}

fn parse_k(s: &str) -> Result<usize, String> {
    let k: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if k == 0 {
        return Err("k-mer length must be at least 1".to_string());
    }
    Ok(k)
}
