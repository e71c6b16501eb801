//! Intermediate sequence-count batcher (C7): a second tier of batching
//! that keeps file-descriptor usage bounded when the joiner would otherwise
//! need to hold every sorted input batch open at once.
//!
//! Splits `N` sorted k-mer batches into chunks of at most `chunk_size`,
//! merges each chunk independently (in parallel) into one sorted
//! `SequenceCount` batch, and returns the resulting (far smaller) set of
//! intermediate batch paths for the final merge to crawl instead.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::alphabet::NaType;
use crate::batch::AppendableBatch;
use crate::crawler::Crawler;
use crate::error::KmaidError;
use crate::sequence::SequenceCount;

/// Reduce `batch_paths` to at most `descriptor_budget` sorted batches,
/// returning the original list unchanged if it already fits.
///
/// `batch_paths` is assumed to hold two-line-FASTA k-mer batches (the
/// output of C4). Every batch this function produces, and every batch any
/// recursive call consumes, is in the tab-formatted `SequenceCount` shape
/// instead.
pub fn build_intermediate(
    batch_paths: Vec<PathBuf>,
    descriptor_budget: usize,
    threads: usize,
    natype: NaType,
    tmp_dir: &Path,
) -> Result<Vec<PathBuf>, KmaidError> {
    merge_down(batch_paths, descriptor_budget, threads, natype, tmp_dir, true)
}

fn merge_down(
    batch_paths: Vec<PathBuf>,
    descriptor_budget: usize,
    threads: usize,
    natype: NaType,
    tmp_dir: &Path,
    source_is_fasta: bool,
) -> Result<Vec<PathBuf>, KmaidError> {
    if batch_paths.len() <= descriptor_budget {
        return Ok(batch_paths);
    }

    let chunk_size = (batch_paths.len() / threads.max(1))
        .max(2)
        .min(descriptor_budget.max(2));

    let chunks: Vec<Vec<PathBuf>> = batch_paths
        .chunks(chunk_size)
        .map(<[PathBuf]>::to_vec)
        .collect();

    let intermediate: Vec<PathBuf> = chunks
        .into_par_iter()
        .enumerate()
        .map(|(idx, chunk)| -> Result<PathBuf, KmaidError> {
            let mut crawler = if source_is_fasta {
                Crawler::from_fasta_batches(chunk)?
            } else {
                Crawler::from_seqcount_batches(chunk)?
            };
            let path = tmp_dir.join(format!("seqcount-{idx:08}.batch"));
            let mut batch: AppendableBatch<SequenceCount> =
                AppendableBatch::create(path, natype)?;
            while let Some((seq, headers)) = crawler.next_group()? {
                batch.append(&SequenceCount::new(seq, headers, natype))?;
            }
            batch.finish()
        })
        .collect::<Result<_, _>>()?;

    // The intermediate tier may itself exceed the descriptor budget for
    // extreme batch counts; recurse until it doesn't. Every batch from here
    // on is SequenceCount-formatted, including the input to this call.
    merge_down(intermediate, descriptor_budget, threads, natype, tmp_dir, false)
}
