//! Driver functions wiring the batching, merging, and joining stages
//! together for each CLI subcommand.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::batch::{Batch, BatchRecord};
use crate::batcher::{load_batches, BatcherConfig, FastaBatcher};
use crate::cli::{BatchArgs, CountArgs, SharedArgs, UniqArgs};
use crate::config::{require_empty_dir, RunConfig};
use crate::error::KmaidError;
use crate::joiner::{JoinMode, Joiner, MemoryMode};
use crate::progress::ProgressTracker;
use crate::sequence::KMer;

fn collect_batch_paths(
    shared: &SharedArgs,
    input: &Path,
    k: usize,
    config: &BatcherConfig,
) -> Result<Vec<PathBuf>, KmaidError> {
    let progress = ProgressTracker::new();

    let batches = if let Some(previous) = &shared.previous_batches {
        info!(dir = %previous.display(), "reloading previous batches");
        let mut batcher = load_batches::<KMer>(previous, config.clone())?;
        if shared.re_sort {
            for batch in batcher.batches_mut() {
                let mut records = batch.read_records()?;
                records.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
                batch.reset()?;
                for record in records {
                    batch.append(record)?;
                }
                batch.flush()?;
            }
        }
        let batches = batcher.into_batches();
        check_k_consistency(&batches, k)?;
        batches
    } else {
        info!(input = %input.display(), k, "scanning input into k-mer batches");
        let batcher = FastaBatcher::run(input, k, config, &progress)?;
        batcher.into_batches()
    };

    let snapshot = progress.snapshot();
    info!(
        sequences = snapshot.sequences_processed,
        bases = snapshot.bases_processed,
        batches = batches.len(),
        "batching complete"
    );

    Ok(batches.into_iter().map(|b| b.temp_path().to_path_buf()).collect())
}

/// Reloaded batches carry no explicit k-mer length of their own; check the
/// first record of the first non-empty batch against the length the caller
/// asked for, rather than silently merging k-mers of two different lengths.
fn check_k_consistency(batches: &[Batch<KMer>], k: usize) -> Result<(), KmaidError> {
    for batch in batches {
        if !batch.is_written() {
            continue;
        }
        if let Some(first) = batch.read_records()?.into_iter().next() {
            let found = first.coords.len();
            if found != k {
                return Err(KmaidError::InconsistentK { expected: k, found });
            }
            return Ok(());
        }
    }
    Ok(())
}

/// `kmermaid batch`: scan a FASTA file into sorted, on-disk k-mer batches.
pub fn run_batch(args: &BatchArgs) -> Result<(), KmaidError> {
    require_empty_dir(&args.output_dir)?;
    let run_config = RunConfig::from_shared_args(&args.shared, &args.input)?;
    let batch_paths = collect_batch_paths(&args.shared, &args.input, args.k, &run_config.batcher)?;

    for path in &batch_paths {
        let file_name = path
            .file_name()
            .expect("batch temp paths always have a file name");
        let dest = args.output_dir.join(file_name);
        if args.compress {
            copy_compressed(path, &dest.with_extension("batch.gz"))?;
        } else {
            std::fs::copy(path, &dest)?;
        }
    }

    info!(
        count = batch_paths.len(),
        dir = %args.output_dir.display(),
        "wrote batch dump"
    );
    Ok(())
}

fn copy_compressed(src: &Path, dest: &Path) -> Result<(), KmaidError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::copy;

    let mut input = std::fs::File::open(src)?;
    let output = std::fs::File::create(dest)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// `kmermaid count`: merge and reduce k-mer batches into a sequence-count
/// table or abundance vectors.
pub fn run_count(args: &CountArgs) -> Result<(), KmaidError> {
    let run_config = RunConfig::from_shared_args(&args.shared, &args.input)?;
    let batch_paths = collect_batch_paths(&args.shared, &args.input, args.k, &run_config.batcher)?;

    let joiner = Joiner {
        mode: JoinMode::from(args.count_mode),
        memory_mode: MemoryMode::from(args.memory_mode),
        natype: args.shared.natype.into(),
        k: args.k,
        threads: args.shared.threads.max(1),
    };
    joiner.run(batch_paths, &args.output, run_config.tmp_dir())?;
    info!(output = %args.output.display(), "count complete");
    Ok(())
}

/// `kmermaid uniq`: emit only k-mers that occur exactly once.
pub fn run_uniq(args: &UniqArgs) -> Result<(), KmaidError> {
    let run_config = RunConfig::from_shared_args(&args.shared, &args.input)?;
    let batch_paths = collect_batch_paths(&args.shared, &args.input, args.k, &run_config.batcher)?;

    let joiner = Joiner {
        mode: JoinMode::Unique,
        memory_mode: MemoryMode::Normal,
        natype: args.shared.natype.into(),
        k: args.k,
        threads: args.shared.threads.max(1),
    };
    joiner.run(batch_paths, &args.output, run_config.tmp_dir())?;
    info!(output = %args.output.display(), "uniq complete");
    Ok(())
}
