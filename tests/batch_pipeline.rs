//! End-to-end coverage of the batch -> merge -> join pipeline.

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use kmermaid::alphabet::NaType;
use kmermaid::batcher::{BatcherConfig, FastaBatcher};
use kmermaid::joiner::{JoinMode, Joiner, MemoryMode};
use kmermaid::progress::ProgressTracker;

fn write_fasta(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn batch_paths(config: &BatcherConfig, input: &std::path::Path, k: usize) -> Vec<PathBuf> {
    let progress = ProgressTracker::new();
    let mut batcher = FastaBatcher::run(input, k, config, &progress).unwrap();
    batcher.finish().unwrap();
    batcher
        .into_batches()
        .into_iter()
        .map(|b| b.temp_path().to_path_buf())
        .collect()
}

#[test]
fn uniq_keeps_only_singleton_kmers() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nACGTACGT\n");
    let config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    let paths = batch_paths(&config, &input, 4);

    let out = dir.path().join("uniq.fa");
    let joiner = Joiner {
        mode: JoinMode::Unique,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 4,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    let text = std::fs::read_to_string(out).unwrap();
    // ACGTACGT has 5 4-mers: ACGT, CGTA, GTAC, TACG, ACGT -- ACGT repeats.
    assert!(!text.contains("ACGT\n"));
    assert!(text.contains("CGTA"));
    assert!(text.contains("GTAC"));
    assert!(text.contains("TACG"));
}

#[test]
fn seq_count_sums_occurrences_across_records() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nAAAA\n>r2\nAAAA\n");
    let config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    let paths = batch_paths(&config, &input, 4);

    let out = dir.path().join("counts.tsv");
    let joiner = Joiner {
        mode: JoinMode::SeqCount,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 4,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text.trim(), "AAAA\t2");
}

#[test]
fn vec_count_produces_one_file_per_reference_and_strand() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nAAAACCCC\n");
    let config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    let paths = batch_paths(&config, &input, 4);

    let out = dir.path().join("vectors");
    let joiner = Joiner {
        mode: JoinMode::VecCount,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 4,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    assert!(out.join("r1___+.gz").exists());
}

#[test]
fn vec_count_masked_excludes_occurrences_on_the_same_reference() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nAAAA\n>r2\nAAAA\n");
    let config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    let paths = batch_paths(&config, &input, 3);

    let out = dir.path().join("vectors");
    let joiner = Joiner {
        mode: JoinMode::VecCountMasked,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 3,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    use flate2::read::GzDecoder;
    use std::io::Read as _;
    let read_vec = |name: &str| {
        let mut decoder = GzDecoder::new(std::fs::File::open(out.join(name)).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        text.lines().skip(1).map(|l| l.parse::<u64>().unwrap()).collect::<Vec<_>>()
    };
    // Spec scenario 4: AAAA on r1 and r2, k=3 -> each header's masked
    // count is 4 total - 2 on its own ref = 2.
    assert_eq!(read_vec("r1___+.gz"), vec![2, 2]);
    assert_eq!(read_vec("r2___+.gz"), vec![2, 2]);
}

#[test]
fn soft_masked_lowercase_sequence_merges_with_uppercase() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nAAAA\n>r2\naaaa\n");
    let config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    let paths = batch_paths(&config, &input, 4);

    let out = dir.path().join("counts.tsv");
    let joiner = Joiner {
        mode: JoinMode::SeqCount,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 4,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    // Without upper-casing, "AAAA" and "aaaa" would sort and group
    // separately, each with count 1.
    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(text.trim(), "AAAA\t2");
}

#[test]
fn reverse_complement_kmers_share_forward_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nACGT\n");
    let mut config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    config.reverse_complement = true;
    let paths = batch_paths(&config, &input, 4);

    let out = dir.path().join("counts.tsv");
    let joiner = Joiner {
        mode: JoinMode::SeqCount,
        memory_mode: MemoryMode::Normal,
        natype: NaType::Dna,
        k: 4,
        threads: 1,
    };
    joiner.run(paths, &out, dir.path()).unwrap();

    let text = std::fs::read_to_string(out).unwrap();
    // ACGT's reverse complement is ACGT itself (palindromic), so both
    // strands collapse into the same sequence-count group.
    assert_eq!(text.trim(), "ACGT\t2");
}

#[test]
fn scan_mode_records_matches_scan_mode_kmers_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fasta(dir.path(), "in.fa", ">r1\nACGTACGTAC\n");

    let mut kmers_config = BatcherConfig::new(1024, dir.path().to_path_buf(), NaType::Dna);
    kmers_config.scan_mode = kmermaid::sequence::ScanMode::Kmers;
    let kmers_paths = batch_paths(&kmers_config, &input, 3);

    let mut records_config = BatcherConfig::new(1024, dir.path().join("r"), NaType::Dna);
    std::fs::create_dir_all(dir.path().join("r")).unwrap();
    records_config.scan_mode = kmermaid::sequence::ScanMode::Records;
    let records_paths = batch_paths(&records_config, &input, 3);

    let out_a = dir.path().join("a.tsv");
    let out_b = dir.path().join("b.tsv");
    for (paths, out) in [(kmers_paths, &out_a), (records_paths, &out_b)] {
        let joiner = Joiner {
            mode: JoinMode::SeqCount,
            memory_mode: MemoryMode::Normal,
            natype: NaType::Dna,
            k: 3,
            threads: 1,
        };
        joiner.run(paths, out, dir.path()).unwrap();
    }

    let mut a: Vec<_> = std::fs::read_to_string(&out_a).unwrap().lines().map(str::to_string).collect();
    let mut b: Vec<_> = std::fs::read_to_string(&out_b).unwrap().lines().map(str::to_string).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}
