//! Abundance vector store (C8): per-(reference, strand) positional counts.
//!
//! Two backends share one trait: an in-memory `HashMap`-backed store for the
//! common case, and a file-backed store (one binary file per reference and
//! strand under a scratch directory) for `--memory-mode local`, where the
//! full vector population would not fit in RAM.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::coords::Strand;
use crate::error::KmaidError;

/// A mapping `(reference, strand) -> resizable count array`, shared
/// contract for both storage backends.
pub trait AbundanceStore {
    /// Grow-only resize: ensure the array for `(reference, strand)` is at
    /// least `len` long, zero-filling any new cells.
    fn add_ref(&mut self, reference: &str, strand: Strand, len: usize) -> Result<(), KmaidError>;

    /// Add `count` at `position`. Errors with `AbundanceConflict` if the
    /// cell is already non-zero and `replace` is false.
    fn add_count(
        &mut self,
        reference: &str,
        strand: Strand,
        position: usize,
        count: u64,
        replace: bool,
    ) -> Result<(), KmaidError>;

    fn get(&self, reference: &str, strand: Strand, position: usize) -> u64;

    fn references(&self) -> Vec<(String, Strand)>;

    fn len_of(&self, reference: &str, strand: Strand) -> usize;
}

/// In-memory abundance vector: every array lives in a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryAbundance {
    k: usize,
    vectors: HashMap<(String, Strand), Vec<u64>>,
}

impl InMemoryAbundance {
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            vectors: HashMap::new(),
        }
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }
}

impl AbundanceStore for InMemoryAbundance {
    fn add_ref(&mut self, reference: &str, strand: Strand, len: usize) -> Result<(), KmaidError> {
        let entry = self
            .vectors
            .entry((reference.to_string(), strand))
            .or_default();
        if entry.len() < len {
            entry.resize(len, 0);
        }
        Ok(())
    }

    fn add_count(
        &mut self,
        reference: &str,
        strand: Strand,
        position: usize,
        count: u64,
        replace: bool,
    ) -> Result<(), KmaidError> {
        self.add_ref(reference, strand, position + 1)?;
        let entry = self
            .vectors
            .get_mut(&(reference.to_string(), strand))
            .expect("add_ref just ensured this entry exists");
        if entry[position] != 0 && !replace {
            return Err(KmaidError::AbundanceConflict {
                reference: reference.to_string(),
                position,
                strand: strand.as_char(),
            });
        }
        entry[position] = count;
        Ok(())
    }

    fn get(&self, reference: &str, strand: Strand, position: usize) -> u64 {
        self.vectors
            .get(&(reference.to_string(), strand))
            .and_then(|v| v.get(position))
            .copied()
            .unwrap_or(0)
    }

    fn references(&self) -> Vec<(String, Strand)> {
        let mut keys: Vec<_> = self.vectors.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn len_of(&self, reference: &str, strand: Strand) -> usize {
        self.vectors
            .get(&(reference.to_string(), strand))
            .map_or(0, Vec::len)
    }
}

/// File-backed abundance vector: one flat file of little-endian `u64`
/// counts per `(reference, strand)`, under `dir`. Used when the full
/// vector population is too large to hold in memory at once.
#[derive(Debug)]
pub struct FileBackedAbundance {
    k: usize,
    dir: PathBuf,
    lengths: HashMap<(String, Strand), usize>,
}

impl FileBackedAbundance {
    pub fn new(k: usize, dir: PathBuf) -> Result<Self, KmaidError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            k,
            dir,
            lengths: HashMap::new(),
        })
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    fn path_for(&self, reference: &str, strand: Strand) -> PathBuf {
        self.dir
            .join(format!("{reference}.{}.vec", strand.as_char()))
    }

    fn file_for(&self, reference: &str, strand: Strand) -> Result<File, KmaidError> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.path_for(reference, strand))?)
    }
}

impl AbundanceStore for FileBackedAbundance {
    fn add_ref(&mut self, reference: &str, strand: Strand, len: usize) -> Result<(), KmaidError> {
        let current = self
            .lengths
            .get(&(reference.to_string(), strand))
            .copied()
            .unwrap_or(0);
        if len > current {
            let file = self.file_for(reference, strand)?;
            file.set_len((len * 8) as u64)?;
            self.lengths.insert((reference.to_string(), strand), len);
        }
        Ok(())
    }

    fn add_count(
        &mut self,
        reference: &str,
        strand: Strand,
        position: usize,
        count: u64,
        replace: bool,
    ) -> Result<(), KmaidError> {
        self.add_ref(reference, strand, position + 1)?;
        let mut file = self.file_for(reference, strand)?;
        file.seek(SeekFrom::Start((position * 8) as u64))?;
        let mut existing = [0u8; 8];
        let read_bytes = file.read(&mut existing)?;
        let current = if read_bytes == 8 {
            u64::from_le_bytes(existing)
        } else {
            0
        };
        if current != 0 && !replace {
            return Err(KmaidError::AbundanceConflict {
                reference: reference.to_string(),
                position,
                strand: strand.as_char(),
            });
        }
        file.seek(SeekFrom::Start((position * 8) as u64))?;
        file.write_all(&count.to_le_bytes())?;
        Ok(())
    }

    fn get(&self, reference: &str, strand: Strand, position: usize) -> u64 {
        let Ok(mut file) = self.file_for(reference, strand) else {
            return 0;
        };
        if file.seek(SeekFrom::Start((position * 8) as u64)).is_err() {
            return 0;
        }
        let mut buf = [0u8; 8];
        if file.read_exact(&mut buf).is_ok() {
            u64::from_le_bytes(buf)
        } else {
            0
        }
    }

    fn references(&self) -> Vec<(String, Strand)> {
        let mut keys: Vec<_> = self.lengths.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn len_of(&self, reference: &str, strand: Strand) -> usize {
        self.lengths
            .get(&(reference.to_string(), strand))
            .copied()
            .unwrap_or(0)
    }
}

/// Serialize every `(reference, strand)` vector in `store` to
/// `dir/{reference}___{strand}.gz`, formatted as `# k={k}\n` followed by
/// one integer per line.
pub fn write_gz(store: &dyn AbundanceStore, k: usize, dir: &Path) -> Result<(), KmaidError> {
    std::fs::create_dir_all(dir)?;
    for (reference, strand) in store.references() {
        let len = store.len_of(&reference, strand);
        let path = dir.join(format!("{reference}___{}.gz", strand.as_char()));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
        writeln!(writer, "# k={k}")?;
        for position in 0..len {
            writeln!(writer, "{}", store.get(&reference, strand, position))?;
        }
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_grows_only() {
        let mut v = InMemoryAbundance::new(3);
        v.add_ref("chr1", Strand::Forward, 5).unwrap();
        v.add_ref("chr1", Strand::Forward, 2).unwrap();
        assert_eq!(v.len_of("chr1", Strand::Forward), 5);
    }

    #[test]
    fn add_count_conflict_without_replace() {
        let mut v = InMemoryAbundance::new(3);
        v.add_count("chr1", Strand::Forward, 0, 1, false).unwrap();
        let err = v.add_count("chr1", Strand::Forward, 0, 2, false).unwrap_err();
        assert!(matches!(err, KmaidError::AbundanceConflict { .. }));
    }

    #[test]
    fn add_count_replace_allowed() {
        let mut v = InMemoryAbundance::new(3);
        v.add_count("chr1", Strand::Forward, 0, 1, false).unwrap();
        v.add_count("chr1", Strand::Forward, 0, 9, true).unwrap();
        assert_eq!(v.get("chr1", Strand::Forward, 0), 9);
    }

    #[test]
    fn file_backed_matches_in_memory_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = FileBackedAbundance::new(3, dir.path().to_path_buf()).unwrap();
        v.add_count("chr1", Strand::Forward, 4, 7, false).unwrap();
        assert_eq!(v.get("chr1", Strand::Forward, 4), 7);
        assert_eq!(v.len_of("chr1", Strand::Forward), 5);
        let err = v.add_count("chr1", Strand::Forward, 4, 8, false).unwrap_err();
        assert!(matches!(err, KmaidError::AbundanceConflict { .. }));
    }

    #[test]
    fn write_gz_roundtrips_as_text() {
        use flate2::read::GzDecoder;
        use std::io::Read as _;

        let dir = tempfile::tempdir().unwrap();
        let mut v = InMemoryAbundance::new(3);
        v.add_count("chr1", Strand::Forward, 0, 5, false).unwrap();
        v.add_count("chr1", Strand::Forward, 1, 2, false).unwrap();
        write_gz(&v, 3, dir.path()).unwrap();

        let path = dir.path().join("chr1___+.gz");
        let mut decoder = GzDecoder::new(File::open(path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# k=3"));
        assert_eq!(lines.next(), Some("5"));
        assert_eq!(lines.next(), Some("2"));
    }
}
