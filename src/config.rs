//! Resolves CLI arguments into the runtime configuration the batching and
//! joining stages share: a `BatcherConfig` plus the owned scratch directory
//! for the current run.

use std::path::Path;

use tempfile::TempDir;

use crate::batcher::BatcherConfig;
use crate::cli::SharedArgs;
use crate::error::KmaidError;
use crate::sequence::ScanMode;

/// Owns the temp directory for one run, and the resolved batching
/// configuration derived from it.
#[derive(Debug)]
pub struct RunConfig {
    pub batcher: BatcherConfig,
    _scratch: Option<TempDir>,
}

impl RunConfig {
    /// Build a `RunConfig` from shared CLI args, validating the input path
    /// exists along the way.
    pub fn from_shared_args(shared: &SharedArgs, input: &Path) -> Result<Self, KmaidError> {
        if !input.exists() {
            return Err(KmaidError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let (tmp_dir, scratch) = match &shared.tmp {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (dir.clone(), None)
            }
            None => {
                let dir = TempDir::new()?;
                (dir.path().to_path_buf(), Some(dir))
            }
        };

        let mut batcher = BatcherConfig::new(shared.batch_size, tmp_dir, shared.natype.into());
        batcher.threads = shared.threads.max(1);
        batcher.reverse_complement = shared.reverse;
        batcher.scan_mode = ScanMode::from(shared.scan_mode);
        batcher.feed_mode = shared.batch_mode.into();

        Ok(Self {
            batcher,
            _scratch: scratch,
        })
    }

    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.batcher.tmp_dir
    }
}

/// Refuse to dump batches into a directory that already has files in it.
pub fn require_empty_dir(dir: &Path) -> Result<(), KmaidError> {
    std::fs::create_dir_all(dir)?;
    let has_entries = std::fs::read_dir(dir)?.next().is_some();
    if has_entries {
        return Err(KmaidError::OutputNotEmpty {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_nonexistent_input() {
        let dir = tempdir().unwrap();
        let shared = crate::cli::SharedArgs {
            reverse: false,
            scan_mode: crate::cli::ScanModeArg::Kmers,
            batch_size: 10,
            batch_mode: crate::cli::BatchModeArg::Append,
            previous_batches: None,
            re_sort: false,
            threads: 1,
            tmp: None,
            natype: crate::cli::NaTypeArg::Dna,
        };
        let err = RunConfig::from_shared_args(&shared, &dir.path().join("nope.fa")).unwrap_err();
        assert!(matches!(err, KmaidError::InputNotFound { .. }));
    }

    #[test]
    fn require_empty_dir_rejects_nonempty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("existing"), "x").unwrap();
        let err = require_empty_dir(dir.path()).unwrap_err();
        assert!(matches!(err, KmaidError::OutputNotEmpty { .. }));
    }

    #[test]
    fn require_empty_dir_accepts_fresh_dir() {
        let dir = tempdir().unwrap();
        let fresh = dir.path().join("fresh");
        require_empty_dir(&fresh).unwrap();
    }
}
