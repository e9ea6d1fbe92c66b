//! Batching of stale source files: how many a worker takes, and how they
//! group by directory for one compiler call.

use std::path::{Path, PathBuf};

use crate::core::source_file::SourceFile;

const BATCH_DIVISOR: f64 = 1.3;

/// Number of files a worker takes from a queue of `queued` files.
pub fn batch_size(queued: usize, workers: usize) -> usize {
    if queued == 0 {
        return 0;
    }
    let share = queued as f64 / (workers.max(1) as f64 * BATCH_DIVISOR);
    (share.ceil() as usize).clamp(1, queued)
}

/// Source files that share a directory and can go to one compiler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColocatedBatch {
    directory: PathBuf,
    files: Vec<SourceFile>,
}

impl ColocatedBatch {
    /// Take every file that shares a directory with the first one out of
    /// `dispersed`. Files elsewhere stay behind, in order, for a later batch.
    pub fn drain_from(dispersed: &mut Vec<SourceFile>) -> Option<ColocatedBatch> {
        let directory = dispersed.first()?.source_dir().to_path_buf();

        let (files, rest): (Vec<_>, Vec<_>) = dispersed
            .drain(..)
            .partition(|f| f.source_dir() == directory);
        *dispersed = rest;

        tracing::debug!(
            "Colocated batch contains {} code files in {}",
            files.len(),
            directory.display()
        );

        Some(ColocatedBatch { directory, files })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> SourceFile {
        SourceFile::new(path, Path::new("/obj"))
    }

    #[test]
    fn test_batch_size() {
        assert_eq!(batch_size(0, 4), 0);
        assert_eq!(batch_size(1, 4), 1);
        assert_eq!(batch_size(10, 4), 2);
        assert_eq!(batch_size(100, 4), 20);
        assert_eq!(batch_size(13, 1), 10);
        assert_eq!(batch_size(5, 0), 4);
    }

    #[test]
    fn test_drain_groups_by_directory() {
        let mut dispersed = vec![
            file("/src/x/a.cpp"),
            file("/src/y/c.cpp"),
            file("/src/x/b.cpp"),
        ];

        let first = ColocatedBatch::drain_from(&mut dispersed).unwrap();
        assert_eq!(first.directory(), Path::new("/src/x"));
        assert_eq!(first.len(), 2);
        assert_eq!(dispersed, vec![file("/src/y/c.cpp")]);

        let second = ColocatedBatch::drain_from(&mut dispersed).unwrap();
        assert_eq!(second.files(), &[file("/src/y/c.cpp")]);
        assert!(dispersed.is_empty());

        assert!(ColocatedBatch::drain_from(&mut dispersed).is_none());
    }
}
