use crate::error::{Error, Result};
use crate::fs::{DirFs, FileSystem};
use crate::index::types::{BlobFingerprint, IndexConfig};
use crate::utils::collect_query_ngrams;
use crossbeam_channel::Receiver;
use rayon::ThreadPool;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Fingerprints of every indexed file of one repository.
///
/// `blobs` is complete before the index is handed out and never mutated
/// afterwards, so any number of queries may share it without locking.
pub struct RepoIndex {
    root_dir: Option<String>,
    blobs: Arc<[BlobFingerprint]>,
    filesystem: OnceLock<Arc<dyn FileSystem>>,
    config: IndexConfig,
    pool: OnceLock<Arc<ThreadPool>>,
}

impl RepoIndex {
    pub(crate) fn from_parts(
        root_dir: Option<String>,
        blobs: Vec<BlobFingerprint>,
        filesystem: Option<Arc<dyn FileSystem>>,
        config: IndexConfig,
    ) -> Self {
        let bound = OnceLock::new();
        if let Some(fs) = filesystem {
            let _ = bound.set(fs);
        }
        Self {
            root_dir,
            blobs: blobs.into(),
            filesystem: bound,
            config,
            pool: OnceLock::new(),
        }
    }

    /// Index over `blobs` with no filesystem attached
    pub fn new(root_dir: Option<String>, blobs: Vec<BlobFingerprint>) -> Self {
        Self::from_parts(root_dir, blobs, None, IndexConfig::default())
    }

    /// Attach the filesystem the blobs were read from
    pub fn with_filesystem(self, filesystem: Arc<dyn FileSystem>) -> Self {
        let bound = OnceLock::new();
        let _ = bound.set(filesystem);
        Self {
            filesystem: bound,
            ..self
        }
    }

    /// Replace the query settings (batch size, parallelism)
    pub fn with_config(self, config: IndexConfig) -> Self {
        Self {
            config,
            pool: OnceLock::new(),
            ..self
        }
    }

    pub fn root_dir(&self) -> Option<&str> {
        self.root_dir.as_deref()
    }

    pub fn blobs(&self) -> &[BlobFingerprint] {
        &self.blobs
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Filesystem backing this index.
    ///
    /// A deserialized index only knows its root directory; the directory is
    /// opened on first use.
    pub fn filesystem(&self) -> Result<Arc<dyn FileSystem>> {
        if let Some(fs) = self.filesystem.get() {
            return Ok(Arc::clone(fs));
        }
        let root = self
            .root_dir
            .as_deref()
            .ok_or_else(|| Error::NotFound("no filesystem bound to index".to_string()))?;
        let opened: Arc<dyn FileSystem> = Arc::new(DirFs::open(root)?);
        Ok(Arc::clone(self.filesystem.get_or_init(|| opened)))
    }

    fn pool(&self) -> Result<Arc<ThreadPool>> {
        if let Some(pool) = self.pool.get() {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(super::thread_pool(&self.config)?);
        Ok(Arc::clone(self.pool.get_or_init(|| pool)))
    }

    /// Candidate paths for `query`, in `blobs` order
    pub fn match_sync(&self, query: &str) -> Vec<String> {
        let fingerprint = collect_query_ngrams(query);
        self.blobs
            .iter()
            .filter(|blob| fingerprint.is_candidate(blob))
            .map(|blob| blob.path.clone())
            .collect()
    }

    /// Candidate paths for `query`, evaluated in parallel batches.
    ///
    /// Paths arrive in no particular order; the iterator ends once every
    /// batch has finished.
    pub fn matches(&self, query: &str) -> Result<Matches> {
        let fingerprint = Arc::new(collect_query_ngrams(query));
        let pool = self.pool()?;
        let total = self.blobs.len();
        let batch_size = self.config.query_batch_size.max(1);

        let (tx, rx) = crossbeam_channel::bounded(total.max(1));
        for start in (0..total).step_by(batch_size) {
            let end = (start + batch_size).min(total);
            let blobs = Arc::clone(&self.blobs);
            let fingerprint = Arc::clone(&fingerprint);
            let tx = tx.clone();
            pool.spawn(move || {
                for blob in &blobs[start..end] {
                    if fingerprint.is_candidate(blob) {
                        // Consumer may have stopped early
                        let _ = tx.send(blob.path.clone());
                    }
                }
            });
        }
        debug!(query, blobs = total, batch_size, "dispatched query");

        Ok(Matches { rx, _pool: pool })
    }

    /// Summary counts over the index
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            blobs: self.blobs.len(),
            ..IndexStats::default()
        };
        for blob in self.blobs.iter() {
            let n = blob.filter.len();
            stats.total_ngrams += n;
            stats.max_ngrams = stats.max_ngrams.max(n);
        }
        stats
    }
}

impl fmt::Debug for RepoIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoIndex")
            .field("root_dir", &self.root_dir)
            .field("blobs", &self.blobs.len())
            .field("config", &self.config)
            .finish()
    }
}

/// One-shot stream of candidate paths produced by [`RepoIndex::matches`]
pub struct Matches {
    rx: Receiver<String>,
    _pool: Arc<ThreadPool>,
}

impl Iterator for Matches {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.rx.recv().ok()
    }
}

/// Counts reported by `ngramdex stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub blobs: usize,
    pub total_ngrams: u64,
    pub max_ngrams: u64,
}

impl IndexStats {
    pub fn mean_ngrams(&self) -> f64 {
        if self.blobs == 0 {
            0.0
        } else {
            self.total_ngrams as f64 / self.blobs as f64
        }
    }
}
