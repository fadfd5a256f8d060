use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};

/// Default cap on indexable file size (1 MiB)
pub const MAX_FILE_SIZE: u64 = 1 << 20;

/// Files per build task
pub const BUILD_BATCH_SIZE: usize = 100;

/// Blobs per query task
pub const QUERY_BATCH_SIZE: usize = 10_000;

/// Set of tagged n-grams, backed by a compressed 64-bit bitmap.
///
/// Records presence only: inserting a gram twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NgramSet(RoaringTreemap);

impl NgramSet {
    pub fn new() -> Self {
        Self(RoaringTreemap::new())
    }

    /// Insert a gram. Returns true if it was not already present.
    #[inline]
    pub fn insert(&mut self, gram: u64) -> bool {
        self.0.insert(gram)
    }

    #[inline]
    pub fn contains(&self, gram: u64) -> bool {
        self.0.contains(gram)
    }

    /// Number of distinct grams
    pub fn len(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of grams present in both sets
    pub fn intersection_len(&self, other: &NgramSet) -> u64 {
        self.0.intersection_len(&other.0)
    }

    /// Candidacy test: true iff every gram of the query is present here
    #[inline]
    pub fn contains_all(&self, query: &QueryFingerprint) -> bool {
        self.intersection_len(&query.bitmask) == query.cardinality
    }
}

/// Fingerprint of one indexed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobFingerprint {
    /// Path relative to the filesystem root, `/`-separated
    pub path: String,
    pub filter: NgramSet,
}

/// Encoded query, with its distinct gram count cached for the candidacy test
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFingerprint {
    pub bitmask: NgramSet,
    pub cardinality: u64,
}

impl QueryFingerprint {
    /// Whether `blob` may contain the query
    #[inline]
    pub fn is_candidate(&self, blob: &BlobFingerprint) -> bool {
        blob.filter.contains_all(self)
    }
}

/// Configuration for building and querying an index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Files larger than this are never fingerprinted
    pub max_file_size: u64,
    /// Number of files handled by one build task
    pub build_batch_size: usize,
    /// Number of blobs handled by one query task
    pub query_batch_size: usize,
    /// Worker threads for build and query; 0 uses the number of CPUs
    pub parallelism: usize,
    /// Show a progress bar while building
    pub progress: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            build_batch_size: BUILD_BATCH_SIZE,
            query_batch_size: QUERY_BATCH_SIZE,
            parallelism: 0,
            progress: true,
        }
    }
}

impl IndexConfig {
    /// Effective worker count (resolves 0 to CPU count)
    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.parallelism
        }
    }

    /// Config with the progress bar disabled, as used by tests and library callers
    pub fn quiet() -> Self {
        Self {
            progress: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{collect_query_ngrams, encode};

    fn blob(path: &str, text: &str) -> BlobFingerprint {
        BlobFingerprint {
            path: path.to_string(),
            filter: encode(text),
        }
    }

    #[test]
    fn test_ngram_set_insert_is_idempotent() {
        let mut set = NgramSet::new();
        assert!(set.insert(42));
        assert!(!set.insert(42));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_candidacy() {
        let b = blob("readme.md", "Hello world,\nthis is the world,\n...");
        assert!(collect_query_ngrams("world").is_candidate(&b));
        assert!(collect_query_ngrams("wor").is_candidate(&b));
        assert!(!collect_query_ngrams("zzzqqq").is_candidate(&b));
    }

    #[test]
    fn test_candidacy_allows_false_positives() {
        // "lo wo" never occurs, but all of its grams do
        let b = blob("a.txt", "lo; go wo");
        assert!(collect_query_ngrams("lo wo").is_candidate(&b));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let b = blob("a.txt", "abc");
        assert!(collect_query_ngrams("").is_candidate(&b));
    }

    #[test]
    fn test_config_defaults() {
        let config = IndexConfig::default();
        assert_eq!(config.max_file_size, 1_048_576);
        assert_eq!(config.build_batch_size, 100);
        assert_eq!(config.query_batch_size, 10_000);
        assert!(config.effective_parallelism() >= 1);
    }

    #[test]
    fn test_config_partial_json() {
        let config: IndexConfig = serde_json::from_str(r#"{"parallelism": 3}"#).unwrap();
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.effective_parallelism(), 3);
        assert_eq!(config.max_file_size, MAX_FILE_SIZE);
        assert!(config.progress);
    }
}
