use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::index::repo::RepoIndex;
use crate::index::types::{BlobFingerprint, IndexConfig};
use crate::utils::progress::ProgressBar;
use crate::utils::{encode, file_progress, is_binary};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Per-build counters, shared by all workers
#[derive(Debug, Default)]
struct BuildCounters {
    indexed: AtomicUsize,
    unreadable: AtomicUsize,
    empty: AtomicUsize,
    oversized: AtomicUsize,
    binary: AtomicUsize,
}

/// Build an index over every eligible file of `filesystem`
pub fn build(filesystem: Arc<dyn FileSystem>, config: &IndexConfig) -> Result<RepoIndex> {
    build_with(filesystem, config, &is_binary)
}

/// Build an index, classifying binary files with `detector`.
///
/// Listing failures abort the build. Unreadable, empty, oversized and binary
/// files are left out without failing it.
pub fn build_with(
    filesystem: Arc<dyn FileSystem>,
    config: &IndexConfig,
    detector: &(dyn Fn(&[u8]) -> bool + Sync),
) -> Result<RepoIndex> {
    let names = filesystem
        .list_relative_filenames()
        .map_err(|e| Error::ListingFailed(Box::new(e)))?;
    let total = names.len();
    debug!(files = total, "listed files");

    let pool = super::thread_pool(config)?;
    let progress = file_progress(total, config.progress);
    let counters = BuildCounters::default();

    // Sized to the candidate count so no worker ever blocks on send
    let (tx, rx) = crossbeam_channel::bounded::<BlobFingerprint>(total.max(1));

    pool.scope(|s| {
        for batch in names.chunks(config.build_batch_size.max(1)) {
            let tx = tx.clone();
            let filesystem = filesystem.as_ref();
            let pb = progress.as_ref();
            let counters = &counters;
            s.spawn(move |_| {
                for name in batch {
                    let blob = fingerprint_file(filesystem, name, config, detector, counters);
                    if let Some(blob) = blob {
                        // The receiver outlives the scope
                        let _ = tx.send(blob);
                    }
                    if let Some(pb) = pb {
                        pb.inc(1);
                    }
                }
            });
        }
    });
    drop(tx);

    let blobs: Vec<BlobFingerprint> = rx.into_iter().collect();

    if let Some(pb) = progress {
        finish_progress(&pb, blobs.len());
    }

    info!(
        indexed = counters.indexed.load(Ordering::Relaxed),
        unreadable = counters.unreadable.load(Ordering::Relaxed),
        empty = counters.empty.load(Ordering::Relaxed),
        oversized = counters.oversized.load(Ordering::Relaxed),
        binary = counters.binary.load(Ordering::Relaxed),
        "built index"
    );

    Ok(RepoIndex::from_parts(
        filesystem.root_dir().map(str::to_owned),
        blobs,
        Some(filesystem),
        config.clone(),
    ))
}

/// Read and fingerprint one file, or `None` if it is not eligible.
///
/// Oversized files are rejected by their stat size before any read, and again
/// by length in case they grew in between.
fn fingerprint_file(
    filesystem: &dyn FileSystem,
    name: &str,
    config: &IndexConfig,
    detector: &(dyn Fn(&[u8]) -> bool + Sync),
    counters: &BuildCounters,
) -> Option<BlobFingerprint> {
    match filesystem.stat_size(name) {
        Ok(size) if size > config.max_file_size => {
            debug!(path = name, size, "skipping oversized file");
            counters.oversized.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(path = name, error = %e, "skipping unreadable file");
            counters.unreadable.fetch_add(1, Ordering::Relaxed);
            return None;
        }
    }

    let content = match filesystem.read_relative_filename(name) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = name, error = %e, "skipping unreadable file");
            counters.unreadable.fetch_add(1, Ordering::Relaxed);
            return None;
        }
    };

    if content.is_empty() {
        debug!(path = name, "skipping empty file");
        counters.empty.fetch_add(1, Ordering::Relaxed);
        return None;
    }

    if content.len() as u64 > config.max_file_size {
        debug!(path = name, size = content.len(), "skipping oversized file");
        counters.oversized.fetch_add(1, Ordering::Relaxed);
        return None;
    }

    if detector(&content) {
        debug!(path = name, "skipping binary file");
        counters.binary.fetch_add(1, Ordering::Relaxed);
        return None;
    }

    let text = String::from_utf8_lossy(&content);
    counters.indexed.fetch_add(1, Ordering::Relaxed);
    Some(BlobFingerprint {
        path: name.to_string(),
        filter: encode(&text),
    })
}

fn finish_progress(pb: &ProgressBar, indexed: usize) {
    pb.finish_with_message(format!("Fingerprinted {} files", indexed));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::BTreeSet;

    fn paths(index: &RepoIndex) -> BTreeSet<String> {
        index.blobs().iter().map(|b| b.path.clone()).collect()
    }

    /// Filesystem whose listing always fails
    struct BrokenListing;

    impl FileSystem for BrokenListing {
        fn list_relative_filenames(&self) -> Result<Vec<String>> {
            Err(Error::Io(std::io::Error::other("walk failed")))
        }

        fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
            Err(Error::NotFound(name.to_string()))
        }

        fn stat_size(&self, name: &str) -> Result<u64> {
            Err(Error::NotFound(name.to_string()))
        }
    }

    /// Lists a file that cannot be read
    struct Flaky(InMemoryFs);

    impl FileSystem for Flaky {
        fn list_relative_filenames(&self) -> Result<Vec<String>> {
            let mut names = self.0.list_relative_filenames()?;
            names.push("vanished.txt".to_string());
            Ok(names)
        }

        fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
            self.0.read_relative_filename(name)
        }

        fn stat_size(&self, name: &str) -> Result<u64> {
            self.0.stat_size(name)
        }
    }

    /// Reports sizes honestly but refuses to read anything over the cap
    struct ReadGuard {
        inner: InMemoryFs,
        max: u64,
    }

    impl FileSystem for ReadGuard {
        fn list_relative_filenames(&self) -> Result<Vec<String>> {
            self.inner.list_relative_filenames()
        }

        fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
            let size = self.inner.stat_size(name)?;
            assert!(size <= self.max, "read {name} ({size} bytes) despite its stat size");
            self.inner.read_relative_filename(name)
        }

        fn stat_size(&self, name: &str) -> Result<u64> {
            self.inner.stat_size(name)
        }
    }

    /// Stat says small, but the content read back has grown past the cap
    struct Growing;

    impl FileSystem for Growing {
        fn list_relative_filenames(&self) -> Result<Vec<String>> {
            Ok(vec!["grows.log".to_string()])
        }

        fn read_relative_filename(&self, _name: &str) -> Result<Vec<u8>> {
            Ok(vec![b'a'; 64])
        }

        fn stat_size(&self, _name: &str) -> Result<u64> {
            Ok(8)
        }
    }

    #[test]
    fn test_oversized_files_are_never_read() {
        let config = IndexConfig {
            max_file_size: 16,
            ..IndexConfig::quiet()
        };
        let fs = ReadGuard {
            inner: InMemoryFs::new()
                .with_file("big.bin", vec![b'x'; 4096])
                .with_file("small.txt", "tiny"),
            max: config.max_file_size,
        };
        let index = build(Arc::new(fs), &config).unwrap();
        assert_eq!(paths(&index), BTreeSet::from(["small.txt".to_string()]));
    }

    #[test]
    fn test_file_grown_after_stat_is_skipped() {
        let config = IndexConfig {
            max_file_size: 16,
            ..IndexConfig::quiet()
        };
        let index = build(Arc::new(Growing), &config).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_build_filters_files() {
        let max = IndexConfig::default().max_file_size as usize;
        let fs = InMemoryFs::new()
            .with_file("empty.txt", "")
            .with_file("huge.txt", vec![b'a'; max + 1])
            .with_file("limit.txt", vec![b'a'; max])
            .with_file("binary.bin", vec![0u8; 64])
            .with_file("small.txt", "ten bytes!");

        let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();
        assert_eq!(
            paths(&index),
            BTreeSet::from(["limit.txt".to_string(), "small.txt".to_string()])
        );
    }

    #[test]
    fn test_build_uses_custom_detector() {
        let fs = InMemoryFs::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "BINARY-MARKER");

        let detector = |content: &[u8]| content.starts_with(b"BINARY");
        let index = build_with(Arc::new(fs), &IndexConfig::quiet(), &detector).unwrap();
        assert_eq!(paths(&index), BTreeSet::from(["a.txt".to_string()]));
    }

    #[test]
    fn test_build_skips_unreadable_files() {
        let fs = Flaky(InMemoryFs::new().with_file("ok.txt", "fine"));
        let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();
        assert_eq!(paths(&index), BTreeSet::from(["ok.txt".to_string()]));
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let err = build(Arc::new(BrokenListing), &IndexConfig::quiet()).unwrap_err();
        assert!(matches!(err, Error::ListingFailed(_)));
    }

    #[test]
    fn test_build_many_batches() {
        let fs: InMemoryFs = (0..1050)
            .map(|i| (format!("dir/file_{i}.txt"), format!("content number {i}")))
            .collect();
        let config = IndexConfig {
            parallelism: 4,
            ..IndexConfig::quiet()
        };

        let index = build(Arc::new(fs), &config).unwrap();
        assert_eq!(index.len(), 1050);
        assert_eq!(paths(&index).len(), 1050);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let fs: Arc<dyn FileSystem> = Arc::new(
            (0..250)
                .map(|i| (format!("f{i}"), format!("line {i}\nshared text")))
                .collect::<InMemoryFs>(),
        );

        let first = build(fs.clone(), &IndexConfig::quiet()).unwrap();
        let second = build(fs, &IndexConfig::quiet()).unwrap();

        let mut a = first.blobs().to_vec();
        let mut b = second.blobs().to_vec();
        a.sort_by(|x, y| x.path.cmp(&y.path));
        b.sort_by(|x, y| x.path.cmp(&y.path));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_filesystem() {
        let index = build(Arc::new(InMemoryFs::new()), &IndexConfig::quiet()).unwrap();
        assert!(index.is_empty());
    }
}
