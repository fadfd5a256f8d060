//! # ngramdex - N-gram fingerprint index
//!
//! ngramdex speeds up literal substring search over a repository by ruling
//! out files that cannot contain the query before any full-text scan runs.
//!
//! ## Architecture
//!
//! - [`utils`] - Tagged unigram/bigram/trigram encoding, config and cache paths
//! - [`fs`] - The [`fs::FileSystem`] trait with directory and in-memory backends
//! - [`index`] - Parallel index building, the query engine and binary formats
//! - [`grep`] - Confirming line scan over the surviving candidates
//!
//! ## Quick Start
//!
//! ```
//! use ngramdex::fs::InMemoryFs;
//! use ngramdex::index::{build, IndexConfig};
//! use std::sync::Arc;
//!
//! let fs = InMemoryFs::new().with_file("readme.md", "Hello world,\nthis is the world,\n...");
//! let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();
//!
//! assert_eq!(index.match_sync("world"), vec!["readme.md"]);
//! assert!(index.match_sync("zzzqqq").is_empty());
//! ```
//!
//! ## How filtering works
//!
//! Each file is reduced to the set of tagged n-grams it contains, stored in a
//! compressed 64-bit bitmap. A query is encoded the same way, and a file is a
//! candidate only if it holds every one of the query's n-grams. The test never
//! misses a real match but can admit files where the n-grams occur apart, so
//! candidates always go through [`grep::confirm`].

pub mod error;
pub mod fs;
pub mod grep;
pub mod index;
pub mod utils;

pub use error::{Error, Result};
pub use index::{BlobFingerprint, IndexConfig, NgramSet, QueryFingerprint, RepoIndex};
