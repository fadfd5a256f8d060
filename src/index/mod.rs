//! Index construction, querying and persistence.
//!
//! - [`build`] - parallel fingerprinting of a [`crate::fs::FileSystem`]
//! - [`repo`] - the [`RepoIndex`] and its query engine
//! - [`codec`] - framed and monolithic binary formats
//! - [`types`] - fingerprints, n-gram sets and configuration

pub mod build;
pub mod codec;
pub mod repo;
pub mod types;

pub use build::{build, build_with};
pub use repo::{IndexStats, Matches, RepoIndex};
pub use types::*;

use crate::error::Result;

/// Worker pool sized by `config.parallelism`
pub(crate) fn thread_pool(config: &IndexConfig) -> Result<rayon::ThreadPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_parallelism())
        .thread_name(|i| format!("ngramdex-worker-{i}"))
        .build()?;
    Ok(pool)
}
