//! Confirming scan over index candidates.
//!
//! The index only rules files out. Every candidate is re-read through the
//! index's filesystem and scanned line by line for the literal query.

use crate::error::Result;
use crate::fs::FileSystem;
use crate::index::RepoIndex;
use memchr::memmem;
use rayon::prelude::*;
use tracing::warn;

/// A file confirmed to contain the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub path: String,
    /// Number of lines containing the query
    pub lines: usize,
}

/// Outcome of one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepResult {
    pub query: String,
    /// Files that passed the n-gram filter
    pub candidates: usize,
    /// Files that really contain the query, sorted by path
    pub matches: Vec<FileMatch>,
}

impl GrepResult {
    /// Total matching lines across all files
    pub fn line_count(&self) -> usize {
        self.matches.iter().map(|m| m.lines).sum()
    }
}

/// Count the lines of `content` containing `needle`
pub fn count_matching_lines(content: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() {
        return content.split(|&b| b == b'\n').count();
    }
    let finder = memmem::Finder::new(needle);
    content
        .split(|&b| b == b'\n')
        .filter(|line| finder.find(line).is_some())
        .count()
}

/// Scan `candidates` through `filesystem`, keeping the files that contain `query`.
///
/// Candidates that can no longer be read are logged and dropped.
pub fn confirm(filesystem: &dyn FileSystem, candidates: &[String], query: &str) -> Vec<FileMatch> {
    let mut matches: Vec<FileMatch> = candidates
        .par_iter()
        .filter_map(|path| {
            let content = match filesystem.read_relative_filename(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        path = path.as_str(),
                        error = %e,
                        "candidate vanished before confirmation"
                    );
                    return None;
                }
            };
            let lines = count_matching_lines(&content, query.as_bytes());
            (lines > 0).then(|| FileMatch {
                path: path.clone(),
                lines,
            })
        })
        .collect();
    matches.sort_by(|a, b| a.path.cmp(&b.path));
    matches
}

/// Filter with the index, then confirm against the files.
///
/// With `parallel` the candidates come from [`RepoIndex::matches`], otherwise
/// from [`RepoIndex::match_sync`].
pub fn grep(index: &RepoIndex, query: &str, parallel: bool) -> Result<GrepResult> {
    let filesystem = index.filesystem()?;
    let candidates: Vec<String> = if parallel {
        index.matches(query)?.collect()
    } else {
        index.match_sync(query)
    };
    let matches = confirm(filesystem.as_ref(), &candidates, query);
    Ok(GrepResult {
        query: query.to_string(),
        candidates: candidates.len(),
        matches,
    })
}

/// Run [`grep`] for each query in turn
pub fn grep_all<S: AsRef<str>>(
    index: &RepoIndex,
    queries: &[S],
    parallel: bool,
) -> Result<Vec<GrepResult>> {
    queries
        .iter()
        .map(|q| grep(index, q.as_ref(), parallel))
        .collect()
}
