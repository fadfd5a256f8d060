use super::FileSystem;
use crate::error::{Error, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directories never worth indexing, even when not gitignored
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target", "__pycache__", ".venv", "venv"];

/// Filesystem backed by a live directory on disk.
///
/// Listing honours `.gitignore` and skips hidden files.
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
    root_str: String,
}

impl DirFs {
    /// Open `root`, which must be an existing directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| Error::read(root.display().to_string(), e))?;
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }
        let root_str = root.to_string_lossy().into_owned();
        Ok(Self { root, root_str })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl FileSystem for DirFs {
    /// Fails only if the root itself cannot be read. Entries below it that
    /// error during the walk are logged and left out.
    fn list_relative_filenames(&self) -> Result<Vec<String>> {
        fs::read_dir(&self.root).map_err(|e| Error::read(self.root_str.as_str(), e))?;

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIPPED_DIRS.contains(&name.as_ref())
            })
            .build();

        let mut names = Vec::new();
        let mut skipped = 0usize;
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping entry during directory walk");
                    skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(rel_path) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
        if skipped > 0 {
            warn!(root = %self.root_str, skipped, "directory walk was incomplete");
        }
        Ok(names)
    }

    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
        fs::read(self.full_path(name)).map_err(|e| Error::read(name, e))
    }

    fn stat_size(&self, name: &str) -> Result<u64> {
        fs::metadata(self.full_path(name))
            .map(|m| m.len())
            .map_err(|e| Error::read(name, e))
    }

    fn root_dir(&self) -> Option<&str> {
        Some(&self.root_str)
    }
}
