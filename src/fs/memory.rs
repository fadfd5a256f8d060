use super::FileSystem;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Filesystem backed by an in-memory map of path to contents
#[derive(Debug, Clone, Default)]
pub struct InMemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for InMemoryFs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            files: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl FileSystem for InMemoryFs {
    fn list_relative_filenames(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn stat_size(&self, name: &str) -> Result<u64> {
        self.files
            .get(name)
            .map(|content| content.len() as u64)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}
