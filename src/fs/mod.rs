//! File access backends.
//!
//! The index core never touches the disk directly. It lists and reads files
//! through the [`FileSystem`] trait, which lets the same builder run against
//! a live directory ([`DirFs`]) or an in-memory map ([`InMemoryFs`]).

pub mod dir;
pub mod memory;

pub use dir::DirFs;
pub use memory::InMemoryFs;

use crate::error::Result;

/// Read-only view over a set of files addressed by relative path.
///
/// Implementations must tolerate concurrent reads from many build workers.
pub trait FileSystem: Send + Sync {
    /// All indexable file names, relative to the root and `/`-separated
    fn list_relative_filenames(&self) -> Result<Vec<String>>;

    /// Full contents of `name`. Missing files yield [`crate::Error::NotFound`].
    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>>;

    /// Size in bytes of `name`
    fn stat_size(&self, name: &str) -> Result<u64>;

    /// Root directory on disk, if this filesystem is backed by one
    fn root_dir(&self) -> Option<&str> {
        None
    }
}
