// Shared fixtures for integration tests
#![allow(dead_code)]

use ngramdex::fs::InMemoryFs;

pub const README: &str = "Hello world,\nthis is the world,\n...";

/// Single-file filesystem used by the query scenarios
pub fn readme_fs() -> InMemoryFs {
    InMemoryFs::new().with_file("readme.md", README)
}
