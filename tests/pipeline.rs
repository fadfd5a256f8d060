//! End-to-end tests of the build → persist → query pipeline.

mod fixtures;

use fixtures::readme_fs;
use ngramdex::fs::{DirFs, FileSystem, InMemoryFs};
use ngramdex::index::codec::{
    BlobReader, deserialize, deserialize_from_file, read_blob, serialize, serialize_to_file,
    write_blob, write_blobs_framed,
};
use ngramdex::index::{build, IndexConfig};
use ngramdex::{BlobFingerprint, Error, RepoIndex, grep};
use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

fn as_set<I: IntoIterator<Item = String>>(paths: I) -> BTreeSet<String> {
    paths.into_iter().collect()
}

fn sorted_blobs(index: &RepoIndex) -> Vec<BlobFingerprint> {
    let mut blobs = index.blobs().to_vec();
    blobs.sort_by(|a, b| a.path.cmp(&b.path));
    blobs
}

#[test]
fn test_readme_scenario() {
    let index = build(Arc::new(readme_fs()), &IndexConfig::quiet()).unwrap();

    assert_eq!(as_set(index.match_sync("world")), as_set(["readme.md".to_string()]));
    assert!(index.match_sync("zzzqqq").is_empty());
    assert_eq!(index.matches("zzzqqq").unwrap().count(), 0);
}

#[test]
fn test_sync_and_parallel_trigram_query() {
    let index = build(Arc::new(readme_fs()), &IndexConfig::quiet()).unwrap();

    let sync = as_set(index.match_sync("wor"));
    let parallel = as_set(index.matches("wor").unwrap());
    assert_eq!(sync, as_set(["readme.md".to_string()]));
    assert_eq!(sync, parallel);
}

#[test]
fn test_build_filtering_boundaries() {
    let limit = IndexConfig::default().max_file_size as usize;
    let mut fs = InMemoryFs::new();
    fs.insert("empty", "");
    fs.insert("over", vec![b'x'; limit + 1]);
    fs.insert("binary", b"\x00\x01\x02\x00\x00\x00\x00\x00\x00\x00".to_vec());
    fs.insert("ten", "0123456789");

    let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();
    let paths = as_set(index.blobs().iter().map(|b| b.path.clone()));
    assert_eq!(paths, as_set(["ten".to_string()]));
}

#[test]
fn test_monolithic_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("cache").join("index.bin");
    let fs: InMemoryFs = (0..300)
        .map(|i| (format!("src/mod_{i}.rs"), format!("pub fn handler_{i}() -> u32 {{ {i} }}")))
        .collect();

    let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();
    serialize_to_file(&index, &cache).unwrap();
    let loaded = deserialize_from_file(&cache).unwrap();

    assert_eq!(sorted_blobs(&loaded), sorted_blobs(&index));
    assert_eq!(
        as_set(loaded.match_sync("handler_42(")),
        as_set(index.match_sync("handler_42("))
    );
}

#[test]
fn test_monolithic_round_trip_in_memory() {
    let index = build(Arc::new(readme_fs()), &IndexConfig::quiet()).unwrap();
    let mut buf = Vec::new();
    serialize(&index, &mut buf).unwrap();

    let loaded = deserialize(Cursor::new(buf)).unwrap();
    assert_eq!(sorted_blobs(&loaded), sorted_blobs(&index));
}

#[test]
fn test_framed_stream_of_whole_index() {
    let fs: InMemoryFs = (0..25)
        .map(|i| (format!("f{i}.txt"), format!("record {i}")))
        .collect();
    let index = build(Arc::new(fs), &IndexConfig::quiet()).unwrap();

    let mut buf = Vec::new();
    assert_eq!(write_blobs_framed(&mut buf, index.blobs()).unwrap(), 25);

    let streamed: Vec<BlobFingerprint> = BlobReader::new(Cursor::new(buf))
        .collect::<ngramdex::Result<_>>()
        .unwrap();
    assert_eq!(streamed, index.blobs());
}

#[test]
fn test_framed_truncated_final_record() {
    let index = build(Arc::new(readme_fs()), &IndexConfig::quiet()).unwrap();
    let blob = &index.blobs()[0];

    let mut buf = Vec::new();
    write_blob(&mut buf, blob).unwrap();
    write_blob(&mut buf, blob).unwrap();
    buf.pop();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_blob(&mut cursor).unwrap().as_ref(), Some(blob));
    assert!(matches!(
        read_blob(&mut cursor),
        Err(Error::LengthMismatch { .. })
    ));
}

#[test]
fn test_directory_index_and_grep() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/lib.rs"),
        "pub fn greet() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    fs::write(dir.path().join("notes.md"), "# Notes\nsay hello twice: hello\n").unwrap();
    fs::write(dir.path().join("empty.txt"), "").unwrap();

    let dir_fs = DirFs::open(dir.path()).unwrap();
    let index = build(Arc::new(dir_fs), &IndexConfig::quiet()).unwrap();
    assert_eq!(index.len(), 2);

    // Reload from cache so the filesystem is rebound from root_dir
    let cache = dir.path().join(".cache/index.bin");
    serialize_to_file(&index, &cache).unwrap();
    let loaded = deserialize_from_file(&cache).unwrap();
    assert!(loaded.root_dir().is_some());
    assert!(loaded.filesystem().unwrap().stat_size("notes.md").unwrap() > 0);

    let result = grep::grep(&loaded, "hello", true).unwrap();
    assert_eq!(result.candidates, 2);
    let found: Vec<(&str, usize)> = result
        .matches
        .iter()
        .map(|m| (m.path.as_str(), m.lines))
        .collect();
    assert_eq!(found, vec![("notes.md", 1), ("src/lib.rs", 1)]);
}

#[test]
fn test_rebuild_yields_same_fingerprints() {
    let fs: Arc<dyn FileSystem> = Arc::new(
        (0..420)
            .map(|i| (format!("doc{i}"), format!("document body {}", i * 7)))
            .collect::<InMemoryFs>(),
    );
    let config = IndexConfig {
        parallelism: 2,
        build_batch_size: 17,
        ..IndexConfig::quiet()
    };

    let first = build(fs.clone(), &config).unwrap();
    let second = build(fs, &config).unwrap();
    assert_eq!(sorted_blobs(&first), sorted_blobs(&second));
}
